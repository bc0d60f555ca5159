use super::blend::compare_and_blend;
use super::geometry::ScanGeometry;
use super::params::EffectParameters;
use crate::display::PixelBuffer;

/// What one pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Pairs compared
    pub pairs: usize,
    /// Pairs that passed the threshold test and were blended
    pub blended: usize,
}

/// One full traversal: every eligible adjacent pair, once, in geometry order.
///
/// # Panics
/// Panics if `geometry` was derived from different dimensions than
/// `buffer`. The effect loop only ever pairs a buffer with its own geometry.
pub fn scan_pass(
    buffer: &mut PixelBuffer,
    geometry: &ScanGeometry,
    params: &EffectParameters,
) -> PassStats {
    assert!(
        geometry.width == buffer.width() && geometry.height == buffer.height(),
        "scan geometry {}x{} does not match buffer {}x{}",
        geometry.width,
        geometry.height,
        buffer.width(),
        buffer.height()
    );

    let mut stats = PassStats::default();
    for (source, target) in geometry.pairs() {
        stats.pairs += 1;
        if compare_and_blend(buffer, source, target, params) {
            stats.blended += 1;
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::params::Orientation;
    use pretty_assertions::assert_eq;

    fn params(strength: f64, threshold: i32, orientation: Orientation) -> EffectParameters {
        let mut p = EffectParameters::new(strength, 0.0, orientation);
        p.effective_threshold = threshold;
        p
    }

    #[test]
    fn test_horizontal_pass_swaps_scenario() {
        let mut buf = PixelBuffer::from_rgb_pixels(2, 1, &[(0, 0, 0), (255, 255, 255)]).unwrap();
        let geometry = ScanGeometry::new(2, 1, Orientation::Horizontal);
        let stats = scan_pass(&mut buf, &geometry, &params(1.0, 10, Orientation::Horizontal));
        assert_eq!(stats, PassStats { pairs: 1, blended: 1 });
        assert_eq!(buf.rgb(0), (255, 255, 255));
        assert_eq!(buf.rgb(4), (0, 0, 0));
    }

    #[test]
    fn test_vertical_pass_on_single_row_does_nothing() {
        let original =
            PixelBuffer::from_rgb_pixels(2, 1, &[(0, 0, 0), (255, 255, 255)]).unwrap();
        let mut buf = original.clone();
        let geometry = ScanGeometry::new(2, 1, Orientation::Vertical);
        let stats = scan_pass(&mut buf, &geometry, &params(1.0, 10, Orientation::Vertical));
        assert_eq!(stats.pairs, 0);
        assert_eq!(buf, original);
    }

    #[test]
    fn test_vertical_full_strength_bubbles_in_order() {
        // A bright pixel at the bottom of a column climbs one row per
        // comparison because later pairs see the earlier swap.
        let mut buf = PixelBuffer::from_rgb_pixels(1, 3, &[(0, 0, 0), (0, 0, 0), (255, 255, 255)])
            .unwrap();
        let geometry = ScanGeometry::new(1, 3, Orientation::Vertical);
        scan_pass(&mut buf, &geometry, &params(1.0, 10, Orientation::Vertical));
        // pair (0,4): both black, no swap; pair (4,8): white moves up to row 1
        assert_eq!(buf.rgb(0), (0, 0, 0));
        assert_eq!(buf.rgb(4), (255, 255, 255));
        assert_eq!(buf.rgb(8), (0, 0, 0));

        scan_pass(&mut buf, &geometry, &params(1.0, 10, Orientation::Vertical));
        assert_eq!(buf.rgb(0), (255, 255, 255));
    }

    #[test]
    fn test_pass_counts_every_pair() {
        let mut buf = PixelBuffer::with_size(6, 4);
        for orientation in [Orientation::Vertical, Orientation::Horizontal] {
            let geometry = ScanGeometry::new(6, 4, orientation);
            let stats = scan_pass(&mut buf, &geometry, &params(0.5, 1, orientation));
            assert_eq!(stats.pairs, geometry.pair_count());
            assert_eq!(stats.blended, 0);
        }
    }

    #[test]
    fn test_pass_is_deterministic() {
        let colors: Vec<_> = (0..48u32)
            .map(|i| ((i * 37 % 256) as u8, (i * 91 % 256) as u8, (i * 13 % 256) as u8))
            .collect();
        let start = PixelBuffer::from_rgb_pixels(8, 6, &colors).unwrap();
        let geometry = ScanGeometry::new(8, 6, Orientation::Vertical);
        let p = params(0.75, 2, Orientation::Vertical);

        let mut a = start.clone();
        let mut b = start.clone();
        for _ in 0..10 {
            scan_pass(&mut a, &geometry, &p);
            scan_pass(&mut b, &geometry, &p);
        }
        assert_eq!(a, b);
        assert_ne!(a, start);
    }

    #[test]
    #[should_panic(expected = "does not match")]
    fn test_stale_geometry_is_rejected() {
        let mut buf = PixelBuffer::with_size(2, 2);
        let geometry = ScanGeometry::new(3, 3, Orientation::Vertical);
        scan_pass(&mut buf, &geometry, &EffectParameters::default());
    }
}
