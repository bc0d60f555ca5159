//! Pairwise compare-and-blend, the inner step of every scan pass

use super::params::EffectParameters;
use crate::display::PixelBuffer;

/// Should the pixels at `source` and `target` trade colors?
///
/// Brightness is the plain R+G+B sum. A positive threshold asks for the
/// target to be brighter than the source by more than the threshold; zero or
/// negative flips the test to "darker than", so one signed value selects
/// both the magnitude and the direction of the sort.
#[inline]
pub fn compare(buffer: &PixelBuffer, source: usize, target: usize, threshold: i32) -> bool {
    let delta = i32::from(buffer.brightness(target)) - i32::from(buffer.brightness(source));
    if threshold > 0 {
        delta > threshold
    } else {
        delta < threshold
    }
}

/// Move the pixel at `index` a `strength` fraction of the way toward `toward`.
/// Alpha is left alone.
#[inline]
pub fn blend_pixel(buffer: &mut PixelBuffer, index: usize, toward: (u8, u8, u8), strength: f64) {
    let (r, g, b) = toward;
    for (offset, target) in [r, g, b].into_iter().enumerate() {
        let old = f64::from(buffer.component(index + offset));
        buffer.set_component(index + offset, old + strength * (f64::from(target) - old));
    }
}

/// Compare a pair and, if it qualifies, blend each pixel toward the other.
///
/// Both blends read from a snapshot taken before either write. Returns
/// whether anything was written.
#[inline]
pub fn compare_and_blend(
    buffer: &mut PixelBuffer,
    source: usize,
    target: usize,
    params: &EffectParameters,
) -> bool {
    if !compare(buffer, source, target, params.effective_threshold) {
        return false;
    }

    let source_rgb = buffer.rgb(source);
    let target_rgb = buffer.rgb(target);
    blend_pixel(buffer, target, source_rgb, params.strength);
    blend_pixel(buffer, source, target_rgb, params.strength);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::params::Orientation;
    use pretty_assertions::assert_eq;

    fn params(strength: f64, threshold: i32) -> EffectParameters {
        let mut p = EffectParameters::new(strength, 0.0, Orientation::Horizontal);
        p.effective_threshold = threshold;
        p
    }

    fn black_white() -> PixelBuffer {
        PixelBuffer::from_rgb_pixels(2, 1, &[(0, 0, 0), (255, 255, 255)]).unwrap()
    }

    #[test]
    fn test_positive_threshold_full_swap() {
        let mut buf = black_white();
        assert!(compare(&buf, 0, 4, 10));
        assert!(compare_and_blend(&mut buf, 0, 4, &params(1.0, 10)));
        let expected =
            PixelBuffer::from_rgb_pixels(2, 1, &[(255, 255, 255), (0, 0, 0)]).unwrap();
        assert_eq!(buf, expected);
    }

    #[test]
    fn test_negative_threshold_leaves_buffer() {
        let mut buf = black_white();
        assert!(!compare(&buf, 0, 4, -10));
        assert!(!compare_and_blend(&mut buf, 0, 4, &params(1.0, -10)));
        assert_eq!(buf, black_white());
    }

    #[test]
    fn test_negative_threshold_seeks_darker_target() {
        let buf = black_white();
        // source is white, target is black: delta = -765 < -10
        assert!(compare(&buf, 4, 0, -10));
    }

    #[test]
    fn test_zero_threshold_uses_inverted_test() {
        let buf = black_white();
        assert!(!compare(&buf, 0, 4, 0));
        assert!(compare(&buf, 4, 0, 0));
    }

    #[test]
    fn test_max_threshold_never_swaps() {
        let buf = black_white();
        assert!(!compare(&buf, 0, 4, 765));
    }

    #[test]
    fn test_equal_brightness_not_swapped() {
        let buf = PixelBuffer::from_rgb_pixels(2, 1, &[(10, 20, 30), (30, 20, 10)]).unwrap();
        assert!(!compare(&buf, 0, 4, 1));
        assert!(!compare(&buf, 0, 4, -1));
    }

    #[test]
    fn test_no_side_effect_when_compare_false() {
        let colors = [(200, 10, 40), (3, 90, 250), (0, 0, 0), (128, 128, 128)];
        let original = PixelBuffer::from_rgb_pixels(4, 1, &colors).unwrap();
        for threshold in [-765, -100, -1, 0, 1, 50, 300, 765] {
            for (s, t) in [(0, 4), (4, 8), (8, 12), (12, 0)] {
                let mut buf = original.clone();
                if !compare(&buf, s, t, threshold) {
                    compare_and_blend(&mut buf, s, t, &params(0.6, threshold));
                    assert_eq!(buf, original, "threshold {} pair {}->{}", threshold, s, t);
                }
            }
        }
    }

    #[test]
    fn test_blend_strength_zero_is_noop() {
        let mut buf = PixelBuffer::from_rgb_pixels(1, 1, &[(17, 99, 201)]).unwrap();
        blend_pixel(&mut buf, 0, (255, 0, 0), 0.0);
        assert_eq!(buf.rgb(0), (17, 99, 201));
    }

    #[test]
    fn test_blend_strength_one_copies() {
        let mut buf = PixelBuffer::from_rgb_pixels(1, 1, &[(17, 99, 201)]).unwrap();
        blend_pixel(&mut buf, 0, (1, 2, 3), 1.0);
        assert_eq!(buf.rgb(0), (1, 2, 3));
    }

    #[test]
    fn test_blend_partial_moves_toward() {
        let mut buf = PixelBuffer::from_rgb_pixels(1, 1, &[(0, 100, 200)]).unwrap();
        blend_pixel(&mut buf, 0, (100, 100, 0), 0.5);
        assert_eq!(buf.rgb(0), (50, 100, 100));
    }

    #[test]
    fn test_blend_rounds_double_precision_step() {
        // 0.3 * 5 is 1.4999999999999998 in f64; single precision lands on 1.5
        let mut buf = PixelBuffer::from_rgb_pixels(1, 1, &[(0, 0, 0)]).unwrap();
        blend_pixel(&mut buf, 0, (5, 5, 5), 0.3);
        assert_eq!(buf.rgb(0), (1, 1, 1));
    }

    #[test]
    fn test_blend_keeps_alpha() {
        let mut buf = PixelBuffer::from_rgba(1, 1, vec![0, 0, 0, 42]).unwrap();
        blend_pixel(&mut buf, 0, (255, 255, 255), 1.0);
        assert_eq!(buf.component(3), 42);
    }

    #[test]
    fn test_blends_read_pre_blend_snapshot() {
        // With half strength both pixels must land in the middle. If the
        // second blend read the first blend's output the source would end
        // up at 64 instead of 128.
        let mut buf = PixelBuffer::from_rgb_pixels(2, 1, &[(0, 0, 0), (255, 255, 255)]).unwrap();
        assert!(compare_and_blend(&mut buf, 0, 4, &params(0.5, 10)));
        assert_eq!(buf.rgb(0), (128, 128, 128));
        assert_eq!(buf.rgb(4), (128, 128, 128));
    }
}
