//! Live-tunable effect parameters
//!
//! The parameter record is plain data. All writes go through
//! [`ParameterController`], which keeps `effective_threshold` in sync with
//! the operator-facing tuning value.

use serde::{Deserialize, Serialize};

pub const DEFAULT_STRENGTH: f64 = 0.75;
pub const DEFAULT_TUNING: f64 = 0.45;

/// Exponent of the tuning curve
const TUNING_EXPONENT: i32 = 7;
/// Largest possible R+G+B difference between two pixels
const MAX_BRIGHTNESS_DELTA: f64 = 3.0 * 255.0;

/// Map the operator's tuning value onto a brightness-difference threshold.
///
/// `floor(tuning^7 * 765)`. The seventh power keeps most of the slider's
/// travel in the low, visually interesting range. The curve is odd, so a
/// negative tuning yields a negative (dark-seeking) threshold.
pub fn remap_threshold(tuning: f64) -> i32 {
    let curved = tuning.powi(TUNING_EXPONENT);
    (curved * MAX_BRIGHTNESS_DELTA).floor() as i32
}

/// Axis along which adjacent pixels are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Each pixel against the one below it
    Vertical,
    /// Each pixel against its right neighbor
    Horizontal,
}

impl Orientation {
    pub fn from_vertical(vertical: bool) -> Self {
        if vertical {
            Self::Vertical
        } else {
            Self::Horizontal
        }
    }

    pub fn is_vertical(self) -> bool {
        self == Self::Vertical
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Vertical => Self::Horizontal,
            Self::Horizontal => Self::Vertical,
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vertical => f.write_str("vertical"),
            Self::Horizontal => f.write_str("horizontal"),
        }
    }
}

/// Values read by every scan pass
#[derive(Debug, Clone, PartialEq)]
pub struct EffectParameters {
    /// Blend fraction per step, 0..=1
    pub strength: f64,
    /// Operator value the threshold is derived from, -1..=1
    pub tuning: f64,
    /// Signed brightness-difference threshold, `remap_threshold(tuning)`
    pub effective_threshold: i32,
    pub orientation: Orientation,
}

impl EffectParameters {
    pub fn new(strength: f64, tuning: f64, orientation: Orientation) -> Self {
        let mut params = Self {
            strength: clamp_strength(strength),
            tuning: clamp_tuning(tuning),
            effective_threshold: 0,
            orientation,
        };
        params.rebuild();
        params
    }

    /// Recompute the effective threshold from the stored tuning value
    pub fn rebuild(&mut self) {
        self.effective_threshold = remap_threshold(self.tuning);
    }
}

impl Default for EffectParameters {
    fn default() -> Self {
        Self::new(DEFAULT_STRENGTH, DEFAULT_TUNING, Orientation::Vertical)
    }
}

fn clamp_strength(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

fn clamp_tuning(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(-1.0, 1.0)
}

/// A finished adjustment of one control
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamChange {
    Strength(f64),
    Threshold(f64),
    Orientation(Orientation),
}

impl ParamChange {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Strength(_) => "strength",
            Self::Threshold(_) => "threshold",
            Self::Orientation(_) => "orientation",
        }
    }
}

/// Single writer for [`EffectParameters`].
///
/// Writes take effect at the next pass: the effect loop reads the record
/// fresh every time, so the last write before a pass wins.
#[derive(Debug, Default)]
pub struct ParameterController {
    params: EffectParameters,
    rebuilds: u64,
}

impl ParameterController {
    pub fn new(params: EffectParameters) -> Self {
        Self {
            params,
            rebuilds: 0,
        }
    }

    pub fn params(&self) -> &EffectParameters {
        &self.params
    }

    /// Number of threshold rebuilds so far
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    pub fn set_strength(&mut self, strength: f64) {
        self.params.strength = clamp_strength(strength);
    }

    /// Store a new tuning value. The effective threshold changes on commit.
    pub fn set_tuning(&mut self, tuning: f64) {
        self.params.tuning = clamp_tuning(tuning);
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.params.orientation = orientation;
    }

    pub fn nudge_strength(&mut self, delta: f64) -> ParamChange {
        self.set_strength(self.params.strength + delta);
        ParamChange::Strength(self.params.strength)
    }

    /// Nudges keep the sign, so a dark-seeking tuning can be pushed further
    pub fn nudge_tuning(&mut self, delta: f64) -> ParamChange {
        self.set_tuning(self.params.tuning + delta);
        ParamChange::Threshold(self.params.tuning)
    }

    pub fn toggle_orientation(&mut self) -> ParamChange {
        self.set_orientation(self.params.orientation.toggled());
        ParamChange::Orientation(self.params.orientation)
    }

    /// The operator finished adjusting a control: store it and rebuild
    pub fn commit(&mut self, change: ParamChange) {
        match change {
            ParamChange::Strength(v) => self.set_strength(v),
            ParamChange::Threshold(v) => self.set_tuning(v),
            ParamChange::Orientation(o) => self.set_orientation(o),
        }
        tracing::info!(
            parameter = change.name(),
            value = ?change,
            "Parameter committed"
        );
        self.rebuild();
    }

    /// Host window was resized.
    ///
    /// Only rebuilds the threshold: the scan geometry follows the image, not
    /// the window. Nothing about a resize actually requires the rebuild; it is
    /// kept so resizing behaves the way it always has.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        tracing::debug!(width, height, "Viewport resized");
        self.rebuild();
    }

    pub fn rebuild(&mut self) {
        self.params.rebuild();
        self.rebuilds += 1;
        tracing::debug!(
            tuning = self.params.tuning,
            effective_threshold = self.params.effective_threshold,
            "Threshold rebuilt"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remap_zero_and_one() {
        assert_eq!(remap_threshold(0.0), 0);
        assert_eq!(remap_threshold(1.0), 765);
    }

    #[test]
    fn test_remap_default_tuning() {
        // 0.45^7 * 765 = 2.86
        assert_eq!(remap_threshold(DEFAULT_TUNING), 2);
    }

    #[test]
    fn test_remap_monotonic() {
        let mut prev = remap_threshold(0.0);
        for i in 1..=1000 {
            let t = i as f64 / 1000.0;
            let v = remap_threshold(t);
            assert!(v >= prev, "remap decreased at tuning {}", t);
            prev = v;
        }
    }

    #[test]
    fn test_remap_negative_tuning_is_dark_seeking() {
        assert_eq!(remap_threshold(-1.0), -765);
        assert!(remap_threshold(-0.5) < 0);
    }

    #[test]
    fn test_rebuild_uses_tuning_not_previous_threshold() {
        let mut params = EffectParameters::new(0.5, 0.9, Orientation::Vertical);
        let first = params.effective_threshold;
        params.rebuild();
        params.rebuild();
        assert_eq!(params.effective_threshold, first);
        assert_eq!(first, remap_threshold(0.9));
    }

    #[test]
    fn test_setters_clamp() {
        let mut ctl = ParameterController::default();
        ctl.set_strength(4.0);
        assert_eq!(ctl.params().strength, 1.0);
        ctl.set_strength(f64::NAN);
        assert_eq!(ctl.params().strength, 0.0);
        ctl.set_tuning(-3.0);
        assert_eq!(ctl.params().tuning, -1.0);
    }

    #[test]
    fn test_set_tuning_waits_for_commit() {
        let mut ctl = ParameterController::default();
        let before = ctl.params().effective_threshold;
        ctl.set_tuning(1.0);
        assert_eq!(ctl.params().effective_threshold, before);
        ctl.commit(ParamChange::Threshold(1.0));
        assert_eq!(ctl.params().effective_threshold, 765);
    }

    #[test]
    fn test_resize_rebuilds_threshold() {
        let mut ctl = ParameterController::default();
        ctl.set_tuning(1.0);
        ctl.on_resize(800, 600);
        assert_eq!(ctl.params().effective_threshold, 765);
        assert_eq!(ctl.rebuilds(), 1);
    }

    #[test]
    fn test_nudges() {
        let mut ctl = ParameterController::default();
        assert_eq!(ctl.nudge_strength(0.5), ParamChange::Strength(1.0));
        ctl.set_tuning(0.99);
        assert_eq!(ctl.nudge_tuning(0.05), ParamChange::Threshold(1.0));
        assert_eq!(
            ctl.toggle_orientation(),
            ParamChange::Orientation(Orientation::Horizontal)
        );
    }

    #[test]
    fn test_tuning_nudge_keeps_dark_seeking_sign() {
        let mut ctl = ParameterController::new(EffectParameters::new(
            0.5,
            -0.5,
            Orientation::Vertical,
        ));
        assert_eq!(ctl.nudge_tuning(-0.25), ParamChange::Threshold(-0.75));
        assert_eq!(ctl.nudge_tuning(-0.5), ParamChange::Threshold(-1.0));
        assert_eq!(ctl.nudge_tuning(0.25), ParamChange::Threshold(-0.75));
    }

    #[test]
    fn test_orientation_serde() {
        let o: Orientation = serde_json::from_str("\"horizontal\"").unwrap();
        assert_eq!(o, Orientation::Horizontal);
        assert_eq!(Orientation::Vertical.to_string(), "vertical");
    }
}
