mod blend;
mod effect_loop;
mod geometry;
mod params;
mod scan;

pub use blend::{blend_pixel, compare, compare_and_blend};
pub use effect_loop::{CancelToken, EffectError, EffectLoop, LoopState};
pub use geometry::ScanGeometry;
pub use params::{
    remap_threshold, EffectParameters, Orientation, ParamChange, ParameterController,
    DEFAULT_STRENGTH, DEFAULT_TUNING,
};
pub use scan::{scan_pass, PassStats};
