// Automation module - keyframes and interpolated curves

pub mod curve;
pub mod keyframe;

pub use curve::{Curve, MergePolicy};
pub use keyframe::{CurveType, Keyframe, Tangent};
