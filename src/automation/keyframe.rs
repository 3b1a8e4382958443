// Keyframe - a single timed sample point on an automation curve
// Ticks are relative to the owning block's start tick

use serde::{Deserialize, Serialize};

/// Tangent handle attached to a keyframe, in (ticks, value) units.
///
/// `dx == i64::MIN` is the "unset" sentinel: the tangent has not been
/// authored and bezier evaluation treats it as `(0, 0.0)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tangent {
    pub dx: i64,
    pub dy: f64,
}

impl Tangent {
    /// The unauthored tangent.
    pub const UNSET: Tangent = Tangent {
        dx: i64::MIN,
        dy: 0.0,
    };

    pub fn new(dx: i64, dy: f64) -> Self {
        Self { dx, dy }
    }

    pub fn is_set(&self) -> bool {
        self.dx != i64::MIN
    }
}

impl Default for Tangent {
    fn default() -> Self {
        Self::UNSET
    }
}

/// Interpolation mode from a keyframe to its successor.
///
/// `Init` means "unspecified by the caller": it never survives insertion
/// into a curve (`Curve::add_key` resolves it to the previous key's mode,
/// or `Linear` at the front).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CurveType {
    Init,
    Step,
    #[default]
    Linear,
    Bezier,
}

/// A single automation sample: time, value, and how to reach the next key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Time in ticks, relative to the owning block's start.
    pub tick: i64,
    /// Controller value at this tick.
    pub value: f64,
    /// Interpolation toward the next keyframe.
    pub curve_type: CurveType,
    /// Incoming bezier tangent (from the previous key toward this one).
    pub in_tangent: Tangent,
    /// Outgoing bezier tangent (from this key toward the next one).
    pub out_tangent: Tangent,
}

impl Keyframe {
    /// Create a keyframe with an unspecified interpolation mode.
    pub fn new(tick: i64, value: f64) -> Self {
        Self {
            tick,
            value,
            curve_type: CurveType::Init,
            in_tangent: Tangent::UNSET,
            out_tangent: Tangent::UNSET,
        }
    }

    /// Create a keyframe with an explicit interpolation mode.
    pub fn with_curve(tick: i64, value: f64, curve_type: CurveType) -> Self {
        Self {
            tick,
            value,
            curve_type,
            in_tangent: Tangent::UNSET,
            out_tangent: Tangent::UNSET,
        }
    }

    /// Shift the keyframe in time.
    pub fn offset(mut self, delta: i64) -> Self {
        self.tick += delta;
        self
    }
}
