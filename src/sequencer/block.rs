// TimedBlock - a titled, time-anchored container for one or two curves
// Blocks live in the BlockArena and are keyed by start tick in a Track

use crate::automation::Curve;
use crate::sequencer::arena::BlockId;

/// Which of a block's two automation channels to address. The secondary
/// channel exists for 14-bit MSB/LSB controller pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveChannel {
    Primary,
    Secondary,
}

impl CurveChannel {
    pub const ALL: [CurveChannel; 2] = [CurveChannel::Primary, CurveChannel::Secondary];
}

/// A time-anchored automation block.
///
/// A block either owns its keyframe data or is an *instance*: a block with
/// `instance_of` set stores no keyframes of its own, and every curve read
/// or write resolves through the arena to the referenced block. That is the
/// instancing contract — mutating an instance mutates the original's data.
#[derive(Debug, Clone)]
pub struct TimedBlock {
    start_tick: i64,
    pub title: String,
    curve: Curve,
    secondary_curve: Curve,
    instance_of: Option<BlockId>,

    // UI pass-through scratch; not load-bearing for the engine.
    pub values_per_pixel: f64,
    pub offset_y: f64,
    pub cursor_tick: Option<i64>,
    pub marker_ticks: (Option<i64>, Option<i64>),
}

impl TimedBlock {
    /// Create an empty block anchored at `start_tick`.
    pub fn new(start_tick: i64, title: impl Into<String>) -> Self {
        assert!(start_tick >= 0, "block start tick must be >= 0");
        Self {
            start_tick,
            title: title.into(),
            curve: Curve::new(),
            secondary_curve: Curve::new(),
            instance_of: None,
            values_per_pixel: 1.0,
            offset_y: 0.0,
            cursor_tick: None,
            marker_ticks: (None, None),
        }
    }

    /// Create an instance of `target` anchored at `start_tick`. Use
    /// `BlockArena::new_instance` instead, which flattens instance chains.
    pub(crate) fn instance(start_tick: i64, title: impl Into<String>, target: BlockId) -> Self {
        let mut block = Self::new(start_tick, title);
        block.instance_of = Some(target);
        block
    }

    pub fn start_tick(&self) -> i64 {
        self.start_tick
    }

    pub(crate) fn set_start_tick(&mut self, start_tick: i64) {
        assert!(start_tick >= 0, "block start tick must be >= 0");
        self.start_tick = start_tick;
    }

    pub fn instance_of(&self) -> Option<BlockId> {
        self.instance_of
    }

    /// Point this block at another block's data. Used by the persistence
    /// resolve pass; `BlockArena::new_instance` is the normal entry point.
    pub(crate) fn set_instance_target(&mut self, target: BlockId) {
        self.instance_of = Some(target);
    }

    pub fn is_instance(&self) -> bool {
        self.instance_of.is_some()
    }

    /// Direct access to this block's own curve data. Instance blocks have
    /// empty curves here; resolve through `BlockArena::curve` instead.
    pub fn curve(&self, channel: CurveChannel) -> &Curve {
        match channel {
            CurveChannel::Primary => &self.curve,
            CurveChannel::Secondary => &self.secondary_curve,
        }
    }

    pub fn curve_mut(&mut self, channel: CurveChannel) -> &mut Curve {
        match channel {
            CurveChannel::Primary => &mut self.curve,
            CurveChannel::Secondary => &mut self.secondary_curve,
        }
    }

    /// Duration of this block's own data: the greatest final keyframe tick
    /// over both channels. Instance blocks delegate via `BlockArena::duration`.
    pub fn raw_duration(&self) -> i64 {
        self.curve.duration().max(self.secondary_curve.duration())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::{CurveType, Keyframe};

    #[test]
    fn test_new_block_is_empty() {
        let block = TimedBlock::new(480, "volume ramp");
        assert_eq!(block.start_tick(), 480);
        assert_eq!(block.raw_duration(), 0);
        assert!(!block.is_instance());
    }

    #[test]
    #[should_panic(expected = "block start tick must be >= 0")]
    fn test_negative_start_tick_rejected() {
        TimedBlock::new(-1, "bad");
    }

    #[test]
    fn test_duration_covers_both_channels() {
        let mut block = TimedBlock::new(0, "pair");
        block
            .curve_mut(CurveChannel::Primary)
            .add_key(Keyframe::with_curve(100, 1.0, CurveType::Step));
        block
            .curve_mut(CurveChannel::Secondary)
            .add_key(Keyframe::with_curve(250, 0.5, CurveType::Step));
        assert_eq!(block.raw_duration(), 250);
    }
}
