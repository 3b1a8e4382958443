// Sequencer module - block arena, tracks, and the recording pipeline

pub mod arena;
pub mod block;
pub mod recorder;
pub mod track;

pub use arena::{BlockArena, BlockId};
pub use block::{CurveChannel, TimedBlock};
pub use recorder::{Recorder, BLOCK_SEPARATION_TICKS};
pub use track::{Track, CHANNEL_ANY};
