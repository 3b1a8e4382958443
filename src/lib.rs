// midicurve - MIDI controller automation-curve engine
// Keyframed curves on time-anchored blocks, plus the pipeline turning
// live-recorded MIDI CC input into such curves

pub mod automation;
pub mod messaging;
pub mod midi;
pub mod project;
pub mod sequencer;

// Re-export commonly used types for convenience
pub use automation::{Curve, CurveType, Keyframe, MergePolicy, Tangent};
pub use messaging::{create_chunk_channel, push_raw, RawMidiChunk};
pub use midi::{MidiByteTokenizer, MidiToken, TokenKind};
pub use project::{Project, ProjectError, ProjectMetadata, ProjectVersion};
pub use sequencer::{
    BlockArena, BlockId, CurveChannel, Recorder, TimedBlock, Track, BLOCK_SEPARATION_TICKS,
    CHANNEL_ANY,
};
