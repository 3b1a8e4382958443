// Messaging module - lock-free channels off the realtime path

pub mod channels;

pub use channels::{
    create_chunk_channel, push_raw, ChunkConsumer, ChunkProducer, RawMidiChunk, CHUNK_CAPACITY,
};
