// Lock-free capture channel between the realtime MIDI callback and the
// control thread that runs tokenization and ingest

use arrayvec::ArrayVec;
use ringbuf::traits::{Producer, Split};
use ringbuf::HeapRb;

/// Maximum bytes carried by one capture chunk. Longer byte runs (sysex) are
/// split across chunks sharing the same frame stamp.
pub const CHUNK_CAPACITY: usize = 64;

/// One `(port, frame, bytes)` capture unit from the transport collaborator.
#[derive(Debug, Clone, Default)]
pub struct RawMidiChunk {
    pub port: usize,
    /// Absolute time of the chunk, in ticks.
    pub frame: i64,
    pub bytes: ArrayVec<u8, CHUNK_CAPACITY>,
}

pub type ChunkProducer = ringbuf::HeapProd<RawMidiChunk>;
pub type ChunkConsumer = ringbuf::HeapCons<RawMidiChunk>;

pub fn create_chunk_channel(capacity: usize) -> (ChunkProducer, ChunkConsumer) {
    let rb = HeapRb::<RawMidiChunk>::new(capacity);
    rb.split()
}

/// Queue a raw byte run from the realtime callback.
///
/// Splits the run into fixed-capacity chunks; never allocates and never
/// blocks. Returns the number of chunks the full ring could not absorb
/// (0 means everything was queued).
pub fn push_raw(producer: &mut ChunkProducer, port: usize, frame: i64, bytes: &[u8]) -> usize {
    let mut dropped = 0;
    for part in bytes.chunks(CHUNK_CAPACITY) {
        let mut chunk = RawMidiChunk {
            port,
            frame,
            bytes: ArrayVec::new(),
        };
        // part.len() <= CHUNK_CAPACITY, the extend cannot fail.
        let _ = chunk.bytes.try_extend_from_slice(part);
        if producer.try_push(chunk).is_err() {
            dropped += 1;
        }
    }
    if dropped > 0 {
        log::warn!("capture buffer full, {dropped} chunk(s) dropped on port {port}");
    }
    dropped
}
