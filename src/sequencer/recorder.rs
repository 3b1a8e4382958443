// Recorder - the recording-ingest pipeline
// Drains captured byte chunks, tokenizes per port, fans CC tokens out to
// armed tracks, and commits buffered tokens as step-curve blocks

use crate::automation::{CurveType, Keyframe, MergePolicy};
use crate::messaging::ChunkConsumer;
use crate::midi::MidiByteTokenizer;
use crate::midi::MidiToken;
use crate::sequencer::arena::{BlockArena, BlockId};
use crate::sequencer::block::{CurveChannel, TimedBlock};
use crate::sequencer::track::Track;
use ringbuf::traits::Consumer;
use std::collections::HashMap;

/// Gap (in ticks) between consecutive tokens beyond which a new block
/// starts during commit.
pub const BLOCK_SEPARATION_TICKS: i64 = 2000;

/// Per-pass recording pipeline.
///
/// The realtime side only pushes chunks into the capture channel; this side
/// runs on the control thread. A pass is `begin_pass` → any number of
/// `poll`s → `commit` (or `abort`). Commit is all-or-nothing per pass:
/// aborting discards everything without touching any track's timeline.
pub struct Recorder {
    consumer: ChunkConsumer,
    tokenizers: HashMap<usize, MidiByteTokenizer>,
}

impl Recorder {
    pub fn new(consumer: ChunkConsumer) -> Self {
        Self {
            consumer,
            tokenizers: HashMap::new(),
        }
    }

    /// Start a recording pass: clear per-track token buffers, parser state,
    /// and any stale chunks left in the channel.
    pub fn begin_pass(&mut self, tracks: &mut [Track]) {
        for track in tracks.iter_mut() {
            track.clear_record_buffer();
        }
        self.tokenizers.clear();
        while self.consumer.try_pop().is_some() {}
    }

    /// Drain pending chunks, decode them, and fan tokens out to every
    /// armed track listening on the chunk's port.
    pub fn poll(&mut self, tracks: &mut [Track]) {
        while let Some(chunk) = self.consumer.try_pop() {
            let tokenizer = self.tokenizers.entry(chunk.port).or_default();
            tokenizer.push_chunk(chunk.frame, &chunk.bytes);
            while tokenizer.token_available() {
                if let Some(token) = tokenizer.next_token() {
                    for track in tracks
                        .iter_mut()
                        .filter(|t| t.input_port == Some(chunk.port))
                    {
                        track.add_record_token(token);
                    }
                }
            }
        }
    }

    /// Finish the pass: segment each track's buffered tokens into new
    /// step-curve blocks and merge them into the track under `Merge`.
    pub fn commit(&mut self, arena: &mut BlockArena, tracks: &mut [Track]) {
        self.poll(tracks);
        for track in tracks.iter_mut() {
            let tokens = track.take_record_buffer();
            if tokens.is_empty() {
                continue;
            }
            let blocks = segment_into_blocks(arena, tokens, track.lsb_controller);
            log::debug!(
                "committing {} recorded block(s) into track '{}'",
                blocks.len(),
                track.name
            );
            track.merge_block_lists(arena, blocks, MergePolicy::Merge);
        }
        self.tokenizers.clear();
    }

    /// Abort the pass, discarding buffered chunks and tokens. No partial
    /// commit occurs.
    pub fn abort(&mut self, tracks: &mut [Track]) {
        while self.consumer.try_pop().is_some() {}
        self.tokenizers.clear();
        for track in tracks.iter_mut() {
            track.clear_record_buffer();
        }
    }
}

/// Group a token run into blocks: a new block starts whenever the gap since
/// the previous token exceeds `BLOCK_SEPARATION_TICKS`. Every token becomes
/// a `Step` keyframe at `time - block_start`; tokens matching the LSB
/// controller go to the secondary curve, everything else to the primary.
fn segment_into_blocks(
    arena: &mut BlockArena,
    mut tokens: Vec<MidiToken>,
    lsb_controller: Option<u8>,
) -> Vec<BlockId> {
    tokens.sort_by_key(|token| token.time);

    let mut blocks = Vec::new();
    let mut start = tokens[0].time;
    let mut previous = start;
    let mut current = TimedBlock::new(start, "Recorded");

    for token in tokens {
        if token.time - previous > BLOCK_SEPARATION_TICKS {
            blocks.push(arena.insert(current));
            start = token.time;
            current = TimedBlock::new(start, "Recorded");
        }
        let channel = if lsb_controller == Some(token.controller) {
            CurveChannel::Secondary
        } else {
            CurveChannel::Primary
        };
        current.curve_mut(channel).add_key(Keyframe::with_curve(
            token.time - start,
            token.value as f64,
            CurveType::Step,
        ));
        previous = token.time;
    }
    blocks.push(arena.insert(current));
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::{create_chunk_channel, push_raw};
    use crate::midi::TokenKind;

    fn armed_track(port: usize, controller: u8) -> Track {
        let mut track = Track::new("rec");
        track.record_armed = true;
        track.input_port = Some(port);
        track.msb_controller = controller;
        track
    }

    #[test]
    fn test_segmentation_gap_threshold() {
        let mut arena = BlockArena::new();
        let tokens: Vec<MidiToken> = [0, 500, 1000, 4000, 4200]
            .iter()
            .map(|&t| MidiToken::cc(t, 0, 7, 64))
            .collect();

        let blocks = segment_into_blocks(&mut arena, tokens, None);
        assert_eq!(blocks.len(), 2);

        let first_ticks: Vec<i64> = arena
            .curve(blocks[0], CurveChannel::Primary)
            .keyframes()
            .map(|kf| kf.tick)
            .collect();
        assert_eq!(first_ticks, vec![0, 500, 1000]);
        assert_eq!(arena[blocks[1]].start_tick(), 4000);
        let second_ticks: Vec<i64> = arena
            .curve(blocks[1], CurveChannel::Primary)
            .keyframes()
            .map(|kf| kf.tick)
            .collect();
        assert_eq!(second_ticks, vec![0, 200]);
    }

    #[test]
    fn test_segmentation_step_keyframes() {
        let mut arena = BlockArena::new();
        let tokens = vec![MidiToken::cc(100, 0, 7, 42)];
        let blocks = segment_into_blocks(&mut arena, tokens, None);

        let curve = arena.curve(blocks[0], CurveChannel::Primary);
        let kf = curve.get(0).expect("keyframe at block start");
        assert_eq!(kf.curve_type, CurveType::Step);
        assert_eq!(kf.value, 42.0);
    }

    #[test]
    fn test_lsb_tokens_land_in_secondary_curve() {
        let mut arena = BlockArena::new();
        let tokens = vec![
            MidiToken::cc(0, 0, 7, 100),
            MidiToken::cc(10, 0, 39, 50),
            MidiToken::cc(20, 0, 7, 101),
        ];
        let blocks = segment_into_blocks(&mut arena, tokens, Some(39));
        assert_eq!(blocks.len(), 1);

        assert_eq!(arena.curve(blocks[0], CurveChannel::Primary).len(), 2);
        let secondary = arena.curve(blocks[0], CurveChannel::Secondary);
        assert_eq!(secondary.len(), 1);
        assert_eq!(secondary.get(10).map(|kf| kf.value), Some(50.0));
    }

    #[test]
    fn test_full_pass_bytes_to_blocks() {
        let (mut tx, rx) = create_chunk_channel(32);
        let mut recorder = Recorder::new(rx);
        let mut arena = BlockArena::new();
        let mut tracks = vec![armed_track(0, 7)];

        recorder.begin_pass(&mut tracks);
        push_raw(&mut tx, 0, 0, &[0xB0, 0x07, 0x10]);
        push_raw(&mut tx, 0, 500, &[0xB0, 0x07, 0x20]);
        // A note-on that must be ignored, then a CC after a long gap.
        push_raw(&mut tx, 0, 4000, &[0x90, 0x40, 0x7F, 0xB0, 0x07, 0x30]);
        recorder.commit(&mut arena, &mut tracks);

        let track = &tracks[0];
        assert_eq!(track.block_count(), 2);
        assert!(track.record_buffer().is_empty());

        let (start, first) = track.blocks().next().expect("first block");
        assert_eq!(start, 0);
        assert_eq!(arena.curve(first, CurveChannel::Primary).len(), 2);
        assert_eq!(track.sample(&arena, 0), 0x10 as f64);
        assert_eq!(track.sample(&arena, 4000), 0x30 as f64);
    }

    #[test]
    fn test_tokens_routed_by_port() {
        let (mut tx, rx) = create_chunk_channel(32);
        let mut recorder = Recorder::new(rx);
        let mut tracks = vec![armed_track(0, 7), armed_track(1, 7)];

        recorder.begin_pass(&mut tracks);
        push_raw(&mut tx, 1, 0, &[0xB0, 0x07, 0x55]);
        recorder.poll(&mut tracks);

        assert!(tracks[0].record_buffer().is_empty());
        assert_eq!(tracks[1].record_buffer().len(), 1);
        assert_eq!(tracks[1].record_buffer()[0].kind, TokenKind::Cc);
    }

    #[test]
    fn test_abort_discards_everything() {
        let (mut tx, rx) = create_chunk_channel(32);
        let mut recorder = Recorder::new(rx);
        let mut arena = BlockArena::new();
        let mut tracks = vec![armed_track(0, 7)];

        recorder.begin_pass(&mut tracks);
        push_raw(&mut tx, 0, 0, &[0xB0, 0x07, 0x10]);
        recorder.poll(&mut tracks);
        assert_eq!(tracks[0].record_buffer().len(), 1);

        recorder.abort(&mut tracks);
        assert!(tracks[0].record_buffer().is_empty());
        assert!(tracks[0].is_empty());
        assert!(arena.is_empty());
    }

    #[test]
    fn test_commit_merges_into_existing_timeline() {
        let (mut tx, rx) = create_chunk_channel(32);
        let mut recorder = Recorder::new(rx);
        let mut arena = BlockArena::new();
        let mut tracks = vec![armed_track(0, 7)];

        // Existing block spanning ticks 0..200.
        let mut existing = TimedBlock::new(0, "existing");
        for (tick, value) in [(0, 99.0), (200, 98.0)] {
            existing
                .curve_mut(CurveChannel::Primary)
                .add_key(Keyframe::with_curve(tick, value, CurveType::Step));
        }
        let existing_id = arena.insert(existing);
        tracks[0].add_block(&arena, existing_id);

        recorder.begin_pass(&mut tracks);
        push_raw(&mut tx, 0, 100, &[0xB0, 0x07, 0x10]);
        recorder.commit(&mut arena, &mut tracks);

        // Overlapping ranges merged into a single block keeping both sides.
        assert_eq!(tracks[0].block_count(), 1);
        let (_, merged) = tracks[0].blocks().next().expect("merged block");
        let curve = arena.curve(merged, CurveChannel::Primary);
        assert_eq!(curve.len(), 3);
        assert_eq!(curve.get(0).map(|kf| kf.value), Some(99.0));
        assert_eq!(curve.get(100).map(|kf| kf.value), Some(16.0));
        assert_eq!(curve.get(200).map(|kf| kf.value), Some(98.0));
    }
}
