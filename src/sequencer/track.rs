// Track - an ordered, non-overlapping set of TimedBlocks driving one MIDI
// controller, plus the recording routing/merge logic

use crate::automation::MergePolicy;
use crate::midi::{MidiToken, TokenKind};
use crate::sequencer::arena::{BlockArena, BlockId};
use crate::sequencer::block::{CurveChannel, TimedBlock};
use std::collections::{BTreeMap, HashSet, VecDeque};

/// Sentinel channel value meaning "record from any MIDI channel".
pub const CHANNEL_ANY: u8 = 16;

/// One automated MIDI parameter: an ordered map of start tick to block,
/// recording configuration, and the transient per-pass token buffer.
///
/// Invariant: after any merge operation completes, no two blocks overlap
/// (`block[i].start + block[i].duration <= block[i+1].start`).
#[derive(Debug)]
pub struct Track {
    pub name: String,
    blocks: BTreeMap<i64, BlockId>,

    /// Whether a recording pass routes tokens into this track.
    pub record_armed: bool,
    /// Input port this track listens on; `None` = not listening.
    pub input_port: Option<usize>,
    /// MIDI channel filter, 0-15 or `CHANNEL_ANY`.
    pub midi_channel: u8,
    /// Controller number for the primary curve (MSB of a 14-bit pair).
    pub msb_controller: u8,
    /// Optional controller routed to the secondary curve (LSB).
    pub lsb_controller: Option<u8>,

    /// Output value range for `sample_as_byte`.
    pub min_value: f64,
    pub max_value: f64,
    /// Scale output to 0-127 when set, 0-255 otherwise.
    pub seven_bit: bool,
    pub mute: bool,

    record_buffer: Vec<MidiToken>,
}

impl Track {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blocks: BTreeMap::new(),
            record_armed: false,
            input_port: None,
            midi_channel: CHANNEL_ANY,
            msb_controller: 7,
            lsb_controller: None,
            min_value: 0.0,
            max_value: 127.0,
            seven_bit: true,
            mute: false,
            record_buffer: Vec::new(),
        }
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Iterate `(start_tick, block)` in start-tick order.
    pub fn blocks(&self) -> impl Iterator<Item = (i64, BlockId)> + '_ {
        self.blocks.iter().map(|(start, id)| (*start, *id))
    }

    pub fn block_at_start(&self, start_tick: i64) -> Option<BlockId> {
        self.blocks.get(&start_tick).copied()
    }

    /// The block whose time range contains `tick`, if any.
    pub fn block_covering(&self, arena: &BlockArena, tick: i64) -> Option<BlockId> {
        let (start, id) = self.blocks.range(..=tick).next_back()?;
        if tick < start + arena.duration(*id) {
            Some(*id)
        } else {
            None
        }
    }

    /// Add a block to the track, keyed by its start tick. Adding at an
    /// occupied start tick is a silent no-op and returns false.
    pub fn add_block(&mut self, arena: &BlockArena, id: BlockId) -> bool {
        let start = arena[id].start_tick();
        if self.blocks.contains_key(&start) {
            return false;
        }
        self.blocks.insert(start, id);
        true
    }

    /// Remove the block starting at `start_tick` from the track (the block
    /// stays alive in the arena).
    pub fn remove_block(&mut self, start_tick: i64) -> Option<BlockId> {
        self.blocks.remove(&start_tick)
    }

    /// Re-anchor a block at a new start tick. No-op when the destination
    /// start is already occupied.
    pub fn move_block(&mut self, arena: &mut BlockArena, id: BlockId, new_start: i64) -> bool {
        let old_start = arena[id].start_tick();
        if new_start == old_start {
            return true;
        }
        if self.blocks.contains_key(&new_start) || self.blocks.get(&old_start) != Some(&id) {
            return false;
        }
        self.blocks.remove(&old_start);
        arena[id].set_start_tick(new_start);
        self.blocks.insert(new_start, id);
        true
    }

    /// Split a block at an absolute `tick`.
    ///
    /// Returns the same block twice (no-op) when `tick` is not strictly
    /// inside the block's range, or when the block is an instance (an
    /// instance has no keys of its own to divide). Otherwise the original
    /// is replaced in this track by two new blocks: the first keeps the
    /// keyframes before `tick`, the second starts at the first keyframe
    /// at/after `tick` with its keyframes retimed to the new start.
    pub fn split_block(
        &mut self,
        arena: &mut BlockArena,
        id: BlockId,
        tick: i64,
    ) -> (BlockId, BlockId) {
        let start = arena[id].start_tick();
        if arena[id].is_instance() {
            log::debug!("split of instance block ignored");
            return (id, id);
        }
        let duration = arena.duration(id);
        if tick <= start || tick >= start + duration {
            return (id, id);
        }

        let offset = tick - start;
        let second_offset = CurveChannel::ALL
            .iter()
            .filter_map(|&channel| {
                arena[id]
                    .curve(channel)
                    .first_keyframe_at_or_after(offset)
                    .map(|kf| kf.tick)
            })
            .min();
        let Some(second_offset) = second_offset else {
            return (id, id);
        };

        let old = match arena.remove(id) {
            Some(block) => block,
            None => panic!("dangling block handle"),
        };
        let mut first = TimedBlock::new(start, old.title.clone());
        let mut second = TimedBlock::new(start + second_offset, old.title.clone());
        for block in [&mut first, &mut second] {
            block.values_per_pixel = old.values_per_pixel;
            block.offset_y = old.offset_y;
        }
        for channel in CurveChannel::ALL {
            let mut head = old.curve(channel).clone();
            let tail = head.split_off_at(second_offset);
            *first.curve_mut(channel) = head;
            *second.curve_mut(channel) = tail;
        }

        self.blocks.remove(&start);
        let first_id = arena.insert(first);
        let second_id = arena.insert(second);
        self.blocks.insert(start, first_id);
        self.blocks.insert(start + second_offset, second_id);
        (first_id, second_id)
    }

    /// Merge two blocks into one under `policy`.
    ///
    /// The merged block starts at the earlier of the two start ticks. Per
    /// channel, surviving old keys are inserted first, then every new key;
    /// `add_key` is first-writer-wins, so under `Merge` old values win tick
    /// collisions. Old and new are removed from the track and arena; the
    /// merged block replaces them.
    pub fn merge_blocks(
        &mut self,
        arena: &mut BlockArena,
        old_id: BlockId,
        new_id: BlockId,
        policy: MergePolicy,
    ) -> BlockId {
        let old_start = arena[old_id].start_tick();
        let new_start = arena[new_id].start_tick();
        let new_end = new_start + arena.duration(new_id);
        let merged_start = old_start.min(new_start);

        let mut merged = TimedBlock::new(merged_start, arena[old_id].title.clone());
        merged.values_per_pixel = arena[old_id].values_per_pixel;
        merged.offset_y = arena[old_id].offset_y;

        let old_offset = old_start - merged_start;
        let new_offset = new_start - merged_start;
        for channel in CurveChannel::ALL {
            // Reads resolve instancing; the merged block owns plain data.
            let old_curve = arena.curve(old_id, channel).clone();
            let new_curve = arena.curve(new_id, channel).clone();
            let out = merged.curve_mut(channel);
            for kf in old_curve.keyframes() {
                let absolute = old_start + kf.tick;
                let keep = match policy {
                    MergePolicy::Merge => true,
                    MergePolicy::Replace => absolute < new_start || absolute > new_end,
                    MergePolicy::Join => absolute < new_start,
                };
                if keep {
                    out.add_key(kf.offset(old_offset));
                }
            }
            for kf in new_curve.keyframes() {
                out.add_key(kf.offset(new_offset));
            }
        }

        if self.blocks.get(&old_start) == Some(&old_id) {
            self.blocks.remove(&old_start);
        }
        if self.blocks.get(&new_start) == Some(&new_id) {
            self.blocks.remove(&new_start);
        }
        arena.remove(old_id);
        arena.remove(new_id);

        let merged_id = arena.insert(merged);
        self.blocks.insert(merged_start, merged_id);
        merged_id
    }

    /// Reconcile a batch of newly produced blocks (e.g. from a recording
    /// pass) against this track's existing blocks.
    ///
    /// Both sides are walked as deques in start-tick order: an old block
    /// ending strictly before the new front starts is left untouched; a new
    /// block ending strictly before the old front starts is inserted as-is;
    /// anything else overlaps or abuts and is merged under `policy`, with
    /// the merged block pushed back for re-comparison against the next new
    /// block. An empty batch is a violated invariant upstream.
    pub fn merge_block_lists(
        &mut self,
        arena: &mut BlockArena,
        new_blocks: Vec<BlockId>,
        policy: MergePolicy,
    ) {
        assert!(
            !new_blocks.is_empty(),
            "merge presented with an empty new-block batch"
        );

        let batch: HashSet<BlockId> = new_blocks.iter().copied().collect();
        let mut old_deque: VecDeque<BlockId> = self
            .blocks
            .values()
            .copied()
            .filter(|id| !batch.contains(id))
            .collect();
        let mut new_deque: VecDeque<BlockId> = new_blocks.into_iter().collect();
        new_deque
            .make_contiguous()
            .sort_by_key(|id| arena[*id].start_tick());

        while let Some(&new_id) = new_deque.front() {
            let Some(&old_id) = old_deque.front() else {
                new_deque.pop_front();
                self.add_block(arena, new_id);
                continue;
            };

            let old_start = arena[old_id].start_tick();
            let old_end = old_start + arena.duration(old_id);
            let new_start = arena[new_id].start_tick();
            let new_end = new_start + arena.duration(new_id);

            if old_end < new_start {
                old_deque.pop_front();
            } else if new_end < old_start {
                new_deque.pop_front();
                self.add_block(arena, new_id);
            } else {
                old_deque.pop_front();
                new_deque.pop_front();
                let mut merged = self.merge_blocks(arena, old_id, new_id, policy);
                // One new block can span several old blocks: keep folding
                // until the merged result clears the old front, or the
                // no-overlap invariant would break here.
                while let Some(&next_old) = old_deque.front() {
                    let merged_start = arena[merged].start_tick();
                    let merged_end = merged_start + arena.duration(merged);
                    if arena[next_old].start_tick() >= merged_end {
                        break;
                    }
                    old_deque.pop_front();
                    merged = self.merge_blocks(arena, next_old, merged, policy);
                }
                old_deque.push_front(merged);
            }
        }
    }

    /// Route a decoded token into the per-pass record buffer. Tokens are
    /// filtered by the armed flag, token kind, channel, and controller
    /// (MSB or the configured LSB). Returns whether the token was accepted.
    pub fn add_record_token(&mut self, token: MidiToken) -> bool {
        if !self.record_armed || token.kind != TokenKind::Cc {
            return false;
        }
        if self.midi_channel != CHANNEL_ANY && token.channel != self.midi_channel {
            return false;
        }
        let msb = token.controller == self.msb_controller;
        let lsb = self.lsb_controller == Some(token.controller);
        if !msb && !lsb {
            return false;
        }
        self.record_buffer.push(token);
        true
    }

    pub fn record_buffer(&self) -> &[MidiToken] {
        &self.record_buffer
    }

    pub fn take_record_buffer(&mut self) -> Vec<MidiToken> {
        std::mem::take(&mut self.record_buffer)
    }

    pub fn clear_record_buffer(&mut self) {
        self.record_buffer.clear();
    }

    /// Sample the track's primary automation at an absolute `tick`.
    ///
    /// The last block starting at/before `tick` answers (its curve holds
    /// its final value past the end); before the first block, the first
    /// block's initial value holds. An empty track samples 0.
    pub fn sample(&self, arena: &BlockArena, tick: i64) -> f64 {
        let id = self
            .blocks
            .range(..=tick)
            .next_back()
            .map(|(_, id)| *id)
            .or_else(|| self.blocks.values().next().copied());
        let Some(id) = id else {
            return 0.0;
        };
        let start = arena[id].start_tick();
        arena.curve(id, CurveChannel::Primary).sample(tick - start)
    }

    /// Sample, clamp to `[min_value, max_value]`, and rescale to the
    /// track's output range (0-127 or 0-255).
    pub fn sample_as_byte(&self, arena: &BlockArena, tick: i64) -> u8 {
        let span = self.max_value - self.min_value;
        if span <= 0.0 {
            return 0;
        }
        let clamped = self.sample(arena, tick).clamp(self.min_value, self.max_value);
        let scale = if self.seven_bit { 127.0 } else { 255.0 };
        (((clamped - self.min_value) / span) * scale).round() as u8
    }

    /// Whether any two blocks overlap. The merge machinery maintains the
    /// no-overlap invariant; this is a validation hook.
    pub fn has_overlaps(&self, arena: &BlockArena) -> bool {
        let mut previous_end = i64::MIN;
        for (start, id) in self.blocks() {
            if start < previous_end {
                return true;
            }
            previous_end = start + arena.duration(id);
        }
        false
    }
}
