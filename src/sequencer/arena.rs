// BlockArena - central owner of every TimedBlock, addressed by stable
// generation-checked handles; instancing resolves through one indirection

use crate::automation::Curve;
use crate::sequencer::block::{CurveChannel, TimedBlock};
use slotmap::SlotMap;
use std::ops::{Index, IndexMut};

slotmap::new_key_type! {
    /// Stable handle to a block in the arena.
    pub struct BlockId;
}

/// Owns every block in the project. Tracks hold `BlockId`s; an instance
/// block holds the `BlockId` of the block whose data it replays.
///
/// Handles are generation-checked: a handle to a removed block never aliases
/// a newer one. Looking one up anyway is a violated structural invariant
/// (an instance outlived its target) and panics.
#[derive(Debug, Default)]
pub struct BlockArena {
    blocks: SlotMap<BlockId, TimedBlock>,
}

impl BlockArena {
    pub fn new() -> Self {
        Self {
            blocks: SlotMap::with_key(),
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn insert(&mut self, block: TimedBlock) -> BlockId {
        self.blocks.insert(block)
    }

    pub fn remove(&mut self, id: BlockId) -> Option<TimedBlock> {
        self.blocks.remove(id)
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.blocks.contains_key(id)
    }

    pub fn get(&self, id: BlockId) -> Option<&TimedBlock> {
        self.blocks.get(id)
    }

    pub fn get_mut(&mut self, id: BlockId) -> Option<&mut TimedBlock> {
        self.blocks.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlockId, &TimedBlock)> {
        self.blocks.iter()
    }

    /// Create an instance of `target` anchored at `start_tick`.
    ///
    /// Instance chains are flattened here: instancing an instance points the
    /// new block straight at the root data owner, so resolution is always a
    /// single hop.
    pub fn new_instance(&mut self, target: BlockId, start_tick: i64) -> BlockId {
        let root = self.resolve(target);
        let title = self[root].title.clone();
        self.blocks.insert(TimedBlock::instance(start_tick, title, root))
    }

    /// Deep-copy a block's (resolved) data into a fresh independent block.
    /// This is how an instance is detached into data of its own.
    pub fn clone_block(&mut self, id: BlockId, start_tick: i64) -> BlockId {
        let root = self.resolve(id);
        let source = &self[root];
        let mut block = TimedBlock::new(start_tick, source.title.clone());
        for channel in CurveChannel::ALL {
            *block.curve_mut(channel) = source.curve(channel).clone();
        }
        block.values_per_pixel = source.values_per_pixel;
        block.offset_y = source.offset_y;
        self.blocks.insert(block)
    }

    /// Follow the instance indirection to the block that owns the data.
    pub fn resolve(&self, id: BlockId) -> BlockId {
        match self[id].instance_of() {
            None => id,
            Some(target) => {
                assert!(
                    self[target].instance_of().is_none(),
                    "instance chains must be flat"
                );
                target
            }
        }
    }

    /// A block's curve for reading, resolved through the instance
    /// indirection.
    pub fn curve(&self, id: BlockId, channel: CurveChannel) -> &Curve {
        let data = self.resolve(id);
        self[data].curve(channel)
    }

    /// A block's curve for mutation, resolved through the instance
    /// indirection: writing through an instance writes the original.
    pub fn curve_mut(&mut self, id: BlockId, channel: CurveChannel) -> &mut Curve {
        let data = self.resolve(id);
        self[data].curve_mut(channel)
    }

    /// A block's duration; instances take the target's duration.
    pub fn duration(&self, id: BlockId) -> i64 {
        self[self.resolve(id)].raw_duration()
    }
}

impl Index<BlockId> for BlockArena {
    type Output = TimedBlock;

    fn index(&self, id: BlockId) -> &TimedBlock {
        match self.blocks.get(id) {
            Some(block) => block,
            None => panic!("dangling block handle: instance target removed"),
        }
    }
}

impl IndexMut<BlockId> for BlockArena {
    fn index_mut(&mut self, id: BlockId) -> &mut TimedBlock {
        match self.blocks.get_mut(id) {
            Some(block) => block,
            None => panic!("dangling block handle: instance target removed"),
        }
    }
}
