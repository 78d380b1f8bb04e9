pub mod block;
pub mod chunk;
pub mod position;

use std::sync::atomic::{AtomicU16, Ordering};

use block::BlockType;
use chunk::{AIR_SLOT, Chunk, PaletteSlot};
use dashmap::{DashMap, DashSet};
use position::{BlockPos, ChunkPos};
use thiserror::Error;

/// Failures surfaced by world access. Callers treat these as transient and
/// per-block: one failed position never aborts a whole operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorldError {
    #[error("position ({}, {}, {}) is outside the world height {min_y}..={max_y}", .pos.x, .pos.y, .pos.z)]
    OutOfBounds { pos: BlockPos, min_y: i64, max_y: i64 },

    #[error("chunk containing ({}, {}, {}) is not loaded", .0.x, .0.y, .0.z)]
    Unloaded(BlockPos),

    #[error("block at ({}, {}, {}) is protected", .0.x, .0.y, .0.z)]
    Protected(BlockPos),

    #[error("block palette is full ({0} types)")]
    PaletteFull(usize),
}

/// Inclusive vertical limits of a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeightBounds {
    pub min_y: i64,
    pub max_y: i64,
}

impl HeightBounds {
    pub const fn new(min_y: i64, max_y: i64) -> Self {
        Self { min_y, max_y }
    }

    pub const fn contains(&self, y: i64) -> bool {
        y >= self.min_y && y <= self.max_y
    }
}

impl Default for HeightBounds {
    /// Overworld limits.
    fn default() -> Self {
        Self::new(-64, 320)
    }
}

/// The narrow interface the vein engine needs from a world: read a block's
/// type, clear a block, and know the vertical limits.
pub trait BlockAccess {
    fn block_type(&self, pos: BlockPos) -> Result<BlockType, WorldError>;

    fn clear_block(&self, pos: BlockPos) -> Result<(), WorldError>;

    fn height_bounds(&self) -> HeightBounds;
}

/// In-memory block world, lock-sharded by chunk.
///
/// Blocks are stored as palette slots; the world owns a single palette that
/// maps slots back to [`BlockType`]s. Slot 0 is air, and unloaded chunks read
/// as air.
pub struct World {
    chunks: DashMap<ChunkPos, Chunk>,
    slots: DashMap<BlockType, PaletteSlot>,
    types: DashMap<PaletteSlot, BlockType>,
    next_slot: AtomicU16,
    bounds: HeightBounds,
    /// Positions whose removal is refused (spawn protection, claims, ...).
    protected: DashSet<BlockPos>,
}

impl World {
    pub fn new() -> Self {
        Self::with_bounds(HeightBounds::default())
    }

    pub fn with_bounds(bounds: HeightBounds) -> Self {
        let types = DashMap::new();
        types.insert(AIR_SLOT, BlockType::air());
        Self {
            chunks: DashMap::new(),
            slots: DashMap::new(),
            types,
            next_slot: AtomicU16::new(AIR_SLOT + 1),
            bounds,
            protected: DashSet::new(),
        }
    }

    pub fn bounds(&self) -> HeightBounds {
        self.bounds
    }

    fn intern(&self, block: &BlockType) -> Result<PaletteSlot, WorldError> {
        if block.is_air() {
            return Ok(AIR_SLOT);
        }
        if let Some(slot) = self.slots.get(block) {
            return Ok(*slot);
        }
        if self.next_slot.load(Ordering::Relaxed) == PaletteSlot::MAX {
            return Err(WorldError::PaletteFull(PaletteSlot::MAX as usize));
        }
        let slot = *self.slots.entry(block.clone()).or_insert_with(|| {
            let slot = self.next_slot.fetch_add(1, Ordering::Relaxed);
            self.types.insert(slot, block.clone());
            slot
        });
        Ok(slot)
    }

    fn type_of(&self, slot: PaletteSlot) -> BlockType {
        self.types
            .get(&slot)
            .map(|entry| entry.value().clone())
            .unwrap_or_else(BlockType::air)
    }

    /// Read a block at an absolute position. Returns air for unloaded chunks
    /// and positions outside the height bounds.
    pub fn get_block(&self, pos: BlockPos) -> BlockType {
        if !self.bounds.contains(pos.y) {
            return BlockType::air();
        }
        match self.chunks.get(&pos.chunk()) {
            Some(chunk) => self.type_of(chunk.get_slot(pos.local())),
            None => BlockType::air(),
        }
    }

    /// Write a block at an absolute position, creating the chunk if needed.
    /// Returns the block that was replaced.
    ///
    /// Takes `&self` because `DashMap` provides per-shard interior mutability.
    pub fn set_block(&self, pos: BlockPos, block: &BlockType) -> Result<BlockType, WorldError> {
        if !self.bounds.contains(pos.y) {
            return Err(WorldError::OutOfBounds {
                pos,
                min_y: self.bounds.min_y,
                max_y: self.bounds.max_y,
            });
        }
        let slot = self.intern(block)?;
        let previous = self
            .chunks
            .entry(pos.chunk())
            .or_default()
            .set_slot(pos.local(), slot);
        Ok(self.type_of(previous))
    }

    /// Refuse future `clear_block` calls at `pos`.
    pub fn protect(&self, pos: BlockPos) {
        self.protected.insert(pos);
    }

    pub fn unprotect(&self, pos: BlockPos) {
        self.protected.remove(&pos);
    }

    pub fn has_chunk(&self, pos: ChunkPos) -> bool {
        self.chunks.contains_key(&pos)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Count blocks of one type across all loaded chunks.
    pub fn count_blocks(&self, block: &BlockType) -> usize {
        let Some(slot) = self.slots.get(block).map(|s| *s) else {
            return 0;
        };
        let mut total = 0;
        for entry in self.chunks.iter() {
            let origin = entry.key().block_origin(0);
            for y in self.bounds.min_y..=self.bounds.max_y {
                for x in 0..16 {
                    for z in 0..16 {
                        let pos = BlockPos::new(origin.x + x, y, origin.z + z);
                        if entry.value().get_slot(pos.local()) == slot {
                            total += 1;
                        }
                    }
                }
            }
        }
        total
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockAccess for World {
    fn block_type(&self, pos: BlockPos) -> Result<BlockType, WorldError> {
        if !self.bounds.contains(pos.y) {
            return Err(WorldError::OutOfBounds {
                pos,
                min_y: self.bounds.min_y,
                max_y: self.bounds.max_y,
            });
        }
        Ok(self.get_block(pos))
    }

    fn clear_block(&self, pos: BlockPos) -> Result<(), WorldError> {
        if self.protected.contains(&pos) {
            return Err(WorldError::Protected(pos));
        }
        self.set_block(pos, &BlockType::air()).map(|_| ())
    }

    fn height_bounds(&self) -> HeightBounds {
        self.bounds
    }
}
