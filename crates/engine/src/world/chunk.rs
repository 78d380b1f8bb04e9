use super::position::LocalBlockPos;
use std::collections::HashMap;

/// Number of blocks along each axis of a chunk section.
pub const SECTION_SIZE: usize = 16;
/// Total block count in one section.
const SECTION_VOLUME: usize = SECTION_SIZE * SECTION_SIZE * SECTION_SIZE;

/// Index into the world's block palette. Slot 0 is always air.
pub type PaletteSlot = u16;

/// Palette slot of the empty block.
pub const AIR_SLOT: PaletteSlot = 0;

/// A 16x16x16 cube of palette slots.
///
/// Stored flat in YZX order (x varies fastest). Tracks how many non-air
/// slots it holds so emptiness is O(1) instead of a 4096-entry scan.
#[derive(Clone)]
pub struct ChunkSection {
    slots: Box<[PaletteSlot; SECTION_VOLUME]>,
    occupied: u16,
}

impl ChunkSection {
    pub fn new_empty() -> Self {
        Self {
            slots: Box::new([AIR_SLOT; SECTION_VOLUME]),
            occupied: 0,
        }
    }

    #[inline]
    const fn index(x: u8, y: u8, z: u8) -> usize {
        (y as usize) * SECTION_SIZE * SECTION_SIZE + (z as usize) * SECTION_SIZE + (x as usize)
    }

    #[inline]
    pub fn get(&self, x: u8, y: u8, z: u8) -> PaletteSlot {
        self.slots[Self::index(x, y, z)]
    }

    pub fn set(&mut self, x: u8, y: u8, z: u8, slot: PaletteSlot) {
        let cell = &mut self.slots[Self::index(x, y, z)];
        match (*cell == AIR_SLOT, slot == AIR_SLOT) {
            (true, false) => self.occupied += 1,
            (false, true) => self.occupied -= 1,
            _ => {}
        }
        *cell = slot;
    }

    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    pub fn occupied(&self) -> u16 {
        self.occupied
    }
}

/// A column of chunk sections, keyed by section index (y >> 4).
///
/// Only non-empty sections are stored.
#[derive(Default)]
pub struct Chunk {
    sections: HashMap<i32, ChunkSection>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_slot(&self, pos: LocalBlockPos) -> PaletteSlot {
        self.sections
            .get(&pos.section_index())
            .map(|section| section.get(pos.x, pos.section_local_y(), pos.z))
            .unwrap_or(AIR_SLOT)
    }

    /// Write a slot. Returns the slot that was there before.
    pub fn set_slot(&mut self, pos: LocalBlockPos, slot: PaletteSlot) -> PaletteSlot {
        let section_idx = pos.section_index();
        let local_y = pos.section_local_y();

        if slot == AIR_SLOT {
            let Some(section) = self.sections.get_mut(&section_idx) else {
                return AIR_SLOT;
            };
            let previous = section.get(pos.x, local_y, pos.z);
            section.set(pos.x, local_y, pos.z, slot);
            if section.is_empty() {
                self.sections.remove(&section_idx);
            }
            previous
        } else {
            let section = self
                .sections
                .entry(section_idx)
                .or_insert_with(ChunkSection::new_empty);
            let previous = section.get(pos.x, local_y, pos.z);
            section.set(pos.x, local_y, pos.z, slot);
            previous
        }
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Number of non-air blocks across all sections.
    pub fn block_count(&self) -> usize {
        self.sections.values().map(|s| s.occupied() as usize).sum()
    }
}
