//! Bounded breadth-first vein discovery.
//!
//! The search expands from a start block through every neighbor offset of
//! the active [`NeighborPattern`], keeping only blocks whose type equals the
//! start block's type. Three limits bound the work:
//!
//!   - **size**: stop as soon as the vein holds `max_size` members,
//!   - **reach**: positions farther than `max_reach` (Euclidean) from the
//!     start are dropped when dequeued,
//!   - **iterations**: more than `max(100, max_size * 10)` dequeues aborts
//!     the search; callers treat that as suspicious and mutate nothing.
//!
//! The queue is FIFO, so when a vein is truncated at `max_size` the kept
//! members are always the ones closest (in hops) to the start.

use std::collections::{HashSet, VecDeque};

use crate::search::pattern::NeighborPattern;
use crate::world::block::BlockType;
use crate::world::position::BlockPos;
use crate::world::{BlockAccess, HeightBounds};

/// Smallest iteration cap, regardless of `max_size`.
pub const MIN_ITERATION_CAP: usize = 100;

/// Iteration cap for a given maximum vein size.
pub fn iteration_cap(max_size: usize) -> usize {
    MIN_ITERATION_CAP.max(max_size.saturating_mul(10))
}

/// Limits applied to a single search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub max_size: usize,
    pub max_reach: u32,
    pub bounds: HeightBounds,
}

/// A connected set of same-type blocks, in discovery order.
#[derive(Debug, Clone)]
pub struct Vein {
    origin: BlockPos,
    block: BlockType,
    members: Vec<BlockPos>,
}

impl Vein {
    pub fn empty(origin: BlockPos, block: BlockType) -> Self {
        Self {
            origin,
            block,
            members: Vec::new(),
        }
    }

    pub fn origin(&self) -> BlockPos {
        self.origin
    }

    /// The type shared by every member.
    pub fn block(&self) -> &BlockType {
        &self.block
    }

    pub fn positions(&self) -> &[BlockPos] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, pos: BlockPos) -> bool {
        self.members.contains(&pos)
    }
}

/// Why the search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStop {
    /// The queue ran dry: the vein is the whole reachable component.
    Exhausted,
    /// The vein reached `max_size`; more connected blocks may exist.
    MaxSize,
    /// The iteration cap was exceeded.
    IterationCap,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub vein: Vein,
    pub iterations: usize,
    pub stop: SearchStop,
}

impl SearchOutcome {
    pub fn hit_iteration_cap(&self) -> bool {
        self.stop == SearchStop::IterationCap
    }
}

fn matches<W: BlockAccess + ?Sized>(world: &W, pos: BlockPos, block: &BlockType) -> bool {
    match world.block_type(pos) {
        Ok(found) => found == *block,
        Err(e) => {
            tracing::trace!("Skipping unreadable block: {}", e);
            false
        }
    }
}

/// Discover the vein of `block` containing `start`.
///
/// `block` is the type observed when the break happened; the start position
/// is re-read, so the result is empty if it changed since.
pub fn find_vein<W: BlockAccess + ?Sized>(
    world: &W,
    start: BlockPos,
    block: &BlockType,
    pattern: &NeighborPattern,
    limits: &SearchLimits,
) -> SearchOutcome {
    let mut vein = Vein::empty(start, block.clone());
    if limits.max_size == 0 {
        return SearchOutcome {
            vein,
            iterations: 0,
            stop: SearchStop::MaxSize,
        };
    }
    if !limits.bounds.contains(start.y) {
        return SearchOutcome {
            vein,
            iterations: 0,
            stop: SearchStop::Exhausted,
        };
    }

    let cap = iteration_cap(limits.max_size);
    let reach = i64::from(limits.max_reach);
    let reach_sq = reach * reach;

    let mut visited = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);
    let mut iterations = 0;
    let mut stop = SearchStop::Exhausted;

    while let Some(pos) = queue.pop_front() {
        iterations += 1;
        if iterations > cap {
            tracing::debug!(
                "Vein search from ({}, {}, {}) exceeded {} iterations",
                start.x, start.y, start.z, cap
            );
            stop = SearchStop::IterationCap;
            break;
        }

        if pos.distance_sq(&start) > reach_sq {
            continue;
        }
        if !matches(world, pos, block) {
            continue;
        }

        vein.members.push(pos);
        if vein.members.len() >= limits.max_size {
            stop = SearchStop::MaxSize;
            break;
        }

        for offset in pattern.offsets() {
            let next = pos.offset(*offset);
            if !limits.bounds.contains(next.y) || !visited.insert(next) {
                continue;
            }
            // Only same-type neighbors enter the queue.
            if matches(world, next, block) {
                queue.push_back(next);
            }
        }
    }

    SearchOutcome {
        vein,
        iterations,
        stop,
    }
}
