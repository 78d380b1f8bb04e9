//! Breadth-first vein discovery against an in-memory world.

use veinmine_engine::search::{
    MiningPattern, NeighborPattern, PatternSpec, SearchLimits, SearchStop, find_vein, iteration_cap,
};
use veinmine_engine::world::block::BlockType;
use veinmine_engine::world::position::BlockPos;
use veinmine_engine::world::{BlockAccess, HeightBounds, World, WorldError};

fn iron() -> BlockType {
    BlockType::new("iron_ore")
}

fn place(world: &World, block: &BlockType, positions: impl IntoIterator<Item = BlockPos>) {
    for pos in positions {
        world.set_block(pos, block).unwrap();
    }
}

/// A line of `len` blocks along +x starting at the origin, one layer up.
fn line_world(len: i64) -> World {
    let world = World::new();
    place(&world, &iron(), (0..len).map(|x| BlockPos::new(x, 10, 0)));
    world
}

fn faces_only() -> NeighborPattern {
    NeighborPattern::build(PatternSpec {
        include_diagonals: false,
        ..PatternSpec::default()
    })
}

fn limits(max_size: usize) -> SearchLimits {
    SearchLimits {
        max_size,
        max_reach: 100,
        bounds: HeightBounds::default(),
    }
}

#[test]
fn finds_whole_small_vein() {
    let world = line_world(6);
    let start = BlockPos::new(0, 10, 0);
    let outcome = find_vein(&world, start, &iron(), &faces_only(), &limits(64));

    assert_eq!(outcome.stop, SearchStop::Exhausted);
    assert_eq!(outcome.vein.len(), 6);
    assert_eq!(outcome.vein.positions()[0], start);
    assert_eq!(outcome.vein.block(), &iron());
    assert!(!outcome.hit_iteration_cap());
}

#[test]
fn truncation_keeps_the_closest_members() {
    let world = line_world(10);
    let outcome = find_vein(&world, BlockPos::new(0, 10, 0), &iron(), &faces_only(), &limits(5));

    assert_eq!(outcome.stop, SearchStop::MaxSize);
    let xs: Vec<i64> = outcome.vein.positions().iter().map(|p| p.x).collect();
    assert_eq!(xs, vec![0, 1, 2, 3, 4]);
}

#[test]
fn exact_component_when_it_fits() {
    let world = World::new();
    // An L-shaped vein plus one stray block that only touches by a gap.
    let vein = [
        BlockPos::new(0, 0, 0),
        BlockPos::new(1, 0, 0),
        BlockPos::new(2, 0, 0),
        BlockPos::new(2, 1, 0),
        BlockPos::new(2, 2, 0),
        BlockPos::new(2, 2, 1),
        BlockPos::new(2, 2, 2),
    ];
    place(&world, &iron(), vein);
    place(&world, &iron(), [BlockPos::new(5, 0, 0)]);
    place(&world, &BlockType::new("stone"), [BlockPos::new(3, 0, 0), BlockPos::new(4, 0, 0)]);

    let outcome = find_vein(&world, BlockPos::new(2, 2, 2), &iron(), &faces_only(), &limits(64));
    assert_eq!(outcome.vein.len(), vein.len());
    for pos in vein {
        assert!(outcome.vein.contains(pos));
    }
    assert!(!outcome.vein.contains(BlockPos::new(5, 0, 0)));
}

#[test]
fn diagonals_control_connectivity() {
    let world = World::new();
    place(&world, &iron(), [BlockPos::new(0, 0, 0), BlockPos::new(1, 1, 0)]);

    let start = BlockPos::new(0, 0, 0);
    let with = find_vein(&world, start, &iron(), &NeighborPattern::default(), &limits(64));
    let without = find_vein(&world, start, &iron(), &faces_only(), &limits(64));
    assert_eq!(with.vein.len(), 2);
    assert_eq!(without.vein.len(), 1);
}

#[test]
fn other_block_types_break_the_vein() {
    let world = World::new();
    place(&world, &iron(), [BlockPos::new(0, 0, 0), BlockPos::new(2, 0, 0)]);
    place(&world, &BlockType::new("coal_ore"), [BlockPos::new(1, 0, 0)]);

    let outcome = find_vein(&world, BlockPos::new(0, 0, 0), &iron(), &faces_only(), &limits(64));
    assert_eq!(outcome.vein.len(), 1);
}

#[test]
fn changed_start_block_yields_empty_vein() {
    let world = line_world(3);
    let start = BlockPos::new(0, 10, 0);
    world.set_block(start, &BlockType::new("stone")).unwrap();

    let outcome = find_vein(&world, start, &iron(), &faces_only(), &limits(64));
    assert!(outcome.vein.is_empty());
    assert_eq!(outcome.iterations, 1);
    assert_eq!(outcome.stop, SearchStop::Exhausted);
}

#[test]
fn zero_max_size_searches_nothing() {
    let world = line_world(3);
    let outcome = find_vein(&world, BlockPos::new(0, 10, 0), &iron(), &faces_only(), &limits(0));
    assert!(outcome.vein.is_empty());
    assert_eq!(outcome.iterations, 0);
}

#[test]
fn reach_prunes_distant_members() {
    let world = line_world(20);
    let start = BlockPos::new(0, 10, 0);
    let outcome = find_vein(
        &world,
        start,
        &iron(),
        &faces_only(),
        &SearchLimits {
            max_size: 64,
            max_reach: 5,
            bounds: HeightBounds::default(),
        },
    );
    assert_eq!(outcome.vein.len(), 6);
    assert!(outcome.vein.positions().iter().all(|p| p.distance_sq(&start) <= 25));
}

#[test]
fn vertical_bounds_stop_expansion() {
    let world = World::new();
    place(&world, &iron(), (-5..=5).map(|y| BlockPos::new(0, y, 0)));

    let outcome = find_vein(
        &world,
        BlockPos::new(0, 0, 0),
        &iron(),
        &faces_only(),
        &SearchLimits {
            max_size: 64,
            max_reach: 100,
            bounds: HeightBounds::new(0, 10),
        },
    );
    assert_eq!(outcome.vein.len(), 6);
    assert!(outcome.vein.positions().iter().all(|p| p.y >= 0));
}

/// A world made entirely of one block type, with no height limit of its own.
struct SolidWorld(BlockType);

impl BlockAccess for SolidWorld {
    fn block_type(&self, _pos: BlockPos) -> Result<BlockType, WorldError> {
        Ok(self.0.clone())
    }

    fn clear_block(&self, _pos: BlockPos) -> Result<(), WorldError> {
        Ok(())
    }

    fn height_bounds(&self) -> HeightBounds {
        HeightBounds::new(i64::MIN, i64::MAX)
    }
}

#[test]
fn start_outside_the_search_bounds_finds_nothing() {
    let world = SolidWorld(iron());
    let bounds = HeightBounds::default();

    for y in [bounds.max_y + 1, bounds.min_y - 1] {
        let outcome = find_vein(&world, BlockPos::new(0, y, 0), &iron(), &faces_only(), &limits(64));
        assert!(outcome.vein.is_empty(), "start at y {}", y);
        assert_eq!(outcome.iterations, 0);
        assert_eq!(outcome.stop, SearchStop::Exhausted);
    }

    // The top layer itself is still searchable, but nothing above it joins.
    let top = BlockPos::new(0, bounds.max_y, 0);
    let outcome = find_vein(&world, top, &iron(), &faces_only(), &limits(3));
    assert_eq!(outcome.vein.len(), 3);
    assert!(outcome.vein.positions().iter().all(|p| p.y <= bounds.max_y));
}

#[test]
fn iteration_cap_aborts_runaway_searches() {
    assert_eq!(iteration_cap(5), 100);
    assert_eq!(iteration_cap(64), 640);

    // A solid slab west of the start: the wide cube pattern queues hundreds
    // of matching neighbors, none of which are within reach.
    let world = World::new();
    let mut slab = Vec::new();
    for x in -6..=0 {
        for y in -6..=6 {
            for z in -6..=6 {
                slab.push(BlockPos::new(x, y, z));
            }
        }
    }
    place(&world, &iron(), slab);

    let cube = NeighborPattern::build(PatternSpec {
        pattern: MiningPattern::Cube,
        radius: 6,
        ..PatternSpec::default()
    });
    let outcome = find_vein(
        &world,
        BlockPos::new(0, 0, 0),
        &iron(),
        &cube,
        &SearchLimits {
            max_size: 10,
            max_reach: 1,
            bounds: HeightBounds::default(),
        },
    );
    assert!(outcome.hit_iteration_cap());
    assert_eq!(outcome.iterations, 101);
    assert_eq!(outcome.vein.len(), 1);
}

#[test]
fn size_reach_and_bounds_hold_for_large_ore_bodies() {
    let world = World::new();
    let mut body = Vec::new();
    for x in 0..12 {
        for y in 0..12 {
            for z in 0..12 {
                body.push(BlockPos::new(x, y, z));
            }
        }
    }
    place(&world, &iron(), body);

    let start = BlockPos::new(6, 6, 6);
    let bounds = HeightBounds::new(2, 9);
    for max_size in [1, 7, 64, 300] {
        for pattern in [MiningPattern::Adjacent, MiningPattern::Sphere] {
            let neighbors = NeighborPattern::build(PatternSpec {
                pattern,
                radius: 2,
                ..PatternSpec::default()
            });
            let outcome = find_vein(
                &world,
                start,
                &iron(),
                &neighbors,
                &SearchLimits {
                    max_size,
                    max_reach: 4,
                    bounds,
                },
            );
            assert!(outcome.vein.len() <= max_size);
            for pos in outcome.vein.positions() {
                assert!(pos.distance_sq(&start) <= 16);
                assert!(bounds.contains(pos.y));
            }
        }
    }
}

/// World wrapper whose reads fail at one position.
struct FlakyWorld {
    inner: World,
    broken: BlockPos,
}

impl BlockAccess for FlakyWorld {
    fn block_type(&self, pos: BlockPos) -> Result<BlockType, WorldError> {
        if pos == self.broken {
            return Err(WorldError::Unloaded(pos));
        }
        self.inner.block_type(pos)
    }

    fn clear_block(&self, pos: BlockPos) -> Result<(), WorldError> {
        self.inner.clear_block(pos)
    }

    fn height_bounds(&self) -> HeightBounds {
        self.inner.height_bounds()
    }
}

#[test]
fn failed_reads_are_skipped() {
    let world = FlakyWorld {
        inner: line_world(5),
        broken: BlockPos::new(2, 10, 0),
    };
    let outcome = find_vein(&world, BlockPos::new(0, 10, 0), &iron(), &faces_only(), &limits(64));
    assert_eq!(outcome.vein.len(), 2);
    assert!(!outcome.vein.contains(BlockPos::new(2, 10, 0)));
}
