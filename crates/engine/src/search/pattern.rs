//! Neighbor patterns: which offsets count as "adjacent" during vein search.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use crate::world::position::Offset;

/// Hard cap on offsets per pattern. Extreme configs are truncated, not rejected.
pub const MAX_OFFSETS: usize = 512;
/// Radius limits for `cube` and `sphere`.
pub const MIN_RADIUS: u32 = 1;
pub const MAX_RADIUS: u32 = 6;
/// Limits for the `vertical` and `horizontal` ranges.
pub const MIN_RANGE: u32 = 1;
pub const MAX_RANGE: u32 = 16;

/// Shape of the neighborhood explored around each vein member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MiningPattern {
    #[default]
    Adjacent,
    Cube,
    Sphere,
    Vertical,
    Horizontal,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown mining pattern '{0}' (expected adjacent, cube, sphere, vertical or horizontal)")]
pub struct UnknownPattern(pub String);

impl FromStr for MiningPattern {
    type Err = UnknownPattern;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "adjacent" => Ok(Self::Adjacent),
            "cube" => Ok(Self::Cube),
            "sphere" => Ok(Self::Sphere),
            "vertical" => Ok(Self::Vertical),
            "horizontal" => Ok(Self::Horizontal),
            _ => Err(UnknownPattern(s.to_string())),
        }
    }
}

impl fmt::Display for MiningPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Adjacent => "adjacent",
            Self::Cube => "cube",
            Self::Sphere => "sphere",
            Self::Vertical => "vertical",
            Self::Horizontal => "horizontal",
        })
    }
}

/// Everything that determines a neighbor pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternSpec {
    pub pattern: MiningPattern,
    pub radius: u32,
    pub vertical_range: u32,
    pub horizontal_range: u32,
    pub include_diagonals: bool,
}

impl Default for PatternSpec {
    fn default() -> Self {
        Self {
            pattern: MiningPattern::Adjacent,
            radius: 1,
            vertical_range: 4,
            horizontal_range: 4,
            include_diagonals: true,
        }
    }
}

impl PatternSpec {
    /// Clamp radius and ranges into their safe bounds.
    pub fn clamped(self) -> Self {
        Self {
            radius: self.radius.clamp(MIN_RADIUS, MAX_RADIUS),
            vertical_range: self.vertical_range.clamp(MIN_RANGE, MAX_RANGE),
            horizontal_range: self.horizontal_range.clamp(MIN_RANGE, MAX_RANGE),
            ..self
        }
    }
}

/// A precomputed, immutable list of neighbor offsets.
///
/// Built once per configuration and shared by every search until reload.
#[derive(Debug, Clone)]
pub struct NeighborPattern {
    spec: PatternSpec,
    offsets: Arc<[Offset]>,
}

impl NeighborPattern {
    pub fn build(spec: PatternSpec) -> Self {
        let spec = spec.clamped();
        let offsets = build_offsets(&spec);
        Self {
            spec,
            offsets: offsets.into(),
        }
    }

    /// The spec after clamping.
    pub fn spec(&self) -> &PatternSpec {
        &self.spec
    }

    pub fn offsets(&self) -> &[Offset] {
        &self.offsets
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

impl Default for NeighborPattern {
    fn default() -> Self {
        Self::build(PatternSpec::default())
    }
}

/// Generate the ordered offsets for a spec (dx outermost, then dy, then dz).
///
/// The spec is clamped first. The result never contains the zero offset,
/// never repeats an offset, and holds at most [`MAX_OFFSETS`] entries.
pub fn build_offsets(spec: &PatternSpec) -> Vec<Offset> {
    let spec = spec.clamped();
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |offset: Offset| {
        if !offset.is_zero() && seen.insert(offset) {
            out.push(offset);
        }
    };

    match spec.pattern {
        MiningPattern::Adjacent => {
            for (dx, dy, dz) in cube_range(1) {
                let offset = Offset::new(dx, dy, dz);
                if spec.include_diagonals || offset.manhattan() == 1 {
                    push(offset);
                }
            }
        }
        MiningPattern::Cube => {
            for (dx, dy, dz) in cube_range(spec.radius as i32) {
                push(Offset::new(dx, dy, dz));
            }
        }
        MiningPattern::Sphere => {
            let r = spec.radius as i64;
            for (dx, dy, dz) in cube_range(spec.radius as i32) {
                let offset = Offset::new(dx, dy, dz);
                if offset.norm_sq() <= r * r {
                    push(offset);
                }
            }
        }
        MiningPattern::Vertical => {
            let v = spec.vertical_range as i32;
            for dy in -v..=v {
                push(Offset::new(0, dy, 0));
            }
        }
        MiningPattern::Horizontal => {
            let h = spec.horizontal_range as i32;
            for dx in -h..=h {
                for dz in -h..=h {
                    let offset = Offset::new(dx, 0, dz);
                    if spec.include_diagonals || offset.manhattan() == 1 {
                        push(offset);
                    }
                }
            }
        }
    }

    out.truncate(MAX_OFFSETS);
    out
}

fn cube_range(r: i32) -> impl Iterator<Item = (i32, i32, i32)> {
    (-r..=r).flat_map(move |dx| (-r..=r).flat_map(move |dy| (-r..=r).map(move |dz| (dx, dy, dz))))
}
