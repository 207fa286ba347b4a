// Core spatial types shared across the pathing engine.
//
// Defines `Position` (the voxel an agent's feet occupy) and `VoxelClass` (the
// coarse classification the world source reports for a voxel). Both derive
// `Serialize`/`Deserialize` so paths and goals can be dumped for diagnostics.
//
// See also: `world.rs` for the `VoxelSource` trait that produces
// `VoxelClass` values, `movement.rs` for transitions between positions.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// A position in the 3D voxel grid. Each component is in voxel units.
///
/// The agent is two voxels tall: a `Position` names the voxel its feet are
/// in, and the head occupies `pos.up(1)`.
///
/// The coordinate system uses right-handed conventions:
/// - X: east  (positive) / west  (negative)
/// - Y: up    (positive) / down  (negative)
/// - Z: south (positive) / north (negative)
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    /// The voxel at block coordinates `(x, y, z)`.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// This position shifted by the given deltas.
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// `n` blocks higher.
    pub const fn up(self, n: i32) -> Self {
        self.offset(0, n, 0)
    }

    /// `n` blocks lower.
    pub const fn down(self, n: i32) -> Self {
        self.offset(0, -n, 0)
    }

    /// Squared Euclidean distance. Exact in integer arithmetic.
    pub fn distance_sq(self, other: Self) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        let dz = (self.z - other.z) as i64;
        dx * dx + dy * dy + dz * dz
    }

    /// Euclidean distance between voxel centers.
    pub fn distance(self, other: Self) -> f64 {
        (self.distance_sq(other) as f64).sqrt()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// The four horizontal unit steps: east, west, south, north.
pub const CARDINALS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// The four horizontal diagonal steps.
pub const DIAGONALS: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

// ---------------------------------------------------------------------------
// Voxel classification
// ---------------------------------------------------------------------------

/// Coarse classification of a single voxel, as reported by the world source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoxelClass {
    /// Empty space; the agent can occupy it.
    #[default]
    Air,
    /// A solid block the agent can stand on (and possibly break).
    Solid,
    /// Something the agent must never enter or break (lava, fire, ...).
    Avoid,
    /// Swimmable fluid: passable but slow, and not a floor.
    Liquid,
    /// The region holding this voxel is not loaded. Neither passable nor
    /// impassable; the search engine refuses to expand into it.
    Unknown,
}

impl VoxelClass {
    /// The agent's body can occupy this voxel without breaking anything.
    pub fn is_passable(self) -> bool {
        matches!(self, VoxelClass::Air | VoxelClass::Liquid)
    }

    /// The agent can stand on top of this voxel.
    pub fn is_floor(self) -> bool {
        self == VoxelClass::Solid
    }

    pub fn is_known(self) -> bool {
        self != VoxelClass::Unknown
    }
}
