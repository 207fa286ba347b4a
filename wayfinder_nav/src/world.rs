// Voxel classification source: the engine's only view of the world.
//
// `VoxelSource` is the trait the search engine, the cost catalog and the
// executor query. Implementations answer two questions per position: what
// kind of voxel is there, and is the region holding it loaded. Unloaded
// regions report `VoxelClass::Unknown`; the engine never expands into them.
//
// `VoxelWorld` is the reference implementation: a dense 3D grid stored as a
// flat `Vec<VoxelClass>` indexed by `x + z * size_x + y * size_x * size_z`
// relative to `origin`. Loading is per column (x, z): columns inside the
// grid's footprint are loaded unless explicitly unloaded with
// `unload_column()`, and everything above or below the grid's vertical range
// in a loaded column reads as `Air` (open sky / void). Columns outside the
// footprint read as `Unknown`.
//
// See also: `movement.rs` for the cost catalog built on `VoxelSource`,
// `search.rs` which checks `is_loaded` before costing a transition.

use crate::types::{Position, VoxelClass};
use rustc_hash::FxHashSet;
use std::sync::Arc;

/// Read-only classification of voxels. Must be cheap: the engine calls it
/// many times per expanded node.
pub trait VoxelSource {
    fn classify(&self, pos: Position) -> VoxelClass;

    /// Whether the region holding `pos` is loaded.
    fn is_loaded(&self, pos: Position) -> bool {
        self.classify(pos).is_known()
    }
}

impl<T: VoxelSource + ?Sized> VoxelSource for &T {
    fn classify(&self, pos: Position) -> VoxelClass {
        (**self).classify(pos)
    }

    fn is_loaded(&self, pos: Position) -> bool {
        (**self).is_loaded(pos)
    }
}

impl<T: VoxelSource + ?Sized> VoxelSource for Arc<T> {
    fn classify(&self, pos: Position) -> VoxelClass {
        (**self).classify(pos)
    }

    fn is_loaded(&self, pos: Position) -> bool {
        (**self).is_loaded(pos)
    }
}

/// Dense, bounded 3D voxel grid.
#[derive(Clone, Debug, Default)]
pub struct VoxelWorld {
    /// Flat storage: index = x + z * size_x + y * size_x * size_z.
    voxels: Vec<VoxelClass>,
    origin: Position,
    pub size_x: u32,
    pub size_y: u32,
    pub size_z: u32,
    unloaded_columns: FxHashSet<(i32, i32)>,
}

impl VoxelWorld {
    /// Create a world filled with `Air` whose minimum corner is `origin`.
    pub fn new(origin: Position, size_x: u32, size_y: u32, size_z: u32) -> Self {
        let total = (size_x as usize) * (size_y as usize) * (size_z as usize);
        Self {
            voxels: vec![VoxelClass::Air; total],
            origin,
            size_x,
            size_y,
            size_z,
            unloaded_columns: FxHashSet::default(),
        }
    }

    pub fn origin(&self) -> Position {
        self.origin
    }

    /// Whether the column holding `pos` lies inside the grid's footprint.
    pub fn in_footprint(&self, pos: Position) -> bool {
        let x = pos.x as i64 - self.origin.x as i64;
        let z = pos.z as i64 - self.origin.z as i64;
        x >= 0 && z >= 0 && x < self.size_x as i64 && z < self.size_z as i64
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        let y = pos.y as i64 - self.origin.y as i64;
        self.in_footprint(pos) && y >= 0 && y < self.size_y as i64
    }

    /// Convert a position to a flat index. Returns `None` if out of bounds.
    fn index(&self, pos: Position) -> Option<usize> {
        if self.in_bounds(pos) {
            let x = (pos.x - self.origin.x) as usize;
            let y = (pos.y - self.origin.y) as usize;
            let z = (pos.z - self.origin.z) as usize;
            let sx = self.size_x as usize;
            let sz = self.size_z as usize;
            Some(x + z * sx + y * sx * sz)
        } else {
            None
        }
    }

    /// Raw stored class, ignoring loading. `Air` outside the grid.
    pub fn get(&self, pos: Position) -> VoxelClass {
        self.index(pos)
            .map(|i| self.voxels[i])
            .unwrap_or(VoxelClass::Air)
    }

    /// Write a voxel. No-op outside the grid.
    pub fn set(&mut self, pos: Position, class: VoxelClass) {
        if let Some(i) = self.index(pos) {
            self.voxels[i] = class;
        }
    }

    /// Fill the inclusive box spanned by `a` and `b`.
    pub fn fill(&mut self, a: Position, b: Position, class: VoxelClass) {
        for y in a.y.min(b.y)..=a.y.max(b.y) {
            for z in a.z.min(b.z)..=a.z.max(b.z) {
                for x in a.x.min(b.x)..=a.x.max(b.x) {
                    self.set(Position::new(x, y, z), class);
                }
            }
        }
    }

    /// Mark the column `(x, z)` as not loaded.
    pub fn unload_column(&mut self, x: i32, z: i32) {
        self.unloaded_columns.insert((x, z));
    }

    pub fn load_column(&mut self, x: i32, z: i32) {
        self.unloaded_columns.remove(&(x, z));
    }
}

impl VoxelSource for VoxelWorld {
    fn classify(&self, pos: Position) -> VoxelClass {
        if !self.is_loaded(pos) {
            return VoxelClass::Unknown;
        }
        self.get(pos)
    }

    fn is_loaded(&self, pos: Position) -> bool {
        self.in_footprint(pos) && !self.unloaded_columns.contains(&(pos.x, pos.z))
    }
}
