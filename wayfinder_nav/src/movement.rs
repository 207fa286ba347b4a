// Transitions between positions and the cost catalog that prices them.
//
// A `Transition` is one primitive move: a fixed `(src, dest, kind)` triple.
// The search engine never decides on its own whether a move is possible; it
// generates every candidate shape with `candidate_transitions()` and asks a
// `CostCatalog` what each one costs. `COST_INF` (or more) means infeasible.
//
// Candidate shapes from a position, with `max_fall_height = 3` giving 27:
// - Traverse:  4 cardinal steps on the same level.
// - Diagonal:  4 diagonal steps on the same level.
// - Ascend:    4 cardinal steps up one block (jump).
// - Descend:   4 cardinal steps down 1..=max_fall_height blocks.
// - Downward:  straight down one block, breaking the floor.
// - Pillar:    straight up one block by placing a block underneath.
// - Climb:     straight up one block while swimming.
//
// `VoxelCostCatalog` is the reference catalog: it reads voxel classes from
// any `VoxelSource` and charges tick costs from `costs.rs`, plus the
// configured break and place costs when a move has to alter the world.
//
// See also: `costs.rs` for the base tick costs, `config.rs` for
// `MovementCostConfig`, `search.rs` and `executor.rs` which consult the
// catalog (the executor re-costs live, every tick).

use crate::config::MovementCostConfig;
use crate::costs::{
    CENTER_AFTER_FALL_COST, COST_INF, SNEAK_ONE_BLOCK_COST, SWIM_UP_ONE_COST,
    WALK_OFF_BLOCK_COST, WALK_ONE_BLOCK_COST, WALK_ONE_IN_LIQUID_COST, fall_n_blocks_cost,
    jump_one_block_cost,
};
use crate::types::{CARDINALS, DIAGONALS, Position, VoxelClass};
use crate::world::VoxelSource;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::f64::consts::SQRT_2;
use std::fmt;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// The shape of a primitive move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionKind {
    Traverse,
    Diagonal,
    Ascend,
    /// Step off an edge and fall `drop` blocks.
    Descend { drop: u32 },
    Downward,
    Pillar,
    Climb,
}

/// One primitive move between two positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transition {
    pub src: Position,
    pub dest: Position,
    pub kind: TransitionKind,
}

impl Transition {
    pub fn new(src: Position, dest: Position, kind: TransitionKind) -> Self {
        Self { src, dest, kind }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {} -> {}", self.kind, self.src, self.dest)
    }
}

/// Inline capacity covers every candidate for falls up to four blocks.
pub type Candidates = SmallVec<[Transition; 32]>;

/// Every transition shape leaving `src`, feasible or not.
pub fn candidate_transitions(src: Position, max_fall_height: u32) -> Candidates {
    let to = |dx, dy, dz, kind| Transition::new(src, src.offset(dx, dy, dz), kind);
    let mut out = Candidates::new();
    for (dx, dz) in CARDINALS {
        out.push(to(dx, 0, dz, TransitionKind::Traverse));
    }
    for (dx, dz) in DIAGONALS {
        out.push(to(dx, 0, dz, TransitionKind::Diagonal));
    }
    for (dx, dz) in CARDINALS {
        out.push(to(dx, 1, dz, TransitionKind::Ascend));
    }
    for (dx, dz) in CARDINALS {
        for drop in 1..=max_fall_height {
            out.push(to(dx, -(drop as i32), dz, TransitionKind::Descend { drop }));
        }
    }
    out.push(to(0, -1, 0, TransitionKind::Downward));
    out.push(to(0, 1, 0, TransitionKind::Pillar));
    out.push(to(0, 1, 0, TransitionKind::Climb));
    out
}

// ---------------------------------------------------------------------------
// Cost catalog
// ---------------------------------------------------------------------------

/// Prices transitions in ticks. Returns `COST_INF` or more for infeasible
/// ones. Feasible costs must be zero or more; the search skips negative and
/// NaN prices.
pub trait CostCatalog {
    fn cost(&self, transition: &Transition) -> f64;
}

impl<T: CostCatalog + ?Sized> CostCatalog for &T {
    fn cost(&self, transition: &Transition) -> f64 {
        (**self).cost(transition)
    }
}

impl<T: CostCatalog + ?Sized> CostCatalog for Arc<T> {
    fn cost(&self, transition: &Transition) -> f64 {
        (**self).cost(transition)
    }
}

/// Reference catalog driven by voxel classes.
#[derive(Clone, Debug)]
pub struct VoxelCostCatalog<W> {
    world: W,
    config: MovementCostConfig,
}

impl<W: VoxelSource> VoxelCostCatalog<W> {
    pub fn new(world: W, config: MovementCostConfig) -> Self {
        Self { world, config }
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn config(&self) -> &MovementCostConfig {
        &self.config
    }

    fn class(&self, pos: Position) -> VoxelClass {
        self.world.classify(pos)
    }

    /// Ticks to make `pos` passable: zero if it already is.
    fn break_cost(&self, pos: Position) -> f64 {
        match self.class(pos) {
            VoxelClass::Air | VoxelClass::Liquid => 0.0,
            VoxelClass::Solid => self.config.break_block_cost.unwrap_or(COST_INF),
            VoxelClass::Avoid | VoxelClass::Unknown => COST_INF,
        }
    }

    /// Ticks to clear both voxels the agent occupies standing at `pos`.
    fn body_cost(&self, pos: Position) -> f64 {
        self.break_cost(pos) + self.break_cost(pos.up(1))
    }

    fn body_passable(&self, pos: Position) -> bool {
        self.class(pos).is_passable() && self.class(pos.up(1)).is_passable()
    }

    fn has_floor(&self, pos: Position) -> bool {
        self.class(pos.down(1)).is_floor()
    }

    /// Ticks to put a floor under `pos`, if one can be placed.
    fn place_floor_cost(&self, pos: Position) -> Option<f64> {
        let place = self.config.place_block_cost?;
        self.class(pos.down(1)).is_passable().then_some(place)
    }

    fn in_liquid(&self, pos: Position) -> bool {
        self.class(pos) == VoxelClass::Liquid
    }

    /// Horizontal movement cost for one block, slowed when wading.
    fn walk_cost(&self, src: Position, dest: Position) -> f64 {
        if self.in_liquid(src) || self.in_liquid(dest) {
            WALK_ONE_IN_LIQUID_COST * self.config.liquid_penalty
        } else {
            WALK_ONE_BLOCK_COST
        }
    }

    fn traverse(&self, src: Position, dest: Position) -> f64 {
        let breaks = self.body_cost(dest);
        if breaks >= COST_INF {
            return COST_INF;
        }
        if self.has_floor(dest) || self.in_liquid(dest) {
            return self.walk_cost(src, dest) + breaks;
        }
        match self.place_floor_cost(dest) {
            // Sneak to the edge and bridge.
            Some(place) if !self.in_liquid(src) => SNEAK_ONE_BLOCK_COST + place + breaks,
            _ => COST_INF,
        }
    }

    fn diagonal(&self, src: Position, dest: Position) -> f64 {
        if !self.config.allow_diagonal {
            return COST_INF;
        }
        if !self.body_passable(dest) || !self.has_floor(dest) {
            return COST_INF;
        }
        let side_a = Position::new(dest.x, src.y, src.z);
        let side_b = Position::new(src.x, src.y, dest.z);
        if !self.body_passable(side_a) && !self.body_passable(side_b) {
            return COST_INF;
        }
        self.walk_cost(src, dest) * SQRT_2
    }

    fn ascend(&self, src: Position, dest: Position) -> f64 {
        let breaks = self.break_cost(src.up(2)) + self.body_cost(dest);
        if breaks >= COST_INF {
            return COST_INF;
        }
        let floor = if self.has_floor(dest) {
            0.0
        } else {
            match self.place_floor_cost(dest) {
                Some(place) => place,
                None => return COST_INF,
            }
        };
        jump_one_block_cost() + WALK_ONE_BLOCK_COST + floor + breaks
    }

    fn descend(&self, src: Position, dest: Position, drop: u32) -> f64 {
        if drop == 0 || drop > self.config.max_fall_height || !self.has_floor(dest) {
            return COST_INF;
        }
        if drop == 1 {
            // Clear the landing spot plus the head-height voxel stepped through.
            let breaks = self.body_cost(dest) + self.break_cost(dest.up(2));
            if breaks >= COST_INF {
                return COST_INF;
            }
            let land = fall_n_blocks_cost(1).max(CENTER_AFTER_FALL_COST);
            return WALK_OFF_BLOCK_COST + land + breaks;
        }
        let edge = Position::new(dest.x, src.y, dest.z);
        let breaks = self.body_cost(edge);
        if breaks >= COST_INF {
            return COST_INF;
        }
        // The fall shaft must already be open.
        if !(1..=drop as i32).all(|d| self.class(edge.down(d)).is_passable()) {
            return COST_INF;
        }
        WALK_ONE_BLOCK_COST + fall_n_blocks_cost(drop) + breaks
    }

    fn downward(&self, dest: Position) -> f64 {
        if !self.has_floor(dest) {
            return COST_INF;
        }
        let breaks = self.break_cost(dest);
        if breaks >= COST_INF {
            return COST_INF;
        }
        fall_n_blocks_cost(1) + breaks
    }

    fn pillar(&self, src: Position) -> f64 {
        if !self.config.allow_pillar || self.in_liquid(src) {
            return COST_INF;
        }
        let Some(place) = self.config.place_block_cost else {
            return COST_INF;
        };
        let breaks = self.break_cost(src.up(2));
        if breaks >= COST_INF {
            return COST_INF;
        }
        jump_one_block_cost() + place + breaks
    }

    fn climb(&self, src: Position, dest: Position) -> f64 {
        if !self.in_liquid(src) || !self.body_passable(dest) {
            return COST_INF;
        }
        SWIM_UP_ONE_COST * self.config.liquid_penalty
    }
}

impl<W: VoxelSource> CostCatalog for VoxelCostCatalog<W> {
    fn cost(&self, t: &Transition) -> f64 {
        let (src, dest) = (t.src, t.dest);
        let (dx, dy, dz) = (dest.x - src.x, dest.y - src.y, dest.z - src.z);
        let horizontal = dx.abs() + dz.abs();
        let shape_ok = match t.kind {
            TransitionKind::Traverse => dy == 0 && horizontal == 1,
            TransitionKind::Diagonal => dy == 0 && dx.abs() == 1 && dz.abs() == 1,
            TransitionKind::Ascend => dy == 1 && horizontal == 1,
            TransitionKind::Descend { drop } => dy == -(drop as i32) && horizontal == 1,
            TransitionKind::Downward => dy == -1 && horizontal == 0,
            TransitionKind::Pillar | TransitionKind::Climb => dy == 1 && horizontal == 0,
        };
        if !shape_ok {
            return COST_INF;
        }
        match t.kind {
            TransitionKind::Traverse => self.traverse(src, dest),
            TransitionKind::Diagonal => self.diagonal(src, dest),
            TransitionKind::Ascend => self.ascend(src, dest),
            TransitionKind::Descend { drop } => self.descend(src, dest, drop),
            TransitionKind::Downward => self.downward(dest),
            TransitionKind::Pillar => self.pillar(src),
            TransitionKind::Climb => self.climb(src, dest),
        }
    }
}
