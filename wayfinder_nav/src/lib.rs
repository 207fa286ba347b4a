// wayfinder_nav: real-time path planning for an agent in a 3D voxel world.
//
// This crate plans and follows paths for a two-voxel-tall agent moving
// through a large, mutable, partially loaded grid world. It knows nothing
// about rendering, entity AI or the game loop; the world, the cost of each
// move and the low-level motor are all supplied through traits.
//
// Module overview:
// - `types.rs`:      Position, VoxelClass.
// - `costs.rs`:      Tick-based movement cost constants, fall-time table, COST_INF.
// - `config.rs`:     PathingConfig: every tunable number, JSON loadable.
// - `error.rs`:      thiserror enums for path integrity, config and goal errors.
// - `goal.rs`:       Goal enum: membership tests and heuristics.
// - `world.rs`:      VoxelSource trait + VoxelWorld, a dense reference grid.
// - `movement.rs`:   Transition shapes, candidate generation, CostCatalog trait
//                    and the voxel-driven VoxelCostCatalog.
// - `node.rs`:       Per-search node arena indexed by position.
// - `open_set.rs`:   Binary min-heap with decrease-key over node ids.
// - `search.rs`:     SearchSession: time-boxed A* with partial-path fallback.
// - `background.rs`: Running a session on a worker thread.
// - `path.rs`:       Immutable validated paths, cutoffs.
// - `executor.rs`:   PathExecutor: tick-driven path following state machine.
// - `prng`:          Re-exported from `wayfinder_prng`: xoshiro256++ PRNG.
//
// Typical use: build a `PathingConfig`, call `search::search_with_config`
// (or `background::spawn_search_with_config`) with a start and a `Goal`,
// then hand the resulting `Path` to a `PathExecutor` and call `tick()` once
// per game tick until it finishes. On failure, search again from wherever
// the agent is.
//
// **Critical constraint: determinism.** Neighbor ordering is shuffled by a
// seeded PRNG, node maps are hashed with a fixed hasher, and nothing reads
// the clock except the timeout checks. Searches that finish by reaching the
// goal or by exhaustion are reproducible bit for bit.

pub mod background;
pub mod config;
pub mod costs;
pub mod error;
pub mod executor;
pub mod goal;
pub mod movement;
pub mod node;
pub mod open_set;
pub mod path;
pub use wayfinder_prng as prng;
pub mod search;
pub mod types;
pub mod world;

pub use config::PathingConfig;
pub use executor::{ExecutorState, FailureReason, MotorController, MotorStatus, PathExecutor};
pub use goal::Goal;
pub use movement::{CostCatalog, Transition, TransitionKind, VoxelCostCatalog};
pub use path::Path;
pub use search::{CancelToken, SearchResult, SearchSession, search, search_with_config};
pub use types::{Position, VoxelClass};
pub use world::{VoxelSource, VoxelWorld};
