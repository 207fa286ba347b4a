// Search goals: where the agent wants to end up.
//
// A `Goal` answers two questions for the A* engine: "is this position
// acceptable?" (`is_in_goal`) and "at least how many ticks away is it?"
// (`heuristic_with`). Goals are plain data, created once per search and read
// only during it, so they are a closed enum dispatched by `match`.
//
// Heuristics are built from three shared pieces:
// - the horizontal blend: `(sqrt(2) * min(|dx|,|dz|) + (max - min)) * cost_heuristic`,
//   i.e. octile distance scaled by the per-block walking estimate;
// - the vertical term: `|dy|` times the ascend or descend weight;
// - the far-away blend: past `y_blend_min` horizontal blocks the vertical
//   term is faded toward `far_vertical_baseline`, and past `y_blend_max` it
//   is replaced by it. The baseline is an estimate, not a lower bound, so
//   heuristics are only admissible for targets within `y_blend_min`.
//
// `RunAway` is not admissible: its heuristic is negative and
// falls as the agent gets farther from the threat.
//
// See also: `config.rs` for `HeuristicConfig`, `search.rs` which caches one
// heuristic value per discovered node.

use crate::config::HeuristicConfig;
use crate::error::GoalError;
use crate::types::Position;
use serde::{Deserialize, Serialize};
use std::f64::consts::SQRT_2;
use std::fmt;
use std::sync::LazyLock;

static DEFAULT_WEIGHTS: LazyLock<HeuristicConfig> = LazyLock::new(HeuristicConfig::default);

/// A set of acceptable end positions plus a distance estimate toward it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Goal {
    /// Stand with feet exactly at this position.
    Block(Position),
    /// Occupy this position with either the feet or the head.
    TwoBlocks(Position),
    /// Any position at this Y level.
    YLevel(i32),
    /// Any position in this column.
    XZ { x: i32, z: i32 },
    /// Any position within `range` blocks (Euclidean) of `center`.
    Near { center: Position, range: f64 },
    /// Touch this block: inside it or face-adjacent (including from above
    /// and with the head from below).
    GetToBlock(Position),
    /// Any of the sub-goals.
    Composite(Vec<Goal>),
    /// At least `distance` horizontal blocks from every point in `from`,
    /// optionally also at Y level `maintain_y`.
    RunAway {
        from: Vec<Position>,
        distance: f64,
        maintain_y: Option<i32>,
    },
}

impl Goal {
    pub fn near(center: Position, range: f64) -> Result<Goal, GoalError> {
        if !(range.is_finite() && range >= 0.0) {
            return Err(GoalError::InvalidRange(range));
        }
        Ok(Goal::Near { center, range })
    }

    pub fn composite(goals: Vec<Goal>) -> Result<Goal, GoalError> {
        if goals.is_empty() {
            return Err(GoalError::EmptyComposite);
        }
        Ok(Goal::Composite(goals))
    }

    pub fn run_away(
        from: Vec<Position>,
        distance: f64,
        maintain_y: Option<i32>,
    ) -> Result<Goal, GoalError> {
        if from.is_empty() {
            return Err(GoalError::NoRunAwayPoints);
        }
        if !(distance.is_finite() && distance > 0.0) {
            return Err(GoalError::NonPositiveDistance(distance));
        }
        Ok(Goal::RunAway {
            from,
            distance,
            maintain_y,
        })
    }

    /// Whether the agent standing at `pos` has arrived.
    pub fn is_in_goal(&self, pos: Position) -> bool {
        match self {
            Goal::Block(target) => pos == *target,
            Goal::TwoBlocks(target) => pos == *target || pos == target.down(1),
            Goal::YLevel(y) => pos.y == *y,
            Goal::XZ { x, z } => pos.x == *x && pos.z == *z,
            Goal::Near { center, range } => pos.distance_sq(*center) as f64 <= range * range,
            Goal::GetToBlock(target) => {
                let dx = pos.x - target.x;
                let mut dy = pos.y - target.y;
                let dz = pos.z - target.z;
                // Feet two below the block means the head touches it.
                if dy < 0 {
                    dy += 1;
                }
                dx.abs() + dy.abs() + dz.abs() <= 1
            }
            Goal::Composite(goals) => goals.iter().any(|g| g.is_in_goal(pos)),
            Goal::RunAway {
                from,
                distance,
                maintain_y,
            } => {
                if maintain_y.is_some_and(|y| y != pos.y) {
                    return false;
                }
                let min_sq = distance * distance;
                from.iter().all(|p| {
                    let dx = (pos.x - p.x) as f64;
                    let dz = (pos.z - p.z) as f64;
                    dx * dx + dz * dz >= min_sq
                })
            }
        }
    }

    /// Estimated ticks from `pos` to the goal, with the default weights.
    pub fn heuristic(&self, pos: Position) -> f64 {
        self.heuristic_with(pos, &DEFAULT_WEIGHTS)
    }

    /// Estimated ticks from `pos` to the goal.
    pub fn heuristic_with(&self, pos: Position, w: &HeuristicConfig) -> f64 {
        match self {
            Goal::Block(target) => {
                let (dx, dy, dz) = diff(pos, *target);
                block_estimate(dx, dy, dz, w)
            }
            Goal::TwoBlocks(target) => {
                let (dx, mut dy, dz) = diff(pos, *target);
                if dy < 0.0 {
                    dy += 1.0;
                }
                block_estimate(dx, dy, dz, w)
            }
            Goal::YLevel(y) => y_level_estimate((pos.y - y) as f64, w),
            Goal::XZ { x, z } => xz_estimate((pos.x - x) as f64, (pos.z - z) as f64, w),
            Goal::Near { center, range } => {
                let (dx, dy, dz) = diff(pos, *center);
                block_estimate(
                    shrink(dx, *range),
                    shrink(dy, *range),
                    shrink(dz, *range),
                    w,
                )
            }
            Goal::GetToBlock(target) => {
                let (dx, dy, dz) = diff(pos, *target);
                // Goal positions span dy in [-2, 1] and one block either
                // way horizontally.
                let dy = if dy < 0.0 {
                    (dy + 2.0).min(0.0)
                } else {
                    shrink(dy, 1.0)
                };
                block_estimate(shrink(dx, 1.0), dy, shrink(dz, 1.0), w)
            }
            Goal::Composite(goals) => goals
                .iter()
                .map(|g| g.heuristic_with(pos, w))
                .fold(f64::INFINITY, f64::min),
            Goal::RunAway {
                from, maintain_y, ..
            } => {
                let nearest = from
                    .iter()
                    .map(|&p| {
                        let (dx, _, dz) = diff(pos, p);
                        xz_estimate(dx, dz, w)
                    })
                    .fold(f64::INFINITY, f64::min);
                let h = -nearest;
                match maintain_y {
                    Some(y) => {
                        let to_level = y_level_estimate((pos.y - y) as f64, w);
                        h * w.run_away_xz_weight + to_level * w.run_away_y_weight
                    }
                    None => h,
                }
            }
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Goal::Block(p) => write!(f, "block {p}"),
            Goal::TwoBlocks(p) => write!(f, "two blocks {p}"),
            Goal::YLevel(y) => write!(f, "y level {y}"),
            Goal::XZ { x, z } => write!(f, "column ({x}, {z})"),
            Goal::Near { center, range } => write!(f, "within {range} of {center}"),
            Goal::GetToBlock(p) => write!(f, "touching {p}"),
            Goal::Composite(goals) => write!(f, "any of {} goals", goals.len()),
            Goal::RunAway { from, distance, .. } => {
                write!(f, "{distance} away from {} points", from.len())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Shared estimate pieces
// ---------------------------------------------------------------------------

/// `pos - target` per axis.
fn diff(pos: Position, target: Position) -> (f64, f64, f64) {
    (
        (pos.x - target.x) as f64,
        (pos.y - target.y) as f64,
        (pos.z - target.z) as f64,
    )
}

/// Move `v` toward zero by `by`, stopping at zero.
fn shrink(v: f64, by: f64) -> f64 {
    v.signum() * (v.abs() - by).max(0.0)
}

/// Octile horizontal distance times the per-block walking estimate.
fn xz_estimate(dx: f64, dz: f64, w: &HeuristicConfig) -> f64 {
    let x = dx.abs();
    let z = dz.abs();
    let (straight, diagonal) = if x < z { (z - x, x) } else { (x - z, z) };
    (diagonal * SQRT_2 + straight) * w.cost_heuristic
}

/// `dy` is the agent's height above the target; positive means descend.
fn vertical_estimate(dy: f64, w: &HeuristicConfig) -> f64 {
    if dy > 0.0 {
        dy * w.descend_cost_per_block
    } else {
        -dy * w.ascend_cost_per_block
    }
}

fn y_level_estimate(dy: f64, w: &HeuristicConfig) -> f64 {
    if dy > 0.0 {
        dy * w.y_level_down_cost
    } else {
        -dy * w.y_level_up_cost
    }
}

fn block_estimate(dx: f64, dy: f64, dz: f64, w: &HeuristicConfig) -> f64 {
    let horizontal = (dx * dx + dz * dz).sqrt();
    let vertical = vertical_estimate(dy, w);
    let vertical = if horizontal < w.y_blend_min {
        vertical
    } else if horizontal < w.y_blend_max {
        let m = 1.0 - (horizontal - w.y_blend_min) / (w.y_blend_max - w.y_blend_min);
        vertical * m + (1.0 - m) * w.far_vertical_baseline
    } else {
        w.far_vertical_baseline
    };
    vertical + xz_estimate(dx, dz, w)
}
