// Immutable planned paths.
//
// A `Path` is N positions joined by N - 1 transitions, each with the cost
// the catalog charged when the path was planned. Construction always runs
// `sanity_check`, so every `Path` in existence satisfies:
// - at least one position, and exactly one transition and one cost per gap;
// - the first position is the source and the last is the destination;
// - transition `i` runs from position `i` to position `i + 1`;
// - no position appears twice.
//
// Suffix sums of the costs are cached at construction, so
// `cost_remaining_from` is O(1) for the executor's per-tick queries.
//
// Post-processing produces new, shorter paths: `cutoff_at_loaded` truncates
// at the first position in an unloaded region and `static_cutoff` trims the
// tail of partial paths, whose last steps are the least trustworthy.
//
// See also: `search.rs` which reconstructs paths from node parents,
// `executor.rs` which follows them.

use crate::config::SearchConfig;
use crate::error::PathIntegrityError;
use crate::goal::Goal;
use crate::movement::Transition;
use crate::types::Position;
use crate::world::VoxelSource;
use rustc_hash::FxHashMap;

#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    src: Position,
    dest: Position,
    positions: Vec<Position>,
    transitions: Vec<Transition>,
    costs: Vec<f64>,
    /// `remaining[i]` = sum of `costs[i..]`; one longer than `costs`.
    remaining: Vec<f64>,
    goal: Goal,
    nodes_considered: usize,
}

impl Path {
    /// Build and validate a path from `src` to `dest`.
    pub fn new(
        src: Position,
        dest: Position,
        positions: Vec<Position>,
        transitions: Vec<Transition>,
        costs: Vec<f64>,
        goal: Goal,
        nodes_considered: usize,
    ) -> Result<Path, PathIntegrityError> {
        let mut remaining = vec![0.0; costs.len() + 1];
        for i in (0..costs.len()).rev() {
            remaining[i] = remaining[i + 1] + costs[i];
        }
        let path = Path {
            src,
            dest,
            positions,
            transitions,
            costs,
            remaining,
            goal,
            nodes_considered,
        };
        path.sanity_check()?;
        Ok(path)
    }

    /// Verify the structural invariants listed in the module header.
    pub fn sanity_check(&self) -> Result<(), PathIntegrityError> {
        let (Some(&first), Some(&last)) = (self.positions.first(), self.positions.last()) else {
            return Err(PathIntegrityError::Empty);
        };
        if self.positions.len() != self.transitions.len() + 1 {
            return Err(PathIntegrityError::TransitionCountMismatch {
                positions: self.positions.len(),
                transitions: self.transitions.len(),
            });
        }
        if self.costs.len() != self.transitions.len() {
            return Err(PathIntegrityError::CostCountMismatch {
                transitions: self.transitions.len(),
                costs: self.costs.len(),
            });
        }
        if first != self.src {
            return Err(PathIntegrityError::WrongSource {
                expected: self.src,
                actual: first,
            });
        }
        if last != self.dest {
            return Err(PathIntegrityError::WrongDestination {
                expected: self.dest,
                actual: last,
            });
        }
        for (i, t) in self.transitions.iter().enumerate() {
            let (from, to) = (self.positions[i], self.positions[i + 1]);
            if t.src != from || t.dest != to {
                return Err(PathIntegrityError::DisconnectedTransition {
                    index: i,
                    from,
                    to,
                });
            }
        }
        let mut seen = FxHashMap::default();
        for (i, &pos) in self.positions.iter().enumerate() {
            if let Some(first) = seen.insert(pos, i) {
                return Err(PathIntegrityError::Loop {
                    position: pos,
                    first,
                    second: i,
                });
            }
        }
        Ok(())
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Planned cost of each transition, parallel to `transitions()`.
    pub fn costs(&self) -> &[f64] {
        &self.costs
    }

    /// Number of positions.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Always false for a validated path; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn source(&self) -> Position {
        self.src
    }

    pub fn destination(&self) -> Position {
        self.dest
    }

    pub fn goal(&self) -> &Goal {
        &self.goal
    }

    /// Nodes the search expanded to produce this path.
    pub fn nodes_considered(&self) -> usize {
        self.nodes_considered
    }

    pub fn total_cost(&self) -> f64 {
        self.remaining[0]
    }

    /// Planned cost of transitions `index..`. Zero at or past the end.
    pub fn cost_remaining_from(&self, index: usize) -> f64 {
        self.remaining[index.min(self.costs.len())]
    }

    /// Whether the destination satisfies the goal.
    pub fn reaches_goal(&self) -> bool {
        self.goal.is_in_goal(self.dest)
    }

    /// Distance to, and index of, the path position nearest `pos`. Ties go
    /// to the earliest index.
    pub fn closest_position(&self, pos: Position) -> (f64, usize) {
        let mut best = 0;
        for (i, p) in self.positions.iter().enumerate() {
            if p.distance_sq(pos) < self.positions[best].distance_sq(pos) {
                best = i;
            }
        }
        (self.positions[best].distance(pos), best)
    }

    /// Truncate before the first position in an unloaded region. The source
    /// is always kept.
    pub fn cutoff_at_loaded<W: VoxelSource>(self, world: &W) -> Path {
        match self.positions.iter().position(|&p| !world.is_loaded(p)) {
            Some(i) => self.truncated(i.max(1) - 1),
            None => self,
        }
    }

    /// Trim a partial path to `path_cutoff_factor` of its length beyond
    /// `path_cutoff_minimum_length`. Paths that reach the goal, or are shorter
    /// than the minimum, are returned unchanged.
    pub fn static_cutoff(self, config: &SearchConfig) -> Path {
        let len = self.positions.len();
        let min = config.path_cutoff_minimum_length;
        if len < min || self.reaches_goal() {
            return self;
        }
        let keep = ((len - min) as f64 * config.path_cutoff_factor) as usize + min;
        self.truncated(keep.saturating_sub(1))
    }

    /// Keep positions `0..=last`.
    fn truncated(mut self, last: usize) -> Path {
        if last + 1 >= self.positions.len() {
            return self;
        }
        self.positions.truncate(last + 1);
        self.transitions.truncate(last);
        self.costs.truncate(last);
        let tail = self.remaining[last];
        self.remaining.truncate(last + 1);
        for r in &mut self.remaining {
            *r -= tail;
        }
        // Exact zero at the end, whatever the rounding above did.
        self.remaining[last] = 0.0;
        self.dest = self.positions[last];
        self
    }
}
