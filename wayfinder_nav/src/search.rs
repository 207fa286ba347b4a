// Time-boxed incremental A* over voxel positions.
//
// A `SearchSession` owns everything one search needs: its node store, open
// set, PRNG, cancel token and statistics. Nothing is shared between
// sessions, so several can run at once on different threads. `search()` is
// the one-call convenience wrapper.
//
// The loop is textbook A* with three additions for a large, partially loaded
// world where a usable answer now beats a perfect answer later:
//
// 1. Best-so-far tracking. For each weighting coefficient `c` the session
//    remembers the node minimising `h + g / c`. If the search stops without
//    reaching the goal, the tightest coefficient whose node is more than
//    `min_dist_path` from the start yields a partial path (`SoftFailure`),
//    trimmed by `Path::static_cutoff`.
// 2. Two timeouts. While no tracked node is far enough from the start to be
//    useful the search is "failing" and may run until `failure_timeout`;
//    once one is, it stops at `primary_timeout` (or `failure_timeout`,
//    whichever comes first). The clock is read every `time_check_interval`
//    expansions.
// 3. Unloaded regions. Candidates whose destination is not loaded are
//    counted and skipped; after `max_unloaded_hits` the search gives up
//    rather than hug the loaded border.
//
// Re-propagation of an already reached node requires an improvement of at
// least `min_improvement`, which keeps floating-point noise from re-opening
// nodes endlessly. Candidate moves are shuffled with the session's seeded
// `GameRng` to break ties without bias.
//
// See also: `node.rs` and `open_set.rs` for the data structures,
// `movement.rs` for candidate generation and costing, `path.rs` for path
// reconstruction, `background.rs` for running a session on a worker thread.
//
// **Critical constraint: determinism.** Given the same seed, world, catalog
// and goal, a search that ends by reaching the goal or exhausting the open
// set produces the same path every time. Only timeouts and cancellation
// depend on the wall clock.

use crate::config::PathingConfig;
use crate::costs::COST_INF;
use crate::goal::Goal;
use crate::movement::{CostCatalog, Transition, candidate_transitions};
use crate::node::{NodeId, NodeStore};
use crate::open_set::OpenSet;
use crate::path::Path;
use crate::types::Position;
use crate::world::VoxelSource;
use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use wayfinder_prng::GameRng;

// ---------------------------------------------------------------------------
// Results and bookkeeping
// ---------------------------------------------------------------------------

/// Outcome of a search.
#[derive(Clone, Debug, PartialEq)]
pub enum SearchResult {
    /// A path whose destination satisfies the goal.
    Success(Path),
    /// The best partial path toward the goal.
    SoftFailure(Path),
    /// Nothing worth walking.
    Failure,
}

impl SearchResult {
    /// The path to walk, successful or partial.
    pub fn path(&self) -> Option<&Path> {
        match self {
            SearchResult::Success(p) | SearchResult::SoftFailure(p) => Some(p),
            SearchResult::Failure => None,
        }
    }

    /// Like `path`, by value.
    pub fn into_path(self) -> Option<Path> {
        match self {
            SearchResult::Success(p) | SearchResult::SoftFailure(p) => Some(p),
            SearchResult::Failure => None,
        }
    }

    /// Whether the path reaches the goal.
    pub fn is_success(&self) -> bool {
        matches!(self, SearchResult::Success(_))
    }
}

/// Why the main loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    ReachedGoal,
    /// The open set ran dry.
    Exhausted,
    Timeout,
    UnloadedLimit,
    NodeLimit,
    Cancelled,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchStats {
    pub nodes_expanded: usize,
    pub nodes_discovered: usize,
    pub movements_considered: usize,
    pub unloaded_hits: u32,
    pub elapsed: Duration,
    pub cancelled: bool,
    /// Coefficient whose best node produced the soft-failure path.
    pub coefficient_used: Option<f64>,
    pub termination: Option<Termination>,
}

/// Shared flag for stopping a running search from another thread.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One search from `start` toward `goal`.
pub struct SearchSession<W, C> {
    start: Position,
    goal: Goal,
    world: W,
    catalog: C,
    config: PathingConfig,
    store: NodeStore,
    open: OpenSet,
    start_node: NodeId,
    rng: GameRng,
    cancel: CancelToken,
    best_so_far: Vec<NodeId>,
    best_score_so_far: Vec<f64>,
    most_recent: Option<NodeId>,
    stats: SearchStats,
    result: Option<SearchResult>,
}

impl<W: VoxelSource, C: CostCatalog> SearchSession<W, C> {
    pub fn new(start: Position, goal: Goal, world: W, catalog: C, config: PathingConfig) -> Self {
        let capacity = config.search.initial_node_capacity;
        let mut store = NodeStore::with_capacity(capacity);
        let start_node = store.get_or_create(start, &goal, &config.heuristic);
        let coefficients = config.search.coefficients.len();
        Self {
            start,
            goal,
            world,
            catalog,
            rng: GameRng::new(config.search.seed),
            config,
            store,
            open: OpenSet::with_capacity(capacity),
            start_node,
            cancel: CancelToken::new(),
            best_so_far: vec![start_node; coefficients],
            best_score_so_far: vec![f64::INFINITY; coefficients],
            most_recent: None,
            stats: SearchStats::default(),
            result: None,
        }
    }

    /// A token that stops this session's `run` at the next expansion.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    pub fn goal(&self) -> &Goal {
        &self.goal
    }

    /// Run the search. A session runs once; later calls return the cached
    /// result.
    pub fn run(&mut self, primary_timeout: Duration, failure_timeout: Duration) -> SearchResult {
        if let Some(result) = &self.result {
            return result.clone();
        }
        let result = self.run_inner(primary_timeout, failure_timeout);
        self.result = Some(result.clone());
        result
    }

    fn run_inner(&mut self, primary_timeout: Duration, failure_timeout: Duration) -> SearchResult {
        let started = Instant::now();
        // `None` when the timeout is too large to represent: never fires.
        let primary_deadline = started.checked_add(primary_timeout);
        let failure_deadline = started.checked_add(failure_timeout);
        let min_dist_sq = self.config.search.min_dist_path * self.config.search.min_dist_path;
        let max_fall = self.config.movement.max_fall_height;
        let interval = self.config.search.time_check_interval.max(1) as usize;
        let slow_delay = self.config.search.slow_path_delay();
        let max_nodes = self.config.search.max_nodes;

        {
            let start = self.store.node_mut(self.start_node);
            start.cost = 0.0;
            start.combined_cost = start.heuristic;
        }
        let start_h = self.store.node(self.start_node).heuristic;
        for score in &mut self.best_score_so_far {
            *score = start_h;
        }
        self.open.insert(self.store.nodes_mut(), self.start_node);

        let mut failing = true;
        let mut last_progress_log = started;
        let mut expanded = 0usize;

        let termination = loop {
            if self.cancel.is_cancelled() {
                break Termination::Cancelled;
            }
            if self.open.is_empty() {
                break Termination::Exhausted;
            }
            if self.stats.unloaded_hits >= self.config.search.max_unloaded_hits {
                break Termination::UnloadedLimit;
            }
            if max_nodes.is_some_and(|max| expanded >= max) {
                break Termination::NodeLimit;
            }
            if expanded % interval == 0 {
                let now = Instant::now();
                let past = |deadline: Option<Instant>| deadline.is_some_and(|d| now >= d);
                if past(failure_deadline) || (!failing && past(primary_deadline)) {
                    break Termination::Timeout;
                }
                if now.duration_since(last_progress_log) >= Duration::from_secs(1) {
                    last_progress_log = now;
                    debug!(
                        "search from {} toward {}: {} expanded, {} open, {} known",
                        self.start,
                        self.goal,
                        expanded,
                        self.open.len(),
                        self.store.len()
                    );
                }
            }
            if let Some(delay) = slow_delay {
                std::thread::sleep(delay);
            }

            let Some(current) = self.open.remove_lowest(self.store.nodes_mut()) else {
                break Termination::Exhausted;
            };
            self.most_recent = Some(current);
            expanded += 1;
            self.stats.nodes_expanded = expanded;

            let (pos, current_cost) = {
                let node = self.store.node(current);
                (node.position, node.cost)
            };
            if self.goal.is_in_goal(pos) {
                self.finish_stats(started, Termination::ReachedGoal);
                info!(
                    "path to {} found after {} nodes in {:?}",
                    self.goal, expanded, self.stats.elapsed
                );
                return match self.path_to(current) {
                    Some(path) => SearchResult::Success(path),
                    None => SearchResult::Failure,
                };
            }

            let mut candidates = candidate_transitions(pos, max_fall);
            self.rng.shuffle(&mut candidates);
            for transition in candidates {
                self.stats.movements_considered += 1;
                if !self.world.is_loaded(transition.dest) {
                    self.stats.unloaded_hits += 1;
                    continue;
                }
                let cost = self.catalog.cost(&transition);
                // Zero is a legal price; negative or NaN ones are catalog bugs.
                if cost.is_nan() || cost < 0.0 || cost >= COST_INF {
                    continue;
                }
                self.relax(
                    current,
                    current_cost,
                    transition,
                    cost,
                    min_dist_sq,
                    &mut failing,
                );
            }
        };

        self.finish_stats(started, termination);
        if termination == Termination::Cancelled {
            self.stats.cancelled = true;
            debug!(
                "search toward {} cancelled after {} nodes",
                self.goal, expanded
            );
        }
        match self.best_path_with_coefficient() {
            Some((path, coefficient)) => {
                self.stats.coefficient_used = Some(coefficient);
                if coefficient >= self.config.search.poor_coefficient_threshold {
                    warn!(
                        "partial path toward {} needed coefficient {coefficient}; it may be poor",
                        self.goal
                    );
                }
                let path = path.static_cutoff(&self.config.search);
                info!(
                    "partial path toward {} ({:?}): {} positions after {} nodes",
                    self.goal,
                    termination,
                    path.len(),
                    expanded
                );
                SearchResult::SoftFailure(path)
            }
            None => {
                info!(
                    "no path toward {} ({:?}) after {} nodes",
                    self.goal, termination, expanded
                );
                SearchResult::Failure
            }
        }
    }

    /// Offer `neighbor` a route through `current` at `cost` more than
    /// `current_cost`.
    fn relax(
        &mut self,
        current: NodeId,
        current_cost: f64,
        transition: Transition,
        cost: f64,
        min_dist_sq: f64,
        failing: &mut bool,
    ) {
        let neighbor = self.store.get_or_create(
            transition.dest,
            &self.goal,
            &self.config.heuristic,
        );
        self.stats.nodes_discovered = self.store.len();
        let tentative = current_cost + cost;
        let node = self.store.node_mut(neighbor);
        if tentative >= node.cost {
            return;
        }
        let improvement = node.cost - tentative;
        let search = &self.config.search;
        if search.use_min_improvement && improvement < search.min_improvement {
            return;
        }
        node.parent = Some(current);
        node.parent_transition = Some(transition);
        node.transition_cost = cost;
        node.cost = tentative;
        node.combined_cost = tentative + node.heuristic;
        let (heuristic, is_open) = (node.heuristic, node.is_open());
        if is_open {
            self.open.update(self.store.nodes_mut(), neighbor);
        } else {
            self.open.insert(self.store.nodes_mut(), neighbor);
        }

        let dist_sq = transition.dest.distance_sq(self.start) as f64;
        let min_improvement = self.config.search.min_improvement;
        for (i, &coefficient) in self.config.search.coefficients.iter().enumerate() {
            let score = heuristic + tentative / coefficient;
            if self.best_score_so_far[i] - score > min_improvement {
                self.best_so_far[i] = neighbor;
                self.best_score_so_far[i] = score;
                if *failing && dist_sq > min_dist_sq {
                    *failing = false;
                }
            }
        }
    }

    fn finish_stats(&mut self, started: Instant, termination: Termination) {
        self.stats.elapsed = started.elapsed();
        self.stats.nodes_discovered = self.store.len();
        self.stats.termination = Some(termination);
    }

    /// The partial path a stopped search would return, before cutoff.
    pub fn best_path_so_far(&self) -> Option<Path> {
        self.best_path_with_coefficient().map(|(path, _)| path)
    }

    fn best_path_with_coefficient(&self) -> Option<(Path, f64)> {
        let min_dist_sq = self.config.search.min_dist_path * self.config.search.min_dist_path;
        self.config
            .search
            .coefficients
            .iter()
            .zip(&self.best_so_far)
            .find(|&(_, &id)| {
                self.store.node(id).position.distance_sq(self.start) as f64 > min_dist_sq
            })
            .and_then(|(&coefficient, &id)| {
                self.path_to(id).map(|p| (p, coefficient))
            })
    }

    /// Path to whichever node was expanded last. For diagnostics.
    pub fn path_to_most_recent_node(&self) -> Option<Path> {
        self.most_recent.and_then(|id| self.path_to(id))
    }

    /// Reconstruct the path from the start to `end` by following parents.
    fn path_to(&self, end: NodeId) -> Option<Path> {
        let mut positions = Vec::new();
        let mut transitions = Vec::new();
        let mut costs = Vec::new();
        let mut current = end;
        loop {
            let node = self.store.node(current);
            positions.push(node.position);
            match (node.parent, node.parent_transition) {
                (Some(parent), Some(transition)) => {
                    transitions.push(transition);
                    costs.push(node.transition_cost);
                    current = parent;
                }
                _ => break,
            }
            // A parent chain longer than the store has a cycle.
            if positions.len() > self.store.len() {
                break;
            }
        }
        positions.reverse();
        transitions.reverse();
        costs.reverse();
        let dest = self.store.node(end).position;
        match Path::new(
            self.start,
            dest,
            positions,
            transitions,
            costs,
            self.goal.clone(),
            self.stats.nodes_expanded,
        ) {
            Ok(path) => Some(path),
            Err(err) => {
                if cfg!(debug_assertions) {
                    panic!("reconstructed path is malformed: {err}");
                }
                log::error!("discarding malformed path toward {}: {err}", self.goal);
                None
            }
        }
    }
}

/// Run one search to completion with the given timeouts.
pub fn search<W: VoxelSource, C: CostCatalog>(
    start: Position,
    goal: Goal,
    world: W,
    catalog: C,
    config: &PathingConfig,
    primary_timeout: Duration,
    failure_timeout: Duration,
) -> SearchResult {
    SearchSession::new(start, goal, world, catalog, config.clone())
        .run(primary_timeout, failure_timeout)
}

/// Run one search with the timeouts from `config.search`.
pub fn search_with_config<W: VoxelSource, C: CostCatalog>(
    start: Position,
    goal: Goal,
    world: W,
    catalog: C,
    config: &PathingConfig,
) -> SearchResult {
    let primary = config.search.primary_timeout();
    let failure = config.search.failure_timeout();
    search(start, goal, world, catalog, config, primary, failure)
}
