// Running a search on a worker thread.
//
// `spawn_search` moves a `SearchSession` onto its own `std::thread` and
// returns a `SearchHandle` immediately. The worker sends its result back
// over an `mpsc` channel; the caller polls with `try_result` (never blocks,
// so it is safe to call from a game tick) or blocks with `wait`. Stopping
// early goes through the session's shared `CancelToken`, which the search
// loop checks before every expansion.
//
// Dropping a handle cancels its search. The worker then finishes on its own
// at the next expansion and its result is discarded.
//
// See also: `search.rs` for the session being run.

use crate::config::PathingConfig;
use crate::goal::Goal;
use crate::movement::CostCatalog;
use crate::search::{CancelToken, SearchResult, SearchSession, SearchStats};
use crate::types::Position;
use crate::world::VoxelSource;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

/// What a finished background search produced.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchOutcome {
    pub result: SearchResult,
    pub stats: SearchStats,
}

/// Handle to a search running on a worker thread.
pub struct SearchHandle {
    cancel: CancelToken,
    receiver: Receiver<SearchOutcome>,
    thread: Option<thread::JoinHandle<()>>,
    outcome: Option<SearchOutcome>,
}

impl SearchHandle {
    /// Ask the worker to stop. It returns its best partial result so far.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// The outcome, if the worker has finished. Never blocks.
    pub fn try_result(&mut self) -> Option<&SearchOutcome> {
        if self.outcome.is_none() {
            match self.receiver.try_recv() {
                Ok(outcome) => {
                    self.join_worker();
                    self.outcome = Some(outcome);
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    self.join_worker();
                    self.outcome = Some(worker_lost());
                }
            }
        }
        self.outcome.as_ref()
    }

    /// Block until the worker finishes.
    pub fn wait(mut self) -> SearchOutcome {
        if let Some(outcome) = self.outcome.take() {
            return outcome;
        }
        let outcome = self.receiver.recv().unwrap_or_else(|_| worker_lost());
        self.join_worker();
        outcome
    }

    fn join_worker(&mut self) {
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SearchHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.cancel.cancel();
        }
    }
}

/// The worker died without reporting (it panicked).
fn worker_lost() -> SearchOutcome {
    log::error!("background search worker exited without a result");
    SearchOutcome {
        result: SearchResult::Failure,
        stats: SearchStats::default(),
    }
}

/// Start a search on a new thread.
pub fn spawn_search<W, C>(
    start: Position,
    goal: Goal,
    world: W,
    catalog: C,
    config: PathingConfig,
    primary_timeout: Duration,
    failure_timeout: Duration,
) -> SearchHandle
where
    W: VoxelSource + Send + 'static,
    C: CostCatalog + Send + 'static,
{
    let mut session = SearchSession::new(start, goal, world, catalog, config);
    let cancel = session.cancel_token();
    let (tx, receiver) = mpsc::channel();
    let thread = thread::spawn(move || {
        let result = session.run(primary_timeout, failure_timeout);
        let stats = session.stats().clone();
        // The handle may already be gone; nobody is waiting then.
        let _ = tx.send(SearchOutcome { result, stats });
    });
    SearchHandle {
        cancel,
        receiver,
        thread: Some(thread),
        outcome: None,
    }
}

/// Start a search on a new thread with the timeouts from `config.search`.
pub fn spawn_search_with_config<W, C>(
    start: Position,
    goal: Goal,
    world: W,
    catalog: C,
    config: PathingConfig,
) -> SearchHandle
where
    W: VoxelSource + Send + 'static,
    C: CostCatalog + Send + 'static,
{
    let primary = config.search.primary_timeout();
    let failure = config.search.failure_timeout();
    spawn_search(start, goal, world, catalog, config, primary, failure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::VoxelCostCatalog;
    use crate::search::Termination;
    use crate::types::VoxelClass;
    use crate::world::VoxelWorld;
    use std::sync::Arc;

    fn p(x: i32, y: i32, z: i32) -> Position {
        Position::new(x, y, z)
    }

    /// 16x16 floor at y = 0 with four loaded columns of margin on every side,
    /// so searches near its edge never count unloaded destinations.
    fn floor() -> Arc<VoxelWorld> {
        let mut world = VoxelWorld::new(p(-4, 0, -4), 24, 4, 24);
        world.fill(p(0, 0, 0), p(15, 0, 15), VoxelClass::Solid);
        Arc::new(world)
    }

    #[test]
    fn background_search_finds_path() {
        let world = floor();
        let config = PathingConfig::default();
        let catalog = VoxelCostCatalog::new(world.clone(), config.movement.clone());
        let handle = spawn_search(
            Position::new(1, 1, 1),
            Goal::Block(Position::new(12, 1, 9)),
            world,
            catalog,
            config,
            Duration::from_secs(30),
            Duration::from_secs(30),
        );
        let outcome = handle.wait();
        assert!(outcome.result.is_success(), "{outcome:?}");
        assert_eq!(outcome.stats.termination, Some(Termination::ReachedGoal));
        assert!(outcome.stats.nodes_expanded > 0);
        assert_eq!(outcome.stats.unloaded_hits, 0);
    }

    #[test]
    fn background_search_gives_up_at_the_loaded_border() {
        // Only a 3x3 patch is loaded and the goal lies outside it.
        let mut world = VoxelWorld::new(p(0, 0, 0), 3, 4, 3);
        world.fill(p(0, 0, 0), p(2, 0, 2), VoxelClass::Solid);
        let world = Arc::new(world);
        let mut config = PathingConfig::default();
        config.movement.break_block_cost = None;
        config.movement.place_block_cost = None;
        let catalog = VoxelCostCatalog::new(world.clone(), config.movement.clone());
        let goal = Goal::Block(p(12, 1, 9));
        let handle = spawn_search_with_config(p(1, 1, 1), goal, world, catalog, config);
        let outcome = handle.wait();
        assert_eq!(outcome.result, SearchResult::Failure);
        assert_eq!(outcome.stats.termination, Some(Termination::UnloadedLimit));
        assert!(outcome.stats.unloaded_hits >= 50);
    }

    #[test]
    fn try_result_eventually_yields() {
        let world = floor();
        let config = PathingConfig::default();
        let catalog = VoxelCostCatalog::new(world.clone(), config.movement.clone());
        let mut handle = spawn_search(
            Position::new(1, 1, 1),
            Goal::Block(Position::new(3, 1, 1)),
            world,
            catalog,
            config,
            Duration::from_secs(30),
            Duration::from_secs(30),
        );
        let mut polls = 0;
        while handle.try_result().is_none() {
            polls += 1;
            assert!(polls < 10_000, "worker never finished");
            thread::sleep(Duration::from_millis(1));
        }
        assert!(handle.try_result().is_some_and(|o| o.result.is_success()));
    }

    #[test]
    fn cancel_stops_slow_search() {
        let world = floor();
        let mut config = PathingConfig::default();
        config.search.slow_path_delay_ms = Some(5);
        let catalog = VoxelCostCatalog::new(world.clone(), config.movement.clone());
        let handle = spawn_search(
            Position::new(1, 1, 1),
            Goal::Block(Position::new(14, 1, 14)),
            world,
            catalog,
            config,
            Duration::from_secs(60),
            Duration::from_secs(60),
        );
        thread::sleep(Duration::from_millis(30));
        handle.cancel();
        let outcome = handle.wait();
        assert!(outcome.stats.cancelled);
        assert!(!outcome.result.is_success());
    }
}
