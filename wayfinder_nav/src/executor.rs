// Tick-driven path following.
//
// `PathExecutor` walks an agent along one `Path`, one game tick per call to
// `tick()`. It never plans: when the plan stops making sense it fails, and
// the caller replaces the executor wholesale after a new search.
//
// Each tick, in order:
// 1. Terminal states are sticky and returned as-is.
// 2. Standing on the final position means success.
// 3. If the agent is not where the current index expects and is standing on
//    something, look for it a few positions back (it was knocked back) or
//    ahead (it moved faster than planned) and jump the index there.
// 4. Off-path watchdog: too many consecutive ticks farther than
//    `max_dist_from_path` from every path position fails the path.
// 5. The current transition is re-costed against the live world; if it has
//    become infeasible the path fails.
// 6. The motor drives one tick of the transition. Success advances the
//    index; an in-progress transition that overruns its first cost estimate
//    by `stuck_margin_ticks` is declared stuck.
//
// See also: `path.rs` for the path being followed, `movement.rs` for the
// catalog used to re-cost transitions, `config.rs` for `ExecutorConfig`.

use crate::config::ExecutorConfig;
use crate::costs::COST_INF;
use crate::movement::{CostCatalog, Transition};
use crate::path::Path;
use crate::types::{Position, VoxelClass};
use crate::world::VoxelSource;
use log::{debug, info, warn};

// ---------------------------------------------------------------------------
// Motor interface
// ---------------------------------------------------------------------------

/// What the low-level controller reports after one tick of a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MotorStatus {
    /// The transition is complete; the agent is at its destination.
    Success,
    /// The transition cannot be performed from here.
    Unreachable,
    /// The transition was attempted and failed.
    Failed,
    InProgress,
}

/// Low-level movement control: turns one transition into inputs.
pub trait MotorController {
    fn drive_one_tick(&mut self, transition: &Transition) -> MotorStatus;

    /// Abandon whatever transition is in progress.
    fn cancel(&mut self);
}

impl<T: MotorController + ?Sized> MotorController for &mut T {
    fn drive_one_tick(&mut self, transition: &Transition) -> MotorStatus {
        (**self).drive_one_tick(transition)
    }

    fn cancel(&mut self) {
        (**self).cancel()
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureReason {
    /// Off the path for more than `max_ticks_away` consecutive ticks.
    TooFarFromPath,
    /// The live catalog now prices the current transition as impossible.
    TransitionInfeasible,
    MotorUnreachable,
    MotorFailed,
    /// The current transition overran its cost estimate.
    Stuck,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutorState {
    Following,
    Succeeded,
    Failed(FailureReason),
    Cancelled,
}

#[derive(Clone, Debug)]
pub struct PathExecutor {
    path: Path,
    config: ExecutorConfig,
    /// Index of the position the agent should be at; the transition being
    /// driven is `transitions()[index]`.
    index: usize,
    state: ExecutorState,
    ticks_away: u32,
    ticks_on_current: u32,
    /// First cost seen for the current transition.
    current_estimate: Option<f64>,
}

impl PathExecutor {
    /// Start following `path` from its first position.
    pub fn new(path: Path, config: ExecutorConfig) -> Self {
        Self {
            path,
            config,
            index: 0,
            state: ExecutorState::Following,
            ticks_away: 0,
            ticks_on_current: 0,
            current_estimate: None,
        }
    }

    pub fn current_path(&self) -> &Path {
        &self.path
    }

    /// Index into `positions()` of where the agent should be now.
    pub fn position_index(&self) -> usize {
        self.index
    }

    /// State after the most recent `tick` or `cancel`.
    pub fn state(&self) -> ExecutorState {
        self.state
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self.state {
            ExecutorState::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn has_failed(&self) -> bool {
        self.failure_reason().is_some()
    }

    /// Succeeded, failed or cancelled.
    pub fn is_finished(&self) -> bool {
        self.state != ExecutorState::Following
    }

    /// Planned ticks left from the current index.
    pub fn ticks_remaining(&self) -> f64 {
        self.path.cost_remaining_from(self.index)
    }

    /// Stop following. No effect once finished.
    pub fn cancel(&mut self, motor: &mut impl MotorController) {
        if self.state == ExecutorState::Following {
            motor.cancel();
            self.state = ExecutorState::Cancelled;
        }
    }

    fn fail(&mut self, reason: FailureReason, motor: &mut impl MotorController) -> ExecutorState {
        motor.cancel();
        warn!(
            "path to {} failed at index {} of {}: {reason:?}",
            self.path.destination(),
            self.index,
            self.path.len()
        );
        self.state = ExecutorState::Failed(reason);
        self.state
    }

    fn reset_transition(&mut self) {
        self.ticks_on_current = 0;
        self.current_estimate = None;
    }

    /// Advance the executor by one game tick.
    pub fn tick(
        &mut self,
        agent: Position,
        world: &impl VoxelSource,
        catalog: &impl CostCatalog,
        motor: &mut impl MotorController,
    ) -> ExecutorState {
        if self.state != ExecutorState::Following {
            return self.state;
        }
        let last = self.path.len() - 1;
        if self.index >= last {
            if agent == self.path.destination() {
                self.state = ExecutorState::Succeeded;
                return self.state;
            }
            // Nothing left to drive toward.
            return self.fail(FailureReason::TooFarFromPath, motor);
        }

        let expected = self.path.positions()[self.index];
        if agent != expected && world.classify(agent.down(1)) != VoxelClass::Air {
            if let Some(found) = self.find_nearby(agent) {
                let from = self.index;
                self.index = found.saturating_sub(1);
                debug!(
                    "agent at {agent}: skipping from index {from} to {}",
                    self.index
                );
                motor.cancel();
                self.reset_transition();
                self.ticks_away = 0;
                return self.state;
            }
        }

        let (distance, _) = self.path.closest_position(agent);
        if distance > self.config.max_dist_from_path {
            self.ticks_away += 1;
            if self.ticks_away > self.config.max_ticks_away {
                return self.fail(FailureReason::TooFarFromPath, motor);
            }
        } else {
            self.ticks_away = 0;
        }

        let transition = self.path.transitions()[self.index];
        let cost = catalog.cost(&transition);
        if cost.is_nan() || cost < 0.0 || cost >= COST_INF {
            return self.fail(FailureReason::TransitionInfeasible, motor);
        }
        let estimate = *self.current_estimate.get_or_insert(cost);

        match motor.drive_one_tick(&transition) {
            MotorStatus::Success => {
                self.index += 1;
                self.reset_transition();
                if self.index == last {
                    info!("arrived at {}", self.path.destination());
                    self.state = ExecutorState::Succeeded;
                }
            }
            MotorStatus::Unreachable => return self.fail(FailureReason::MotorUnreachable, motor),
            MotorStatus::Failed => return self.fail(FailureReason::MotorFailed, motor),
            MotorStatus::InProgress => {
                self.ticks_on_current += 1;
                if self.ticks_on_current as f64 > estimate + self.config.stuck_margin_ticks {
                    return self.fail(FailureReason::Stuck, motor);
                }
            }
        }
        self.state
    }

    /// Index of the agent's position within the skip window, excluding the
    /// positions next to the current one (the motor reports those itself).
    fn find_nearby(&self, agent: Position) -> Option<usize> {
        let positions = self.path.positions();
        let window = self.config.skip_window;
        let back = self.index.saturating_sub(window)..self.index.saturating_sub(2);
        let ahead_end = (self.index + window).min(positions.len() - 1);
        let ahead = (self.index + 2)..=ahead_end;
        back.chain(ahead).find(|&i| positions[i] == agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::Goal;
    use crate::movement::TransitionKind;
    use crate::world::VoxelWorld;

    fn p(x: i32, y: i32, z: i32) -> Position {
        Position::new(x, y, z)
    }

    /// Straight path along +x at y = 1, `n` positions.
    fn straight(n: i32) -> Path {
        let positions: Vec<Position> = (0..n).map(|x| p(x, 1, 0)).collect();
        let transitions: Vec<Transition> = positions
            .windows(2)
            .map(|w| Transition::new(w[0], w[1], TransitionKind::Traverse))
            .collect();
        let costs = vec![5.0; transitions.len()];
        let dest = *positions.last().unwrap();
        Path::new(
            positions[0],
            dest,
            positions,
            transitions,
            costs,
            Goal::Block(dest),
            0,
        )
        .unwrap()
    }

    fn floor() -> VoxelWorld {
        let mut world = VoxelWorld::new(p(-5, 0, -5), 30, 4, 10);
        world.fill(p(-5, 0, -5), p(24, 0, 4), VoxelClass::Solid);
        world
    }

    /// Catalog with a fixed price for everything.
    struct Flat(f64);

    impl CostCatalog for Flat {
        fn cost(&self, _: &Transition) -> f64 {
            self.0
        }
    }

    /// Motor that replays a scripted status forever and counts cancels.
    struct Scripted {
        status: MotorStatus,
        driven: Vec<Transition>,
        cancels: u32,
    }

    impl Scripted {
        fn new(status: MotorStatus) -> Self {
            Self {
                status,
                driven: Vec::new(),
                cancels: 0,
            }
        }
    }

    impl MotorController for Scripted {
        fn drive_one_tick(&mut self, transition: &Transition) -> MotorStatus {
            self.driven.push(*transition);
            self.status
        }

        fn cancel(&mut self) {
            self.cancels += 1;
        }
    }

    #[test]
    fn follows_to_success() {
        let world = floor();
        let path = straight(4);
        let mut exec = PathExecutor::new(path.clone(), ExecutorConfig::default());
        let mut motor = Scripted::new(MotorStatus::Success);
        for i in 0..3 {
            assert_eq!(exec.position_index(), i);
            let state = exec.tick(path.positions()[i], &world, &Flat(5.0), &mut motor);
            if i < 2 {
                assert_eq!(state, ExecutorState::Following);
            } else {
                assert_eq!(state, ExecutorState::Succeeded);
            }
        }
        assert!(exec.is_finished());
        assert!(!exec.has_failed());
        assert_eq!(exec.ticks_remaining(), 0.0);
        assert_eq!(motor.driven, path.transitions().to_vec());
        // Sticky.
        assert_eq!(
            exec.tick(p(99, 1, 0), &world, &Flat(5.0), &mut motor),
            ExecutorState::Succeeded
        );
    }

    #[test]
    fn single_position_path_succeeds_in_place() {
        let world = floor();
        let path = Path::new(
            p(0, 1, 0),
            p(0, 1, 0),
            vec![p(0, 1, 0)],
            vec![],
            vec![],
            Goal::Block(p(0, 1, 0)),
            0,
        )
        .unwrap();
        let mut exec = PathExecutor::new(path, ExecutorConfig::default());
        let mut motor = Scripted::new(MotorStatus::InProgress);
        assert_eq!(
            exec.tick(p(0, 1, 0), &world, &Flat(1.0), &mut motor),
            ExecutorState::Succeeded
        );
    }

    #[test]
    fn motor_failures_map_to_reasons() {
        let world = floor();
        for (status, reason) in [
            (MotorStatus::Unreachable, FailureReason::MotorUnreachable),
            (MotorStatus::Failed, FailureReason::MotorFailed),
        ] {
            let mut exec = PathExecutor::new(straight(4), ExecutorConfig::default());
            let mut motor = Scripted::new(status);
            let state = exec.tick(p(0, 1, 0), &world, &Flat(5.0), &mut motor);
            assert_eq!(state, ExecutorState::Failed(reason));
            assert_eq!(exec.failure_reason(), Some(reason));
        }
    }

    #[test]
    fn infeasible_transition_fails_without_driving() {
        let world = floor();
        let mut exec = PathExecutor::new(straight(4), ExecutorConfig::default());
        let mut motor = Scripted::new(MotorStatus::InProgress);
        let state = exec.tick(p(0, 1, 0), &world, &Flat(COST_INF), &mut motor);
        assert_eq!(
            state,
            ExecutorState::Failed(FailureReason::TransitionInfeasible)
        );
        assert!(motor.driven.is_empty());
        assert_eq!(motor.cancels, 1);
    }

    #[test]
    fn free_transitions_are_followed() {
        let world = floor();
        let path = straight(3);
        let mut exec = PathExecutor::new(path.clone(), ExecutorConfig::default());
        let mut motor = Scripted::new(MotorStatus::Success);
        exec.tick(path.positions()[0], &world, &Flat(0.0), &mut motor);
        let state = exec.tick(path.positions()[1], &world, &Flat(0.0), &mut motor);
        assert_eq!(state, ExecutorState::Succeeded);

        let mut exec = PathExecutor::new(path, ExecutorConfig::default());
        exec.tick(p(0, 1, 0), &world, &Flat(-1.0), &mut motor);
        let infeasible = Some(FailureReason::TransitionInfeasible);
        assert_eq!(exec.failure_reason(), infeasible);
    }

    #[test]
    fn stuck_after_estimate_plus_margin() {
        let world = floor();
        let config = ExecutorConfig {
            stuck_margin_ticks: 10.0,
            ..ExecutorConfig::default()
        };
        let mut exec = PathExecutor::new(straight(4), config);
        let mut motor = Scripted::new(MotorStatus::InProgress);
        // Estimate 5 + margin 10: tick 15 is still fine, tick 16 is stuck.
        for _ in 0..15 {
            assert_eq!(
                exec.tick(p(0, 1, 0), &world, &Flat(5.0), &mut motor),
                ExecutorState::Following
            );
        }
        assert_eq!(
            exec.tick(p(0, 1, 0), &world, &Flat(5.0), &mut motor),
            ExecutorState::Failed(FailureReason::Stuck)
        );
    }

    #[test]
    fn stuck_estimate_is_the_first_cost_seen() {
        let world = floor();
        let config = ExecutorConfig {
            stuck_margin_ticks: 0.0,
            ..ExecutorConfig::default()
        };
        let mut exec = PathExecutor::new(straight(4), config);
        let mut motor = Scripted::new(MotorStatus::InProgress);
        for _ in 0..3 {
            exec.tick(p(0, 1, 0), &world, &Flat(3.0), &mut motor);
        }
        // A later, higher price does not extend the budget.
        assert_eq!(
            exec.tick(p(0, 1, 0), &world, &Flat(50.0), &mut motor),
            ExecutorState::Failed(FailureReason::Stuck)
        );
    }

    #[test]
    fn too_far_from_path() {
        let world = floor();
        let config = ExecutorConfig {
            max_ticks_away: 3,
            ..ExecutorConfig::default()
        };
        let mut exec = PathExecutor::new(straight(4), config);
        let mut motor = Scripted::new(MotorStatus::InProgress);
        let away = p(1, 1, 4);
        for _ in 0..3 {
            assert_eq!(
                exec.tick(away, &world, &Flat(5.0), &mut motor),
                ExecutorState::Following
            );
        }
        assert_eq!(
            exec.tick(away, &world, &Flat(5.0), &mut motor),
            ExecutorState::Failed(FailureReason::TooFarFromPath)
        );
    }

    #[test]
    fn returning_to_path_resets_away_counter() {
        let world = floor();
        let config = ExecutorConfig {
            max_ticks_away: 2,
            ..ExecutorConfig::default()
        };
        let mut exec = PathExecutor::new(straight(4), config);
        let mut motor = Scripted::new(MotorStatus::InProgress);
        for _ in 0..5 {
            exec.tick(p(1, 1, 4), &world, &Flat(5.0), &mut motor);
            exec.tick(p(1, 1, 4), &world, &Flat(5.0), &mut motor);
            assert_eq!(
                exec.tick(p(0, 1, 0), &world, &Flat(5.0), &mut motor),
                ExecutorState::Following
            );
        }
    }

    #[test]
    fn skips_back_when_knocked_back() {
        let world = floor();
        let path = straight(10);
        let mut exec = PathExecutor::new(path.clone(), ExecutorConfig::default());
        let mut motor = Scripted::new(MotorStatus::Success);
        for i in 0..6 {
            exec.tick(path.positions()[i], &world, &Flat(5.0), &mut motor);
        }
        assert_eq!(exec.position_index(), 6);
        let cancels = motor.cancels;
        let state = exec.tick(path.positions()[2], &world, &Flat(5.0), &mut motor);
        assert_eq!(state, ExecutorState::Following);
        assert_eq!(exec.position_index(), 1);
        assert_eq!(motor.cancels, cancels + 1);
    }

    #[test]
    fn no_skip_while_airborne() {
        let mut world = floor();
        world.set(p(3, 0, 0), VoxelClass::Air);
        let path = straight(6);
        let mut exec = PathExecutor::new(path, ExecutorConfig::default());
        let mut motor = Scripted::new(MotorStatus::InProgress);
        exec.tick(p(3, 1, 0), &world, &Flat(5.0), &mut motor);
        assert_eq!(exec.position_index(), 0);
    }

    #[test]
    fn cancel_is_terminal() {
        let world = floor();
        let mut exec = PathExecutor::new(straight(4), ExecutorConfig::default());
        let mut motor = Scripted::new(MotorStatus::InProgress);
        exec.cancel(&mut motor);
        assert_eq!(exec.state(), ExecutorState::Cancelled);
        assert_eq!(motor.cancels, 1);
        assert_eq!(
            exec.tick(p(0, 1, 0), &world, &Flat(5.0), &mut motor),
            ExecutorState::Cancelled
        );
        assert!(motor.driven.is_empty());
        exec.cancel(&mut motor);
        assert_eq!(motor.cancels, 1);
    }
}
