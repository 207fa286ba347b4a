// Movement cost constants, measured in game ticks (20 ticks per second).
//
// Every cost the engine compares (transition costs from the catalog, goal
// heuristics, executor watchdog budgets) is expressed in this one unit, so a
// heuristic of 10.0 means "at least ten ticks of movement remain".
//
// Fall times are derived from simple drag-and-gravity integration
// (`velocity(t) = 3.92 * (1 - 0.98^t)` blocks per tick) and tabulated once on
// first use.
//
// See also: `movement.rs` for the reference cost catalog built from these
// numbers, `config.rs` for the tunable multipliers layered on top,
// `goal.rs` for the heuristic weights derived from them.

use std::sync::LazyLock;

/// Sentinel for "this transition is impossible".
///
/// Finite, so it can be summed with other costs. Test with `cost >= COST_INF`.
pub const COST_INF: f64 = 1_000_000.0;

pub const WALK_ONE_BLOCK_COST: f64 = 20.0 / 4.317;
pub const WALK_ONE_IN_LIQUID_COST: f64 = 20.0 / 2.2;
pub const SNEAK_ONE_BLOCK_COST: f64 = 20.0 / 1.3;
/// Swimming straight up one block.
pub const SWIM_UP_ONE_COST: f64 = 20.0 / 2.35;

/// Walking 0.5 to the edge and 0.3 past it before the fall starts.
pub const WALK_OFF_BLOCK_COST: f64 = WALK_ONE_BLOCK_COST * 0.8;
/// Walking the rest of the way to the center of the landing block.
pub const CENTER_AFTER_FALL_COST: f64 = WALK_ONE_BLOCK_COST - WALK_OFF_BLOCK_COST;

/// Longest fall the table covers. Longer falls clamp to the last entry.
pub const MAX_TABULATED_FALL: usize = 256;

static FALL_N_BLOCKS_COST: LazyLock<Vec<f64>> = LazyLock::new(|| {
    (0..=MAX_TABULATED_FALL)
        .map(|n| distance_to_ticks(n as f64))
        .collect()
});

/// Ticks needed to free-fall `n` blocks.
pub fn fall_n_blocks_cost(n: u32) -> f64 {
    FALL_N_BLOCKS_COST[(n as usize).min(MAX_TABULATED_FALL)]
}

/// Ticks to jump up one block.
///
/// A jump peaks 1.25 blocks up; by symmetry of the parabola the climb from
/// 1.0 to 1.25 takes as long as the fall back from 1.25 to 1.0, so the
/// useful part of the jump costs `fall(1.25) - fall(0.25)`.
pub fn jump_one_block_cost() -> f64 {
    static JUMP: LazyLock<f64> =
        LazyLock::new(|| distance_to_ticks(1.25) - distance_to_ticks(0.25));
    *JUMP
}

/// Fall distance covered during tick `ticks` (blocks).
fn velocity(ticks: u32) -> f64 {
    (0.98f64.powi(ticks as i32) - 1.0) * -3.92
}

/// Fractional ticks to fall `distance` blocks from rest.
fn distance_to_ticks(distance: f64) -> f64 {
    if distance == 0.0 {
        return 0.0;
    }
    let mut remaining = distance;
    let mut tick = 0u32;
    loop {
        let fall = velocity(tick);
        if remaining <= fall {
            return tick as f64 + remaining / fall;
        }
        remaining -= fall;
        tick += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fall_table_is_monotonic() {
        for n in 1..64 {
            assert!(fall_n_blocks_cost(n) > fall_n_blocks_cost(n - 1));
        }
        assert_eq!(fall_n_blocks_cost(0), 0.0);
    }

    #[test]
    fn fall_cost_per_block_shrinks_with_height() {
        // Terminal-velocity effect: longer falls are cheaper per block.
        let per_block_1 = fall_n_blocks_cost(1);
        let per_block_3 = fall_n_blocks_cost(3) / 3.0;
        assert!(per_block_3 < per_block_1);
    }

    #[test]
    fn known_values() {
        assert!((WALK_ONE_BLOCK_COST - 4.6328).abs() < 1e-3);
        assert!((fall_n_blocks_cost(1) - 5.6147).abs() < 1e-3);
        assert!((jump_one_block_cost() - 3.1634).abs() < 1e-3);
    }

    #[test]
    fn huge_falls_clamp() {
        assert_eq!(fall_n_blocks_cost(10_000), fall_n_blocks_cost(256));
    }

    #[test]
    fn walk_off_and_center_sum_to_walk() {
        let split = WALK_OFF_BLOCK_COST + CENTER_AFTER_FALL_COST;
        assert!((split - WALK_ONE_BLOCK_COST).abs() < 1e-12);
    }
}
