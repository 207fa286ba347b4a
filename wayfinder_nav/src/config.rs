// Data-driven pathing configuration.
//
// Every tunable number the engine reads lives in `PathingConfig`, loaded from
// JSON (or built with `PathingConfig::default()`, which carries the tuned
// values). Algorithm code never embeds magic numbers; it reads from one of
// the nested groups:
//
// - `SearchConfig`:       A* loop limits, timeouts, coefficients, seed.
// - `HeuristicConfig`:    per-block weights the goal heuristics multiply by.
// - `MovementCostConfig`: what the reference cost catalog allows and charges.
// - `ExecutorConfig`:     divergence and watchdog thresholds.
//
// Every struct is `#[serde(default)]`, so a JSON document only needs the
// fields it overrides. `from_json` validates after parsing.
//
// See also: `search.rs` and `executor.rs` which read these values,
// `goal.rs` for how `HeuristicConfig` shapes the heuristics, `movement.rs`
// for the catalog driven by `MovementCostConfig`.
//
// **Critical constraint: determinism.** Given the same config (including
// `search.seed`) and the same world, a search that ends by exhaustion or by
// reaching the goal produces the same path every time.

use crate::costs::{fall_n_blocks_cost, jump_one_block_cost};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Controls the A* loop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Weighting coefficients for best-so-far tracking, tightest first. Each
    /// coefficient `c` tracks the node minimising `h + g / c`.
    pub coefficients: Vec<f64>,
    /// A partial path is only worth returning if its end lies more than this
    /// many blocks from the start.
    pub min_dist_path: f64,
    /// Smallest cost improvement that triggers re-propagation of a node.
    pub min_improvement: f64,
    /// When false, any strict improvement re-propagates.
    pub use_min_improvement: bool,
    /// Give up after this many candidate destinations turned out unloaded.
    pub max_unloaded_hits: u32,
    /// Hard cap on expanded nodes. `None` means unbounded.
    pub max_nodes: Option<usize>,
    /// Read the clock once every this many expansions.
    pub time_check_interval: u32,
    /// Once some best-so-far node lies beyond `min_dist_path`, the search
    /// stops after this long. Read by `search_with_config`.
    pub primary_timeout_ms: u64,
    /// Absolute limit, used while no best-so-far node is far enough to be
    /// useful.
    pub failure_timeout_ms: u64,
    /// Partial paths from a coefficient this loose or looser log a warning.
    pub poor_coefficient_threshold: f64,
    /// Sleep this long after every expansion (visual debugging only).
    pub slow_path_delay_ms: Option<u64>,
    /// Seed for the per-search neighbor shuffle.
    pub seed: u64,
    /// Pre-size the node store's hash map.
    pub initial_node_capacity: usize,
    /// Partial (soft-failure) paths keep this fraction of their positions.
    pub path_cutoff_factor: f64,
    /// ...but never fewer than this many positions.
    pub path_cutoff_minimum_length: usize,
}

impl SearchConfig {
    pub fn primary_timeout(&self) -> Duration {
        Duration::from_millis(self.primary_timeout_ms)
    }

    pub fn failure_timeout(&self) -> Duration {
        Duration::from_millis(self.failure_timeout_ms)
    }

    pub fn slow_path_delay(&self) -> Option<Duration> {
        self.slow_path_delay_ms.map(Duration::from_millis)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            coefficients: vec![1.5, 2.0, 2.5, 3.0, 4.0, 5.0, 10.0],
            min_dist_path: 5.0,
            min_improvement: 0.01,
            use_min_improvement: true,
            max_unloaded_hits: 50,
            max_nodes: None,
            time_check_interval: 64,
            primary_timeout_ms: 500,
            failure_timeout_ms: 2000,
            poor_coefficient_threshold: 3.0,
            slow_path_delay_ms: None,
            seed: 0x5741_5946_494e_4452,
            initial_node_capacity: 1024,
            path_cutoff_factor: 0.9,
            path_cutoff_minimum_length: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// Heuristic weights
// ---------------------------------------------------------------------------

/// Per-block weights the goal heuristics are built from.
///
/// The defaults keep every non-flee heuristic admissible against the
/// reference cost catalog for targets within `y_blend_min` blocks: each
/// weight is at most the cheapest way the catalog can cover that block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    /// Cost per block of horizontal travel.
    pub cost_heuristic: f64,
    /// Cost per block of climbing.
    pub ascend_cost_per_block: f64,
    /// Cost per block of descending.
    pub descend_cost_per_block: f64,
    /// Cost per block toward a `YLevel` target from below.
    pub y_level_up_cost: f64,
    /// Cost per block toward a `YLevel` target from above.
    pub y_level_down_cost: f64,
    /// Below this horizontal distance the vertical term counts fully.
    pub y_blend_min: f64,
    /// At and beyond this horizontal distance the vertical term is replaced by
    /// `far_vertical_baseline`.
    pub y_blend_max: f64,
    /// Vertical estimate used for far-away targets. Not a lower bound.
    pub far_vertical_baseline: f64,
    /// `RunAway` with `maintain_y` scales the flee term by this...
    pub run_away_xz_weight: f64,
    /// ...and the distance to the held Y level by this.
    pub run_away_y_weight: f64,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            cost_heuristic: 3.563,
            ascend_cost_per_block: jump_one_block_cost(),
            descend_cost_per_block: fall_n_blocks_cost(3) / 3.0,
            y_level_up_cost: jump_one_block_cost(),
            y_level_down_cost: fall_n_blocks_cost(3) / 3.0,
            y_blend_min: 20.0,
            y_blend_max: 150.0,
            far_vertical_baseline: (20.0 + fall_n_blocks_cost(1)) * 32.0,
            run_away_xz_weight: 0.6,
            run_away_y_weight: 1.5,
        }
    }
}

// ---------------------------------------------------------------------------
// Movement costs
// ---------------------------------------------------------------------------

/// What the reference cost catalog permits, and what it charges for
/// world-altering actions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementCostConfig {
    /// Ticks to break one solid voxel. `None` disables breaking entirely.
    pub break_block_cost: Option<f64>,
    /// Ticks to place one voxel. `None` disables placing entirely.
    pub place_block_cost: Option<f64>,
    /// Longest drop a single `Descend` transition may take.
    pub max_fall_height: u32,
    pub allow_diagonal: bool,
    pub allow_pillar: bool,
    /// Multiplier applied to every transition in liquid.
    pub liquid_penalty: f64,
}

impl Default for MovementCostConfig {
    fn default() -> Self {
        Self {
            break_block_cost: Some(8.0),
            place_block_cost: Some(20.0),
            max_fall_height: 3,
            allow_diagonal: true,
            allow_pillar: true,
            liquid_penalty: 1.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Thresholds for the tick-driven path executor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Distance (blocks) from the closest path position that counts as
    /// "off path".
    pub max_dist_from_path: f64,
    /// Consecutive off-path ticks tolerated before failing.
    pub max_ticks_away: u32,
    /// Slack (ticks) on top of a transition's cost estimate before it is
    /// declared stuck.
    pub stuck_margin_ticks: f64,
    /// How far back and ahead to look for the agent when it is not where the
    /// current index expects.
    pub skip_window: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_dist_from_path: 2.0,
            max_ticks_away: 200,
            stuck_margin_ticks: 100.0,
            skip_window: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// Top level
// ---------------------------------------------------------------------------

/// All tunable pathing parameters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathingConfig {
    pub search: SearchConfig,
    pub heuristic: HeuristicConfig,
    pub movement: MovementCostConfig,
    pub executor: ExecutorConfig,
}

impl PathingConfig {
    /// Parse and validate a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.search;
        if s.coefficients.is_empty() {
            return Err(ConfigError::invalid(
                "search.coefficients",
                "must not be empty",
            ));
        }
        if s.coefficients.iter().any(|&c| !(c.is_finite() && c > 0.0)) {
            return Err(ConfigError::invalid(
                "search.coefficients",
                "every coefficient must be finite and positive",
            ));
        }
        if !(s.min_dist_path.is_finite() && s.min_dist_path >= 0.0) {
            return Err(ConfigError::invalid("search.min_dist_path", "must be >= 0"));
        }
        if !(s.min_improvement.is_finite() && s.min_improvement >= 0.0) {
            return Err(ConfigError::invalid(
                "search.min_improvement",
                "must be >= 0",
            ));
        }
        if s.time_check_interval == 0 {
            return Err(ConfigError::invalid(
                "search.time_check_interval",
                "must be >= 1",
            ));
        }
        if s.poor_coefficient_threshold.is_nan() || s.poor_coefficient_threshold <= 0.0 {
            return Err(ConfigError::invalid(
                "search.poor_coefficient_threshold",
                "must be positive",
            ));
        }
        if !(s.path_cutoff_factor > 0.0 && s.path_cutoff_factor <= 1.0) {
            return Err(ConfigError::invalid(
                "search.path_cutoff_factor",
                "must be in (0, 1]",
            ));
        }

        let h = &self.heuristic;
        for (field, value) in [
            ("heuristic.cost_heuristic", h.cost_heuristic),
            ("heuristic.ascend_cost_per_block", h.ascend_cost_per_block),
            ("heuristic.descend_cost_per_block", h.descend_cost_per_block),
            ("heuristic.y_level_up_cost", h.y_level_up_cost),
            ("heuristic.y_level_down_cost", h.y_level_down_cost),
            ("heuristic.far_vertical_baseline", h.far_vertical_baseline),
            ("heuristic.run_away_xz_weight", h.run_away_xz_weight),
            ("heuristic.run_away_y_weight", h.run_away_y_weight),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::invalid(field, "must be finite and >= 0"));
            }
        }
        if !(h.y_blend_min >= 0.0 && h.y_blend_min < h.y_blend_max) {
            return Err(ConfigError::invalid(
                "heuristic.y_blend_min",
                "must be >= 0 and less than y_blend_max",
            ));
        }

        let m = &self.movement;
        for (field, value) in [
            ("movement.break_block_cost", m.break_block_cost),
            ("movement.place_block_cost", m.place_block_cost),
        ] {
            if value.is_some_and(|v| !(v.is_finite() && v > 0.0)) {
                return Err(ConfigError::invalid(field, "must be finite and positive"));
            }
        }
        if m.max_fall_height == 0 {
            return Err(ConfigError::invalid(
                "movement.max_fall_height",
                "must be >= 1",
            ));
        }
        if !(m.liquid_penalty.is_finite() && m.liquid_penalty >= 1.0) {
            return Err(ConfigError::invalid(
                "movement.liquid_penalty",
                "must be >= 1",
            ));
        }

        let e = &self.executor;
        if !(e.max_dist_from_path.is_finite() && e.max_dist_from_path >= 0.0) {
            return Err(ConfigError::invalid(
                "executor.max_dist_from_path",
                "must be >= 0",
            ));
        }
        if !(e.stuck_margin_ticks.is_finite() && e.stuck_margin_ticks >= 0.0) {
            return Err(ConfigError::invalid(
                "executor.stuck_margin_ticks",
                "must be >= 0",
            ));
        }
        if e.skip_window < 2 {
            return Err(ConfigError::invalid("executor.skip_window", "must be >= 2"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        PathingConfig::default().validate().unwrap();
    }

    #[test]
    fn config_roundtrip() {
        let config = PathingConfig::default();
        let json = config.to_json_pretty().unwrap();
        let restored = PathingConfig::from_json(&json).unwrap();
        assert_eq!(config, restored);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let json = r#"{
            "search": { "primary_timeout_ms": 4000, "seed": 7 },
            "movement": { "break_block_cost": null }
        }"#;
        let config = PathingConfig::from_json(json).unwrap();
        assert_eq!(config.search.primary_timeout_ms, 4000);
        assert_eq!(config.search.seed, 7);
        assert_eq!(config.search.failure_timeout_ms, 2000);
        assert_eq!(config.search.coefficients.len(), 7);
        assert_eq!(config.movement.break_block_cost, None);
        assert_eq!(config.movement.place_block_cost, Some(20.0));
        assert_eq!(config.executor, ExecutorConfig::default());
    }

    #[test]
    fn empty_object_is_default() {
        let config = PathingConfig::from_json("{}").unwrap();
        assert_eq!(config, PathingConfig::default());
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = PathingConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_empty_coefficients() {
        let json = r#"{"search": {"coefficients": []}}"#;
        let err = PathingConfig::from_json(json).unwrap_err();
        match err {
            ConfigError::Invalid { field, .. } => assert_eq!(field, "search.coefficients"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_zero_fall_height_and_bad_cutoff() {
        let mut config = PathingConfig::default();
        config.movement.max_fall_height = 0;
        assert!(config.validate().is_err());

        let mut config = PathingConfig::default();
        config.search.path_cutoff_factor = 1.5;
        assert!(config.validate().is_err());

        let mut config = PathingConfig::default();
        config.movement.place_block_cost = Some(-1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn tuning_weights_come_from_json() {
        let json = r#"{
            "search": { "poor_coefficient_threshold": 5.0 },
            "heuristic": { "run_away_xz_weight": 1.0, "run_away_y_weight": 4.0 }
        }"#;
        let config = PathingConfig::from_json(json).unwrap();
        assert_eq!(config.search.poor_coefficient_threshold, 5.0);
        assert_eq!(config.heuristic.run_away_xz_weight, 1.0);
        assert_eq!(config.heuristic.run_away_y_weight, 4.0);
        assert_eq!(config.heuristic.cost_heuristic, 3.563);

        let mut config = PathingConfig::default();
        config.heuristic.run_away_y_weight = -1.0;
        assert!(config.validate().is_err());

        let mut config = PathingConfig::default();
        config.search.poor_coefficient_threshold = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn timeouts_convert_to_durations() {
        let s = SearchConfig::default();
        assert_eq!(s.primary_timeout(), Duration::from_millis(500));
        assert_eq!(s.failure_timeout(), Duration::from_millis(2000));
        assert_eq!(s.slow_path_delay(), None);
    }

    #[test]
    fn default_weights_do_not_exceed_cheapest_moves() {
        let h = HeuristicConfig::default();
        assert!(h.ascend_cost_per_block <= jump_one_block_cost() + 1e-12);
        assert!(h.descend_cost_per_block <= fall_n_blocks_cost(1));
        assert!(h.cost_heuristic < crate::costs::WALK_ONE_BLOCK_COST);
    }
}
