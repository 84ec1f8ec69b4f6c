//! Agent and game configuration.
//!
//! `GameConfig` is what the environment connector reports (movement duration,
//! parcel decay interval, observation radii).  `AgentConfig` holds every
//! tunable of the execution engine.  The utility constants are empirical and
//! are kept as plain parameters rather than derived values.
//!
//! Both structs deserialize from JSON with every field optional:
//!
//! ```
//! use pd_core::AgentConfig;
//!
//! let cfg = AgentConfig::from_json_str(r#"{ "horizon": 16, "replan_mode": "hard" }"#).unwrap();
//! assert_eq!(cfg.horizon, 16);
//! assert_eq!(cfg.retry_limit, AgentConfig::default().retry_limit);
//! ```

use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

// ── GameConfig ────────────────────────────────────────────────────────────────

/// Static environment parameters exposed by the connector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Wall-clock duration of one atomic move.
    pub movement_ms: u64,

    /// Every `parcel_decay_interval_ms` each parcel loses one point.
    /// `0` means parcels never decay.
    pub parcel_decay_interval_ms: u64,

    /// Manhattan radius within which parcels are sensed.
    pub parcels_observation_distance: u32,

    /// Manhattan radius within which other agents are sensed.
    pub agents_observation_distance: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            movement_ms:                  500,
            parcel_decay_interval_ms:     1_000,
            parcels_observation_distance: 5,
            agents_observation_distance:  5,
        }
    }
}

impl GameConfig {
    /// Moves an agent can make while a parcel loses one point.
    ///
    /// Returns `f32::INFINITY` when parcels never decay.
    pub fn moves_per_decay(&self) -> f32 {
        if self.parcel_decay_interval_ms == 0 {
            return f32::INFINITY;
        }
        self.parcel_decay_interval_ms as f32 / self.movement_ms.max(1) as f32
    }
}

// ── UtilityParams ─────────────────────────────────────────────────────────────

/// Constants of the intention utility functions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UtilityParams {
    /// Multiplier on the projected decay cost of a route.
    pub penalty_rate: f32,

    /// Scale of the residual utility of a parcel a third party is closer to.
    pub contested_factor: f32,

    /// Fixed utility of the explore intention.
    pub explore_utility: f32,

    /// Weight of the newest sample in the planning-latency moving average.
    pub latency_smoothing: f32,

    /// Planning latency assumed before the first planner call is measured.
    pub initial_latency_ms: f32,

    /// How much a rival must beat the running intention by before the
    /// scheduler switches to it.
    pub switch_margin: f32,
}

impl Default for UtilityParams {
    fn default() -> Self {
        Self {
            penalty_rate:       1.0,
            contested_factor:   0.1,
            explore_utility:    0.5,
            latency_smoothing:  0.2,
            initial_latency_ms: 0.0,
            switch_margin:      2.0,
        }
    }
}

// ── ReplanMode ────────────────────────────────────────────────────────────────

/// How the executor refreshes its plan every `replan_every` moves.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplanMode {
    /// Discard the remaining plan and replan from the current position.
    Hard,
    /// Replan only the remaining tail with the time-expanded search.
    #[default]
    Soft,
    /// Never replan proactively.
    Off,
}

// ── AgentConfig ───────────────────────────────────────────────────────────────

/// Tunables of the intention-driven execution engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Forecast horizon `H` (number of predicted frames).
    pub horizon: usize,

    /// Consecutive waits allowed on one tile in the time-expanded search.
    pub max_waits: u32,

    /// Failed attempts of the same step before recovery is invoked.
    pub retry_limit: u32,

    /// Pause between retries of a failed step.
    pub retry_backoff_ms: u64,

    /// Proactive replan every N successful moves (`0` disables).
    pub replan_every: u32,
    pub replan_mode: ReplanMode,

    /// Check the stop flag every N executed steps.
    pub stop_check_every: u32,

    /// Cadence of the stop poll loop while planning.
    pub stop_poll_ms: u64,

    /// Period of the scheduler's revision tick.
    pub revision_ms: u64,

    /// Bound on every cross-agent wait (request/response, hold/release).
    pub negotiation_timeout_ms: u64,

    /// Randomized wait bounds when blocked by an unknown agent.
    pub unknown_wait_min_ms: u64,
    pub unknown_wait_max_ms: u64,

    /// Maximum length of a detour around an unknown agent.
    pub detour_max_len: usize,

    /// How long a responder stays aside during `moveOut` before returning.
    pub move_out_hold_ms: u64,

    /// Revision ticks after which an unseen third-party agent's position
    /// decays to unknown.
    pub unseen_timeout_ticks: u64,

    /// Observed positions kept per believed agent.
    pub history_len: usize,

    /// Global RNG seed.
    pub seed: u64,

    pub utility: UtilityParams,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            horizon:                12,
            max_waits:              2,
            retry_limit:            2,
            retry_backoff_ms:       50,
            replan_every:           5,
            replan_mode:            ReplanMode::Soft,
            stop_check_every:       1,
            stop_poll_ms:           20,
            revision_ms:            100,
            negotiation_timeout_ms: 1_000,
            unknown_wait_min_ms:    100,
            unknown_wait_max_ms:    400,
            detour_max_len:         6,
            move_out_hold_ms:       600,
            unseen_timeout_ticks:   20,
            history_len:            8,
            seed:                   0,
            utility:                UtilityParams::default(),
        }
    }
}

impl AgentConfig {
    /// Parse from JSON; absent fields take their defaults.  The result is
    /// validated.
    pub fn from_json_str(json: &str) -> CoreResult<Self> {
        let cfg: AgentConfig = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.horizon == 0 {
            return Err(CoreError::Config("horizon must be at least 1".into()));
        }
        if self.unknown_wait_min_ms > self.unknown_wait_max_ms {
            return Err(CoreError::Config(format!(
                "unknown_wait_min_ms ({}) exceeds unknown_wait_max_ms ({})",
                self.unknown_wait_min_ms, self.unknown_wait_max_ms
            )));
        }
        if self.revision_ms == 0 || self.stop_poll_ms == 0 {
            return Err(CoreError::Config("timer periods must be non-zero".into()));
        }
        if self.stop_check_every == 0 {
            return Err(CoreError::Config("stop_check_every must be at least 1".into()));
        }
        if self.utility.switch_margin.is_nan() || self.utility.switch_margin < 0.0 {
            return Err(CoreError::Config(format!(
                "switch_margin must be non-negative, got {}",
                self.utility.switch_margin
            )));
        }
        Ok(())
    }
}
