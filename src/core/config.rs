//! Engine configuration with documented constants
//!
//! All tunable values are collected here with explanations of their purpose
//! and how they interact with each other.

use crate::core::error::{HearthError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the orchestration engine
///
/// Defaults are tuned for a small settlement (a handful of residents) driven
/// by a remote decision service with multi-second latency.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === SPATIAL SYSTEM ===
    /// Size of one grid cell in world units
    ///
    /// The spiral placement search steps outward in cell-size increments,
    /// and grid references address whole cells. Smaller cells give denser
    /// settlements but longer placement searches.
    pub cell_size: f32,

    /// Maximum distance from the rally point the placement search will try
    ///
    /// The spiral search gives up past this radius and the build fails with
    /// a no-space error.
    pub placement_search_max: f32,

    /// Radius of the disc new residents spawn into, centered on the origin
    pub spawn_radius: f32,

    /// How far a resident perceives neighbors (world units)
    pub perception_radius: f32,

    // === MEMORY & EVENTS ===
    /// Hard cap on memories retained per resident
    ///
    /// Insertion beyond the cap prunes the oldest entries by timestamp.
    pub memory_cap: usize,

    /// How many recent memories accompany a turn request
    pub memory_recall: usize,

    /// How many recent events a perception carries as ambient context
    pub ambient_event_count: usize,

    // === SCHEDULER ===
    /// Minimum population ensured before the timers are armed
    pub min_population: usize,

    /// World tick period in milliseconds (one resident turn per tick)
    pub turn_period_ms: u64,

    /// Deliberation tick period in milliseconds
    ///
    /// Typically several world ticks long; the deliberation loop runs on its
    /// own timer and drains the pending-action queue each cycle.
    pub deliberation_period_ms: u64,

    /// Timeout for a single decision-service call in milliseconds
    ///
    /// On expiry the scheduler falls back to the deterministic scripted
    /// policy rather than blocking the next tick.
    pub decision_timeout_ms: u64,

    /// Grace period for in-flight work during shutdown, in milliseconds
    pub shutdown_grace_ms: u64,

    /// Bounded history of deliberation observations
    pub observation_cap: usize,

    /// How many recent speech events the deliberation context carries
    pub conversation_recall: usize,

    // === ACTIONS ===
    /// Maximum distance one gather call moves a resident
    ///
    /// Gather is explicitly incremental: converging on a rally point takes
    /// repeated invocations.
    pub gather_step: f32,

    /// Seed for the spawn-placement RNG, for reproducible worlds
    pub world_seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cell_size: 2.0,
            placement_search_max: 40.0,
            spawn_radius: 24.0,
            perception_radius: 10.0,

            memory_cap: 100,
            memory_recall: 8,
            ambient_event_count: 5,

            min_population: 3,
            turn_period_ms: 15_000,
            deliberation_period_ms: 60_000,
            decision_timeout_ms: 10_000,
            shutdown_grace_ms: 2_000,
            observation_cap: 20,
            conversation_recall: 10,

            gather_step: 5.0,
            world_seed: 7,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turn_period(&self) -> Duration {
        Duration::from_millis(self.turn_period_ms)
    }

    pub fn deliberation_period(&self) -> Duration {
        Duration::from_millis(self.deliberation_period_ms)
    }

    pub fn decision_timeout(&self) -> Duration {
        Duration::from_millis(self.decision_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Load configuration from a TOML file, falling back to defaults for
    /// missing fields.
    pub fn from_toml_file(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)
            .map_err(|e| HearthError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.cell_size <= 0.0 {
            return Err(HearthError::Config("cell_size must be positive".into()));
        }
        if self.memory_cap == 0 {
            return Err(HearthError::Config("memory_cap must be at least 1".into()));
        }
        if self.gather_step <= 0.0 {
            return Err(HearthError::Config("gather_step must be positive".into()));
        }
        if self.decision_timeout_ms == 0 {
            return Err(HearthError::Config(
                "decision_timeout_ms must be positive".into(),
            ));
        }
        // A stalled decision call must never delay the tick beyond one cycle.
        if self.decision_timeout_ms > self.turn_period_ms {
            return Err(HearthError::Config(format!(
                "decision_timeout_ms ({}) should not exceed turn_period_ms ({})",
                self.decision_timeout_ms, self.turn_period_ms
            )));
        }
        if self.placement_search_max < self.cell_size {
            return Err(HearthError::Config(format!(
                "placement_search_max ({}) should be at least one cell ({})",
                self.placement_search_max, self.cell_size
            )));
        }
        Ok(())
    }
}
