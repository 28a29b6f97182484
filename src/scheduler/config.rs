/*!
 * Simulation Configuration
 * Policy flags and tunables, loadable from JSON and `SIM_*` environment variables
 *
 * Environment variables:
 * - SIM_CONFIG_JSON: path of a JSON file loaded before the overrides below
 * - SIM_SEED: fixed seed for the scheduling generator
 * - SIM_AUTO_ARRIVALS / SIM_AUTO_BLOCKS / SIM_SIMULATE_ZOMBIE / SIM_REPEAT_MODE: flags
 * - SIM_DEPENDENCY_RELEASE: on_progress | on_reply
 * - SIM_FINISHED_TTL: ticks a FINISHED process is kept (unset = forever)
 * - SIM_TICK_INTERVAL_MS: clock interval for the driver
 */

use super::policy::PriorityPolicy;
use crate::core::errors::{SchedulerError, SchedulerResult};
use crate::core::limits::*;
use crate::core::types::Tick;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::str::FromStr;

/// How a dependency wait is satisfied
///
/// Exactly one policy is active per scheduler instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyRelease {
    /// The waiter is released on any tick the awaited process executes
    #[default]
    OnProgress,
    /// The waiter is released only by a reply message from the awaited process
    OnReply,
}

impl FromStr for DependencyRelease {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "on_progress" | "progress" => Ok(Self::OnProgress),
            "on_reply" | "reply" | "mailbox" => Ok(Self::OnReply),
            other => Err(SchedulerError::InvalidConfig(format!(
                "Invalid dependency release '{}'. Valid: on_progress, on_reply",
                other
            ))),
        }
    }
}

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct SimConfig {
    /// Spawn processes on their own during ticks
    pub auto_arrivals: bool,
    /// Let the running process block on I/O at random
    pub auto_blocks: bool,
    /// Completed processes become ZOMBIE until reaped
    pub simulate_zombie: bool,
    /// Completed processes go straight back to READY
    pub repeat_mode: bool,
    /// Revival in repeat mode also brings back zombies
    pub revive_zombies: bool,
    pub dependency_release: DependencyRelease,
    pub arrival_chance: f64,
    pub block_chance: f64,
    pub dependency_injection_chance: f64,
    pub io_ticks: RangeInclusive<u32>,
    pub arrival_burst: RangeInclusive<u32>,
    pub finished_ttl: Option<Tick>,
    pub seed: Option<u64>,
    pub tick_interval_ms: u64,
    pub policy: PriorityPolicy,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            auto_arrivals: false,
            auto_blocks: false,
            simulate_zombie: false,
            repeat_mode: true,
            revive_zombies: true,
            dependency_release: DependencyRelease::default(),
            arrival_chance: DEFAULT_ARRIVAL_CHANCE,
            block_chance: DEFAULT_BLOCK_CHANCE,
            dependency_injection_chance: DEFAULT_DEPENDENCY_INJECTION_CHANCE,
            io_ticks: IO_TICKS,
            arrival_burst: ARRIVAL_BURST,
            finished_ttl: None,
            seed: None,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            policy: PriorityPolicy::default(),
        }
    }
}

impl SimConfig {
    /// Deterministic configuration with every random branch disabled
    pub fn deterministic(seed: u64) -> Self {
        Self {
            repeat_mode: false,
            seed: Some(seed),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: PriorityPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_repeat_mode(mut self, enabled: bool) -> Self {
        self.repeat_mode = enabled;
        self
    }

    #[must_use]
    pub fn with_simulate_zombie(mut self, enabled: bool) -> Self {
        self.simulate_zombie = enabled;
        self
    }

    #[must_use]
    pub fn with_dependency_release(mut self, release: DependencyRelease) -> Self {
        self.dependency_release = release;
        self
    }

    #[must_use]
    pub fn with_finished_ttl(mut self, ttl: Tick) -> Self {
        self.finished_ttl = Some(ttl);
        self
    }

    /// Load from the process environment
    pub fn from_env() -> SchedulerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> SchedulerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup("SIM_CONFIG_JSON") {
            Some(path) => {
                let raw = std::fs::read_to_string(&path).map_err(|e| {
                    SchedulerError::InvalidConfig(format!("cannot read {}: {}", path, e))
                })?;
                Self::from_json(&raw)?
            }
            None => Self::default(),
        };

        if let Some(seed) = parse_var::<u64, _>(&lookup, "SIM_SEED")? {
            config.seed = Some(seed);
        }
        if let Some(flag) = flag_var(&lookup, "SIM_AUTO_ARRIVALS")? {
            config.auto_arrivals = flag;
        }
        if let Some(flag) = flag_var(&lookup, "SIM_AUTO_BLOCKS")? {
            config.auto_blocks = flag;
        }
        if let Some(flag) = flag_var(&lookup, "SIM_SIMULATE_ZOMBIE")? {
            config.simulate_zombie = flag;
        }
        if let Some(flag) = flag_var(&lookup, "SIM_REPEAT_MODE")? {
            config.repeat_mode = flag;
        }
        if let Some(release) = lookup("SIM_DEPENDENCY_RELEASE") {
            config.dependency_release = release.parse()?;
        }
        if let Some(ttl) = parse_var::<Tick, _>(&lookup, "SIM_FINISHED_TTL")? {
            config.finished_ttl = Some(ttl);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "SIM_TICK_INTERVAL_MS")? {
            config.tick_interval_ms = ms;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_json(raw: &str) -> SchedulerResult<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| SchedulerError::InvalidConfig(format!("invalid JSON config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SchedulerResult<()> {
        for (name, chance) in [
            ("arrival_chance", self.arrival_chance),
            ("block_chance", self.block_chance),
            ("dependency_injection_chance", self.dependency_injection_chance),
        ] {
            if !(0.0..=1.0).contains(&chance) {
                return Err(SchedulerError::InvalidConfig(format!(
                    "{} must be within [0, 1], got {}",
                    name, chance
                )));
            }
        }

        for (name, range) in [
            ("io_ticks", &self.io_ticks),
            ("arrival_burst", &self.arrival_burst),
        ] {
            if range.is_empty() || *range.start() == 0 {
                return Err(SchedulerError::InvalidConfig(format!(
                    "{} must be a non-empty range starting at 1 or more, got {:?}",
                    name, range
                )));
            }
        }

        if !(MIN_TICK_INTERVAL_MS..=MAX_TICK_INTERVAL_MS).contains(&self.tick_interval_ms) {
            return Err(SchedulerError::InvalidConfig(format!(
                "tick_interval_ms must be between {} and {}, got {}",
                MIN_TICK_INTERVAL_MS, MAX_TICK_INTERVAL_MS, self.tick_interval_ms
            )));
        }

        self.policy.validate()
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> SchedulerResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| SchedulerError::InvalidConfig(format!("{}={}: {}", key, raw, e))),
        None => Ok(None),
    }
}

fn flag_var<F>(lookup: &F, key: &str) -> SchedulerResult<Option<bool>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).as_deref().map(str::trim) {
        None => Ok(None),
        Some("1") | Some("true") | Some("yes") | Some("on") => Ok(Some(true)),
        Some("0") | Some("false") | Some("no") | Some("off") => Ok(Some(false)),
        Some(other) => Err(SchedulerError::InvalidConfig(format!(
            "{} expects a boolean, got '{}'",
            key, other
        ))),
    }
}
