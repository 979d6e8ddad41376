//! Configuration types for a Darkmatch node.
//!
//! Every section has defaults from [`constants`], so a config file only
//! needs to name what it overrides.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{DarkmatchError, Result, constants};

/// Full configuration of one node's matching pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub ranker: RankerConfig,
    pub confirmer: ConfirmerConfig,
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

impl NodeConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.ranker.validate()?;
        self.confirmer.validate()?;
        self.engine.validate()
    }
}

/// Position of this node among the cooperating rankers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankerConfig {
    /// Total number of rankers sharing the pair space.
    pub num_rankers: u64,
    /// This node's shard index, `0..num_rankers`.
    pub pos: u64,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            num_rankers: constants::DEFAULT_NUM_RANKERS,
            pos: 0,
        }
    }
}

impl RankerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_rankers == 0 {
            return Err(DarkmatchError::Configuration(
                "ranker.num_rankers must be > 0".into(),
            ));
        }
        if self.pos >= self.num_rankers {
            return Err(DarkmatchError::Configuration(format!(
                "ranker.pos {} out of range for {} rankers",
                self.pos, self.num_rankers
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmerConfig {
    /// Interval between finality polls of the ledger.
    pub poll_interval: Duration,
    /// Ledger depth at which a status is treated as final.
    pub depth_threshold: u64,
    /// Capacity of the confirmed-match output.
    pub buffer: usize,
    /// Capacity of the error output.
    pub error_buffer: usize,
    /// Emitted order IDs remembered for de-duplication.
    pub emitted_cache_size: usize,
}

impl Default for ConfirmerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(constants::DEFAULT_POLL_INTERVAL_MS),
            depth_threshold: constants::DEFAULT_DEPTH_THRESHOLD,
            buffer: constants::DEFAULT_CONFIRMER_BUFFER,
            error_buffer: constants::DEFAULT_ERROR_BUFFER,
            emitted_cache_size: constants::DEFAULT_EMITTED_CACHE_SIZE,
        }
    }
}

impl ConfirmerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(DarkmatchError::Configuration(
                "confirmer.poll_interval must be > 0".into(),
            ));
        }
        if self.buffer == 0 || self.error_buffer == 0 || self.emitted_cache_size == 0 {
            return Err(DarkmatchError::Configuration(
                "confirmer buffers must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Interval between draining the ranker backlog.
    pub compute_interval: Duration,
    /// Maximum computations drained per tick.
    pub compute_batch_size: usize,
    /// Time a single computation may take to resolve before it is abandoned.
    pub resolve_timeout: Duration,
    /// Capacity of the matched-computation queue into the confirmer.
    pub matched_buffer: usize,
    /// Capacity of the engine's error output.
    pub error_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            compute_interval: Duration::from_millis(constants::DEFAULT_COMPUTE_INTERVAL_MS),
            compute_batch_size: constants::DEFAULT_COMPUTE_BATCH_SIZE,
            resolve_timeout: Duration::from_millis(constants::DEFAULT_RESOLVE_TIMEOUT_MS),
            matched_buffer: constants::DEFAULT_MATCHED_BUFFER,
            error_buffer: constants::DEFAULT_ERROR_BUFFER,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.compute_interval.is_zero() || self.resolve_timeout.is_zero() {
            return Err(DarkmatchError::Configuration(
                "engine intervals must be > 0".into(),
            ));
        }
        if self.compute_batch_size == 0 || self.matched_buffer == 0 || self.error_buffer == 0 {
            return Err(DarkmatchError::Configuration(
                "engine buffers must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `"info,darkmatch_matchcore=debug"`.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: constants::DEFAULT_LOG_FILTER.to_string(),
            json: false,
        }
    }
}
