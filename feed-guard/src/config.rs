//! Configuration for validation, pruning and batch runs.
//!
//! Iteration bounds are sanity limits, not tuning knobs: each continuing
//! repair pass deletes at least one row, so the loop terminates on any
//! finite store. A bound that trips indicates a schema whose violations
//! cascade further than expected and is reported as
//! [`FeedError::FixedPointNotReached`].

use crate::core::ValidationMode;
use crate::error::{FeedError, Result};
use crate::logging::LogConfig;

/// Default bound on repair sweeps.
pub const DEFAULT_MAX_PASSES: usize = 64;

/// Default bound on cascade rounds.
pub const DEFAULT_MAX_ROUNDS: usize = 32;

/// Configuration for [`IntegrityValidator`](crate::core::IntegrityValidator).
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Maximum number of sweeps a repair may take, the final clean sweep included
    pub max_passes: usize,
    pub log: LogConfig,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_passes: DEFAULT_MAX_PASSES,
            log: LogConfig::default(),
        }
    }
}

impl ValidatorConfig {
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    pub fn with_log(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_passes == 0 {
            return Err(FeedError::Configuration(
                "max_passes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for [`Pruner`](crate::prune::Pruner).
#[derive(Debug, Clone)]
pub struct PruneConfig {
    /// Maximum number of rounds over the cascade plan, the final quiet round included
    pub max_rounds: usize,
    /// Configuration of the closing repair
    pub validator: ValidatorConfig,
    pub log: LogConfig,
}

impl Default for PruneConfig {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            validator: ValidatorConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl PruneConfig {
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_validator(mut self, validator: ValidatorConfig) -> Self {
        self.validator = validator;
        self
    }

    /// Sets the log configuration of both the pruner and its closing repair.
    pub fn with_log(mut self, log: LogConfig) -> Self {
        self.validator.log = log.clone();
        self.log = log;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_rounds == 0 {
            return Err(FeedError::Configuration(
                "max_rounds must be greater than 0".to_string(),
            ));
        }
        self.validator.validate()
    }
}

/// Configuration for [`batch::validate_all`](crate::batch::validate_all).
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum number of stores validated at once
    pub max_workers: usize,
    pub mode: ValidationMode,
    pub validator: ValidatorConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_workers: num_cpus::get(),
            mode: ValidationMode::default(),
            validator: ValidatorConfig::default(),
        }
    }
}

impl BatchConfig {
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn with_mode(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_validator(mut self, validator: ValidatorConfig) -> Self {
        self.validator = validator;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(FeedError::Configuration(
                "max_workers must be greater than 0".to_string(),
            ));
        }
        self.validator.validate()
    }
}
