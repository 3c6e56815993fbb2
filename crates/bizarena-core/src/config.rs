//! Runtime configuration for the arena.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{ArenaError, Result};
use crate::verification::DEFAULT_TOLERANCE;

pub const ENV_SUBMISSIONS_DIR: &str = "BIZARENA_SUBMISSIONS_DIR";
pub const ENV_ROUND_TIMEOUT_SECS: &str = "BIZARENA_ROUND_TIMEOUT_SECS";
pub const ENV_SAMPLE_SIZE: &str = "BIZARENA_SAMPLE_SIZE";
pub const ENV_TOLERANCE: &str = "BIZARENA_TOLERANCE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaConfig {
    pub submissions_dir: PathBuf,
    /// Deadline for every participant call in a round.
    pub round_timeout: Option<Duration>,
    pub verification_sample_size: usize,
    pub verification_tolerance: f64,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            submissions_dir: PathBuf::from("submissions"),
            round_timeout: None,
            verification_sample_size: 3,
            verification_tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl ArenaConfig {
    pub fn with_submissions_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.submissions_dir = dir.into();
        self
    }

    pub fn with_round_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.round_timeout = timeout;
        self
    }

    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.verification_sample_size = sample_size;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.verification_tolerance = tolerance;
        self
    }

    /// Create from environment variables
    ///
    /// Reads (all optional):
    /// - BIZARENA_SUBMISSIONS_DIR (default: "submissions")
    /// - BIZARENA_ROUND_TIMEOUT_SECS (default: no deadline)
    /// - BIZARENA_SAMPLE_SIZE (default: 3)
    /// - BIZARENA_TOLERANCE (default: 0.10)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup(ENV_SUBMISSIONS_DIR).filter(|d| !d.trim().is_empty()) {
            config.submissions_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(ENV_ROUND_TIMEOUT_SECS) {
            let secs: u64 = parse_var(ENV_ROUND_TIMEOUT_SECS, &raw)?;
            config.round_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(raw) = lookup(ENV_SAMPLE_SIZE) {
            config.verification_sample_size = parse_var(ENV_SAMPLE_SIZE, &raw)?;
        }
        if let Some(raw) = lookup(ENV_TOLERANCE) {
            config.verification_tolerance = parse_var(ENV_TOLERANCE, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.verification_sample_size == 0 {
            return Err(ArenaError::InvalidConfiguration(format!(
                "{ENV_SAMPLE_SIZE} must be at least 1"
            )));
        }
        if !self.verification_tolerance.is_finite() || self.verification_tolerance < 0.0 {
            return Err(ArenaError::InvalidConfiguration(format!(
                "{ENV_TOLERANCE} must be a non-negative number"
            )));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| ArenaError::InvalidConfiguration(format!("{key}: cannot parse {raw:?}")))
}
