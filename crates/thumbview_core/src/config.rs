use std::thread;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ReadAhead;

/// Window width as a multiple of the visible span; 2 reads one span ahead and behind.
pub const DEFAULT_READ_AHEAD_MULTIPLIER: u32 = 2;

const FALLBACK_WORKERS: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_workers must be at least 1")]
    NoWorkers,
    #[error("read_ahead_multiplier must be at least 2, got {0}")]
    WindowTooNarrow(u32),
}

/// Scheduler settings, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub max_workers: usize,
    pub read_ahead_multiplier: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_workers: thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(FALLBACK_WORKERS),
            read_ahead_multiplier: DEFAULT_READ_AHEAD_MULTIPLIER,
        }
    }
}

impl SchedulerConfig {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers,
            ..Self::default()
        }
    }

    pub fn with_read_ahead_multiplier(mut self, multiplier: u32) -> Self {
        self.read_ahead_multiplier = multiplier;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.read_ahead_multiplier < DEFAULT_READ_AHEAD_MULTIPLIER {
            return Err(ConfigError::WindowTooNarrow(self.read_ahead_multiplier));
        }
        Ok(())
    }

    pub fn read_ahead(&self) -> ReadAhead {
        ReadAhead::new(self.read_ahead_multiplier)
    }
}
