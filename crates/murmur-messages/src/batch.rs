//! Per-definition batching parameters

use crate::error::DefinitionError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How incoming messages of one definition are grouped before `apply`.
///
/// Batching is off unless `max_window` is positive; with batching off the
/// remaining fields are ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfiguration {
    max_window: Duration,
    priority: u8,
    max_size: usize,
    max_age: Duration,
}

impl Default for BatchConfiguration {
    fn default() -> Self {
        Self {
            max_window: Duration::ZERO,
            priority: 128,
            max_size: 1024,
            max_age: Duration::from_secs(300),
        }
    }
}

impl BatchConfiguration {
    /// Build a configuration, rejecting `max_size == 0` and
    /// `max_window >= max_age`.
    pub fn new(
        max_window: Duration,
        priority: u8,
        max_size: usize,
        max_age: Duration,
    ) -> Result<Self, DefinitionError> {
        let config = Self {
            max_window,
            priority,
            max_size,
            max_age,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants `new` enforces.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.max_size == 0 {
            return Err(DefinitionError::InvalidBatchConfiguration {
                reason: "max_size must be positive".into(),
            });
        }
        if self.max_window >= self.max_age {
            return Err(DefinitionError::InvalidBatchConfiguration {
                reason: format!(
                    "max_window ({:?}) must be below max_age ({:?})",
                    self.max_window, self.max_age
                ),
            });
        }
        Ok(())
    }

    /// Whether messages are batched at all.
    pub fn enabled(&self) -> bool {
        !self.max_window.is_zero()
    }

    /// Longest time the first message of a batch waits.
    pub fn max_window(&self) -> Duration {
        self.max_window
    }

    /// Higher priorities are flushed first when several batches are due.
    pub fn priority(&self) -> u8 {
        self.priority
    }

    /// A batch reaching this size is flushed immediately.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Batches older than this when flushed are discarded.
    pub fn max_age(&self) -> Duration {
        self.max_age
    }
}
