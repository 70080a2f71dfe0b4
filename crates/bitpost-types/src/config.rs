//! Dispatch engine configuration with documented defaults.
//!
//! All scheduling constants are centralized here. Every value has a
//! default matching the original client's behavior; anything read from
//! a settings file must pass [`DispatchConfig::validate`] before use.

use serde::{Deserialize, Serialize};

use crate::{BitpostError, Result};

/// Configuration for the dispatcher and its retry policy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Whether this client performs proof of work for the objects it
    /// creates. When false, servers are expected to do the work.
    pub do_pow: bool,

    /// Time to live (seconds) used on the first attempt to create and
    /// send an object. Kept short: in protocol version 3 a lower TTL
    /// needs less proof of work, which pays off when the recipient is
    /// online and acknowledges immediately.
    pub first_attempt_ttl_secs: u64,

    /// Time to live (seconds) used on every attempt after the first.
    /// If the short first attempt is not acknowledged, the object is
    /// re-created and re-sent with this longer validity.
    pub subsequent_attempts_ttl_secs: u64,

    /// Number of processing passes a record may survive before it is
    /// abandoned and deleted from the queue.
    pub maximum_attempts: u32,

    /// Seconds between dispatcher wake-ups.
    pub wakeup_interval_secs: u64,

    /// Minimum seconds between runs of the database cleaning routine.
    pub database_clean_interval_secs: u64,

    /// Whether a record skipped purely for lack of connectivity still
    /// has its `attempts` counter incremented. The original client
    /// fails open here: a record that can never execute is eventually
    /// evicted instead of queuing forever. Set false to count only
    /// passes where the task actually ran.
    pub count_offline_skips: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            do_pow: true,
            first_attempt_ttl_secs: 3_600,           // 1 hour
            subsequent_attempts_ttl_secs: 86_400,    // 1 day
            maximum_attempts: 500,
            wakeup_interval_secs: 60,
            database_clean_interval_secs: 3_600,
            count_offline_skips: true,
        }
    }
}

impl DispatchConfig {
    /// Validates all configuration values.
    ///
    /// Returns [`BitpostError::Config`] if any value is outside its
    /// acceptable range.
    pub fn validate(&self) -> Result<()> {
        if self.first_attempt_ttl_secs == 0 {
            return Err(BitpostError::Config {
                reason: "first_attempt_ttl_secs must be greater than 0".into(),
            });
        }

        if self.subsequent_attempts_ttl_secs < self.first_attempt_ttl_secs {
            return Err(BitpostError::Config {
                reason: "subsequent_attempts_ttl_secs must not be shorter than the first-attempt TTL".into(),
            });
        }

        if self.maximum_attempts == 0 {
            return Err(BitpostError::Config {
                reason: "maximum_attempts must be greater than 0".into(),
            });
        }

        if self.wakeup_interval_secs == 0 {
            return Err(BitpostError::Config {
                reason: "wakeup_interval_secs must be greater than 0".into(),
            });
        }

        if self.database_clean_interval_secs == 0 {
            return Err(BitpostError::Config {
                reason: "database_clean_interval_secs must be greater than 0".into(),
            });
        }

        Ok(())
    }
}
