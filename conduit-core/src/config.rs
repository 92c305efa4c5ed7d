//! Scheduler Configuration
//!
//! Every step of the transition function is on by default. The switches
//! exist so that hosts can isolate a step when diagnosing scheduling
//! behavior; turning one off never breaks the uniqueness invariant, only
//! liveness or redundancy pruning.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tunables for the scheduler and its runtime front ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Speculatively unblock closed dependency loops.
    pub resolve_cycles: bool,

    /// Drop ready callbacks whose inputs did not change within their
    /// execution group.
    pub drop_irrelevant: bool,

    /// Remove requested callbacks that already list themselves as a
    /// predecessor.
    pub prune_completed_loops: bool,

    /// Capacity of the dispatcher command channel.
    pub queue_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            resolve_cycles: true,
            drop_irrelevant: true,
            prune_completed_loops: true,
            queue_capacity: 64,
        }
    }
}

impl SchedulerConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check field ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "queue_capacity",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_every_step() {
        let config = SchedulerConfig::default();
        assert!(config.resolve_cycles);
        assert!(config.drop_irrelevant);
        assert!(config.prune_completed_loops);
        assert_eq!(config.queue_capacity, 64);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = SchedulerConfig::from_json(r#"{"resolve_cycles": false}"#).unwrap();
        assert!(!config.resolve_cycles);
        assert!(config.drop_irrelevant);
        assert_eq!(config.queue_capacity, 64);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = SchedulerConfig::from_json(r#"{"queue_capacity": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "queue_capacity", .. }));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = SchedulerConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
