//! Tracking worker configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Configuration for the tracking worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Enable/disable scheduled runs.
    /// When disabled, cycles only run when triggered via API.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Cron expression with seconds, e.g. "0 */30 * * * *".
    #[serde(default = "default_schedule")]
    pub schedule: String,

    /// Re-check any shipment not checked for this long (minutes).
    #[serde(default = "default_stale_after")]
    pub stale_after_mins: u64,

    /// Delivery is "soon" when the window ends within this many minutes.
    #[serde(default = "default_soon_threshold")]
    pub soon_threshold_mins: u64,

    /// Minimum gap between checks of a soon-due shipment (minutes).
    #[serde(default = "default_recheck_delay")]
    pub recheck_delay_mins: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_schedule() -> String {
    "0 */30 * * * *".to_string()
}

fn default_stale_after() -> u64 {
    24 * 60 // 1 day
}

fn default_soon_threshold() -> u64 {
    2 * 60 // 2 hours
}

fn default_recheck_delay() -> u64 {
    15
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            schedule: default_schedule(),
            stale_after_mins: default_stale_after(),
            soon_threshold_mins: default_soon_threshold(),
            recheck_delay_mins: default_recheck_delay(),
        }
    }
}

impl WorkerConfig {
    /// Eligibility thresholds derived from this config.
    pub fn policy(&self) -> TrackingPolicy {
        TrackingPolicy {
            stale_after: minutes(self.stale_after_mins),
            soon_threshold: minutes(self.soon_threshold_mins),
            recheck_delay: minutes(self.recheck_delay_mins),
        }
    }
}

fn minutes(value: u64) -> Duration {
    // Largest minute count chrono can represent.
    const MAX_MINUTES: u64 = (i64::MAX / 60_000) as u64;
    Duration::minutes(value.min(MAX_MINUTES) as i64)
}

/// Thresholds deciding when a shipment is due for a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackingPolicy {
    /// Baseline re-check cadence.
    pub stale_after: Duration,
    /// How close the delivery window end must be to poll more often.
    pub soon_threshold: Duration,
    /// Minimum gap between checks while delivery is soon.
    pub recheck_delay: Duration,
}

impl Default for TrackingPolicy {
    fn default() -> Self {
        WorkerConfig::default().policy()
    }
}
