use std::str::FromStr;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Worker schedule is a valid cron expression
/// - Worker thresholds are positive
/// - UPS credentials are non-empty when the section is present
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    // Worker validation
    let worker = &config.worker;
    cron::Schedule::from_str(&worker.schedule).map_err(|e| {
        ConfigError::ValidationError(format!(
            "worker.schedule '{}' is not a valid cron expression: {}",
            worker.schedule, e
        ))
    })?;

    for (name, value) in [
        ("stale_after_mins", worker.stale_after_mins),
        ("soon_threshold_mins", worker.soon_threshold_mins),
        ("recheck_delay_mins", worker.recheck_delay_mins),
    ] {
        if value == 0 {
            return Err(ConfigError::ValidationError(format!(
                "worker.{} must be greater than 0",
                name
            )));
        }
    }

    // Carrier validation
    if let Some(ups) = &config.carriers.ups {
        if ups.client_id.is_empty() || ups.client_secret.is_empty() {
            return Err(ConfigError::ValidationError(
                "carriers.ups requires client_id and client_secret".to_string(),
            ));
        }
        if ups.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "carriers.ups.timeout_secs cannot be 0".to_string(),
            ));
        }
    }

    if config.carriers.uds.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "carriers.uds.timeout_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}
