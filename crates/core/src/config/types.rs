use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::tracking::{UdsConfig, UpsConfig};
use crate::worker::WorkerConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub carriers: CarriersConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("parcelwatch.db")
}

/// Per-carrier processor configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CarriersConfig {
    /// UPS API credentials. Without them UPS shipments are reported unsupported.
    #[serde(default)]
    pub ups: Option<UpsConfig>,
    #[serde(default)]
    pub uds: UdsConfig,
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub worker: WorkerConfig,
    pub carriers: SanitizedCarriersConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCarriersConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ups: Option<SanitizedUpsConfig>,
    pub uds: UdsConfig,
}

/// Sanitized UPS config (credentials hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedUpsConfig {
    pub base_url: String,
    pub credentials_configured: bool,
    pub timeout_secs: u64,
    pub transaction_src: String,
    pub home_country: String,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            worker: config.worker.clone(),
            carriers: SanitizedCarriersConfig {
                ups: config.carriers.ups.as_ref().map(|u| SanitizedUpsConfig {
                    base_url: u.base_url.clone(),
                    credentials_configured: !u.client_id.is_empty()
                        && !u.client_secret.is_empty(),
                    timeout_secs: u.timeout_secs,
                    transaction_src: u.transaction_src.clone(),
                    home_country: u.home_country.clone(),
                }),
                uds: config.carriers.uds.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.database.path.to_str().unwrap(), "parcelwatch.db");
        assert!(config.worker.enabled);
        assert!(config.carriers.ups.is_none());
        assert_eq!(config.carriers.uds.timeout_secs, 30);
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000

[database]
path = "/data/shipments.db"

[worker]
schedule = "0 */5 * * * *"
stale_after_mins = 360

[carriers.ups]
client_id = "id"
client_secret = "secret"

[carriers.uds]
timeout_secs = 10
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.path.to_str().unwrap(), "/data/shipments.db");
        assert_eq!(config.worker.schedule, "0 */5 * * * *");
        assert_eq!(config.worker.stale_after_mins, 360);
        assert_eq!(config.worker.soon_threshold_mins, 120); // default

        let ups = config.carriers.ups.as_ref().unwrap();
        assert_eq!(ups.client_id, "id");
        assert_eq!(ups.base_url, "https://onlinetools.ups.com");
        assert_eq!(config.carriers.uds.timeout_secs, 10);
    }

    #[test]
    fn test_ups_section_requires_credentials() {
        let toml = r#"
[carriers.ups]
base_url = "https://wwwcie.ups.com"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_sanitized_config_hides_ups_secret() {
        let toml = r#"
[carriers.ups]
client_id = "id"
client_secret = "super-secret"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let sanitized = SanitizedConfig::from(&config);

        let ups = sanitized.carriers.ups.as_ref().unwrap();
        assert!(ups.credentials_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("super-secret"));
    }

    #[test]
    fn test_sanitized_config_without_ups() {
        let sanitized = SanitizedConfig::from(&Config::default());
        assert!(sanitized.carriers.ups.is_none());
        assert_eq!(sanitized.server.port, 8080);
    }
}
