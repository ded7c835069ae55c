//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtSettings,
    /// Seat billing tunables.
    #[serde(default)]
    pub billing: BillingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key shared with the identity service.
    pub secret: String,
}

/// Seat billing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Number of history rows returned with the billing state.
    #[serde(default = "default_history_limit")]
    pub history_limit: u64,
    /// Upper bound for a single storage call before it is reported unavailable.
    #[serde(default = "default_storage_timeout_ms")]
    pub storage_timeout_ms: u64,
    /// Seconds between reconciler passes.
    #[serde(default = "default_reconcile_interval_secs")]
    pub reconcile_interval_secs: u64,
}

fn default_history_limit() -> u64 {
    20
}

fn default_storage_timeout_ms() -> u64 {
    5_000
}

fn default_reconcile_interval_secs() -> u64 {
    300 // 5 minutes
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            storage_timeout_ms: default_storage_timeout_ms(),
            reconcile_interval_secs: default_reconcile_interval_secs(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, lowest precedence first: `config/default`, `config/{RUN_MODE}`,
    /// then `ROSTER__SECTION__KEY` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("ROSTER").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_billing_defaults() {
        let billing = BillingConfig::default();
        assert_eq!(billing.history_limit, 20);
        assert_eq!(billing.storage_timeout_ms, 5_000);
        assert_eq!(billing.reconcile_interval_secs, 300);
    }

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(
            [
                ("ROSTER__DATABASE__URL", Some("postgres://localhost/roster_test")),
                ("ROSTER__JWT__SECRET", Some("secret")),
                ("ROSTER__SERVER__PORT", Some("9090")),
                ("ROSTER__BILLING__HISTORY_LIMIT", Some("5")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.database.url, "postgres://localhost/roster_test");
                assert_eq!(config.server.port, 9090);
                assert_eq!(config.server.host, "0.0.0.0");
                assert_eq!(config.billing.history_limit, 5);
                assert_eq!(config.billing.storage_timeout_ms, 5_000);
            },
        );
    }

    #[test]
    fn test_load_fails_without_database_url() {
        temp_env::with_vars_unset(["ROSTER__DATABASE__URL", "ROSTER__JWT__SECRET"], || {
            assert!(AppConfig::load().is_err());
        });
    }
}
