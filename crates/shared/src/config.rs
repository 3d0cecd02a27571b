//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Ledger engine configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// SMS gateway configuration.
    #[serde(default)]
    pub sms: SmsConfig,
    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
    /// Deferred transaction replayer configuration.
    #[serde(default)]
    pub replayer: ReplayerConfig,
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

/// Ledger engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Scope value that marks a tariff as applying to every entity.
    #[serde(default = "default_wildcard_scope")]
    pub wildcard_scope: String,
    /// Owner reference of the service item used for labour on job completion.
    #[serde(default = "default_labour_owner")]
    pub labour_owner: String,
    /// Owner reference of the control account that carries credit legs.
    #[serde(default = "default_credit_owner")]
    pub credit_owner: String,
    /// How many times a commit is attempted when the store reports a serialization conflict.
    #[serde(default = "default_max_commit_attempts")]
    pub max_commit_attempts: u32,
}

fn default_wildcard_scope() -> String {
    "ALL".to_string()
}

fn default_labour_owner() -> String {
    "labour".to_string()
}

fn default_credit_owner() -> String {
    "credit".to_string()
}

fn default_max_commit_attempts() -> u32 {
    3
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            wildcard_scope: default_wildcard_scope(),
            labour_owner: default_labour_owner(),
            credit_owner: default_credit_owner(),
            max_commit_attempts: default_max_commit_attempts(),
        }
    }
}

/// SMS gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SmsConfig {
    /// Whether notifications are dispatched at all.
    #[serde(default)]
    pub enabled: bool,
    /// Endpoint that accepts outbound messages.
    #[serde(default)]
    pub send_url: String,
    /// Endpoint that exchanges credentials for a bearer token.
    #[serde(default)]
    pub auth_url: String,
    /// Gateway account code.
    #[serde(default)]
    pub account_code: String,
    /// Login used against `auth_url`.
    #[serde(default)]
    pub auth_email: String,
    /// Password used against `auth_url`.
    #[serde(default)]
    pub auth_password: String,
    /// Optional pre-issued token; skips the first login when set.
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_sms_timeout")]
    pub timeout_secs: u64,
    /// Currency label used in message bodies.
    #[serde(default = "default_currency_label")]
    pub currency_label: String,
}

fn default_sms_timeout() -> u64 {
    10
}

fn default_currency_label() -> String {
    "UGX".to_string()
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            send_url: String::new(),
            auth_url: String::new(),
            account_code: String::new(),
            auth_email: String::new(),
            auth_password: String::new(),
            auth_token: None,
            timeout_secs: default_sms_timeout(),
            currency_label: default_currency_label(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "autoledger_core=info,autoledger_db=info,autoledger_replayer=info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

/// Deferred transaction replayer configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayerConfig {
    /// Seconds between queue polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Maximum transactions replayed per poll.
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
}

fn default_poll_interval() -> u64 {
    5
}

fn default_batch_size() -> u64 {
    50
}

impl Default for ReplayerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            batch_size: default_batch_size(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("AUTOLEDGER").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_defaults() {
        let ledger = LedgerConfig::default();
        assert_eq!(ledger.wildcard_scope, "ALL");
        assert_eq!(ledger.labour_owner, "labour");
        assert_eq!(ledger.credit_owner, "credit");
        assert_eq!(ledger.max_commit_attempts, 3);
    }

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(
            [
                ("AUTOLEDGER__DATABASE__URL", Some("postgres://localhost/autoledger")),
                ("AUTOLEDGER__LEDGER__LABOUR_OWNER", Some("workshop-labour")),
                ("AUTOLEDGER__SMS__ENABLED", Some("true")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.database.url, "postgres://localhost/autoledger");
                assert_eq!(config.database.max_connections, 10);
                assert_eq!(config.ledger.labour_owner, "workshop-labour");
                assert_eq!(config.ledger.wildcard_scope, "ALL");
                assert!(config.sms.enabled);
                assert_eq!(config.sms.currency_label, "UGX");
                assert_eq!(config.replayer.batch_size, 50);
            },
        );
    }

    #[test]
    fn test_load_requires_database_url() {
        temp_env::with_var_unset("AUTOLEDGER__DATABASE__URL", || {
            assert!(AppConfig::load().is_err());
        });
    }
}
