//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Redis configuration (distributed lock backend).
    #[serde(default)]
    pub redis: RedisConfig,
    /// Payment service provider configuration.
    pub psp: PspConfig,
    /// Instant payout business rules.
    #[serde(default)]
    pub instant_payout: InstantPayoutConfig,
    /// Lock backend selection and timing.
    #[serde(default)]
    pub lock: LockConfig,
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
    /// Emit JSON log lines instead of human-readable ones.
    #[serde(default)]
    pub log_json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_json: false,
        }
    }
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

/// Redis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL.
    #[serde(default = "default_redis_url")]
    pub url: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

/// Payment service provider configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PspConfig {
    /// Base URL of the provider REST API.
    #[serde(default = "default_psp_api_base")]
    pub api_base: String,
    /// Secret API key.
    pub secret_key: String,
    /// Provider id of the platform account that funds top-up transfers.
    pub platform_account_id: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_psp_timeout")]
    pub timeout_secs: u64,
}

fn default_psp_api_base() -> String {
    "https://api.stripe.com".to_string()
}

fn default_psp_timeout() -> u64 {
    30
}

/// Instant payout business rules.
#[derive(Debug, Clone, Deserialize)]
pub struct InstantPayoutConfig {
    /// Flat fee in minor units charged per instant payout.
    #[serde(default = "default_fee")]
    pub fee: i64,
    /// Days instant payout stays blocked after any card change.
    #[serde(default = "default_card_change_cooldown_days")]
    pub card_change_cooldown_days: u32,
    /// ISO 3166 country codes eligible for instant payout.
    #[serde(default = "default_supported_countries")]
    pub supported_countries: Vec<String>,
    /// Minimum age of a NEW payout before the retry job picks it up.
    #[serde(default = "default_retry_min_age")]
    pub retry_min_age_secs: u64,
    /// Maximum age of a NEW payout the retry job will re-drive.
    #[serde(default = "default_retry_max_age")]
    pub retry_max_age_secs: u64,
    /// Interval between retry job passes.
    #[serde(default = "default_retry_interval")]
    pub retry_interval_secs: u64,
}

impl Default for InstantPayoutConfig {
    fn default() -> Self {
        Self {
            fee: default_fee(),
            card_change_cooldown_days: default_card_change_cooldown_days(),
            supported_countries: default_supported_countries(),
            retry_min_age_secs: default_retry_min_age(),
            retry_max_age_secs: default_retry_max_age(),
            retry_interval_secs: default_retry_interval(),
        }
    }
}

fn default_fee() -> i64 {
    199
}

fn default_card_change_cooldown_days() -> u32 {
    7
}

fn default_supported_countries() -> Vec<String> {
    vec!["US".to_string()]
}

fn default_retry_min_age() -> u64 {
    1800 // 30 minutes
}

fn default_retry_max_age() -> u64 {
    10800 // 3 hours
}

fn default_retry_interval() -> u64 {
    300 // 5 minutes
}

/// Lock backend names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockBackend {
    /// Row lock in the ledger database.
    #[default]
    Row,
    /// Redis-backed mutex.
    Distributed,
}

/// Lock backend selection and timing.
///
/// Acts as the feature-flag source that picks a lock backend per account.
#[derive(Debug, Clone, Deserialize)]
pub struct LockConfig {
    /// Backend used when no override applies.
    #[serde(default)]
    pub default_strategy: LockBackend,
    /// Accounts forced onto the distributed backend.
    #[serde(default)]
    pub distributed_accounts: Vec<i64>,
    /// Forces every account onto the distributed backend.
    #[serde(default)]
    pub distributed_for_all: bool,
    /// Lock lease time-to-live in seconds.
    #[serde(default = "default_lock_ttl")]
    pub ttl_secs: u64,
    /// Maximum time to wait for the lock in seconds.
    #[serde(default = "default_lock_timeout")]
    pub timeout_secs: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            default_strategy: LockBackend::default(),
            distributed_accounts: Vec::new(),
            distributed_for_all: false,
            ttl_secs: default_lock_ttl(),
            timeout_secs: default_lock_timeout(),
        }
    }
}

fn default_lock_ttl() -> u64 {
    10
}

fn default_lock_timeout() -> u64 {
    5
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
            .add_source(
                config::Environment::with_prefix("PAYOUT")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("lock.distributed_accounts")
                    .with_list_parse_key("instant_payout.supported_countries")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
