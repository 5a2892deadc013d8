use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

use chrono::FixedOffset;
use domain::services::ReconnectPolicy;
use shared::time::{offset_from_minutes, MAX_UTC_OFFSET_MINUTES};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub realtime: RealtimeConfig,
    #[serde(default)]
    pub timeline: TimelineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl DatabaseConfig {
    /// Pool settings in the form the persistence layer expects.
    pub fn pool_config(&self) -> persistence::db::DatabaseConfig {
        persistence::db::DatabaseConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            connect_timeout_secs: self.connect_timeout_secs,
            idle_timeout_secs: self.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityConfig {
    /// Allowed browser origins. Empty allows any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

/// Change notification channel settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// Run the change channel and the dashboard synchronizer.
    #[serde(default = "default_realtime_enabled")]
    pub enabled: bool,

    #[serde(default = "default_reconnect_initial_delay")]
    pub reconnect_initial_delay_ms: u64,

    /// 1.0 reproduces a fixed retry delay.
    #[serde(default = "default_reconnect_multiplier")]
    pub reconnect_multiplier: f64,

    #[serde(default = "default_reconnect_max_delay")]
    pub reconnect_max_delay_ms: u64,

    /// Consecutive failed subscriptions before giving up. 0 retries forever.
    #[serde(default = "default_reconnect_max_attempts")]
    pub reconnect_max_attempts: u32,

    /// Per-subscriber buffer of undelivered changes.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            enabled: default_realtime_enabled(),
            reconnect_initial_delay_ms: default_reconnect_initial_delay(),
            reconnect_multiplier: default_reconnect_multiplier(),
            reconnect_max_delay_ms: default_reconnect_max_delay(),
            reconnect_max_attempts: default_reconnect_max_attempts(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl RealtimeConfig {
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            initial_delay: Duration::from_millis(self.reconnect_initial_delay_ms),
            multiplier: self.reconnect_multiplier,
            max_delay: Duration::from_millis(self.reconnect_max_delay_ms),
            max_attempts: self.reconnect_max_attempts,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimelineConfig {
    /// Offset from UTC, in minutes, used for event times of day.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl TimelineConfig {
    pub fn offset(&self) -> Result<FixedOffset, ConfigValidationError> {
        offset_from_minutes(self.utc_offset_minutes).ok_or_else(|| {
            ConfigValidationError::InvalidValue(format!(
                "timeline.utc_offset_minutes must be within ±{}",
                MAX_UTC_OFFSET_MINUTES
            ))
        })
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    5
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_realtime_enabled() -> bool {
    true
}
fn default_reconnect_initial_delay() -> u64 {
    1000
}
fn default_reconnect_multiplier() -> f64 {
    2.0
}
fn default_reconnect_max_delay() -> u64 {
    30_000
}
fn default_reconnect_max_attempts() -> u32 {
    10
}
fn default_event_buffer() -> usize {
    256
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with SW__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("SW").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Builds from embedded defaults so tests do not depend on config files.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 30

            [database]
            url = ""
            max_connections = 20
            min_connections = 5
            connect_timeout_secs = 10
            idle_timeout_secs = 600

            [logging]
            level = "info"
            format = "json"

            [security]
            cors_origins = []

            [realtime]
            enabled = true
            reconnect_initial_delay_ms = 1000
            reconnect_multiplier = 2.0
            reconnect_max_delay_ms = 30000
            reconnect_max_attempts = 10
            event_buffer = 256

            [timeline]
            utc_offset_minutes = 0
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        // Skip validation in tests to allow partial configs
        Ok(cfg)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "SW__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if !(self.realtime.reconnect_multiplier >= 1.0) {
            return Err(ConfigValidationError::InvalidValue(
                "realtime.reconnect_multiplier must be at least 1.0".to_string(),
            ));
        }

        if self.realtime.reconnect_max_delay_ms < self.realtime.reconnect_initial_delay_ms {
            return Err(ConfigValidationError::InvalidValue(
                "realtime.reconnect_max_delay_ms cannot be below the initial delay".to_string(),
            ));
        }

        self.timeline.offset()?;

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigValidationError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| {
                ConfigValidationError::InvalidValue(format!("Invalid socket address: {}", e))
            })
    }
}
