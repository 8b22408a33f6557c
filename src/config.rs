//! Application configuration
//!
//! All settings come from environment variables with sensible defaults,
//! so the binary can run in a container without a config file.

use std::time::Duration;

use tracing::warn;

/// Runtime configuration for the whole CSMS process.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// WebSocket listener host
    pub ws_host: String,
    /// WebSocket listener port
    pub ws_port: u16,
    /// REST API listener host
    pub api_host: String,
    /// REST API listener port
    pub api_port: u16,
    /// Database connection URL
    pub database_url: String,
    /// Heartbeat interval granted to stations at boot (seconds)
    pub heartbeat_interval: u32,
    /// Multiplier applied to a station's interval before it is
    /// considered silent
    pub heartbeat_grace: f64,
    /// Default deadline for outbound CSMS -> CP calls
    pub command_timeout: Duration,
    /// Log level used when `RUST_LOG` is not set
    pub log_level: String,
    /// Graceful shutdown window (seconds)
    pub shutdown_timeout: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ws_host: "0.0.0.0".to_string(),
            ws_port: 9000,
            api_host: "0.0.0.0".to_string(),
            api_port: 8080,
            database_url: "sqlite://./csms.db?mode=rwc".to_string(),
            heartbeat_interval: 300,
            heartbeat_grace: 2.5,
            command_timeout: Duration::from_secs(30),
            log_level: "info".to_string(),
            shutdown_timeout: 30,
        }
    }
}

impl AppConfig {
    /// Build the configuration from environment variables, falling back
    /// to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ws_host: env_string("CSMS_WS_HOST", defaults.ws_host),
            ws_port: env_parsed("CSMS_WS_PORT", defaults.ws_port),
            api_host: env_string("CSMS_API_HOST", defaults.api_host),
            api_port: env_parsed("CSMS_API_PORT", defaults.api_port),
            database_url: env_string("DATABASE_URL", defaults.database_url),
            heartbeat_interval: env_parsed("CSMS_HEARTBEAT_INTERVAL", defaults.heartbeat_interval),
            heartbeat_grace: env_parsed("CSMS_HEARTBEAT_GRACE", defaults.heartbeat_grace),
            command_timeout: Duration::from_secs(env_parsed(
                "CSMS_COMMAND_TIMEOUT",
                defaults.command_timeout.as_secs(),
            )),
            log_level: env_string("CSMS_LOG", defaults.log_level),
            shutdown_timeout: env_parsed("CSMS_SHUTDOWN_TIMEOUT", defaults.shutdown_timeout),
        }
    }

    /// WebSocket listener address (`host:port`).
    pub fn ws_address(&self) -> String {
        format!("{}:{}", self.ws_host, self.ws_port)
    }

    /// REST API listener address (`host:port`).
    pub fn api_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }

    /// Idle window after which a session with no inbound traffic is
    /// considered half-open: `heartbeat_interval * heartbeat_grace`.
    pub fn idle_deadline(&self) -> Duration {
        Duration::from_secs_f64(self.heartbeat_interval as f64 * self.heartbeat_grace)
    }
}

fn env_string(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parsed<T: std::str::FromStr + std::fmt::Display>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(v) => v,
            Err(_) => {
                warn!(key, raw = raw.as_str(), %default, "Unparsable value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.ws_address(), "0.0.0.0:9000");
        assert_eq!(cfg.api_address(), "0.0.0.0:8080");
        assert_eq!(cfg.heartbeat_interval, 300);
        assert_eq!(cfg.command_timeout, Duration::from_secs(30));
    }

    #[test]
    fn idle_deadline_applies_grace() {
        let mut cfg = AppConfig::default();
        cfg.heartbeat_interval = 60;
        cfg.heartbeat_grace = 2.5;
        assert_eq!(cfg.idle_deadline(), Duration::from_secs(150));
    }
}
