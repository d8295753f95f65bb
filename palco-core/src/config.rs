use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::service::wallet::{ExchangeTier, WithdrawalCalculator};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub realtime: RealtimeConfig,
    pub signaling: SignalingConfig,
    pub wallet: WalletConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            http_port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace | debug | info | warn | error
    pub level: String,
    /// "json" for production, "pretty" for development
    pub format: String,
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for financial-state snapshots. None disables durability
    /// (tests only).
    pub data_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for verifying identity tokens. Token issuance happens
    /// elsewhere; this layer only validates.
    pub jwt_secret: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Liveness probe interval.
    pub ping_interval_seconds: u64,
    /// A connection missing a pong for this long is force-closed.
    pub pong_grace_seconds: u64,
    /// First frame must be AUTH within this window.
    pub auth_deadline_seconds: u64,
    /// Per-user chat rate limit.
    pub chat_messages_per_second: u32,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            ping_interval_seconds: 30,
            pong_grace_seconds: 75,
            auth_deadline_seconds: 10,
            chat_messages_per_second: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnServerConfig {
    pub urls: Vec<String>,
    pub username: String,
    pub credential: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingConfig {
    /// Base URL of the media server's signaling endpoint.
    pub endpoint: String,
    pub stun_servers: Vec<String>,
    pub turn_servers: Vec<TurnServerConfig>,
    /// Full negotiation attempts before giving up.
    pub retry_budget: u32,
    /// Linear backoff step between attempts.
    pub backoff_step_ms: u64,
    /// Bounded wait for ICE candidate gathering.
    pub ice_gathering_timeout_ms: u64,
    /// Timeout for one signaling HTTP round-trip.
    pub request_timeout_ms: u64,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9000".to_string(),
            stun_servers: vec!["stun:stun.l.google.com:19302".to_string()],
            turn_servers: Vec::new(),
            retry_budget: 3,
            backoff_step_ms: 500,
            ice_gathering_timeout_ms: 2_000,
            request_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Platform cut of gross withdrawal value.
    pub fee_rate: Decimal,
    /// Ascending (diamond threshold, BRL price) exchange table.
    pub tiers: Vec<ExchangeTier>,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            fee_rate: dec!(0.20),
            tiers: WithdrawalCalculator::default_tiers(),
        }
    }
}

impl Config {
    /// Load configuration from an optional file plus `PALCO__*` environment
    /// overrides (e.g. `PALCO__SERVER__HTTP_PORT=9090`).
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(Path::new(path)));
        } else if Path::new("palco.toml").exists() {
            builder = builder.add_source(File::from(Path::new("palco.toml")));
        }

        builder = builder.add_source(Environment::with_prefix("PALCO").separator("__"));
        builder.build()?.try_deserialize()
    }

    /// Validate the configuration, collecting every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.server.http_port == 0 {
            errors.push("server.http_port must be non-zero".to_string());
        }
        if self.signaling.endpoint.is_empty() {
            errors.push("signaling.endpoint must be set".to_string());
        }
        if self.signaling.retry_budget == 0 {
            errors.push("signaling.retry_budget must be at least 1".to_string());
        }
        if self.realtime.ping_interval_seconds == 0 {
            errors.push("realtime.ping_interval_seconds must be non-zero".to_string());
        }
        if self.realtime.chat_messages_per_second == 0 {
            errors.push("realtime.chat_messages_per_second must be non-zero".to_string());
        }
        if self.auth.jwt_secret.is_empty() {
            errors.push("auth.jwt_secret must be set".to_string());
        }
        if let Err(e) =
            WithdrawalCalculator::new(self.wallet.tiers.clone(), self.wallet.fee_rate)
        {
            errors.push(format!("wallet: {e}"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate_except_secret() {
        let config = Config::default();
        let errors = config.validate().expect_err("empty jwt secret");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("jwt_secret"));
    }

    #[test]
    fn test_validate_catches_bad_wallet_table() {
        let mut config = Config::default();
        config.auth.jwt_secret = "secret".to_string();
        config.wallet.tiers.clear();
        let errors = config.validate().expect_err("empty table");
        assert!(errors.iter().any(|e| e.starts_with("wallet:")));
    }

    #[test]
    fn test_validate_ok() {
        let mut config = Config::default();
        config.auth.jwt_secret = "secret".to_string();
        assert!(config.validate().is_ok());
    }
}
