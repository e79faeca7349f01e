use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Immutable, validated configuration consumed by every component. Cheap to
/// `Clone`; holding one (or an `Arc` of one) requires no further
/// synchronization — it never changes after [`ConfigSnapshot::load`] returns
/// successfully (spec §3 "ConfigSnapshot").
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSnapshot {
    pub reply_delay_seconds: u32,
    pub poll_timeout: u32,
    pub poll_limit: u32,
    pub access_path: String,
    pub webhook_enabled: bool,
    pub webhook_port: u16,
    pub webhook_threads: u32,
    pub webhook_pool_size: u32,
    pub webhook_secret: String,
    pub admin_id: i64,
    pub worker_count: u32,
    pub user_ring_size: usize,
    pub log_path: String,
    pub log_max_size_mb: u32,
    pub completion_endpoint: String,
    pub completion_model: String,
    pub completion_max_tokens: u32,
    pub completion_system_prompt: Option<String>,
    pub bot_username: Option<String>,
    pub platform_api_base: String,
}

/// Deserialization target before bounds validation. Every field has a
/// default so a minimal TOML source is enough to get started.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawConfig {
    reply_delay_seconds: u32,
    poll_timeout: u32,
    poll_limit: u32,
    access_path: String,
    webhook_enabled: bool,
    webhook_port: u16,
    webhook_threads: u32,
    webhook_pool_size: u32,
    webhook_secret: String,
    admin_id: i64,
    worker_count: u32,
    user_ring_size: usize,
    log_path: String,
    log_max_size_mb: u32,
    completion_endpoint: String,
    completion_model: String,
    completion_max_tokens: u32,
    completion_system_prompt: Option<String>,
    bot_username: Option<String>,
    platform_api_base: String,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            reply_delay_seconds: 0,
            poll_timeout: 30,
            poll_limit: 100,
            access_path: "access.txt".to_owned(),
            webhook_enabled: false,
            webhook_port: 8443,
            webhook_threads: 4,
            webhook_pool_size: 16,
            webhook_secret: String::new(),
            admin_id: 0,
            worker_count: 4,
            user_ring_size: 16,
            log_path: "relay.log".to_owned(),
            log_max_size_mb: 8,
            completion_endpoint: String::new(),
            completion_model: String::new(),
            completion_max_tokens: 1024,
            completion_system_prompt: None,
            bot_username: None,
            platform_api_base: String::new(),
        }
    }
}

impl ConfigSnapshot {
    /// Parses and validates a TOML configuration source (spec §9.7: a
    /// simple TOML source standing in for the out-of-scope environment/INI
    /// merge).
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(source)?;
        Self::validate(raw)
    }

    /// Reads and validates the configuration file at `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    fn validate(raw: RawConfig) -> Result<Self, ConfigError> {
        bounded("reply_delay_seconds", raw.reply_delay_seconds, 0, 300, "0..300")?;
        bounded("poll_timeout", raw.poll_timeout, 1, 120, "1..120")?;
        bounded("poll_limit", raw.poll_limit, 1, 100, "1..100")?;
        bounded("webhook_threads", raw.webhook_threads, 1, 32, "1..32")?;
        bounded("webhook_pool_size", raw.webhook_pool_size, 1, 64, "1..64")?;
        bounded("worker_count", raw.worker_count, 1, 16, "1..16")?;
        bounded(
            "user_ring_size",
            raw.user_ring_size as u32,
            4,
            256,
            "4..256",
        )?;
        if raw.log_max_size_mb < 1 {
            return Err(ConfigError::OutOfRange {
                field: "log_max_size_mb",
                value: raw.log_max_size_mb.to_string(),
                bounds: ">=1",
            });
        }
        if raw.webhook_port == 0 {
            return Err(ConfigError::OutOfRange {
                field: "webhook_port",
                value: raw.webhook_port.to_string(),
                bounds: "1..65535",
            });
        }

        Ok(Self {
            reply_delay_seconds: raw.reply_delay_seconds,
            poll_timeout: raw.poll_timeout,
            poll_limit: raw.poll_limit,
            access_path: raw.access_path,
            webhook_enabled: raw.webhook_enabled,
            webhook_port: raw.webhook_port,
            webhook_threads: raw.webhook_threads,
            webhook_pool_size: raw.webhook_pool_size,
            webhook_secret: raw.webhook_secret,
            admin_id: raw.admin_id,
            worker_count: raw.worker_count,
            user_ring_size: raw.user_ring_size,
            log_path: raw.log_path,
            log_max_size_mb: raw.log_max_size_mb,
            completion_endpoint: raw.completion_endpoint,
            completion_model: raw.completion_model,
            completion_max_tokens: raw.completion_max_tokens,
            completion_system_prompt: raw.completion_system_prompt,
            bot_username: raw.bot_username,
            platform_api_base: raw.platform_api_base,
        })
    }
}

fn bounded(
    field: &'static str,
    value: u32,
    min: u32,
    max: u32,
    bounds: &'static str,
) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            field,
            value: value.to_string(),
            bounds,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_cleanly() {
        let snap = ConfigSnapshot::from_toml_str("").unwrap();
        assert_eq!(snap.worker_count, 4);
        assert_eq!(snap.user_ring_size, 16);
    }

    #[test]
    fn rejects_out_of_range_worker_count() {
        let err = ConfigSnapshot::from_toml_str("worker_count = 99").unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { field: "worker_count", .. }));
    }

    #[test]
    fn rejects_user_ring_size_below_minimum() {
        let err = ConfigSnapshot::from_toml_str("user_ring_size = 1").unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { field: "user_ring_size", .. }));
    }

    #[test]
    fn parses_full_custom_source() {
        let source = r#"
            reply_delay_seconds = 2
            admin_id = 12345
            webhook_enabled = true
            webhook_port = 9443
            bot_username = "relaybot"
        "#;
        let snap = ConfigSnapshot::from_toml_str(source).unwrap();
        assert_eq!(snap.admin_id, 12345);
        assert_eq!(snap.webhook_port, 9443);
        assert_eq!(snap.bot_username.as_deref(), Some("relaybot"));
    }
}
