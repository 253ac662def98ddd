//! Configuration resolution for `GreenLoop`.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/greenloop/settings.json)
//! 3. Explicit config file (`--config`)
//! 4. Environment variables (`GREENLOOP_*`)
//! 5. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::rewards::RewardPolicy;

/// Complete `GreenLoop` configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub rewards: RewardPolicy,
    #[serde(default)]
    pub feeds: FeedConfig,
}

/// Server process configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    pub database_path: Option<PathBuf>,
    pub log_level: String,
    pub log_json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:50051".to_string(),
            database_path: None,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

/// Token lifetimes and credential rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub access_ttl_secs: i64,
    /// Default: 7 days.
    pub refresh_ttl_secs: i64,
    /// Lifetime of a password reset token. Default: 30 minutes.
    pub reset_ttl_secs: i64,
    pub min_password_len: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_ttl_secs: 3600,
            refresh_ttl_secs: 7 * 24 * 60 * 60,
            reset_ttl_secs: 30 * 60,
            min_password_len: 8,
        }
    }
}

/// Live feed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Snapshots buffered per feed before a slow subscriber starts skipping.
    pub broadcast_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 16,
        }
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_config_path()
        && global_path.exists()
    {
        let global = load_config_file(&global_path)?;
        merge_config(&mut config, global);
    }

    if let Some(path) = explicit {
        let file = load_config_file(path)?;
        merge_config(&mut config, file);
    }

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate(&config)?;

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("settings.json"))
}

/// Get the default database path for the server.
pub fn database_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("market.db"))
}

fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .ok()
            .map(|h| PathBuf::from(h).join(".greenloop"))
    }
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join("Library/Application Support/greenloop"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
            .map(|p| p.join("greenloop"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn merge_config(base: &mut Config, overlay: Config) {
    if overlay.server.database_path.is_some() {
        base.server.database_path = overlay.server.database_path;
    }
    base.server.addr = overlay.server.addr;
    base.server.log_level = overlay.server.log_level;
    base.server.log_json |= overlay.server.log_json;

    base.auth = overlay.auth;
    base.rewards = overlay.rewards;
    base.feeds = overlay.feeds;
}

fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("GREENLOOP_ADDR") {
        config.server.addr = val;
    }
    if let Some(val) = lookup("GREENLOOP_DATABASE_PATH") {
        config.server.database_path = Some(PathBuf::from(val));
    }
    if let Some(val) = lookup("GREENLOOP_LOG_LEVEL") {
        config.server.log_level = val;
    }
    if let Some(n) = lookup("GREENLOOP_ACCESS_TTL_SECS").and_then(|v| v.parse().ok()) {
        config.auth.access_ttl_secs = n;
    }
    if let Some(n) = lookup("GREENLOOP_COINS_PER_COMPLETION").and_then(|v| v.parse().ok()) {
        config.rewards.coins_per_completion = n;
    }
}

fn validate(config: &Config) -> Result<()> {
    config.rewards.validate().map_err(Error::Config)?;
    if config.auth.access_ttl_secs <= 0 || config.auth.refresh_ttl_secs <= 0 {
        return Err(Error::Config("token TTLs must be positive".into()));
    }
    if config.feeds.broadcast_capacity == 0 {
        return Err(Error::Config("feeds.broadcast_capacity must be positive".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_has_7_day_refresh_ttl() {
        let config = Config::default();
        assert_eq!(config.auth.refresh_ttl_secs, 7 * 24 * 60 * 60);
        assert_eq!(config.rewards, RewardPolicy::default());
    }

    #[test]
    fn explicit_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"server": {"addr": "127.0.0.1:9000"}, "rewards": {"coins_per_completion": 2}}"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.server.addr, "127.0.0.1:9000");
        assert_eq!(config.rewards.coins_per_completion, 2);
        assert_eq!(config.rewards.coins_per_cash_unit, 5);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("absent.json"))).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn invalid_reward_policy_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"rewards": {"coins_per_cash_unit": 0}}"#).unwrap();
        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = [
            ("GREENLOOP_ADDR", "0.0.0.0:7000"),
            ("GREENLOOP_COINS_PER_COMPLETION", "3"),
            ("GREENLOOP_ACCESS_TTL_SECS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        apply_env_overrides(&mut config, |k| env.get(k).map(ToString::to_string));

        assert_eq!(config.server.addr, "0.0.0.0:7000");
        assert_eq!(config.rewards.coins_per_completion, 3);
        assert_eq!(config.auth.access_ttl_secs, 3600);
    }
}
