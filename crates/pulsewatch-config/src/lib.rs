//! Configuration for the pulsewatch CLI.
//!
//! Layered loading (built-in defaults, then the TOML file, then
//! `PULSEWATCH_` environment variables) and translation into the engine's
//! and feed's startup types.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pulsewatch_core::{CoreError, EngineConfig, Rule, RuleRegistry, Settings, default_rules};
use pulsewatch_feed::ReconnectConfig;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("invalid configuration: {0}")]
    Invalid(#[from] CoreError),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Presentation defaults for the CLI.
    #[serde(default)]
    pub defaults: Defaults,

    /// Initial engine settings.
    #[serde(default)]
    pub settings: Settings,

    /// Telemetry feed connection.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Rule set, in evaluation order. Empty means the built-in rules.
    #[serde(default)]
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FeedConfig {
    /// WebSocket endpoint (`ws://` or `wss://`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Reconnect attempts before giving up; unset retries forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: None,
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_retries: None,
        }
    }
}

fn default_initial_delay_ms() -> u64 {
    1_000
}
fn default_max_delay_ms() -> u64 {
    30_000
}

impl FeedConfig {
    pub fn reconnect_config(&self) -> ReconnectConfig {
        ReconnectConfig {
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            max_retries: self.max_retries,
        }
    }
}

impl Config {
    /// Configured rules, or the built-in set when none are configured.
    pub fn effective_rules(&self) -> Vec<Rule> {
        if self.rules.is_empty() {
            default_rules()
        } else {
            self.rules.clone()
        }
    }

    /// Engine startup parameters. The alert sink is left at its default.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_settings(self.settings.clone())
            .with_rules(self.effective_rules())
    }

    /// Check settings, rules and feed values without starting anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.settings.validate()?;
        RuleRegistry::with_rules(self.effective_rules())?;

        if self.feed.initial_delay_ms > self.feed.max_delay_ms {
            return Err(ConfigError::Validation {
                field: "feed.initial_delay_ms".into(),
                reason: format!(
                    "must not exceed feed.max_delay_ms ({})",
                    self.feed.max_delay_ms
                ),
            });
        }
        if let Some(url) = &self.feed.url {
            if !(url.starts_with("ws://") || url.starts_with("wss://")) {
                return Err(ConfigError::Validation {
                    field: "feed.url".into(),
                    reason: format!("expected a ws:// or wss:// URL, got '{url}'"),
                });
            }
        }
        Ok(())
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "pulsewatch", "pulsewatch").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("pulsewatch");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// The provider stack for `path`. Nested keys in environment variables are
/// separated by a double underscore, e.g. `PULSEWATCH_SETTINGS__SOUND_ENABLED`.
pub fn figment_for(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("PULSEWATCH_").split("__"))
}

/// Load and validate the config at the canonical path.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load and validate the config at `path`. A missing file yields defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = figment_for(path).extract()?;
    config.validate()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

pub fn to_toml(cfg: &Config) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(cfg)?)
}

/// Serialize config to TOML and write it to `path`, creating parent
/// directories as needed.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, to_toml(cfg)?)?;
    Ok(())
}

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}
