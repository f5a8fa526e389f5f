//! Configuration system for Outpost.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $OUTPOST_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/outpost/config.toml
//!   3. ~/.config/outpost/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::wire::ProtocolVersion;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub api: ApiConfig,
    pub jobs: JobsConfig,
    pub state: StateConfig,
    pub protocol: ProtocolConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Address the command endpoint binds to.
    pub bind: String,
    /// TCP port for the command endpoint. 0 = OS-assigned.
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Root of the job directories. Each job may ship `bin/run`,
    /// `bin/drain` and other named scripts.
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Where the persistent task ledger is kept.
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Version assumed for requests that don't carry one.
    pub default_version: u32,
}

impl ProtocolConfig {
    pub fn default_protocol(&self) -> ProtocolVersion {
        ProtocolVersion(self.default_version)
    }
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 6868,
        }
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/var/vcap/jobs"),
        }
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            dir: data_dir(),
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self { default_version: 1 }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("outpost")
}

pub fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".local").join("share"))
        .join("outpost")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl AgentConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::file_path())
    }

    /// Load from an explicit path, falling back to defaults when it is absent.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))?
        } else {
            AgentConfig::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("OUTPOST_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&AgentConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply OUTPOST_* overrides using `lookup` to read variables.
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("OUTPOST_API__BIND") {
            self.api.bind = v;
        }
        if let Some(v) = lookup("OUTPOST_API__PORT") {
            if let Ok(p) = v.parse() {
                self.api.port = p;
            }
        }
        if let Some(v) = lookup("OUTPOST_JOBS__DIR") {
            self.jobs.dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("OUTPOST_STATE__DIR") {
            self.state.dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("OUTPOST_PROTOCOL__DEFAULT_VERSION") {
            if let Ok(p) = v.parse() {
                self.protocol.default_version = p;
            }
        }
    }
}
