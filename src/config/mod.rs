// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/camwatch

//! Configuration module

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default tracing filter, e.g. `info` or `camwatch=debug`.
    /// `RUST_LOG`, `--debug` and `--trace` take precedence.
    pub log_level: String,

    /// Use simulated probes instead of ping/ffprobe
    pub demo_mode: bool,

    /// Probing cadence and fleet layout
    pub monitor: MonitorConfig,

    /// External probe commands
    pub probe: ProbeConfig,

    /// Camera roster source
    pub roster: RosterConfig,

    /// Health timeline store
    pub database: DatabaseConfig,

    /// Unauthorized camera audit log
    pub audit: AuditConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            demo_mode: false,
            monitor: MonitorConfig::default(),
            probe: ProbeConfig::default(),
            roster: RosterConfig::default(),
            database: DatabaseConfig::default(),
            audit: AuditConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file.
    ///
    /// Values are not validated here so command line overrides can still
    /// fix them; call [`Config::validate`] once overrides are applied.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Reject values the scheduler cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.monitor.interval_secs == 0 {
            bail!("monitor.interval_secs must be at least 1");
        }
        if self.monitor.num_shards == 0 {
            bail!("monitor.num_shards must be at least 1");
        }
        if self.probe.ping_count == 0 {
            bail!("probe.ping_count must be at least 1");
        }
        Ok(())
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("camwatch"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

/// Fleet scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between two probes of the same camera
    pub interval_secs: u64,

    /// Number of launch groups the roster is split into
    pub num_shards: usize,

    /// Pause between a finished cycle and the next roster reload
    pub reload_delay_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            num_shards: 4,
            reload_delay_secs: 10,
        }
    }
}

/// Probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Reachability command, invoked as `<cmd> -c <count> <ip>`
    pub ping_command: String,
    pub ping_count: u32,
    pub ping_timeout_secs: u64,

    /// Stream open command, invoked with the RTSP URI
    pub stream_command: String,
    pub stream_timeout_secs: u64,

    /// Demo mode failure probability per probe
    pub demo_failure_rate: f64,

    /// Demo mode probability that a camera rejects its credentials
    pub demo_unauthorized_rate: f64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            ping_command: "ping".to_string(),
            ping_count: 4,
            ping_timeout_secs: 5,
            stream_command: "ffprobe".to_string(),
            stream_timeout_secs: 10,
            demo_failure_rate: 0.2,
            demo_unauthorized_rate: 0.05,
        }
    }
}

/// Roster configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    /// JSON array of camera objects
    pub path: PathBuf,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./cameraList.json"),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Persist health records; when off, records are only logged
    pub enabled: bool,

    /// Database path
    pub path: PathBuf,

    /// Retention used by the `prune` command, in days
    pub retention_days: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("./data/camwatch.db"),
            retention_days: 30,
        }
    }
}

/// Audit log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub path: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./unauthorized_cameras.csv"),
        }
    }
}
