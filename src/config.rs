// src/config.rs
//! Scheduler configuration: one struct, loaded once at startup. Supports
//! TOML or JSON, with an env-var path override and sensible defaults for
//! every knob, so an absent config file never stops the daemon.

use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use anyhow::{anyhow, Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::hours::HoursTable;

const ENV_PATH: &str = "CASTER_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Polling cadence of the control loop.
    pub tick_interval_secs: u64,
    /// Minimum time after a cast start before a content change may re-cast.
    pub cooldown_mins: i64,
    /// How far ahead of a scheduled start the display may come up.
    pub early_start_mins: i64,
    /// Delay after the event's scheduled start for the one-shot
    /// re-verification of a possibly stale session.
    pub failsafe_delay_mins: i64,
    /// Bound on each device command; a timeout counts as a failed command.
    pub command_timeout_secs: u64,
    /// The record slot the producer overwrites.
    pub record_path: PathBuf,
    /// The scheduler's own durable state.
    pub state_path: PathBuf,
    /// Address the device loads when casting starts.
    pub cast_url: String,
    /// Cast device name as known to the control tool.
    pub device_name: String,
    pub hours: HoursTable,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 20,
            cooldown_mins: 10,
            early_start_mins: 60,
            failsafe_delay_mins: 40,
            command_timeout_secs: 20,
            record_path: PathBuf::from("data/tournament_record.json"),
            state_path: PathBuf::from("state/cast_state.json"),
            cast_url: "http://localhost/display/".to_string(),
            device_name: "Venue TV".to_string(),
            hours: HoursTable::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn tick_interval(&self) -> StdDuration {
        StdDuration::from_secs(self.tick_interval_secs.max(1))
    }

    pub fn cooldown(&self) -> Duration {
        Duration::minutes(self.cooldown_mins)
    }

    pub fn early_start_offset(&self) -> Duration {
        Duration::minutes(self.early_start_mins)
    }

    pub fn failsafe_delay(&self) -> Duration {
        Duration::minutes(self.failsafe_delay_mins)
    }
}

/// Load configuration from an explicit path. Supports TOML or JSON.
pub fn load_config_from(path: &Path) -> Result<SchedulerConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str())
}

/// Load configuration using env var + fallbacks:
/// 1) $CASTER_CONFIG_PATH
/// 2) config/caster.toml
/// 3) config/caster.json
/// 4) built-in defaults
pub fn load_config_default() -> Result<SchedulerConfig> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("CASTER_CONFIG_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/caster.toml");
    if toml_p.exists() {
        return load_config_from(&toml_p);
    }
    let json_p = PathBuf::from("config/caster.json");
    if json_p.exists() {
        return load_config_from(&json_p);
    }
    Ok(SchedulerConfig::default())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<SchedulerConfig> {
    // Try TOML first if hinted or content looks like toml.
    let try_toml = hint_ext == "toml" || s.contains('=');
    if try_toml {
        if let Ok(v) = toml::from_str(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = serde_json::from_str(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = toml::from_str(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported config format"))
}
