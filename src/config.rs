//! Configuration management for the link supervisor.
//!
//! This module handles loading and saving timing and volume tunables from
//! disk. Every field has a default matching the shipped firmware behavior,
//! so a missing or partial config file is always usable.

use std::{env, fs, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::{LinkError, Result};

/// Main configuration structure for the supervisor.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Config {
   /// Debounce window after the last signal change before status is
   /// recomputed.
   #[serde(default = "default_settle_window_ms")]
   pub settle_window_ms: u64,

   /// Minimum age of the boot cue before any recompute may run.
   #[serde(default = "default_resolve_holdoff_ms")]
   pub resolve_holdoff_ms: u64,

   /// Grace period appended to the boot cue's nominal duration before
   /// status-driven cues are allowed.
   #[serde(default = "default_boot_cue_grace_ms")]
   pub boot_cue_grace_ms: u64,

   /// Worker idle-callback polling interval.
   #[serde(default = "default_idle_poll_ms")]
   pub idle_poll_ms: u64,

   /// Continuous zero-connection time before the module is powered off.
   #[serde(default = "default_auto_off_secs")]
   pub auto_off_secs: u64,

   /// How long the off phase waits for the module to confirm shutdown.
   #[serde(default = "default_off_confirm_timeout_ms")]
   pub off_confirm_timeout_ms: u64,

   /// Pre-off delay letting the power-down cue finish before mute.
   #[serde(default = "default_pre_off_delay_ms")]
   pub pre_off_delay_ms: u64,

   /// Absolute-volume step applied per volume up/down request.
   #[serde(default = "default_volume_step")]
   pub volume_step: u8,

   /// Absolute volume after boot or factory reset.
   #[serde(default = "default_volume")]
   pub default_volume: u8,
}

const fn default_settle_window_ms() -> u64 {
   200
}

const fn default_resolve_holdoff_ms() -> u64 {
   1_000
}

const fn default_boot_cue_grace_ms() -> u64 {
   500
}

const fn default_idle_poll_ms() -> u64 {
   20
}

const fn default_auto_off_secs() -> u64 {
   5 * 60
}

const fn default_off_confirm_timeout_ms() -> u64 {
   2_000
}

const fn default_pre_off_delay_ms() -> u64 {
   2_000
}

const fn default_volume_step() -> u8 {
   5
}

const fn default_volume() -> u8 {
   40
}

impl Default for Config {
   fn default() -> Self {
      Self {
         settle_window_ms: default_settle_window_ms(),
         resolve_holdoff_ms: default_resolve_holdoff_ms(),
         boot_cue_grace_ms: default_boot_cue_grace_ms(),
         idle_poll_ms: default_idle_poll_ms(),
         auto_off_secs: default_auto_off_secs(),
         off_confirm_timeout_ms: default_off_confirm_timeout_ms(),
         pre_off_delay_ms: default_pre_off_delay_ms(),
         volume_step: default_volume_step(),
         default_volume: default_volume(),
      }
   }
}

impl Config {
   /// Loads configuration from disk or creates default if not exists.
   pub fn load() -> Result<Self> {
      let config_path = Self::config_path()?;

      if config_path.exists() {
         let contents = fs::read_to_string(&config_path)?;
         Ok(toml::from_str(&contents)?)
      } else {
         // Create default config
         let config = Self::default();
         config.save()?;
         Ok(config)
      }
   }

   /// Saves the current configuration to disk.
   pub fn save(&self) -> Result<()> {
      let config_path = Self::config_path()?;

      // Ensure directory exists
      if let Some(parent) = config_path.parent() {
         fs::create_dir_all(parent)?;
      }

      let contents = toml::to_string_pretty(self)?;
      fs::write(&config_path, contents)?;

      Ok(())
   }

   fn config_path() -> Result<PathBuf> {
      let config_dir = if let Ok(wavelink_home) = env::var("WAVELINK_HOME") {
         PathBuf::from(wavelink_home)
      } else if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
         PathBuf::from(config_home)
      } else if let Ok(home) = env::var("HOME") {
         PathBuf::from(home).join(".config")
      } else {
         return Err(LinkError::ConfigDirNotFound);
      };

      Ok(config_dir.join("wavelink").join("config.toml"))
   }

   pub fn settle_window(&self) -> Duration {
      Duration::from_millis(self.settle_window_ms)
   }

   pub fn resolve_holdoff(&self) -> Duration {
      Duration::from_millis(self.resolve_holdoff_ms)
   }

   pub fn boot_cue_grace(&self) -> Duration {
      Duration::from_millis(self.boot_cue_grace_ms)
   }

   pub fn idle_poll(&self) -> Duration {
      Duration::from_millis(self.idle_poll_ms)
   }

   pub fn auto_off(&self) -> Duration {
      Duration::from_secs(self.auto_off_secs)
   }

   pub fn off_confirm_timeout(&self) -> Duration {
      Duration::from_millis(self.off_confirm_timeout_ms)
   }

   pub fn pre_off_delay(&self) -> Duration {
      Duration::from_millis(self.pre_off_delay_ms)
   }
}
