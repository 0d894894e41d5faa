//! # Configuration
//!
//! Agenda configuration is managed by [`confique`], which handles layered loading
//! from a TOML file, environment variables and compiled defaults.
//!
//! ## Storage Hierarchy
//!
//! Configuration is resolved in priority order:
//! 1. **Environment variables**: `AGENDA_OPERATING_START`, `AGENDA_WEEK_STARTS_ON`, etc.
//! 2. **Data-dir Config**: `agenda.toml` inside the data directory.
//! 3. **Compiled Defaults**: Built-in fallbacks via `#[config(default = ...)]`.
//!
//! The data directory itself is resolved first (see [`resolve_data_dir`]), since
//! that is where the config file lives.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `operating_start` | `06:00` | Earliest time a block may start |
//! | `operating_end` | `22:00` | Latest time a block may end |
//! | `week_starts_on` | `sunday` | First day of a visible week |

use crate::error::{AgendaError, Result};
use crate::model::{TimeOfDay, TimeRange, WeekStart};
use confique::Config;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "agenda.toml";
pub const DATA_DIR_ENV: &str = "AGENDA_DATA_DIR";

/// Configuration for agenda, stored in `agenda.toml`.
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AgendaConfig {
    /// Earliest time of day a block may start.
    #[config(default = "06:00", env = "AGENDA_OPERATING_START")]
    pub operating_start: TimeOfDay,

    /// Latest time of day a block may end.
    #[config(default = "22:00", env = "AGENDA_OPERATING_END")]
    pub operating_end: TimeOfDay,

    /// First day of a visible week ("sunday", "monday", ...).
    #[config(default = "sunday", env = "AGENDA_WEEK_STARTS_ON")]
    pub week_starts_on: WeekStart,
}

impl Default for AgendaConfig {
    fn default() -> Self {
        Self {
            operating_start: TimeOfDay::from_minutes(6 * 60).unwrap_or(TimeOfDay::MIDNIGHT),
            operating_end: TimeOfDay::from_minutes(22 * 60).unwrap_or(TimeOfDay::END_OF_DAY),
            week_starts_on: WeekStart::Sunday,
        }
    }
}

impl AgendaConfig {
    /// Load from the environment and `<data_dir>/agenda.toml`, then validate.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let config = Self::builder()
            .env()
            .file(data_dir.join(CONFIG_FILE))
            .load()
            .map_err(|e| AgendaError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.operating_hours().map(|_| ())
    }

    /// The window every block must fall inside.
    pub fn operating_hours(&self) -> Result<TimeRange> {
        TimeRange::new(self.operating_start, self.operating_end).map_err(|_| {
            AgendaError::Config(format!(
                "operating_start ({}) must be before operating_end ({})",
                self.operating_start, self.operating_end
            ))
        })
    }
}

/// Explicit path, else `AGENDA_DATA_DIR`, else the OS data directory.
pub fn resolve_data_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    ProjectDirs::from("com", "agenda", "agenda")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| AgendaError::Config("Could not determine a data directory".to_string()))
}
