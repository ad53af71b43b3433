//! Scheduler configuration.
//!
//! Loaded from an optional TOML file; every field has a default so an empty
//! file (or no file at all) yields `SchedulerConfig::default()`.
//!
//! ```toml
//! lapse_policy = "strict-lapse-reset"
//! utc_offset_minutes = 120
//! maximum_interval_days = 3650
//! ```

use std::fs;
use std::path::Path;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// What a failed review does to a card's repetition count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LapsePolicy {
    /// Keep the repetition count; the card is only postponed by one day.
    #[default]
    SoftLapseRetain,
    /// Reset the repetition count to 0, as classic SM-2 does.
    StrictLapseReset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub lapse_policy: LapsePolicy,
    /// Offset of the local day boundary from UTC, in minutes.
    pub utc_offset_minutes: i32,
    /// Upper bound for `interval_days`.
    pub maximum_interval_days: u32,
}

pub const DEFAULT_MAXIMUM_INTERVAL_DAYS: u32 = 36_500;

const MAX_OFFSET_MINUTES: u32 = 24 * 60;

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lapse_policy: LapsePolicy::default(),
            utc_offset_minutes: 0,
            maximum_interval_days: DEFAULT_MAXIMUM_INTERVAL_DAYS,
        }
    }
}

impl SchedulerConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: SchedulerConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        log::info!("Loaded scheduler config from '{}'", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.utc_offset_minutes.unsigned_abs() >= MAX_OFFSET_MINUTES {
            return Err(Error::invalid(format!(
                "utc_offset_minutes must be within ±{} (got {})",
                MAX_OFFSET_MINUTES - 1,
                self.utc_offset_minutes
            )));
        }
        if self.maximum_interval_days == 0 {
            return Err(Error::invalid("maximum_interval_days must be at least 1"));
        }
        Ok(())
    }

    /// The fixed offset used to find local midnight.
    pub fn day_offset(&self) -> Result<FixedOffset> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                Error::invalid(format!(
                    "utc_offset_minutes out of range: {}",
                    self.utc_offset_minutes
                ))
            })
    }
}
