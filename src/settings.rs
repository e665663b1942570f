use anyhow::{bail, Context, Result};
use chrono::NaiveTime;
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::clock::{DAY_MS, MINUTE_MS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LearningTimeSettings {
    /// Gap after which a topic's aggregate restarts instead of accumulating.
    pub staleness_ms: u64,
}

impl Default for LearningTimeSettings {
    fn default() -> Self {
        Self {
            staleness_ms: (10 * DAY_MS) as u64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatingSettings {
    /// Exclusive lower bound of the local time-of-day window.
    pub window_start: NaiveTime,
    /// Exclusive upper bound of the local time-of-day window.
    pub window_end: NaiveTime,
    pub cooldown_ms: u64,
    pub threshold_ms: u64,
}

impl Default for GatingSettings {
    fn default() -> Self {
        Self {
            window_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            window_end: NaiveTime::from_hms_opt(22, 0, 0).unwrap_or_default(),
            cooldown_ms: (30 * DAY_MS) as u64,
            threshold_ms: (5 * MINUTE_MS) as u64,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub learning_time: LearningTimeSettings,
    pub gating: GatingSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.gating.window_start >= self.gating.window_end {
            bail!(
                "survey window start {} must be before window end {}",
                self.gating.window_start,
                self.gating.window_end
            );
        }
        Ok(())
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<Settings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str::<Settings>(&contents) {
                Ok(parsed) if parsed.validate().is_ok() => parsed,
                _ => {
                    warn!(
                        "Ignoring invalid settings at {}; using defaults",
                        path.display()
                    );
                    Settings::default()
                }
            }
        } else {
            Settings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn get(&self) -> Settings {
        *self.read_guard()
    }

    pub fn update(&self, settings: Settings) -> Result<()> {
        settings.validate()?;
        let mut guard = self.write_guard();
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    fn persist(&self, data: &Settings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, Settings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, Settings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SettingsStore {
    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let data: Settings = serde_json::from_str(&contents)?;
        data.validate()?;
        *self.write_guard() = data;
        Ok(())
    }
}
