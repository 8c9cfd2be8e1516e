use std::{fmt, fs, path::Path, str::FromStr, time::Duration};

use anyhow::{ensure, Context};
use serde::Deserialize;
use tracing::warn;

use crate::{
    catalog::CatalogRevision,
    speed::{Speed, SpeedRange},
    EmptyStepPolicy,
};

pub const DEFAULT_CONFIG_FILE: &str = "visualizer.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_stage_duration_ms: u64,
    pub default_speed: f64,
    pub min_speed: f64,
    pub max_speed: f64,
    pub catalog_revision: CatalogRevision,
    pub empty_step_policy: EmptyStepPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_stage_duration_ms: 500,
            default_speed: Speed::DEFAULT.value(),
            min_speed: SpeedRange::DEFAULT.min(),
            max_speed: SpeedRange::DEFAULT.max(),
            catalog_revision: CatalogRevision::Strict,
            empty_step_policy: EmptyStepPolicy::Immediate,
        }
    }
}

/// Validated runtime parameters of a sequencer.
#[derive(Debug, Clone, Copy)]
pub struct SequencerSettings {
    pub base_stage_duration: Duration,
    pub speed_range: SpeedRange,
    pub default_speed: Speed,
    pub catalog_revision: CatalogRevision,
    pub empty_step_policy: EmptyStepPolicy,
}

impl Default for SequencerSettings {
    fn default() -> Self {
        let settings = Settings::default();
        Self {
            base_stage_duration: Duration::from_millis(settings.base_stage_duration_ms),
            speed_range: SpeedRange::DEFAULT,
            default_speed: Speed::DEFAULT,
            catalog_revision: settings.catalog_revision,
            empty_step_policy: settings.empty_step_policy,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> anyhow::Result<SequencerSettings> {
        ensure!(
            self.base_stage_duration_ms > 0,
            "base_stage_duration_ms must be positive"
        );
        let speed_range = SpeedRange::new(self.min_speed, self.max_speed).with_context(|| {
            format!(
                "invalid speed range {}..={}",
                self.min_speed, self.max_speed
            )
        })?;
        let default_speed = speed_range
            .admit(self.default_speed)
            .context("invalid default_speed")?;

        Ok(SequencerSettings {
            base_stage_duration: Duration::from_millis(self.base_stage_duration_ms),
            speed_range,
            default_speed,
            catalog_revision: self.catalog_revision,
            empty_step_policy: self.empty_step_policy,
        })
    }

    /// Applies `APP__*` overrides; values that fail to parse are logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        apply_override(&lookup, "APP__BASE_STAGE_DURATION_MS", &mut self.base_stage_duration_ms);
        apply_override(&lookup, "APP__DEFAULT_SPEED", &mut self.default_speed);
        apply_override(&lookup, "APP__MIN_SPEED", &mut self.min_speed);
        apply_override(&lookup, "APP__MAX_SPEED", &mut self.max_speed);
        apply_override(&lookup, "APP__CATALOG_REVISION", &mut self.catalog_revision);
        apply_override(&lookup, "APP__EMPTY_STEP_POLICY", &mut self.empty_step_policy);
    }
}

fn apply_override<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, target: &mut T)
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.parse() {
        Ok(parsed) => *target = parsed,
        Err(err) => warn!(value = %raw, "ignoring {key}: {err}"),
    }
}

/// Defaults, overlaid by `path` when it exists and parses, overlaid by the environment.
pub fn load_settings(path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<Settings>(&raw) {
            Ok(file_cfg) => settings = file_cfg,
            Err(err) => warn!("ignoring unreadable config '{}': {err}", path.display()),
        }
    }

    settings.apply_overrides(|key| std::env::var(key).ok());
    settings
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
