use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct LoadSettings {
    /// Host sleep between cooperative ticks while a project loads.
    #[serde(default = "LoadSettings::default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Watchdog for a load cycle that never completes.
    #[serde(default = "LoadSettings::default_max_ticks")]
    pub max_ticks: usize,
}

impl LoadSettings {
    const fn default_tick_interval_ms() -> u64 {
        10
    }

    const fn default_max_ticks() -> usize {
        100_000
    }
}

impl Default for LoadSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: Self::default_tick_interval_ms(),
            max_ticks: Self::default_max_ticks(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AutosaveSettings {
    #[serde(default = "AutosaveSettings::default_enabled")]
    pub enabled: bool,
}

impl AutosaveSettings {
    const fn default_enabled() -> bool {
        true
    }
}

impl Default for AutosaveSettings {
    fn default() -> Self {
        Self { enabled: Self::default_enabled() }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShellConfig {
    #[serde(default)]
    pub load: LoadSettings,
    #[serde(default)]
    pub autosave: AutosaveSettings,
}

#[derive(Debug, Clone, Default)]
pub struct ShellConfigOverrides {
    pub tick_interval_ms: Option<u64>,
    pub max_ticks: Option<usize>,
}

impl ShellConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                eprintln!("[config] load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &ShellConfigOverrides) {
        if let Some(tick_interval_ms) = overrides.tick_interval_ms {
            self.load.tick_interval_ms = tick_interval_ms;
        }
        if let Some(max_ticks) = overrides.max_ticks {
            self.load.max_ticks = max_ticks;
        }
    }
}

impl ShellConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.tick_interval_ms.is_none() && self.max_ticks.is_none()
    }
}
