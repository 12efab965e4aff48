//! Configuration loading and parsing.
//!
//! The host reads a TOML file describing the clip table, initial volumes, and output
//! settings. A missing file is replaced by a written default.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use cue_player::volume::{DEFAULT_VOLUME_STEP, VolumeLimits};
use cue_player::{EngineConfig, OutputConfig};

/// Top-level host configuration loaded from TOML.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CueConfig {
    pub master_volume: Option<f32>,
    pub min_volume: Option<f32>,
    pub max_volume: Option<f32>,
    pub volume_step: Option<f32>,
    /// Output device substring.
    pub device: Option<String>,
    /// Preferred device sample rate.
    pub sample_rate: Option<u32>,
    /// Clip name -> WAVE file path (relative paths resolve against the config file).
    #[serde(default)]
    pub clips: BTreeMap<String, PathBuf>,
    /// Initial per-clip volumes, applied after loading.
    #[serde(default)]
    pub volumes: BTreeMap<String, f32>,
}

impl Default for CueConfig {
    fn default() -> Self {
        let clips = ["good", "bad", "overlap"]
            .into_iter()
            .map(|name| (name.to_string(), PathBuf::from(format!("sounds/{name}.wav"))))
            .collect();
        let volumes = [("good", 0.3), ("bad", 0.3), ("overlap", 0.6)]
            .into_iter()
            .map(|(name, v)| (name.to_string(), v))
            .collect();
        Self {
            clips,
            volumes,
            master_volume: Some(1.0),
            min_volume: Some(0.0),
            max_volume: Some(2.5),
            volume_step: Some(DEFAULT_VOLUME_STEP),
            device: None,
            sample_rate: None,
        }
    }
}

impl CueConfig {
    /// Load configuration from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            std::fs::read_to_string(path).with_context(|| format!("read config {:?}", path))?;
        let cfg = toml::from_str::<CueConfig>(&raw)
            .with_context(|| format!("parse config {:?}", path))?;
        Ok(cfg)
    }

    /// Load `path`, writing the default config there first if it does not exist.
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }
        let cfg = Self::default();
        let raw = toml::to_string_pretty(&cfg).context("serialize default config")?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).with_context(|| format!("create {:?}", dir))?;
        }
        std::fs::write(path, raw).with_context(|| format!("write config {:?}", path))?;
        tracing::info!(path = ?path, "wrote default config");
        Ok(cfg)
    }

    /// Clip table with relative paths joined onto `base`.
    pub fn resolved_clips(&self, base: &Path) -> Vec<(String, PathBuf)> {
        self.clips
            .iter()
            .map(|(name, path)| (name.clone(), resolve_path(base, path)))
            .collect()
    }

    /// Engine settings; missing values fall back to the engine defaults.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let defaults = VolumeLimits::default();
        let limits = VolumeLimits::new(
            self.min_volume.unwrap_or(defaults.min()),
            self.max_volume.unwrap_or(defaults.max()),
        )
        .context("min_volume/max_volume")?;

        let defaults = OutputConfig::default();
        let output = OutputConfig {
            device: self.device.clone(),
            sample_rate: self.sample_rate.or(defaults.sample_rate),
            ..defaults
        };

        Ok(EngineConfig {
            limits,
            volume_step: self.volume_step.unwrap_or(DEFAULT_VOLUME_STEP),
            output,
        })
    }
}

fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
