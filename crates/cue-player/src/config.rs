use crate::volume::{DEFAULT_VOLUME_STEP, VolumeLimits};

/// Engine-wide settings fixed at construction (limits stay adjustable afterwards).
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Initial clamp range for stepped volume changes.
    pub limits: VolumeLimits,
    /// Step used when increase/decrease calls pass `None`.
    pub volume_step: f32,
    /// Output device settings (ignored by non-device outputs).
    pub output: OutputConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            limits: VolumeLimits::default(),
            volume_step: DEFAULT_VOLUME_STEP,
            output: OutputConfig::default(),
        }
    }
}

/// Output device tuning.
#[derive(Clone, Debug)]
pub struct OutputConfig {
    /// Output device name substring; `None` selects the host default.
    pub device: Option<String>,
    /// Preferred device sample rate; `None` picks the highest supported.
    pub sample_rate: Option<u32>,
    /// Resampler input chunk size in frames, used when a clip's rate differs from the
    /// device rate.
    pub resample_chunk_frames: usize,
}

impl Default for OutputConfig {
    /// Defaults tuned for short clips on common devices.
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: Some(48_000),
            resample_chunk_frames: 1024,
        }
    }
}
