//! Audio output capability used by the dispatch thread.
//!
//! An [`AudioOutput`] is an opened device with a master volume. Opening it is the
//! equivalent of creating the master output voice; dropping it releases the device.
//! Each play request asks it for a fresh [`PlaybackVoice`], which is fire-and-forget
//! once started: the output owns completion and cleanup.

use std::sync::Arc;

use anyhow::Result;

use crate::wav::WaveFormat;

pub mod cpal_output;
pub mod recording;

pub trait AudioOutput: Send + Sync + 'static {
    type Voice: PlaybackVoice;

    /// Create a transient voice able to play buffers in `format`.
    ///
    /// Fails when the output cannot play the format; the request is then dropped.
    fn create_voice(&self, format: &WaveFormat) -> Result<Self::Voice>;

    fn master_volume(&self) -> f32;

    /// Set the output-level gain. No clamping is applied.
    fn set_master_volume(&self, volume: f32);
}

pub trait PlaybackVoice: Send {
    fn set_volume(&mut self, volume: f32);

    /// Submit the whole clip as a single end-of-stream buffer.
    fn submit(&mut self, samples: Arc<[u8]>) -> Result<()>;

    /// Start playback and release the voice to the output.
    fn start(self) -> Result<()>;
}
