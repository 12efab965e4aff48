//! Engine lifecycle and the host-facing API.
//!
//! Construction order: open the output (fatal on failure), load the bank (best-effort),
//! start the dispatch thread. Dropping the engine closes the queue, waits for the
//! dispatch thread to drain it, then releases the output.
//!
//! ## Shutdown ordering
//! `shutdown` takes the engine by value and `play` borrows it, so no play can be issued
//! while shutdown runs. Hosts sharing the engine through an `Arc` must drop every other
//! handle first. Every `play` that returned before that point is dispatched.
//!
//! The queue itself still accepts pushes after it is closed; such a request is never
//! consumed if the dispatch thread has already seen "closed and empty" and exited.

use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{Context, Result};

use crate::bank::{LoadFailure, SoundBank};
use crate::config::EngineConfig;
use crate::dispatch;
use crate::output::AudioOutput;
use crate::output::cpal_output::CpalOutput;
use crate::queue::PlayQueue;
use crate::volume::{VolumeControl, VolumeError, VolumeLimits};

pub struct Engine<O: AudioOutput = CpalOutput> {
    bank: Arc<SoundBank>,
    output: Arc<O>,
    queue: Arc<PlayQueue>,
    volume: VolumeControl,
    worker: Option<JoinHandle<()>>,
}

impl Engine<CpalOutput> {
    /// Open the configured cpal output device and preload `clips`.
    pub fn open<I, K, P>(clips: I, config: EngineConfig) -> Result<Self>
    where
        I: IntoIterator<Item = (K, P)>,
        K: Into<String>,
        P: AsRef<Path>,
    {
        let output_cfg = config.output.clone();
        Self::start(move || CpalOutput::open(&output_cfg), clips, config)
    }
}

impl<O: AudioOutput> Engine<O> {
    /// Build an engine around the output returned by `open_output`.
    pub fn start<F, I, K, P>(open_output: F, clips: I, config: EngineConfig) -> Result<Self>
    where
        F: FnOnce() -> Result<O>,
        I: IntoIterator<Item = (K, P)>,
        K: Into<String>,
        P: AsRef<Path>,
    {
        let output = Arc::new(open_output().context("open audio output")?);

        let bank = Arc::new(SoundBank::load(clips));
        tracing::info!(
            loaded = bank.len(),
            failed = bank.failures().len(),
            "sound bank ready"
        );

        let queue = Arc::new(PlayQueue::new());
        let worker = dispatch::spawn_dispatcher(queue.clone(), bank.clone(), output.clone())?;

        Ok(Self {
            bank,
            output,
            queue,
            volume: VolumeControl::new(config.limits, config.volume_step),
            worker: Some(worker),
        })
    }

    /// Queue `name` for playback. Never blocks on playback; unknown names are dropped
    /// later by the dispatch thread.
    pub fn play(&self, name: &str) {
        self.queue.push(name);
    }

    /// Set a clip's volume exactly, ignoring the limits.
    ///
    /// Returns the new volume, or `None` when no such clip is loaded.
    pub fn set_clip_volume(&self, name: &str, volume: f32) -> Option<f32> {
        tracing::info!(clip = %name, volume, "clip volume set");
        let asset = self.bank.get(name)?;
        asset.volume().set(volume);
        Some(volume)
    }

    /// Raise a clip's volume by `step` (default step when `None`), clamped to the limits.
    pub fn increase_clip_volume(&self, name: &str, step: Option<f32>) -> Option<f32> {
        let asset = self.bank.get(name)?;
        let volume = asset.volume().update(|v| self.volume.raised(v, step));
        tracing::info!(clip = %name, volume, "clip volume increased");
        Some(volume)
    }

    /// Lower a clip's volume by `step` (default step when `None`), clamped to the limits.
    pub fn decrease_clip_volume(&self, name: &str, step: Option<f32>) -> Option<f32> {
        let asset = self.bank.get(name)?;
        let volume = asset.volume().update(|v| self.volume.lowered(v, step));
        tracing::info!(clip = %name, volume, "clip volume decreased");
        Some(volume)
    }

    pub fn clip_volume(&self, name: &str) -> Option<f32> {
        self.bank.get(name).map(|asset| asset.volume().get())
    }

    /// Set the output master volume exactly, ignoring the limits.
    pub fn set_master_volume(&self, volume: f32) -> f32 {
        self.output.set_master_volume(volume);
        tracing::info!(volume, "master volume set");
        volume
    }

    pub fn increase_master_volume(&self, step: Option<f32>) -> f32 {
        let volume = self.volume.raised(self.output.master_volume(), step);
        self.output.set_master_volume(volume);
        tracing::info!(volume, "master volume increased");
        volume
    }

    pub fn decrease_master_volume(&self, step: Option<f32>) -> f32 {
        let volume = self.volume.lowered(self.output.master_volume(), step);
        self.output.set_master_volume(volume);
        tracing::info!(volume, "master volume decreased");
        volume
    }

    pub fn master_volume(&self) -> f32 {
        self.output.master_volume()
    }

    /// Replace the clamp range. Volumes already set are left as they are.
    pub fn set_volume_limits(&self, min: f32, max: f32) -> Result<VolumeLimits, VolumeError> {
        let limits = VolumeLimits::new(min, max)?;
        self.volume.set_limits(limits);
        tracing::info!(min, max, "volume limits set");
        Ok(limits)
    }

    pub fn set_max_volume(&self, max: f32) -> Result<VolumeLimits, VolumeError> {
        let limits = self.volume.set_max(max)?;
        tracing::info!(max, "max volume set");
        Ok(limits)
    }

    pub fn set_min_volume(&self, min: f32) -> Result<VolumeLimits, VolumeError> {
        let limits = self.volume.set_min(min)?;
        tracing::info!(min, "min volume set");
        Ok(limits)
    }

    pub fn max_volume(&self) -> f32 {
        self.volume.limits().max()
    }

    pub fn min_volume(&self) -> f32 {
        self.volume.limits().min()
    }

    pub fn volume_limits(&self) -> VolumeLimits {
        self.volume.limits()
    }

    pub fn contains_clip(&self, name: &str) -> bool {
        self.bank.contains(name)
    }

    /// Loaded clip names, sorted.
    pub fn clip_names(&self) -> Vec<&str> {
        self.bank.names()
    }

    pub fn load_failures(&self) -> &[LoadFailure] {
        self.bank.failures()
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    /// Stop accepting work, drain queued plays, and release the output.
    pub fn shutdown(self) {
        drop(self);
    }

    fn stop_worker(&mut self) {
        self.queue.close();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("dispatch thread panicked");
            }
        }
    }
}

impl<O: AudioOutput> Drop for Engine<O> {
    fn drop(&mut self) {
        self.stop_worker();
        tracing::debug!("engine stopped");
    }
}
