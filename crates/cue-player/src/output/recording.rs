//! Silent output that records what would have been played.
//!
//! Used by tests and by hosts running without an audio device. Every started voice is
//! appended to a log in start order. The output can refuse voice creation, and it can be
//! held closed so dispatches block until [`RecordingOutput::release`] is called.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use anyhow::{Result, anyhow};

use super::{AudioOutput, PlaybackVoice};
use crate::volume::AtomicVolume;
use crate::wav::WaveFormat;

/// One voice that reached `start`.
#[derive(Clone, Debug)]
pub struct StartedVoice {
    pub format: WaveFormat,
    pub samples: Arc<[u8]>,
    pub volume: f32,
}

/// Shared handle to the started-voice log. Outlives the output that writes to it.
#[derive(Clone, Debug, Default)]
pub struct StartLog(Arc<Mutex<Vec<StartedVoice>>>);

impl StartLog {
    /// Snapshot of all started voices, oldest first.
    pub fn snapshot(&self) -> Vec<StartedVoice> {
        self.0.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, voice: StartedVoice) {
        self.0.lock().unwrap().push(voice);
    }
}

#[derive(Default)]
struct Gate {
    held: Mutex<bool>,
    cv: Condvar,
}

impl Gate {
    fn wait_open(&self) {
        let mut held = self.held.lock().unwrap();
        while *held {
            held = self.cv.wait(held).unwrap();
        }
    }

    fn set(&self, hold: bool) {
        *self.held.lock().unwrap() = hold;
        if !hold {
            self.cv.notify_all();
        }
    }
}

pub struct RecordingOutput {
    started: StartLog,
    master: AtomicVolume,
    refuse_voices: AtomicBool,
    gate: Arc<Gate>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self {
            started: StartLog::default(),
            master: AtomicVolume::new(1.0),
            refuse_voices: AtomicBool::new(false),
            gate: Arc::default(),
        }
    }

    /// Snapshot of all started voices, oldest first.
    pub fn started(&self) -> Vec<StartedVoice> {
        self.started.snapshot()
    }

    pub fn started_count(&self) -> usize {
        self.started.len()
    }

    /// Handle to the log that stays readable after the output is dropped.
    pub fn log(&self) -> StartLog {
        self.started.clone()
    }

    /// Make `create_voice` fail, as a device that cannot play the format would.
    pub fn refuse_voices(&self, refuse: bool) {
        self.refuse_voices.store(refuse, Ordering::Relaxed);
    }

    /// Block every `create_voice` call until [`release`](Self::release).
    pub fn hold(&self) {
        self.gate.set(true);
    }

    pub fn release(&self) {
        self.gate.set(false);
    }

    /// Handle that can release a held output from another thread.
    pub fn release_handle(&self) -> ReleaseHandle {
        ReleaseHandle(self.gate.clone())
    }
}

#[derive(Clone)]
pub struct ReleaseHandle(Arc<Gate>);

impl ReleaseHandle {
    pub fn release(&self) {
        self.0.set(false);
    }
}

impl Default for RecordingOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for RecordingOutput {
    type Voice = RecordingVoice;

    fn create_voice(&self, format: &WaveFormat) -> Result<RecordingVoice> {
        self.gate.wait_open();
        if self.refuse_voices.load(Ordering::Relaxed) {
            return Err(anyhow!("voice creation refused"));
        }
        Ok(RecordingVoice {
            log: self.started.clone(),
            format: format.clone(),
            samples: None,
            volume: 1.0,
        })
    }

    fn master_volume(&self) -> f32 {
        self.master.get()
    }

    fn set_master_volume(&self, volume: f32) {
        self.master.set(volume);
    }
}

pub struct RecordingVoice {
    log: StartLog,
    format: WaveFormat,
    samples: Option<Arc<[u8]>>,
    volume: f32,
}

impl PlaybackVoice for RecordingVoice {
    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn submit(&mut self, samples: Arc<[u8]>) -> Result<()> {
        if self.samples.is_some() {
            return Err(anyhow!("buffer already submitted"));
        }
        self.samples = Some(samples);
        Ok(())
    }

    fn start(self) -> Result<()> {
        let samples = self.samples.ok_or_else(|| anyhow!("start without a buffer"))?;
        self.log.push(StartedVoice {
            format: self.format,
            samples,
            volume: self.volume,
        });
        Ok(())
    }
}
