//! Software mixer feeding the output stream callback.
//!
//! Holds every voice that has been started and not yet finished. Each render call sums
//! the active voices into the device buffer, applying per-voice gain, channel mapping,
//! and the master gain. Voices that run out of samples are dropped.

use std::sync::{Arc, Mutex};

use crate::volume::AtomicVolume;

/// A started voice: interleaved `f32` at the mixer rate plus its read cursor.
#[derive(Debug)]
pub struct ActiveVoice {
    samples: Arc<[f32]>,
    channels: usize,
    gain: f32,
    pos: usize,
}

impl ActiveVoice {
    pub fn new(samples: Vec<f32>, channels: usize, gain: f32) -> Self {
        Self::shared(samples.into(), channels, gain)
    }

    /// Play a buffer that other voices may be reading too.
    pub fn shared(samples: Arc<[f32]>, channels: usize, gain: f32) -> Self {
        Self {
            samples,
            channels: channels.max(1),
            gain,
            pos: 0,
        }
    }

    fn finished(&self) -> bool {
        self.pos + self.channels > self.samples.len()
    }

    /// Sample for output channel `dst_ch` of the current frame.
    ///
    /// Mapping rules:
    /// - mono → stereo: duplicate channel 0
    /// - stereo → mono: average L/R
    /// - other layouts: clamp to the available channels
    fn mapped(&self, dst_channels: usize, dst_ch: usize) -> f32 {
        let frame = &self.samples[self.pos..self.pos + self.channels];
        match (self.channels, dst_channels) {
            (2, 1) => 0.5 * (frame[0] + frame[1]),
            _ => frame[dst_ch.min(self.channels - 1)],
        }
    }
}

pub struct Mixer {
    channels: usize,
    sample_rate: u32,
    master: AtomicVolume,
    voices: Mutex<Vec<ActiveVoice>>,
}

impl Mixer {
    pub fn new(channels: usize, sample_rate: u32) -> Self {
        Self {
            channels: channels.max(1),
            sample_rate,
            master: AtomicVolume::new(1.0),
            voices: Mutex::new(Vec::new()),
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn master_volume(&self) -> f32 {
        self.master.get()
    }

    pub fn set_master_volume(&self, volume: f32) {
        self.master.set(volume);
    }

    pub fn push(&self, voice: ActiveVoice) {
        if voice.finished() {
            return;
        }
        self.voices.lock().unwrap().push(voice);
    }

    pub fn active_voices(&self) -> usize {
        self.voices.lock().unwrap().len()
    }

    /// Mix into `out` (interleaved, `channels` wide). Always writes every sample.
    pub fn render(&self, out: &mut [f32]) {
        out.fill(0.0);
        let master = self.master.get();
        let channels = self.channels;
        let mut voices = self.voices.lock().unwrap();

        for voice in voices.iter_mut() {
            for frame in out.chunks_exact_mut(channels) {
                if voice.finished() {
                    break;
                }
                for (ch, sample) in frame.iter_mut().enumerate() {
                    *sample += voice.mapped(channels, ch) * voice.gain;
                }
                voice.pos += voice.channels;
            }
        }
        voices.retain(|v| !v.finished());
        drop(voices);

        if master != 1.0 {
            for sample in out.iter_mut() {
                *sample *= master;
            }
        }
    }
}
