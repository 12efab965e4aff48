//! Audio output on a real device via CPAL.
//!
//! The CPAL stream is built and owned by a `cue-output` thread (streams are not `Send`
//! on every platform). That thread reports readiness over a channel, then waits until
//! the output is dropped. Voices are decoded to `f32` and resampled to the device rate
//! on `submit`, then handed to the shared [`Mixer`] on `start`. A clip is converted once
//! per output; later plays of the same bank buffer reuse the result.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result, anyhow};
use cpal::traits::{DeviceTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};

use super::{AudioOutput, PlaybackVoice};
use crate::config::OutputConfig;
use crate::mixer::{ActiveVoice, Mixer};
use crate::pcm::{self, PcmLayout};
use crate::wav::WaveFormat;
use crate::{device, playback, resample};

pub struct CpalOutput {
    mixer: Arc<Mixer>,
    converted: Arc<ConvertedClips>,
    resample_chunk_frames: usize,
    shutdown_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl CpalOutput {
    /// Open the configured device and start its output stream.
    pub fn open(cfg: &OutputConfig) -> Result<Self> {
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<Arc<Mixer>>>(1);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);

        let cfg_thread = cfg.clone();
        let thread = thread::Builder::new()
            .name("cue-output".to_string())
            .spawn(move || output_thread_main(cfg_thread, ready_tx, shutdown_rx))
            .context("spawn output thread")?;

        let mixer = match ready_rx.recv() {
            Ok(Ok(mixer)) => mixer,
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(anyhow!("output thread exited before the stream started"));
            }
        };

        Ok(Self {
            mixer,
            converted: Arc::default(),
            resample_chunk_frames: cfg.resample_chunk_frames,
            shutdown_tx: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.mixer.sample_rate()
    }

    pub fn channels(&self) -> usize {
        self.mixer.channels()
    }

    /// Voices currently mixing into the stream.
    pub fn active_voices(&self) -> usize {
        self.mixer.active_voices()
    }
}

fn output_thread_main(
    cfg: OutputConfig,
    ready_tx: Sender<Result<Arc<Mixer>>>,
    shutdown_rx: Receiver<()>,
) {
    let (stream, mixer) = match start_stream(&cfg) {
        Ok(started) => started,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };
    if ready_tx.send(Ok(mixer)).is_err() {
        return;
    }

    // Either an explicit signal or the sender being dropped ends the stream.
    let _ = shutdown_rx.recv();
    drop(stream);
    tracing::debug!("output stream closed");
}

fn start_stream(cfg: &OutputConfig) -> Result<(cpal::Stream, Arc<Mixer>)> {
    let host = cpal::default_host();
    let device = device::pick_device(&host, cfg.device.as_deref())?;
    let config = device::pick_output_config(&device, cfg.sample_rate)?;
    let stream_config: cpal::StreamConfig = config.clone().into();

    let mixer = Arc::new(Mixer::new(
        stream_config.channels as usize,
        stream_config.sample_rate,
    ));
    let stream = playback::build_output_stream(
        &device,
        &stream_config,
        config.sample_format(),
        mixer.clone(),
    )
    .context("build output stream")?;
    stream.play().context("start output stream")?;

    tracing::info!(
        device = %device.description().map(|d| d.to_string()).unwrap_or_default(),
        rate_hz = stream_config.sample_rate,
        channels = stream_config.channels,
        format = ?config.sample_format(),
        "audio output opened"
    );
    Ok((stream, mixer))
}

impl AudioOutput for CpalOutput {
    type Voice = CpalVoice;

    fn create_voice(&self, format: &WaveFormat) -> Result<CpalVoice> {
        let layout = PcmLayout::from_format(format)?;
        Ok(CpalVoice {
            mixer: self.mixer.clone(),
            converted: self.converted.clone(),
            layout,
            resample_chunk_frames: self.resample_chunk_frames,
            volume: 1.0,
            samples: None,
        })
    }

    fn master_volume(&self) -> f32 {
        self.mixer.master_volume()
    }

    fn set_master_volume(&self, volume: f32) {
        self.mixer.set_master_volume(volume);
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Clip buffers already converted to the mixer rate.
///
/// Keyed by the address of the source buffer. The entry keeps that buffer alive, so the
/// address cannot be reused by another clip while it is cached.
#[derive(Default)]
struct ConvertedClips(Mutex<HashMap<usize, (Arc<[u8]>, Arc<[f32]>)>>);

impl ConvertedClips {
    fn get_or_convert(
        &self,
        source: &Arc<[u8]>,
        convert: impl FnOnce(&[u8]) -> Result<Vec<f32>>,
    ) -> Result<Arc<[f32]>> {
        let key = Arc::as_ptr(source).cast::<u8>() as usize;
        if let Some((_, converted)) = self.0.lock().unwrap().get(&key) {
            return Ok(converted.clone());
        }
        let converted: Arc<[f32]> = convert(source)?.into();
        self.0.lock().unwrap().insert(key, (source.clone(), converted.clone()));
        Ok(converted)
    }
}

pub struct CpalVoice {
    mixer: Arc<Mixer>,
    converted: Arc<ConvertedClips>,
    layout: PcmLayout,
    resample_chunk_frames: usize,
    volume: f32,
    /// Interleaved samples at the mixer rate, set by `submit`.
    samples: Option<Arc<[f32]>>,
}

impl PlaybackVoice for CpalVoice {
    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn submit(&mut self, samples: Arc<[u8]>) -> Result<()> {
        if self.samples.is_some() {
            return Err(anyhow!("buffer already submitted"));
        }
        let layout = &self.layout;
        let converted = self.converted.get_or_convert(&samples, |bytes| {
            let decoded = pcm::decode_interleaved(bytes, layout);
            resample::resample_interleaved(
                &decoded,
                layout.channels,
                layout.sample_rate,
                self.mixer.sample_rate(),
                self.resample_chunk_frames,
            )
        })?;
        self.samples = Some(converted);
        Ok(())
    }

    fn start(self) -> Result<()> {
        let samples = self.samples.ok_or_else(|| anyhow!("start without a buffer"))?;
        let voice = ActiveVoice::shared(samples, self.layout.channels, self.volume);
        self.mixer.push(voice);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn each_source_buffer_is_converted_once() {
        let clips = ConvertedClips::default();
        let calls = Cell::new(0);
        let convert = |bytes: &[u8]| -> Result<Vec<f32>> {
            calls.set(calls.get() + 1);
            Ok(bytes.iter().map(|&b| f32::from(b)).collect())
        };

        let good: Arc<[u8]> = Arc::from(&[1u8, 2][..]);
        let first = clips.get_or_convert(&good, convert).unwrap();
        let second = clips.get_or_convert(&good, convert).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(&*first, &[1.0, 2.0]);
        assert_eq!(calls.get(), 1);

        // Equal contents in a different buffer are a different clip.
        let copy: Arc<[u8]> = Arc::from(&[1u8, 2][..]);
        clips.get_or_convert(&copy, convert).unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn failed_conversion_is_not_cached() {
        let clips = ConvertedClips::default();
        let source: Arc<[u8]> = Arc::from(&[0u8][..]);
        assert!(clips.get_or_convert(&source, |_| Err(anyhow!("resample"))).is_err());
        let ok = clips.get_or_convert(&source, |_| Ok(vec![0.5])).unwrap();
        assert_eq!(&*ok, &[0.5]);
    }
}
