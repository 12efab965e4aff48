//! Playback stage (CPAL output stream).
//!
//! Builds the CPAL output stream whose callback pulls mixed `f32` frames from the
//! [`Mixer`] and converts them to the device sample format.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use cpal::traits::DeviceTrait;

use crate::mixer::Mixer;

/// Build a CPAL output stream rendering from `mixer`.
///
/// The mixer must have been created with `config.channels` channels.
pub fn build_output_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    mixer: Arc<Mixer>,
) -> Result<cpal::Stream> {
    match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(device, config, mixer),
        cpal::SampleFormat::I16 => build_stream::<i16>(device, config, mixer),
        cpal::SampleFormat::I32 => build_stream::<i32>(device, config, mixer),
        cpal::SampleFormat::U16 => build_stream::<u16>(device, config, mixer),
        other => Err(anyhow!("Unsupported sample format: {other:?}")),
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mixer: Arc<Mixer>,
) -> Result<cpal::Stream>
where
    T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32>,
{
    let err_fn = |err| tracing::warn!("stream error: {err}");

    // Scratch grows to the largest callback size seen and is then reused.
    let mut scratch: Vec<f32> = Vec::new();

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _| {
            if scratch.len() < data.len() {
                scratch.resize(data.len(), 0.0);
            }
            let mixed = &mut scratch[..data.len()];
            mixer.render(mixed);
            for (dst, &src) in data.iter_mut().zip(mixed.iter()) {
                *dst = <T as cpal::Sample>::from_sample::<f32>(src.clamp(-1.0, 1.0));
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}
