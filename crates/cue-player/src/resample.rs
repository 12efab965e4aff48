//! One-shot clip resampling.
//!
//! Clips are short and fully decoded before playback, so the whole clip is run through
//! Rubato's sinc resampler at `submit` time. The result is delay-compensated and trimmed
//! to `ceil(frames * dst_rate / src_rate)` frames.

use anyhow::{Result, anyhow};
use audioadapter_buffers::direct::InterleavedSlice;
use rubato::{
    Async, FixedAsync, Indexing, Resampler, SincInterpolationParameters, SincInterpolationType,
    WindowFunction, calculate_cutoff,
};

/// Expected output length in frames for `frames` input frames.
pub fn output_frames(frames: usize, src_rate: u32, dst_rate: u32) -> usize {
    (frames as u64 * dst_rate as u64).div_ceil(src_rate as u64) as usize
}

/// Resample interleaved `input` from `src_rate` to `dst_rate`.
///
/// Returns the input unchanged when the rates match.
pub fn resample_interleaved(
    input: &[f32],
    channels: usize,
    src_rate: u32,
    dst_rate: u32,
    chunk_frames: usize,
) -> Result<Vec<f32>> {
    if channels == 0 || src_rate == 0 || dst_rate == 0 {
        return Err(anyhow!(
            "invalid resample request: {channels} ch, {src_rate} -> {dst_rate} Hz"
        ));
    }
    if src_rate == dst_rate {
        return Ok(input.to_vec());
    }

    let in_frames = input.len() / channels;
    let wanted = output_frames(in_frames, src_rate, dst_rate);
    if wanted == 0 {
        return Ok(Vec::new());
    }

    let f_ratio = dst_rate as f64 / src_rate as f64;

    let sinc_len = 128;
    let window = WindowFunction::BlackmanHarris2;
    let params = SincInterpolationParameters {
        sinc_len,
        f_cutoff: calculate_cutoff(sinc_len, window),
        interpolation: SincInterpolationType::Cubic,
        oversampling_factor: 256,
        window,
    };

    let chunk_in_frames = chunk_frames.max(1);
    let mut resampler = Async::<f32>::new_sinc(
        f_ratio,
        1.1,
        &params,
        chunk_in_frames,
        channels,
        FixedAsync::Input,
    )
    .map_err(|e| anyhow!("resampler init error: {e}"))?;

    let delay = resampler.output_delay();
    let mut scratch = vec![0.0f32; resampler.output_frames_max() * channels];
    let mut chunk = vec![0.0f32; chunk_in_frames * channels];
    let mut out = Vec::with_capacity((wanted + delay) * channels);

    let indexing = Indexing {
        input_offset: 0,
        output_offset: 0,
        active_channels_mask: None,
        partial_len: None,
    };

    // Keep feeding (zero-padded past the end) until the delayed tail has been flushed.
    let mut consumed = 0usize;
    while out.len() < (wanted + delay) * channels {
        let take = in_frames.saturating_sub(consumed).min(chunk_in_frames);
        let start = consumed * channels;
        chunk.fill(0.0);
        chunk[..take * channels].copy_from_slice(&input[start..start + take * channels]);
        consumed += take;

        let input_adapter = InterleavedSlice::new(&chunk, channels, chunk_in_frames)
            .map_err(|e| anyhow!("interleaved slice (input) error: {e}"))?;
        let out_capacity_frames = scratch.len() / channels;
        let mut output_adapter =
            InterleavedSlice::new_mut(&mut scratch, channels, out_capacity_frames)
                .map_err(|e| anyhow!("interleaved slice (output) error: {e}"))?;

        let (_nbr_in, nbr_out) = resampler
            .process_into_buffer(&input_adapter, &mut output_adapter, Some(&indexing))
            .map_err(|e| anyhow!("resampler process error: {e}"))?;
        out.extend_from_slice(&scratch[..nbr_out * channels]);
    }

    let skip = delay * channels;
    out.drain(..skip.min(out.len()));
    out.truncate(wanted * channels);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_frames_rounds_up() {
        assert_eq!(output_frames(441, 44_100, 48_000), 480);
        assert_eq!(output_frames(1, 44_100, 48_000), 2);
        assert_eq!(output_frames(480, 48_000, 44_100), 441);
        assert_eq!(output_frames(0, 8_000, 48_000), 0);
    }

    #[test]
    fn same_rate_is_identity() {
        let input = vec![0.1, -0.2, 0.3, -0.4];
        let out = resample_interleaved(&input, 2, 48_000, 48_000, 256).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn upsampled_length_matches() {
        let input = vec![0.0f32; 2 * 4_410];
        let out = resample_interleaved(&input, 2, 44_100, 48_000, 1024).unwrap();
        assert_eq!(out.len(), 2 * 4_800);
    }

    #[test]
    fn downsampled_length_matches_for_short_clip() {
        // Shorter than one chunk.
        let input = vec![0.5f32; 100];
        let out = resample_interleaved(&input, 1, 48_000, 22_050, 1024).unwrap();
        assert_eq!(out.len(), output_frames(100, 48_000, 22_050));
    }

    #[test]
    fn dc_level_survives_resampling() {
        let input = vec![0.5f32; 8_000];
        let out = resample_interleaved(&input, 1, 8_000, 48_000, 512).unwrap();
        let mid = out[out.len() / 2];
        assert!((mid - 0.5).abs() < 0.01, "mid sample {mid}");
    }

    #[test]
    fn zero_rate_is_an_error() {
        assert!(resample_interleaved(&[0.0], 1, 0, 48_000, 64).is_err());
    }
}
