//! Raw sample bytes to interleaved `f32`.

use thiserror::Error;

use crate::wav::{WAVE_FORMAT_IEEE_FLOAT, WAVE_FORMAT_PCM, WaveFormat};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleEncoding {
    /// Unsigned 8-bit, midpoint 128.
    U8,
    I16,
    I24,
    I32,
    F32,
    F64,
}

impl SampleEncoding {
    pub fn bytes(self) -> usize {
        match self {
            SampleEncoding::U8 => 1,
            SampleEncoding::I16 => 2,
            SampleEncoding::I24 => 3,
            SampleEncoding::I32 | SampleEncoding::F32 => 4,
            SampleEncoding::F64 => 8,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnsupportedFormat {
    #[error("unsupported format tag {0:#06x}")]
    Tag(u16),
    #[error("extensible format without a sub-format")]
    MissingSubFormat,
    #[error("unsupported {bits}-bit samples for tag {tag:#06x}")]
    BitDepth { tag: u16, bits: u16 },
    #[error("zero channels")]
    NoChannels,
    #[error("zero sample rate")]
    NoSampleRate,
}

/// How the bytes of a data chunk are laid out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PcmLayout {
    pub encoding: SampleEncoding,
    pub channels: usize,
    pub sample_rate: u32,
    /// Bytes per frame (at least `channels * encoding.bytes()`).
    pub block_align: usize,
}

impl PcmLayout {
    pub fn from_format(format: &WaveFormat) -> Result<Self, UnsupportedFormat> {
        if format.channels == 0 {
            return Err(UnsupportedFormat::NoChannels);
        }
        if format.sample_rate == 0 {
            return Err(UnsupportedFormat::NoSampleRate);
        }
        let tag = format
            .effective_tag()
            .ok_or(UnsupportedFormat::MissingSubFormat)?;
        let bits = format.bits_per_sample;
        let encoding = match (tag, bits) {
            (WAVE_FORMAT_PCM, 8) => SampleEncoding::U8,
            (WAVE_FORMAT_PCM, 16) => SampleEncoding::I16,
            (WAVE_FORMAT_PCM, 24) => SampleEncoding::I24,
            (WAVE_FORMAT_PCM, 32) => SampleEncoding::I32,
            (WAVE_FORMAT_IEEE_FLOAT, 32) => SampleEncoding::F32,
            (WAVE_FORMAT_IEEE_FLOAT, 64) => SampleEncoding::F64,
            (WAVE_FORMAT_PCM | WAVE_FORMAT_IEEE_FLOAT, _) => {
                return Err(UnsupportedFormat::BitDepth { tag, bits });
            }
            _ => return Err(UnsupportedFormat::Tag(tag)),
        };

        let channels = format.channels as usize;
        // Some writers leave block_align at zero; fall back to the packed size.
        let packed = channels * encoding.bytes();
        let block_align = (format.block_align as usize).max(packed);

        Ok(Self {
            encoding,
            channels,
            sample_rate: format.sample_rate,
            block_align,
        })
    }

    pub fn frames(&self, bytes: usize) -> usize {
        bytes / self.block_align
    }
}

/// Convert whole frames of `bytes` to interleaved `f32` in `[-1.0, 1.0]`.
///
/// A trailing partial frame is ignored.
pub fn decode_interleaved(bytes: &[u8], layout: &PcmLayout) -> Vec<f32> {
    let width = layout.encoding.bytes();
    let frames = layout.frames(bytes.len());
    let mut out = Vec::with_capacity(frames * layout.channels);
    for frame in bytes.chunks_exact(layout.block_align) {
        for ch in 0..layout.channels {
            let at = ch * width;
            out.push(read_sample(&frame[at..at + width], layout.encoding));
        }
    }
    out
}

fn read_sample(b: &[u8], encoding: SampleEncoding) -> f32 {
    match encoding {
        SampleEncoding::U8 => (b[0] as f32 - 128.0) / 128.0,
        SampleEncoding::I16 => i16::from_le_bytes([b[0], b[1]]) as f32 / 32_768.0,
        SampleEncoding::I24 => {
            // Sign-extend through the top byte of an i32.
            let v = i32::from_le_bytes([0, b[0], b[1], b[2]]) >> 8;
            v as f32 / 8_388_608.0
        }
        SampleEncoding::I32 => {
            (i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64 / 2_147_483_648.0) as f32
        }
        SampleEncoding::F32 => f32::from_le_bytes([b[0], b[1], b[2], b[3]]),
        SampleEncoding::F64 => {
            f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f32
        }
    }
}
