//! RIFF/WAVE container decoding.
//!
//! Reads a chunked container into a [`WaveFormat`] descriptor plus the raw bytes of the
//! `data` chunk. Sample bytes are not interpreted here; the output backend decides what
//! it can play.
//!
//! Layout (all integers little-endian):
//! - `"RIFF"`, u32 overall size (ignored), `"WAVE"`
//! - `"fmt "`, u32 size, format description
//! - zero or more `id`, u32 size, payload chunks (skipped)
//! - `"data"`, u32 size, raw samples
//!
//! Chunks after `data` are never read.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use thiserror::Error;

pub const RIFF_TAG: [u8; 4] = *b"RIFF";
pub const WAVE_TAG: [u8; 4] = *b"WAVE";
pub const FMT_ID: [u8; 4] = *b"fmt ";
pub const DATA_ID: [u8; 4] = *b"data";

pub const WAVE_FORMAT_PCM: u16 = 0x0001;
pub const WAVE_FORMAT_IEEE_FLOAT: u16 = 0x0003;
pub const WAVE_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// Minimum size of a `fmt ` chunk (tag through bits per sample).
const FMT_BASE_LEN: u32 = 16;

/// Errors produced while decoding a container.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("not a RIFF container (found tag {found:?})")]
    NotRiff { found: [u8; 4] },

    #[error("not a WAVE file (found form type {found:?})")]
    NotWave { found: [u8; 4] },

    #[error("expected fmt chunk, found {found:?}")]
    MissingFormat { found: [u8; 4] },

    #[error("fmt chunk too short: {0} bytes")]
    FormatTooShort(u32),

    #[error("stream ended inside {0}")]
    Truncated(&'static str),

    #[error("no data chunk before end of stream")]
    MissingData,
}

/// Format description read from the `fmt ` chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WaveFormat {
    pub format_tag: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub avg_bytes_per_sec: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    /// Format-specific bytes following the `cbSize` field (empty for plain PCM).
    pub extra: Vec<u8>,
}

impl WaveFormat {
    /// Effective format tag, looking through `WAVE_FORMAT_EXTENSIBLE` to its sub-format.
    ///
    /// The sub-format GUID starts at offset 6 of the extension; its first two bytes carry
    /// the wrapped tag. Returns `None` for an extensible header with a short extension.
    pub fn effective_tag(&self) -> Option<u16> {
        if self.format_tag != WAVE_FORMAT_EXTENSIBLE {
            return Some(self.format_tag);
        }
        if self.extra.len() < 22 {
            return None;
        }
        Some(u16::from_le_bytes([self.extra[6], self.extra[7]]))
    }
}

/// A decoded container: format plus the exact bytes of the data chunk.
#[derive(Clone, Debug)]
pub struct DecodedWave {
    pub format: WaveFormat,
    pub samples: Vec<u8>,
}

/// Open and decode a file from disk.
pub fn load_file(path: &Path) -> Result<DecodedWave, DecodeError> {
    let file = File::open(path)?;
    decode(BufReader::new(file))
}

/// Decode a container from any byte stream.
pub fn decode<R: Read>(mut r: R) -> Result<DecodedWave, DecodeError> {
    let riff = read_tag(&mut r, "container tag")?;
    if riff != RIFF_TAG {
        return Err(DecodeError::NotRiff { found: riff });
    }
    let _riff_size = read_u32(&mut r, "container size")?;

    let wave = read_tag(&mut r, "form type")?;
    if wave != WAVE_TAG {
        return Err(DecodeError::NotWave { found: wave });
    }

    let fmt_id = read_tag(&mut r, "fmt chunk header")?;
    if fmt_id != FMT_ID {
        return Err(DecodeError::MissingFormat { found: fmt_id });
    }
    let fmt_size = read_u32(&mut r, "fmt chunk header")?;
    let format = read_format(&mut r, fmt_size)?;

    loop {
        let id = match read_chunk_id(&mut r)? {
            Some(id) => id,
            None => return Err(DecodeError::MissingData),
        };
        let size = read_u32(&mut r, "chunk header")?;
        if id == DATA_ID {
            // Grow with the bytes actually present; the declared size is untrusted.
            let mut samples = Vec::new();
            r.by_ref().take(u64::from(size)).read_to_end(&mut samples)?;
            if samples.len() < size as usize {
                return Err(DecodeError::Truncated("data chunk"));
            }
            return Ok(DecodedWave { format, samples });
        }
        tracing::trace!(chunk = %String::from_utf8_lossy(&id), size, "skipping chunk");
        skip(&mut r, u64::from(size))?;
    }
}

fn read_format<R: Read>(r: &mut R, fmt_size: u32) -> Result<WaveFormat, DecodeError> {
    if fmt_size < FMT_BASE_LEN {
        return Err(DecodeError::FormatTooShort(fmt_size));
    }
    let mut base = [0u8; FMT_BASE_LEN as usize];
    read_exact(r, &mut base, "fmt chunk")?;

    let mut format = WaveFormat {
        format_tag: u16::from_le_bytes([base[0], base[1]]),
        channels: u16::from_le_bytes([base[2], base[3]]),
        sample_rate: u32::from_le_bytes([base[4], base[5], base[6], base[7]]),
        avg_bytes_per_sec: u32::from_le_bytes([base[8], base[9], base[10], base[11]]),
        block_align: u16::from_le_bytes([base[12], base[13]]),
        bits_per_sample: u16::from_le_bytes([base[14], base[15]]),
        extra: Vec::new(),
    };

    let mut remaining = fmt_size - FMT_BASE_LEN;
    if remaining >= 2 {
        let mut cb = [0u8; 2];
        read_exact(r, &mut cb, "fmt chunk")?;
        remaining -= 2;
        let extra_len = u32::from(u16::from_le_bytes(cb)).min(remaining);
        format.extra = vec![0u8; extra_len as usize];
        read_exact(r, &mut format.extra, "fmt chunk")?;
        remaining -= extra_len;
    }
    skip(r, u64::from(remaining))?;

    Ok(format)
}

/// Read the next chunk identifier, or `None` on a clean end of stream.
///
/// A stream that ends partway through an identifier counts as truncated.
fn read_chunk_id<R: Read>(r: &mut R) -> Result<Option<[u8; 4]>, DecodeError> {
    let mut id = [0u8; 4];
    let mut filled = 0;
    while filled < id.len() {
        match r.read(&mut id[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    match filled {
        0 => Ok(None),
        4 => Ok(Some(id)),
        _ => Err(DecodeError::Truncated("chunk header")),
    }
}

fn read_tag<R: Read>(r: &mut R, what: &'static str) -> Result<[u8; 4], DecodeError> {
    let mut tag = [0u8; 4];
    read_exact(r, &mut tag, what)?;
    Ok(tag)
}

fn read_u32<R: Read>(r: &mut R, what: &'static str) -> Result<u32, DecodeError> {
    Ok(u32::from_le_bytes(read_tag(r, what)?))
}

fn read_exact<R: Read>(r: &mut R, buf: &mut [u8], what: &'static str) -> Result<(), DecodeError> {
    r.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => DecodeError::Truncated(what),
        _ => DecodeError::Io(e),
    })
}

fn skip<R: Read>(r: &mut R, len: u64) -> Result<(), DecodeError> {
    let copied = io::copy(&mut r.by_ref().take(len), &mut io::sink())?;
    if copied < len {
        return Err(DecodeError::Truncated("skipped chunk"));
    }
    Ok(())
}
