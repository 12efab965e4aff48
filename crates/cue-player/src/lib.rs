//! Low-latency playback of short preloaded sound cues.
//!
//! An [`Engine`] loads a table of WAVE clips into memory, then plays them on demand from
//! any thread. Requests go through a FIFO queue drained by one dispatch thread, so
//! callers never wait on the audio device.

pub mod bank;
pub mod config;
mod dispatch;
pub mod device;
pub mod engine;
pub mod mixer;
pub mod output;
pub mod pcm;
pub mod playback;
pub mod queue;
pub mod resample;
pub mod volume;
pub mod wav;

pub use config::{EngineConfig, OutputConfig};
pub use engine::Engine;
