//! Dispatch thread: turns queued clip names into started voices.
//!
//! The thread is the only consumer of the [`PlayQueue`] and the only caller that creates
//! voices on the output. It exits once the queue is closed and drained.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};

use crate::bank::SoundBank;
use crate::output::{AudioOutput, PlaybackVoice};
use crate::queue::PlayQueue;

/// Spawn the dispatch thread.
pub(crate) fn spawn_dispatcher<O: AudioOutput>(
    queue: Arc<PlayQueue>,
    bank: Arc<SoundBank>,
    output: Arc<O>,
) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("cue-dispatch".to_string())
        .spawn(move || dispatch_loop(&queue, &bank, &*output))
        .context("spawn dispatch thread")
}

/// Main loop for the dispatch thread.
fn dispatch_loop<O: AudioOutput>(queue: &PlayQueue, bank: &SoundBank, output: &O) {
    let mut dispatched = 0u64;
    while let Some(name) = queue.pop_blocking() {
        match dispatch_one(bank, output, &name) {
            Ok(true) => dispatched += 1,
            Ok(false) => {}
            Err(e) => tracing::trace!(clip = %name, "dispatch dropped: {e:#}"),
        }
    }
    tracing::debug!(dispatched, "dispatch thread stopped");
}

/// Play one clip. Returns `Ok(false)` for names not in the bank.
fn dispatch_one<O: AudioOutput>(bank: &SoundBank, output: &O, name: &str) -> Result<bool> {
    let Some(asset) = bank.get(name) else {
        return Ok(false);
    };

    let mut voice = output.create_voice(asset.format()).context("create voice")?;
    voice.set_volume(asset.volume().get());
    voice.submit(asset.samples()).context("submit buffer")?;
    voice.start().context("start voice")?;
    Ok(true)
}
