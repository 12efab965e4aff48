//! cue: play short preloaded sound cues on demand.
//!
//! Loads the clip table from a TOML config, opens the output device, then reads one
//! control command per line from stdin (`play good`, `vol bad 0.3`, `master up`, ...).
//! `quit`, end of input, or Ctrl-C stop the engine; queued plays are drained first.

mod cli;
mod command;
mod config;

use std::io::BufRead;
use std::path::Path;

use anyhow::Result;
use clap::Parser;
use crossbeam_channel::{Receiver, Sender};
use tracing_subscriber::EnvFilter;

use cue_player::Engine;
use cue_player::output::AudioOutput;
use cue_player::output::recording::RecordingOutput;

use command::Command;
use config::CueConfig;

enum Input {
    Line(String),
    Eof,
    Interrupt,
}

fn main() -> Result<()> {
    let args = cli::Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,cue=info,cue_player=info")
        }))
        .init();

    if args.list_devices {
        cue_player::device::list_devices(&cpal::default_host())?;
        return Ok(());
    }

    let cfg = CueConfig::load_or_init(&args.config)?;
    let base = args
        .config
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let mut clips = cfg.resolved_clips(base);
    clips.extend(args.clips.iter().cloned());

    let mut engine_cfg = cfg.engine_config()?;
    if let Some(device) = args.device.clone() {
        engine_cfg.output.device = Some(device);
    }

    let (tx, rx) = crossbeam_channel::unbounded();
    spawn_stdin_reader(tx.clone());
    let _ = ctrlc::set_handler(move || {
        let _ = tx.send(Input::Interrupt);
    });

    if args.no_audio {
        let engine = Engine::start(|| Ok(RecordingOutput::new()), clips, engine_cfg)?;
        run(engine, &cfg, &rx);
    } else {
        let engine = Engine::open(clips, engine_cfg)?;
        run(engine, &cfg, &rx);
    }
    Ok(())
}

fn spawn_stdin_reader(tx: Sender<Input>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(Input::Line(line)).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    tracing::warn!("stdin read error: {e}");
                    break;
                }
            }
        }
        let _ = tx.send(Input::Eof);
    });
}

/// Apply configured initial volumes, then serve commands until asked to stop.
fn run<O: AudioOutput>(engine: Engine<O>, cfg: &CueConfig, rx: &Receiver<Input>) {
    if let Some(master) = cfg.master_volume {
        engine.set_master_volume(master);
    }
    for (name, volume) in &cfg.volumes {
        engine.set_clip_volume(name, *volume);
    }
    tracing::info!(clips = ?engine.clip_names(), "ready; {}", command::HELP);

    while let Ok(input) = rx.recv() {
        let line = match input {
            Input::Line(line) => line,
            Input::Eof => break,
            Input::Interrupt => {
                tracing::info!("interrupted");
                break;
            }
        };
        match command::parse(&line) {
            Ok(Some(Command::Quit)) => break,
            Ok(Some(cmd)) => apply(&engine, cmd),
            Ok(None) => {}
            Err(e) => tracing::warn!("{e}; {}", command::HELP),
        }
    }

    tracing::info!("shutting down");
    engine.shutdown();
}

fn apply<O: AudioOutput>(engine: &Engine<O>, cmd: Command) {
    match cmd {
        Command::Play(name) => engine.play(&name),
        Command::SetVolume(name, v) => {
            engine.set_clip_volume(&name, v);
        }
        Command::VolumeUp(name, step) => {
            engine.increase_clip_volume(&name, step);
        }
        Command::VolumeDown(name, step) => {
            engine.decrease_clip_volume(&name, step);
        }
        Command::SetMaster(v) => {
            engine.set_master_volume(v);
        }
        Command::MasterUp(step) => {
            engine.increase_master_volume(step);
        }
        Command::MasterDown(step) => {
            engine.decrease_master_volume(step);
        }
        Command::Limits(min, max) => {
            if let Err(e) = engine.set_volume_limits(min, max) {
                tracing::warn!("{e}");
            }
        }
        Command::Max(max) => {
            if let Err(e) = engine.set_max_volume(max) {
                tracing::warn!("{e}");
            }
        }
        Command::Min(min) => {
            if let Err(e) = engine.set_min_volume(min) {
                tracing::warn!("{e}");
            }
        }
        Command::Status => print_status(engine),
        Command::Quit => {}
    }
}

fn print_status<O: AudioOutput>(engine: &Engine<O>) {
    println!(
        "master {:.2} (limits {:.2}..{:.2})",
        engine.master_volume(),
        engine.min_volume(),
        engine.max_volume()
    );
    for name in engine.clip_names() {
        let volume = engine.clip_volume(name).unwrap_or_default();
        println!("  {name}: {volume:.2}");
    }
    for failure in engine.load_failures() {
        println!("  {} (not loaded: {})", failure.name, failure.error);
    }
}
