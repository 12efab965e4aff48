use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "cue", version, about = "Play preloaded sound cues from stdin commands")]
pub struct Args {
    /// Config file (TOML); a default one is written if it does not exist
    #[arg(long, default_value = "cue.toml")]
    pub config: PathBuf,

    /// List output devices and exit
    #[arg(long)]
    pub list_devices: bool,

    /// Use a specific output device by substring match (overrides the config)
    #[arg(long)]
    pub device: Option<String>,

    /// Run without an audio device; plays are logged instead of heard
    #[arg(long)]
    pub no_audio: bool,

    /// Add or replace a clip, e.g. --clip good=sounds/good.wav (repeatable)
    #[arg(long = "clip", value_name = "NAME=PATH", value_parser = parse_clip)]
    pub clips: Vec<(String, PathBuf)>,
}

fn parse_clip(raw: &str) -> Result<(String, PathBuf), String> {
    let (name, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=PATH, got {raw:?}"))?;
    let name = name.trim();
    if name.is_empty() || path.is_empty() {
        return Err(format!("expected NAME=PATH, got {raw:?}"));
    }
    Ok((name.to_string(), PathBuf::from(path)))
}
