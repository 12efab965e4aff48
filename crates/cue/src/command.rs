//! Line-oriented control commands read from stdin.

use thiserror::Error;

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Play(String),
    SetVolume(String, f32),
    VolumeUp(String, Option<f32>),
    VolumeDown(String, Option<f32>),
    SetMaster(f32),
    MasterUp(Option<f32>),
    MasterDown(Option<f32>),
    Limits(f32, f32),
    Max(f32),
    Min(f32),
    Status,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("unrecognized command: {0}")]
    Unrecognized(String),
    #[error("not a number: {0}")]
    NotANumber(String),
}

pub const HELP: &str = "commands: play <clip> | vol <clip> <v> | up <clip> [step] | \
down <clip> [step] | master <v>|up [step]|down [step] | limits <min> <max> | \
max <v> | min <v> | status | quit";

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<Command>, ParseError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let cmd = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("play", [clip]) => Command::Play(clip.to_string()),
        ("vol", [clip, v]) => Command::SetVolume(clip.to_string(), number(v)?),
        ("up", [clip]) => Command::VolumeUp(clip.to_string(), None),
        ("up", [clip, step]) => Command::VolumeUp(clip.to_string(), Some(number(step)?)),
        ("down", [clip]) => Command::VolumeDown(clip.to_string(), None),
        ("down", [clip, step]) => Command::VolumeDown(clip.to_string(), Some(number(step)?)),
        ("master", ["up"]) => Command::MasterUp(None),
        ("master", ["up", step]) => Command::MasterUp(Some(number(step)?)),
        ("master", ["down"]) => Command::MasterDown(None),
        ("master", ["down", step]) => Command::MasterDown(Some(number(step)?)),
        ("master", [v]) => Command::SetMaster(number(v)?),
        ("limits", [min, max]) => Command::Limits(number(min)?, number(max)?),
        ("max", [v]) => Command::Max(number(v)?),
        ("min", [v]) => Command::Min(number(v)?),
        ("status", []) => Command::Status,
        ("quit" | "exit", []) => Command::Quit,
        _ => return Err(ParseError::Unrecognized(line.trim().to_string())),
    };
    Ok(Some(cmd))
}

fn number(raw: &str) -> Result<f32, ParseError> {
    raw.parse::<f32>()
        .map_err(|_| ParseError::NotANumber(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(line: &str) -> Command {
        parse(line).unwrap().unwrap()
    }

    #[test]
    fn parses_clip_commands() {
        assert_eq!(ok("play good"), Command::Play("good".into()));
        assert_eq!(ok("  vol bad 0.25 "), Command::SetVolume("bad".into(), 0.25));
        assert_eq!(ok("up good"), Command::VolumeUp("good".into(), None));
        assert_eq!(ok("down good 0.5"), Command::VolumeDown("good".into(), Some(0.5)));
    }

    #[test]
    fn parses_master_forms() {
        assert_eq!(ok("master 1.5"), Command::SetMaster(1.5));
        assert_eq!(ok("master up"), Command::MasterUp(None));
        assert_eq!(ok("MASTER down 0.2"), Command::MasterDown(Some(0.2)));
    }

    #[test]
    fn parses_limit_commands() {
        assert_eq!(ok("limits 0 2.5"), Command::Limits(0.0, 2.5));
        assert_eq!(ok("max 3"), Command::Max(3.0));
        assert_eq!(ok("min 0.1"), Command::Min(0.1));
        assert_eq!(ok("status"), Command::Status);
        assert_eq!(ok("exit"), Command::Quit);
    }

    #[test]
    fn blank_line_is_nothing() {
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn malformed_commands_are_errors() {
        assert!(parse("play").is_err());
        assert!(parse("vol good loud").is_err());
        assert!(parse("limits 1").is_err());
        assert!(parse("dance").is_err());
        assert!(parse("status now").is_err());
    }

    #[test]
    fn errors_name_the_offending_input() {
        let err = parse("vol good loud").unwrap_err();
        assert_eq!(err, ParseError::NotANumber("loud".into()));
        assert_eq!(err.to_string(), "not a number: loud");
        let err = parse("  dance now ").unwrap_err();
        assert_eq!(err.to_string(), "unrecognized command: dance now");
    }
}
