//! Operator commands
//!
//! Every control surface (keyboard, Unix socket, MQTT) produces the same
//! [`Command`] values; the scheduler applies them between passes.

use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;

use crate::effect::Orientation;

/// Strength change per arrow-key press
pub const STRENGTH_STEP: f64 = 0.05;
/// Tuning change per arrow-key press
pub const THRESHOLD_STEP: f64 = 0.02;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetStrength(f64),
    /// New tuning value (before the threshold remap)
    SetThreshold(f64),
    SetVertical(bool),
    ToggleOrientation,
    NudgeStrength(f64),
    NudgeThreshold(f64),
    Pause,
    Resume,
    TogglePause,
    /// Restart from the current source image
    Reload,
    /// Switch to another source image
    Load(PathBuf),
    Quit,
}

/// Anything that can hand over pending commands without blocking
pub trait CommandSource {
    fn poll(&mut self) -> Vec<Command>;
}

/// Parse one line of the text protocol, e.g. `strength 0.4` or `pause`
pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match (word.to_lowercase().as_str(), rest) {
        ("strength" | "s", v) => v.parse().ok().map(Command::SetStrength),
        ("threshold" | "t", v) => v.parse().ok().map(Command::SetThreshold),
        ("vertical" | "v", "") => Some(Command::ToggleOrientation),
        ("vertical" | "v", v) => parse_bool(v).map(Command::SetVertical),
        ("orientation", v) => parse_orientation(v).map(|o| Command::SetVertical(o.is_vertical())),
        ("pause", "") => Some(Command::Pause),
        ("resume" | "play", "") => Some(Command::Resume),
        ("reload" | "reset" | "r", "") => Some(Command::Reload),
        ("load" | "image", path) if !path.is_empty() => Some(Command::Load(PathBuf::from(path))),
        ("q" | "quit" | "exit", "") => Some(Command::Quit),
        _ => None,
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn parse_orientation(value: &str) -> Option<Orientation> {
    match value.to_lowercase().as_str() {
        "vertical" | "v" => Some(Orientation::Vertical),
        "horizontal" | "h" => Some(Orientation::Horizontal),
        _ => None,
    }
}

/// JSON form of a parameter change: `{"name": "strength", "value": 0.4}`
#[derive(Deserialize)]
struct JsonCommand {
    name: String,
    #[serde(default)]
    value: Value,
}

/// Parse a message payload: JSON if it looks like JSON, the text protocol
/// otherwise
pub fn parse_payload(payload: &str) -> Option<Command> {
    let payload = payload.trim();
    if payload.starts_with('{') {
        let json: JsonCommand = serde_json::from_str(payload).ok()?;
        let line = match json.value {
            Value::Null => json.name,
            Value::String(s) => format!("{} {}", json.name, s),
            other => format!("{} {}", json.name, other),
        };
        return parse_command(&line);
    }
    parse_command(payload)
}
