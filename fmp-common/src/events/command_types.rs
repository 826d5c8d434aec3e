//! Remote command wire types
//!
//! Commands arrive as JSON text on the command channel:
//! `{"event": "<pause|resume|stop|set_volume|set_mute>", ...fields}`.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Event names the dispatcher understands
pub const COMMAND_NAMES: [&str; 5] = ["pause", "resume", "stop", "set_volume", "set_mute"];

/// A decoded remote control command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Command {
    Pause,
    Resume,
    /// Skip the current track
    Stop,
    /// Requested level on the mixer's 0-100 scale
    ///
    /// Kept wide so out-of-range requests decode and can be rejected by the
    /// dispatcher rather than vanishing as parse errors.
    SetVolume { volume: i64 },
    SetMute { mute: bool },
}

impl Command {
    /// Wire event name
    pub fn name(&self) -> &'static str {
        match self {
            Command::Pause => "pause",
            Command::Resume => "resume",
            Command::Stop => "stop",
            Command::SetVolume { .. } => "set_volume",
            Command::SetMute { .. } => "set_mute",
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::SetVolume { volume } => write!(f, "set_volume({})", volume),
            Command::SetMute { mute } => write!(f, "set_mute({})", mute),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// Result of decoding one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Command(Command),
    /// Well-formed message with an event name we don't handle
    Unknown(String),
}

/// Decode a raw command message
///
/// Unknown event names are not an error: they decode to [`Decoded::Unknown`]
/// so newer producers can add commands without upsetting older players.
/// Malformed JSON, a missing `event` field, or mistyped command fields are
/// errors.
pub fn decode(raw: &str) -> Result<Decoded> {
    let value: serde_json::Value = serde_json::from_str(raw)?;

    let name = value
        .get("event")
        .and_then(|event| event.as_str())
        .ok_or_else(|| Error::InvalidInput("message has no string 'event' field".to_string()))?
        .to_string();

    if !COMMAND_NAMES.contains(&name.as_str()) {
        return Ok(Decoded::Unknown(name));
    }

    let command: Command = serde_json::from_value(value)?;
    Ok(Decoded::Command(command))
}
