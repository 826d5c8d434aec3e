//! Track request and current-track record
//!
//! Queue entries and the persisted current-track record share one wire shape:
//! `{"uri": "<engine track identifier>", "user": <opaque identity>}`.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Opaque identity of whoever requested a track
///
/// Carried through from the queue entry to the `play`/`end` notifications
/// exactly as received. Never inspected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Requester(pub serde_json::Value);

impl From<&str> for Requester {
    fn from(value: &str) -> Self {
        Requester(serde_json::Value::String(value.to_string()))
    }
}

impl std::fmt::Display for Requester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            serde_json::Value::String(s) => write!(f, "{}", s),
            other => write!(f, "{}", other),
        }
    }
}

/// A track waiting in (or popped from) the work queue
///
/// Also used as the current-track record while the track plays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRequest {
    /// Engine track identifier, e.g. `spotify:track:3Esqxo3D31RCjmdgwBPbOO`
    pub uri: String,

    /// Who asked for it (`user` on the wire)
    #[serde(rename = "user", default)]
    pub requester: Requester,
}

impl TrackRequest {
    pub fn new(uri: impl Into<String>, requester: impl Into<Requester>) -> Self {
        Self {
            uri: uri.into(),
            requester: requester.into(),
        }
    }

    /// Decode a queue entry or current-track record
    ///
    /// Rejects records whose `uri` is missing or blank.
    pub fn from_json(raw: &str) -> Result<Self> {
        let track: TrackRequest = serde_json::from_str(raw)?;
        if track.uri.trim().is_empty() {
            return Err(Error::InvalidInput("track uri is empty".to_string()));
        }
        Ok(track)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
