//! Coordinator configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Who may have audio relayed in a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AudioPolicy {
    /// Relay audio from any member, speaker or not.
    #[default]
    Permissive,

    /// Relay audio only from the channel's recorded speaker; everything
    /// else is dropped.
    SpeakerOnly,
}

impl fmt::Display for AudioPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioPolicy::Permissive => f.write_str("permissive"),
            AudioPolicy::SpeakerOnly => f.write_str("speaker-only"),
        }
    }
}

impl FromStr for AudioPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(AudioPolicy::Permissive),
            "speaker-only" | "speaker_only" => Ok(AudioPolicy::SpeakerOnly),
            other => Err(format!(
                "unknown audio policy {other:?} (expected \"permissive\" or \"speaker-only\")"
            )),
        }
    }
}

/// Configuration for a [`Coordinator`](crate::Coordinator).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Relay policy for `audio_chunk`.
    pub audio_policy: AudioPolicy,
}
