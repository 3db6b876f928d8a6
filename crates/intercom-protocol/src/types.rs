//! Core protocol types for Intercom's wire format.
//!
//! Every event is a JSON object internally tagged by `"event"`, so a join
//! request looks like `{"event": "join_channel", "channel": "123456"}` and
//! a speaker notice like
//! `{"event": "speaker_update", "id": 3, "speaking": true, "channel": "123456"}`.
//! Audio normally skips JSON entirely and rides in binary frames (see
//! [`crate::frame`]).

use std::fmt;

use intercom_transport::ConnectionId;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// ChannelCode
// ---------------------------------------------------------------------------

/// Number of digits in a channel code.
pub const CHANNEL_CODE_LEN: usize = 6;

/// A validated six-digit channel code.
///
/// The only way to build one is [`ChannelCode::parse`] (or deserializing,
/// which goes through the same check), so holding a `ChannelCode` means
/// the code is well formed. Leading zeros are significant: `"012345"` and
/// `"12345"` are different inputs and only the first is valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChannelCode(String);

impl ChannelCode {
    /// Validates `raw` as a channel code.
    ///
    /// Surrounding whitespace is trimmed; what remains must be exactly
    /// six ASCII digits.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidChannelCode`] with the trimmed input
    /// if validation fails.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let code = raw.trim();
        if code.len() == CHANNEL_CODE_LEN && code.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(code.to_owned()))
        } else {
            Err(ProtocolError::InvalidChannelCode(code.to_owned()))
        }
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ChannelCode {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ChannelCode> for String {
    fn from(code: ChannelCode) -> Self {
        code.0
    }
}

/// The raw `channel` field of a join request.
///
/// Browsers usually send a string, but a numeric input field serialized
/// without quoting arrives as a JSON number. Both are accepted and
/// validated the same way. Any other value still decodes, so that the
/// request is answered with `join_error` rather than dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawChannelCode {
    /// `"channel": "123456"`
    Text(String),
    /// `"channel": 123456`
    Number(u64),
    /// `null`, booleans, floats, negatives, arrays, objects.
    #[cfg(feature = "json")]
    Other(serde_json::Value),
}

impl RawChannelCode {
    /// Returns the field rendered as a string, ready for validation.
    ///
    /// Values other than strings and unsigned integers render as their
    /// JSON text, which never passes validation.
    pub fn to_code_string(&self) -> String {
        match self {
            RawChannelCode::Text(text) => text.clone(),
            RawChannelCode::Number(n) => n.to_string(),
            #[cfg(feature = "json")]
            RawChannelCode::Other(value) => value.to_string(),
        }
    }
}

/// Deserializes a `channel` field that is present on the wire.
///
/// Plain `Option` would turn `"channel": null` into `None`, making it
/// indistinguishable from a missing field.
fn present_channel<'de, D>(deserializer: D) -> Result<Option<RawChannelCode>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    RawChannelCode::deserialize(deserializer).map(Some)
}

// ---------------------------------------------------------------------------
// ClientEvent — client → server
// ---------------------------------------------------------------------------

/// Events a client sends to the server.
///
/// Connect and disconnect are not listed here: they are transport
/// lifecycle, observed by the connection handler rather than decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Join (or switch to) a channel.
    ///
    /// `channel` is optional on the wire so that a request missing it can
    /// be answered with `join_error` instead of being dropped as garbage.
    JoinChannel {
        #[serde(
            default,
            deserialize_with = "present_channel",
            skip_serializing_if = "Option::is_none"
        )]
        channel: Option<RawChannelCode>,
    },

    /// One opaque frame of audio to relay to the rest of the channel.
    AudioChunk { payload: Vec<u8> },

    /// The sender pressed the talk button.
    StartTalking,

    /// The sender released the talk button.
    StopTalking,
}

impl ClientEvent {
    /// Returns the wire name of this event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::JoinChannel { .. } => "join_channel",
            ClientEvent::AudioChunk { .. } => "audio_chunk",
            ClientEvent::StartTalking => "start_talking",
            ClientEvent::StopTalking => "stop_talking",
        }
    }
}

// ---------------------------------------------------------------------------
// ServerEvent — server → client
// ---------------------------------------------------------------------------

/// Events the server sends to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Sent once, right after the connection is accepted.
    ConnectionConfirmed { id: ConnectionId },

    /// The join request succeeded; the sender is now in `channel`.
    JoinSuccess { channel: ChannelCode },

    /// The join request was rejected. `message` is meant for display.
    JoinError { message: String },

    /// Connection `id` started (`speaking: true`) or stopped talking in
    /// `channel`.
    SpeakerUpdate {
        id: ConnectionId,
        speaking: bool,
        channel: ChannelCode,
    },

    /// Relayed audio, byte-for-byte as the speaker sent it.
    AudioChunk { payload: Vec<u8> },
}
