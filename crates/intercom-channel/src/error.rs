//! Error types for the channel layer.
//!
//! None of these are fatal. Each is recovered by the dispatcher in the
//! handler for the event that raised it; only [`ChannelError::InvalidChannelCode`]
//! is ever reported back to the client.

use intercom_protocol::ChannelCode;
use intercom_transport::ConnectionId;

/// Errors that can occur while applying a client event.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The join request had no channel field (`code: None`) or the code
    /// was not exactly six digits.
    #[error("invalid channel code {code:?}")]
    InvalidChannelCode { code: Option<String> },

    /// The connection sent a channel-scoped event without being in a
    /// channel.
    #[error("{0} is not in any channel")]
    NotInChannel(ConnectionId),

    /// A `stop_talking` from a connection that is no longer the recorded
    /// speaker, typically delayed behind a newer speaker's barge-in.
    #[error("stale stop signal from {conn} in channel {channel} (speaker is {current:?})")]
    StaleSpeakerSignal {
        conn: ConnectionId,
        channel: ChannelCode,
        current: Option<ConnectionId>,
    },

    /// Audio from a member that does not hold the speaker slot, rejected
    /// because the coordinator runs with `AudioPolicy::SpeakerOnly`.
    #[error("{conn} is not the speaker in channel {channel}")]
    NotSpeaker {
        conn: ConnectionId,
        channel: ChannelCode,
    },
}

impl ChannelError {
    /// Returns the text shown to the client, for errors that are reported
    /// at all.
    pub fn client_message(&self) -> Option<&'static str> {
        match self {
            ChannelError::InvalidChannelCode { code: None } => Some("invalid request format"),
            ChannelError::InvalidChannelCode { code: Some(_) } => {
                Some("invalid channel code (6 digits required)")
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_only_for_join_errors() {
        let missing = ChannelError::InvalidChannelCode { code: None };
        assert_eq!(missing.client_message(), Some("invalid request format"));

        let malformed = ChannelError::InvalidChannelCode {
            code: Some("12a45b".into()),
        };
        assert!(malformed.client_message().unwrap().contains("6 digits"));

        let silent = ChannelError::NotInChannel(ConnectionId::new(1));
        assert_eq!(silent.client_message(), None);
    }

    #[test]
    fn test_display_mentions_connection() {
        let err = ChannelError::NotInChannel(ConnectionId::new(5));
        assert_eq!(err.to_string(), "conn-5 is not in any channel");
    }
}
