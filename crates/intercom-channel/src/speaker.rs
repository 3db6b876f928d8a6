//! Speaker arbitration table: the current talker, per channel.
//!
//! Each channel is a two-state machine, `Idle ↔ Speaking(conn)`. A channel
//! with no entry is `Idle`. Claims are last-write-wins (barge-in); releases
//! only take effect when they come from the current speaker.

use std::collections::HashMap;

use intercom_protocol::ChannelCode;
use intercom_transport::ConnectionId;

/// The speaking state of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakerState {
    /// Nobody is talking.
    Idle,
    /// The given connection holds the speaker slot.
    Speaking(ConnectionId),
}

/// Maps channels to their current speaker.
#[derive(Debug, Default)]
pub struct SpeakerTable {
    speakers: HashMap<ChannelCode, ConnectionId>,
}

impl SpeakerTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `conn` the speaker of `code`, returning whoever it displaced.
    pub fn claim(&mut self, code: &ChannelCode, conn: ConnectionId) -> Option<ConnectionId> {
        self.speakers.insert(code.clone(), conn)
    }

    /// Clears the slot if `conn` holds it. Returns `true` if it did.
    pub fn release(&mut self, code: &ChannelCode, conn: ConnectionId) -> bool {
        if self.speaker(code) == Some(conn) {
            self.speakers.remove(code);
            true
        } else {
            false
        }
    }

    /// Drops the channel's entry regardless of who holds it.
    pub fn clear(&mut self, code: &ChannelCode) -> Option<ConnectionId> {
        self.speakers.remove(code)
    }

    /// Returns the current speaker of `code`.
    pub fn speaker(&self, code: &ChannelCode) -> Option<ConnectionId> {
        self.speakers.get(code).copied()
    }

    /// Returns the state machine view of `code`.
    pub fn state(&self, code: &ChannelCode) -> SpeakerState {
        match self.speaker(code) {
            Some(conn) => SpeakerState::Speaking(conn),
            None => SpeakerState::Idle,
        }
    }

    /// Iterates over every `(channel, speaker)` entry.
    pub fn iter(&self) -> impl Iterator<Item = (&ChannelCode, ConnectionId)> {
        self.speakers.iter().map(|(code, conn)| (code, *conn))
    }

    /// Returns the number of channels with an active speaker.
    pub fn len(&self) -> usize {
        self.speakers.len()
    }

    /// Returns `true` if no channel has an active speaker.
    pub fn is_empty(&self) -> bool {
        self.speakers.is_empty()
    }
}
