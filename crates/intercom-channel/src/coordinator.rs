//! The session lifecycle coordinator: the only code that mutates the
//! registry, membership, and speaker tables.
//!
//! Each public method is one atomic step over all three tables. The
//! coordinator itself is a plain struct with `&mut self` methods; the
//! server serializes access by keeping it behind a single mutex, so a
//! method never observes another method half-way through.

use std::collections::HashSet;

use intercom_protocol::{ChannelCode, ServerEvent};
use intercom_transport::ConnectionId;

use crate::{
    AudioPolicy, ChannelError, ConnectionRegistry, CoordinatorConfig, MembershipTable, Outbox,
    SpeakerState, SpeakerTable,
};

/// Owns the channel state and applies client events to it.
///
/// ## Invariants
///
/// Between method calls the following always hold (see
/// [`check_invariants`](Self::check_invariants)):
///
/// 1. A connection is a member of at most one channel, and the registry
///    records exactly that channel.
/// 2. A channel exists in the membership table iff it has members.
/// 3. A recorded speaker is a member of its channel.
/// 4. A channel has a speaker entry only while the channel exists.
#[derive(Debug, Default)]
pub struct Coordinator {
    registry: ConnectionRegistry,
    members: MembershipTable,
    speakers: SpeakerTable,
    config: CoordinatorConfig,
}

impl Coordinator {
    /// Creates an empty coordinator with the given config.
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            members: MembershipTable::new(),
            speakers: SpeakerTable::new(),
            config,
        }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    // -----------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------

    /// Registers a new connection (in no channel) and confirms it.
    pub fn connect<O: Outbox + ?Sized>(&mut self, out: &O, conn: ConnectionId) {
        self.registry.register(conn);
        tracing::info!(%conn, "client connected");
        out.emit_to(conn, ServerEvent::ConnectionConfirmed { id: conn });
    }

    /// Tears down a connection, cascading through its channel.
    ///
    /// If the connection was the last member, the channel and its speaker
    /// slot go with it. If it was the speaker of a channel that survives,
    /// the remaining members are told it stopped. Unknown connections are
    /// ignored.
    pub fn disconnect<O: Outbox + ?Sized>(&mut self, out: &O, conn: ConnectionId) {
        match self.registry.channel_of(conn).cloned() {
            Some(code) => {
                self.leave_channel(out, conn, &code);
                tracing::info!(%conn, channel = %code, "client disconnected");
            }
            None => {
                tracing::info!(%conn, "client disconnected (not in a channel)");
            }
        }
        self.registry.remove(conn);
    }

    /// Joins `conn` to the channel named by `code`, switching out of its
    /// current channel first if it is in a different one.
    ///
    /// `code` is `None` when the request carried no channel field.
    /// Re-joining the current channel is accepted and acknowledged again.
    ///
    /// On success the sender gets `join_success`, followed by a
    /// `speaker_update` if someone is already talking in the channel.
    ///
    /// # Errors
    /// [`ChannelError::InvalidChannelCode`] if `code` is missing or not
    /// six digits. Nothing is mutated in that case.
    pub fn join<O: Outbox + ?Sized>(
        &mut self,
        out: &O,
        conn: ConnectionId,
        code: Option<&str>,
    ) -> Result<ChannelCode, ChannelError> {
        let raw = code.ok_or(ChannelError::InvalidChannelCode { code: None })?;
        let code = ChannelCode::parse(raw).map_err(|_| ChannelError::InvalidChannelCode {
            code: Some(raw.to_owned()),
        })?;

        if let Some(previous) = self.registry.channel_of(conn).cloned() {
            if previous != code {
                tracing::info!(%conn, from = %previous, to = %code, "switching channel");
                self.leave_channel(out, conn, &previous);
            }
        }

        out.join_room(conn, &code);
        if self.members.add(&code, conn) {
            tracing::info!(channel = %code, "channel created");
        }
        self.registry.assign(conn, code.clone());
        tracing::info!(
            %conn,
            channel = %code,
            members = self.members.members(&code).map_or(0, HashSet::len),
            "joined channel"
        );

        out.emit_to(
            conn,
            ServerEvent::JoinSuccess {
                channel: code.clone(),
            },
        );

        if let Some(speaker) = self.speakers.speaker(&code) {
            out.emit_to(
                conn,
                ServerEvent::SpeakerUpdate {
                    id: speaker,
                    speaking: true,
                    channel: code.clone(),
                },
            );
        }

        Ok(code)
    }

    // -----------------------------------------------------------------
    // Speaker arbitration
    // -----------------------------------------------------------------

    /// Makes `conn` the speaker of its channel and tells the other members.
    ///
    /// Barge-in is allowed: a claim replaces whoever was speaking.
    ///
    /// # Errors
    /// [`ChannelError::NotInChannel`] if `conn` has not joined a channel.
    pub fn start_talking<O: Outbox + ?Sized>(
        &mut self,
        out: &O,
        conn: ConnectionId,
    ) -> Result<(), ChannelError> {
        let code = self.channel_or_err(conn)?;

        if let Some(displaced) = self.speakers.claim(&code, conn) {
            if displaced != conn {
                tracing::info!(%conn, %displaced, channel = %code, "speaker barged in");
            }
        }
        tracing::info!(%conn, channel = %code, "started talking");

        out.emit_to_room(
            &code,
            ServerEvent::SpeakerUpdate {
                id: conn,
                speaking: true,
                channel: code.clone(),
            },
            Some(conn),
        );
        Ok(())
    }

    /// Releases the speaker slot if `conn` holds it and tells the other
    /// members.
    ///
    /// # Errors
    /// - [`ChannelError::NotInChannel`] if `conn` has not joined a channel.
    /// - [`ChannelError::StaleSpeakerSignal`] if `conn` is not the current
    ///   speaker. The slot is left untouched.
    pub fn stop_talking<O: Outbox + ?Sized>(
        &mut self,
        out: &O,
        conn: ConnectionId,
    ) -> Result<(), ChannelError> {
        let code = self.channel_or_err(conn)?;

        if !self.speakers.release(&code, conn) {
            return Err(ChannelError::StaleSpeakerSignal {
                current: self.speakers.speaker(&code),
                conn,
                channel: code,
            });
        }
        tracing::info!(%conn, channel = %code, "stopped talking");

        out.emit_to_room(
            &code,
            ServerEvent::SpeakerUpdate {
                id: conn,
                speaking: false,
                channel: code.clone(),
            },
            Some(conn),
        );
        Ok(())
    }

    // -----------------------------------------------------------------
    // Audio relay
    // -----------------------------------------------------------------

    /// Relays `payload` unchanged to every other member of the sender's
    /// channel.
    ///
    /// # Errors
    /// - [`ChannelError::NotInChannel`] if `conn` has not joined a channel.
    /// - [`ChannelError::NotSpeaker`] under [`AudioPolicy::SpeakerOnly`]
    ///   when `conn` does not hold the speaker slot.
    pub fn audio_chunk<O: Outbox + ?Sized>(
        &self,
        out: &O,
        conn: ConnectionId,
        payload: Vec<u8>,
    ) -> Result<(), ChannelError> {
        let code = self.channel_or_err(conn)?;

        if self.config.audio_policy == AudioPolicy::SpeakerOnly
            && self.speakers.speaker(&code) != Some(conn)
        {
            return Err(ChannelError::NotSpeaker {
                conn,
                channel: code,
            });
        }

        tracing::trace!(%conn, channel = %code, bytes = payload.len(), "relaying audio");
        out.emit_to_room(&code, ServerEvent::AudioChunk { payload }, Some(conn));
        Ok(())
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    /// Returns the channel `conn` is in, if any.
    pub fn channel_of(&self, conn: ConnectionId) -> Option<&ChannelCode> {
        self.registry.channel_of(conn)
    }

    /// Returns the members of `code`, if the channel exists.
    pub fn members(&self, code: &ChannelCode) -> Option<&HashSet<ConnectionId>> {
        self.members.members(code)
    }

    /// Returns the current speaker of `code`.
    pub fn speaker(&self, code: &ChannelCode) -> Option<ConnectionId> {
        self.speakers.speaker(code)
    }

    /// Returns the speaking state of `code`.
    pub fn speaker_state(&self, code: &ChannelCode) -> SpeakerState {
        self.speakers.state(code)
    }

    /// Returns the number of live channels.
    pub fn channel_count(&self) -> usize {
        self.members.len()
    }

    /// Returns the number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// Verifies the structural invariants across all three tables.
    ///
    /// # Errors
    /// Returns a description of the first violation found.
    pub fn check_invariants(&self) -> Result<(), String> {
        for (code, members) in self.members.iter() {
            if members.is_empty() {
                return Err(format!("channel {code} exists with no members"));
            }
            for conn in members {
                if self.registry.channel_of(*conn) != Some(code) {
                    return Err(format!(
                        "{conn} is a member of {code} but the registry records {:?}",
                        self.registry.channel_of(*conn)
                    ));
                }
            }
        }

        for (conn, code) in self.registry.iter() {
            if let Some(code) = code {
                if !self.members.is_member(code, conn) {
                    return Err(format!(
                        "registry places {conn} in {code} but it is not a member"
                    ));
                }
            }
        }

        for (code, speaker) in self.speakers.iter() {
            if !self.members.contains(code) {
                return Err(format!("speaker entry for deleted channel {code}"));
            }
            if !self.members.is_member(code, speaker) {
                return Err(format!("speaker {speaker} of {code} is not a member"));
            }
        }

        Ok(())
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    fn channel_or_err(&self, conn: ConnectionId) -> Result<ChannelCode, ChannelError> {
        self.registry
            .channel_of(conn)
            .cloned()
            .ok_or(ChannelError::NotInChannel(conn))
    }

    /// Removes `conn` from `code`: room, member set, and speaker slot.
    ///
    /// Does not touch the registry; callers either reassign or remove the
    /// connection right after.
    fn leave_channel<O: Outbox + ?Sized>(
        &mut self,
        out: &O,
        conn: ConnectionId,
        code: &ChannelCode,
    ) {
        out.leave_room(conn, code);

        if self.members.remove(code, conn) {
            self.speakers.clear(code);
            tracing::info!(channel = %code, "channel empty, removed");
        } else if self.speakers.release(code, conn) {
            tracing::info!(%conn, channel = %code, "speaker left, notifying members");
            out.emit_to_room(
                code,
                ServerEvent::SpeakerUpdate {
                    id: conn,
                    speaking: false,
                    channel: code.clone(),
                },
                Some(conn),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests against a no-op outbox. Event delivery is covered by
    //! the integration tests in `tests/coordinator.rs`.

    use super::*;

    struct NullOutbox;

    impl Outbox for NullOutbox {
        fn join_room(&self, _: ConnectionId, _: &ChannelCode) {}
        fn leave_room(&self, _: ConnectionId, _: &ChannelCode) {}
        fn emit_to(&self, _: ConnectionId, _: ServerEvent) {}
        fn emit_to_room(&self, _: &ChannelCode, _: ServerEvent, _: Option<ConnectionId>) {}
    }

    fn cid(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn code(s: &str) -> ChannelCode {
        ChannelCode::parse(s).unwrap()
    }

    fn coordinator() -> Coordinator {
        Coordinator::new(CoordinatorConfig::default())
    }

    #[test]
    fn test_connect_registers_without_channel() {
        let mut c = coordinator();
        c.connect(&NullOutbox, cid(1));
        assert_eq!(c.connection_count(), 1);
        assert_eq!(c.channel_of(cid(1)), None);
        c.check_invariants().unwrap();
    }

    #[test]
    fn test_join_invalid_code_mutates_nothing() {
        let mut c = coordinator();
        c.connect(&NullOutbox, cid(1));

        let err = c.join(&NullOutbox, cid(1), Some("12a45b")).unwrap_err();
        assert!(matches!(
            err,
            ChannelError::InvalidChannelCode { code: Some(ref s) } if s == "12a45b"
        ));
        let err = c.join(&NullOutbox, cid(1), None).unwrap_err();
        assert!(matches!(err, ChannelError::InvalidChannelCode { code: None }));

        assert_eq!(c.channel_count(), 0);
        assert_eq!(c.channel_of(cid(1)), None);
    }

    #[test]
    fn test_invalid_join_keeps_current_channel() {
        let mut c = coordinator();
        c.connect(&NullOutbox, cid(1));
        c.join(&NullOutbox, cid(1), Some("111111")).unwrap();

        assert!(c.join(&NullOutbox, cid(1), Some("oops")).is_err());
        assert_eq!(c.channel_of(cid(1)), Some(&code("111111")));
        c.check_invariants().unwrap();
    }

    #[test]
    fn test_switch_moves_membership() {
        let mut c = coordinator();
        c.connect(&NullOutbox, cid(1));
        c.connect(&NullOutbox, cid(2));
        c.join(&NullOutbox, cid(1), Some("111111")).unwrap();
        c.join(&NullOutbox, cid(2), Some("111111")).unwrap();

        c.join(&NullOutbox, cid(1), Some("222222")).unwrap();

        assert_eq!(c.channel_of(cid(1)), Some(&code("222222")));
        assert!(!c.members(&code("111111")).unwrap().contains(&cid(1)));
        assert!(c.members(&code("222222")).unwrap().contains(&cid(1)));
        c.check_invariants().unwrap();
    }

    #[test]
    fn test_switch_out_of_sole_membership_deletes_channel_and_speaker() {
        let mut c = coordinator();
        c.connect(&NullOutbox, cid(1));
        c.join(&NullOutbox, cid(1), Some("111111")).unwrap();
        c.start_talking(&NullOutbox, cid(1)).unwrap();

        c.join(&NullOutbox, cid(1), Some("222222")).unwrap();

        assert!(c.members(&code("111111")).is_none());
        assert_eq!(c.speaker(&code("111111")), None);
        c.check_invariants().unwrap();
    }

    #[test]
    fn test_rejoin_same_channel_is_idempotent() {
        let mut c = coordinator();
        c.connect(&NullOutbox, cid(1));
        c.join(&NullOutbox, cid(1), Some("111111")).unwrap();
        c.start_talking(&NullOutbox, cid(1)).unwrap();

        c.join(&NullOutbox, cid(1), Some("111111")).unwrap();

        assert_eq!(c.members(&code("111111")).unwrap().len(), 1);
        assert_eq!(c.speaker(&code("111111")), Some(cid(1)), "rejoin keeps the slot");
        c.check_invariants().unwrap();
    }

    #[test]
    fn test_talk_signals_require_channel() {
        let mut c = coordinator();
        c.connect(&NullOutbox, cid(1));
        assert!(matches!(
            c.start_talking(&NullOutbox, cid(1)),
            Err(ChannelError::NotInChannel(_))
        ));
        assert!(matches!(
            c.stop_talking(&NullOutbox, cid(1)),
            Err(ChannelError::NotInChannel(_))
        ));
        assert!(matches!(
            c.audio_chunk(&NullOutbox, cid(1), vec![1]),
            Err(ChannelError::NotInChannel(_))
        ));
    }

    #[test]
    fn test_stop_from_idle_channel_is_stale() {
        let mut c = coordinator();
        c.connect(&NullOutbox, cid(1));
        c.join(&NullOutbox, cid(1), Some("111111")).unwrap();
        let err = c.stop_talking(&NullOutbox, cid(1)).unwrap_err();
        assert!(matches!(err, ChannelError::StaleSpeakerSignal { current: None, .. }));
    }

    #[test]
    fn test_speaker_state_transitions() {
        let mut c = coordinator();
        c.connect(&NullOutbox, cid(1));
        c.join(&NullOutbox, cid(1), Some("111111")).unwrap();
        assert_eq!(c.speaker_state(&code("111111")), SpeakerState::Idle);

        c.start_talking(&NullOutbox, cid(1)).unwrap();
        assert_eq!(c.speaker_state(&code("111111")), SpeakerState::Speaking(cid(1)));

        c.stop_talking(&NullOutbox, cid(1)).unwrap();
        assert_eq!(c.speaker_state(&code("111111")), SpeakerState::Idle);
    }

    #[test]
    fn test_disconnect_unknown_connection_is_noop() {
        let mut c = coordinator();
        c.disconnect(&NullOutbox, cid(42));
        assert_eq!(c.connection_count(), 0);
    }

    #[test]
    fn test_disconnect_without_channel_unregisters() {
        let mut c = coordinator();
        c.connect(&NullOutbox, cid(1));
        c.disconnect(&NullOutbox, cid(1));
        assert_eq!(c.connection_count(), 0);
    }
}
