//! Connection registry: which channel, if any, each live connection is in.

use std::collections::HashMap;

use intercom_protocol::ChannelCode;
use intercom_transport::ConnectionId;

/// Tracks every live connection and the channel it currently belongs to.
///
/// A connection maps to at most one channel; `None` means connected but
/// not yet joined. The coordinator keeps this in step with the
/// [`MembershipTable`](crate::MembershipTable).
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Option<ChannelCode>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a freshly connected connection with no channel.
    ///
    /// Registering an id twice resets it to no channel.
    pub fn register(&mut self, conn: ConnectionId) {
        self.connections.insert(conn, None);
    }

    /// Records that `conn` is now in `code`, returning the channel it was
    /// in before.
    pub fn assign(&mut self, conn: ConnectionId, code: ChannelCode) -> Option<ChannelCode> {
        self.connections.insert(conn, Some(code)).flatten()
    }

    /// Forgets `conn` entirely, returning the channel it was in.
    pub fn remove(&mut self, conn: ConnectionId) -> Option<ChannelCode> {
        self.connections.remove(&conn).flatten()
    }

    /// Returns the channel `conn` is in, if any.
    pub fn channel_of(&self, conn: ConnectionId) -> Option<&ChannelCode> {
        self.connections.get(&conn).and_then(Option::as_ref)
    }

    /// Returns `true` if `conn` is registered, whether or not it has joined.
    pub fn contains(&self, conn: ConnectionId) -> bool {
        self.connections.contains_key(&conn)
    }

    /// Iterates over `(connection, channel)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (ConnectionId, Option<&ChannelCode>)> {
        self.connections
            .iter()
            .map(|(conn, code)| (*conn, code.as_ref()))
    }

    /// Returns the number of registered connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Returns `true` if no connections are registered.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
