//! Channel membership table: which connections are in each channel.

use std::collections::{HashMap, HashSet};

use intercom_protocol::ChannelCode;
use intercom_transport::ConnectionId;

/// Maps each live channel to its member set.
///
/// A channel is present exactly while it has at least one member: it is
/// created by the first [`add`](Self::add) and deleted by the
/// [`remove`](Self::remove) that empties it.
#[derive(Debug, Default)]
pub struct MembershipTable {
    channels: HashMap<ChannelCode, HashSet<ConnectionId>>,
}

impl MembershipTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `conn` to `code`, creating the channel if needed.
    ///
    /// Returns `true` if this call created the channel. Adding an existing
    /// member is a no-op.
    pub fn add(&mut self, code: &ChannelCode, conn: ConnectionId) -> bool {
        let created = !self.channels.contains_key(code);
        self.channels.entry(code.clone()).or_default().insert(conn);
        created
    }

    /// Removes `conn` from `code`.
    ///
    /// Returns `true` if the channel became empty and was deleted.
    pub fn remove(&mut self, code: &ChannelCode, conn: ConnectionId) -> bool {
        let Some(members) = self.channels.get_mut(code) else {
            return false;
        };
        members.remove(&conn);
        if members.is_empty() {
            self.channels.remove(code);
            true
        } else {
            false
        }
    }

    /// Returns the members of `code`, if the channel exists.
    pub fn members(&self, code: &ChannelCode) -> Option<&HashSet<ConnectionId>> {
        self.channels.get(code)
    }

    /// Returns `true` if `conn` is a member of `code`.
    pub fn is_member(&self, code: &ChannelCode, conn: ConnectionId) -> bool {
        self.channels
            .get(code)
            .is_some_and(|members| members.contains(&conn))
    }

    /// Returns `true` if the channel exists.
    pub fn contains(&self, code: &ChannelCode) -> bool {
        self.channels.contains_key(code)
    }

    /// Iterates over every channel and its members.
    pub fn iter(&self) -> impl Iterator<Item = (&ChannelCode, &HashSet<ConnectionId>)> {
        self.channels.iter()
    }

    /// Returns the number of live channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Returns `true` if there are no live channels.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cid(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn code(s: &str) -> ChannelCode {
        ChannelCode::parse(s).unwrap()
    }

    #[test]
    fn test_add_creates_channel_once() {
        let mut table = MembershipTable::new();
        assert!(table.add(&code("111111"), cid(1)));
        assert!(!table.add(&code("111111"), cid(2)));
        assert!(!table.add(&code("111111"), cid(2)), "re-adding is idempotent");
        assert_eq!(table.members(&code("111111")).unwrap().len(), 2);
    }

    #[test]
    fn test_remove_last_member_deletes_channel() {
        let mut table = MembershipTable::new();
        table.add(&code("111111"), cid(1));
        table.add(&code("111111"), cid(2));

        assert!(!table.remove(&code("111111"), cid(1)));
        assert!(table.contains(&code("111111")));

        assert!(table.remove(&code("111111"), cid(2)));
        assert!(!table.contains(&code("111111")));
        assert!(table.is_empty());
    }

    #[test]
    fn test_remove_from_missing_channel_is_noop() {
        let mut table = MembershipTable::new();
        assert!(!table.remove(&code("999999"), cid(1)));
    }

    #[test]
    fn test_is_member() {
        let mut table = MembershipTable::new();
        table.add(&code("111111"), cid(1));
        assert!(table.is_member(&code("111111"), cid(1)));
        assert!(!table.is_member(&code("111111"), cid(2)));
        assert!(!table.is_member(&code("222222"), cid(1)));
    }
}
