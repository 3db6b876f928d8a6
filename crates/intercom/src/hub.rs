//! Per-connection mailboxes and room fan-out.
//!
//! Every connection handler owns the receiving half of an unbounded
//! channel and registers the sending half here. The coordinator talks to
//! the hub through [`Outbox`], so emitting an event is a non-blocking push
//! into one or more mailboxes; the handlers do the actual socket writes.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use intercom_channel::Outbox;
use intercom_protocol::{ChannelCode, ServerEvent};
use intercom_transport::ConnectionId;
use tokio::sync::mpsc;

/// Sending half of a connection's mailbox.
pub type Mailbox = mpsc::UnboundedSender<ServerEvent>;

#[derive(Default)]
struct HubInner {
    mailboxes: HashMap<ConnectionId, Mailbox>,
    rooms: HashMap<ChannelCode, HashSet<ConnectionId>>,
}

/// Routes server events to connection mailboxes.
#[derive(Default)]
pub struct Hub {
    inner: Mutex<HubInner>,
}

impl Hub {
    /// Creates an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the mailbox for `conn`.
    pub fn register(&self, conn: ConnectionId, mailbox: Mailbox) {
        self.lock().mailboxes.insert(conn, mailbox);
    }

    /// Drops the mailbox for `conn` and any room tags it still holds.
    pub fn unregister(&self, conn: ConnectionId) {
        let mut inner = self.lock();
        inner.mailboxes.remove(&conn);
        inner.rooms.retain(|_, members| {
            members.remove(&conn);
            !members.is_empty()
        });
    }

    /// Returns the number of registered mailboxes.
    pub fn connection_count(&self) -> usize {
        self.lock().mailboxes.len()
    }

    /// Returns the connections tagged into the room for `code`.
    pub fn room(&self, code: &ChannelCode) -> HashSet<ConnectionId> {
        self.lock().rooms.get(code).cloned().unwrap_or_default()
    }

    // A panic while holding the lock leaves the maps structurally valid,
    // so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HubInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HubInner {
    fn deliver(&self, conn: ConnectionId, event: ServerEvent) {
        match self.mailboxes.get(&conn) {
            Some(mailbox) => {
                if mailbox.send(event).is_err() {
                    tracing::debug!(%conn, "mailbox closed, event dropped");
                }
            }
            None => tracing::debug!(%conn, "no mailbox, event dropped"),
        }
    }
}

impl Outbox for Hub {
    fn join_room(&self, conn: ConnectionId, code: &ChannelCode) {
        self.lock().rooms.entry(code.clone()).or_default().insert(conn);
    }

    fn leave_room(&self, conn: ConnectionId, code: &ChannelCode) {
        let mut inner = self.lock();
        if let Some(members) = inner.rooms.get_mut(code) {
            members.remove(&conn);
            if members.is_empty() {
                inner.rooms.remove(code);
            }
        }
    }

    fn emit_to(&self, conn: ConnectionId, event: ServerEvent) {
        self.lock().deliver(conn, event);
    }

    fn emit_to_room(&self, code: &ChannelCode, event: ServerEvent, except: Option<ConnectionId>) {
        let inner = self.lock();
        let Some(members) = inner.rooms.get(code) else {
            tracing::debug!(channel = %code, "no room, event dropped");
            return;
        };
        for conn in members.iter().copied().filter(|conn| Some(*conn) != except) {
            inner.deliver(conn, event.clone());
        }
    }
}
