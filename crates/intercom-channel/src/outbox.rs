//! The room/multicast primitives the coordinator sends through.
//!
//! The coordinator never touches sockets. It tells an [`Outbox`] which
//! connections are grouped under which channel code and asks it to deliver
//! events, either to one connection or to a whole group. The server
//! implements this over per-connection mailboxes; tests implement it with
//! a recorder.

use intercom_protocol::{ChannelCode, ServerEvent};
use intercom_transport::ConnectionId;

/// Fire-and-forget delivery of server events.
///
/// Every method returns immediately. Delivery is best-effort: events for a
/// connection that has gone away are discarded, and nothing is
/// acknowledged or retried.
///
/// The room grouping is the transport's own bookkeeping, separate from the
/// coordinator's membership table. The coordinator keeps the two in step
/// by calling [`join_room`](Self::join_room) and
/// [`leave_room`](Self::leave_room) alongside its own mutations.
pub trait Outbox: Send + Sync {
    /// Tags `conn` as part of the room for `code`.
    fn join_room(&self, conn: ConnectionId, code: &ChannelCode);

    /// Removes `conn` from the room for `code`.
    fn leave_room(&self, conn: ConnectionId, code: &ChannelCode);

    /// Sends `event` to a single connection.
    fn emit_to(&self, conn: ConnectionId, event: ServerEvent);

    /// Sends `event` to every connection in the room for `code`, skipping
    /// `except` if given.
    fn emit_to_room(&self, code: &ChannelCode, event: ServerEvent, except: Option<ConnectionId>);
}
