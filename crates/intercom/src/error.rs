//! Unified error type for the Intercom server.

use intercom_channel::ChannelError;
use intercom_protocol::ProtocolError;
use intercom_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `intercom` crate, you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum IntercomError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A channel-level error (bad code, stale signal, policy rejection).
    #[error(transparent)]
    Channel(#[from] ChannelError),
}
