//! Wire protocol for Intercom.
//!
//! This crate defines the "language" that clients and the relay speak:
//!
//! - **Types** ([`ChannelCode`], [`ClientEvent`], [`ServerEvent`]) —
//!   the events that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how control events are
//!   converted to/from bytes.
//! - **Frames** ([`decode_client_frame`], [`encode_server_event`]) — which
//!   events ride in text frames and which in binary frames.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (frames) → Protocol (events) → Channel coordinator
//! ```

mod codec;
mod error;
mod frame;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use frame::{decode_client_frame, encode_server_event};
pub use types::{CHANNEL_CODE_LEN, ChannelCode, ClientEvent, RawChannelCode, ServerEvent};
