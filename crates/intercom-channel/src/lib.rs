//! Channel state for Intercom: who is in which channel, who is talking,
//! and where audio goes.
//!
//! # Key types
//!
//! - [`Coordinator`] — owns the three tables and applies every mutation
//! - [`ConnectionRegistry`], [`MembershipTable`], [`SpeakerTable`] — the tables
//! - [`Outbox`] — the room/multicast primitives the coordinator sends through
//! - [`dispatch`] — maps a decoded [`ClientEvent`](intercom_protocol::ClientEvent)
//!   to a coordinator call
//! - [`CoordinatorConfig`] / [`AudioPolicy`] — relay settings

mod config;
mod coordinator;
mod dispatch;
mod error;
mod membership;
mod outbox;
mod registry;
mod speaker;

pub use config::{AudioPolicy, CoordinatorConfig};
pub use coordinator::Coordinator;
pub use dispatch::dispatch;
pub use error::ChannelError;
pub use membership::MembershipTable;
pub use outbox::Outbox;
pub use registry::ConnectionRegistry;
pub use speaker::{SpeakerState, SpeakerTable};
