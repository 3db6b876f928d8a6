//! # Intercom
//!
//! Push-to-talk audio relay over WebSocket.
//!
//! Clients join a channel by six-digit code, claim the speaker slot with
//! `start_talking`, and stream audio that the server fans out to the other
//! members. The relay never decodes audio; it only decides who hears what.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use intercom::prelude::*;
//!
//! # async fn run() -> Result<(), IntercomError> {
//! intercom::logging::init("info");
//! let server = IntercomServer::builder()
//!     .bind("0.0.0.0:5000")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod hub;
pub mod logging;
mod server;

pub use error::IntercomError;
pub use hub::{Hub, Mailbox};
pub use server::{IntercomServer, IntercomServerBuilder};

/// Everything needed to configure and run a relay.
pub mod prelude {
    pub use crate::{IntercomError, IntercomServer, IntercomServerBuilder};
    pub use intercom_channel::{AudioPolicy, CoordinatorConfig};
    pub use intercom_protocol::{ChannelCode, ClientEvent, ServerEvent};
    pub use intercom_transport::ConnectionId;
}
