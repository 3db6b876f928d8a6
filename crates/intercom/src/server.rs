//! `IntercomServer` builder and server loop.
//!
//! This is the entry point for running an Intercom relay. It ties
//! together all the layers: transport → protocol → channel coordinator.

use std::net::SocketAddr;
use std::sync::Arc;

use intercom_channel::{AudioPolicy, Coordinator, CoordinatorConfig};
use intercom_protocol::{Codec, JsonCodec};
use intercom_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::IntercomError;
use crate::handler::handle_connection;
use crate::hub::Hub;

/// Shared server state passed to each connection handler task.
///
/// The coordinator sits behind one lock so each operation sees and leaves
/// the channel tables consistent. The hub has its own internal lock and is
/// only ever called with the coordinator lock held or for mailbox
/// registration.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) coordinator: Mutex<Coordinator>,
    pub(crate) hub: Hub,
    pub(crate) codec: C,
}

/// Builder for configuring and starting an Intercom server.
///
/// # Example
///
/// ```rust,no_run
/// use intercom::prelude::*;
///
/// # async fn run() -> Result<(), IntercomError> {
/// let server = IntercomServer::builder()
///     .bind("0.0.0.0:5000")
///     .audio_policy(AudioPolicy::SpeakerOnly)
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct IntercomServerBuilder {
    bind_addr: String,
    coordinator_config: CoordinatorConfig,
}

impl IntercomServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".to_string(),
            coordinator_config: CoordinatorConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets which connections may relay audio.
    pub fn audio_policy(mut self, policy: AudioPolicy) -> Self {
        self.coordinator_config.audio_policy = policy;
        self
    }

    /// Replaces the whole coordinator configuration.
    pub fn coordinator_config(mut self, config: CoordinatorConfig) -> Self {
        self.coordinator_config = config;
        self
    }

    /// Binds the listener and builds the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<IntercomServer<JsonCodec>, IntercomError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        tracing::info!(
            addr = %self.bind_addr,
            audio_policy = %self.coordinator_config.audio_policy,
            "intercom server configured"
        );

        let state = Arc::new(ServerState {
            coordinator: Mutex::new(Coordinator::new(self.coordinator_config)),
            hub: Hub::new(),
            codec: JsonCodec,
        });

        Ok(IntercomServer { transport, state })
    }
}

impl Default for IntercomServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Intercom relay.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct IntercomServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl IntercomServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> IntercomServerBuilder {
        IntercomServerBuilder::new()
    }
}

impl<C: Codec> IntercomServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, IntercomError> {
        Ok(self.transport.local_addr()?)
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a handler task for each.
    /// Handshakes run in the transport's own tasks, so a slow client never
    /// delays the next one.
    ///
    /// Runs until the process is terminated.
    ///
    /// # Errors
    /// Returns the transport error if the listener stops.
    pub async fn run(mut self) -> Result<(), IntercomError> {
        tracing::info!("intercom server running");

        loop {
            let conn = match self.transport.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::error!(error = %e, "accept failed, stopping server");
                    return Err(e.into());
                }
            };
            let state = Arc::clone(&self.state);
            tokio::spawn(async move {
                if let Err(e) = handle_connection(conn, state).await {
                    tracing::debug!(error = %e, "connection ended with error");
                }
            });
        }
    }
}
