//! Standalone push-to-talk relay.
//!
//! Listens for WebSocket clients and relays channel audio between them.
//! TLS and the browser entry page are expected to be served by a reverse
//! proxy in front of this process.

use clap::Parser;
use intercom::prelude::*;

#[derive(Debug, Parser)]
#[command(name = "intercom-relay")]
#[command(about = "Push-to-talk audio relay over WebSocket")]
#[command(version)]
struct Args {
    /// Address to listen on. Overrides --port.
    #[arg(long, env = "INTERCOM_BIND")]
    bind: Option<String>,

    /// Port to listen on (all interfaces) when --bind is not given.
    #[arg(long, env = "PORT", default_value_t = 5000)]
    port: u16,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, env = "INTERCOM_DEBUG")]
    debug: bool,

    /// Which members may have audio relayed: permissive or speaker-only.
    #[arg(long, env = "INTERCOM_AUDIO_POLICY", default_value_t = AudioPolicy::Permissive)]
    audio_policy: AudioPolicy,
}

impl Args {
    fn bind_addr(&self) -> String {
        self.bind
            .clone()
            .unwrap_or_else(|| format!("0.0.0.0:{}", self.port))
    }

    fn log_filter(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    intercom::logging::init(args.log_filter());

    let bind = args.bind_addr();
    tracing::info!(%bind, debug = args.debug, "starting intercom relay");

    let server = IntercomServer::builder()
        .bind(&bind)
        .audio_policy(args.audio_policy)
        .build()
        .await?;

    server.run().await?;
    Ok(())
}
