//! Event dispatch: routes each decoded client event to the coordinator
//! operation that handles it, and recovers the errors it returns.

use intercom_protocol::{ClientEvent, RawChannelCode, ServerEvent};
use intercom_transport::ConnectionId;

use crate::{ChannelError, Coordinator, Outbox};

/// Applies one client event from `sender`.
///
/// Errors never escape: an invalid join is answered with `join_error`,
/// everything else is logged and dropped.
pub fn dispatch<O: Outbox + ?Sized>(
    coordinator: &mut Coordinator,
    out: &O,
    sender: ConnectionId,
    event: ClientEvent,
) {
    let name = event.name();
    let result = match event {
        ClientEvent::JoinChannel { channel } => {
            let raw = channel.as_ref().map(RawChannelCode::to_code_string);
            coordinator.join(out, sender, raw.as_deref()).map(|_| ())
        }
        ClientEvent::AudioChunk { payload } => coordinator.audio_chunk(out, sender, payload),
        ClientEvent::StartTalking => coordinator.start_talking(out, sender),
        ClientEvent::StopTalking => coordinator.stop_talking(out, sender),
    };

    if let Err(err) = result {
        recover(out, sender, name, err);
    }
}

fn recover<O: Outbox + ?Sized>(out: &O, sender: ConnectionId, event: &str, err: ChannelError) {
    match err.client_message() {
        Some(message) => {
            tracing::warn!(%sender, event, error = %err, "rejected request");
            out.emit_to(
                sender,
                ServerEvent::JoinError {
                    message: message.to_owned(),
                },
            );
        }
        None => {
            tracing::debug!(%sender, event, error = %err, "ignored event");
        }
    }
}
