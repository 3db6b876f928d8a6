//! Mapping between transport frames and protocol events.
//!
//! Control events travel as text frames encoded by the [`Codec`]. Audio
//! travels as binary frames holding the raw payload, so the hot path never
//! inflates a chunk into a JSON number array. A JSON `audio_chunk` text
//! frame is still accepted inbound for clients that cannot send binary.

use intercom_transport::Frame;

use crate::{ClientEvent, Codec, ProtocolError, ServerEvent};

/// Decodes an inbound frame into a client event.
///
/// # Errors
/// Returns the codec's decode error for text frames that are not a
/// well-formed [`ClientEvent`].
pub fn decode_client_frame<C: Codec>(
    codec: &C,
    frame: Frame,
) -> Result<ClientEvent, ProtocolError> {
    match frame {
        Frame::Binary(payload) => Ok(ClientEvent::AudioChunk { payload }),
        Frame::Text(text) => codec.decode(text.as_bytes()),
    }
}

/// Encodes an outbound server event into a frame.
///
/// # Errors
/// Returns the codec's encode error, or [`ProtocolError::InvalidMessage`]
/// if the codec produced bytes that are not valid UTF-8.
pub fn encode_server_event<C: Codec>(
    codec: &C,
    event: &ServerEvent,
) -> Result<Frame, ProtocolError> {
    match event {
        ServerEvent::AudioChunk { payload } => Ok(Frame::Binary(payload.clone())),
        other => {
            let bytes = codec.encode(other)?;
            String::from_utf8(bytes).map(Frame::Text).map_err(|e| {
                ProtocolError::InvalidMessage(format!("codec produced non-UTF-8 text: {e}"))
            })
        }
    }
}
