//! Conversions between Axum WebSocket messages and relay frames.

use axum::extract::ws::Message as WsMessage;
use bytes::Bytes;

use webobs_core::config::relay::FrameFormat;
use webobs_relay::Frame;

/// Maps one received WebSocket message to a relay frame.
///
/// Text and binary messages both become [`Frame::Data`]; control frames
/// other than close are answered by Axum and skipped here.
pub fn inbound_frame(msg: Result<WsMessage, axum::Error>) -> Option<Result<Frame, axum::Error>> {
    match msg {
        Ok(WsMessage::Text(text)) => Some(Ok(Frame::Data(Bytes::copy_from_slice(
            text.as_str().as_bytes(),
        )))),
        Ok(WsMessage::Binary(data)) => Some(Ok(Frame::Data(data))),
        Ok(WsMessage::Close(_)) => Some(Ok(Frame::Close)),
        Ok(WsMessage::Ping(_)) | Ok(WsMessage::Pong(_)) => None,
        Err(e) => Some(Err(e)),
    }
}

/// Builds the WebSocket message for an outbound payload.
pub fn outbound_message(data: Bytes, format: FrameFormat) -> WsMessage {
    match format {
        FrameFormat::Binary => WsMessage::Binary(data),
        FrameFormat::Text => WsMessage::Text(String::from_utf8_lossy(&data).into_owned().into()),
        FrameFormat::Auto => match std::str::from_utf8(&data) {
            Ok(text) => WsMessage::Text(text.to_owned().into()),
            Err(_) => WsMessage::Binary(data),
        },
    }
}
