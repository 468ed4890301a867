//! Per-session read and write pumps.
//!
//! Both pumps are generic over the transport so the relay does not depend on
//! a particular WebSocket implementation: the read side consumes a stream of
//! [`Frame`]s and the write side feeds a sink of raw payloads.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::message::Message;
use crate::metrics::RelayMetrics;

use super::handle::SessionHandle;

/// Upper bound on flushing and closing the sink once the write pump stops.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// One unit read from the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A payload frame (text or binary, the relay does not care).
    Data(Bytes),
    /// The peer closed the connection.
    Close,
}

/// Reads frames until end-of-stream, forwarding each payload to the shared
/// inbound channel tagged with the session's tag.
///
/// Receive errors are logged and skipped. The pump also stops when the
/// session is closed or the dispatch side has gone away.
pub async fn read_pump<S, E>(
    handle: &SessionHandle,
    inbound: &mpsc::Sender<Message>,
    metrics: &RelayMetrics,
    mut stream: S,
) where
    S: Stream<Item = Result<Frame, E>> + Unpin,
    E: Display,
{
    loop {
        let next = tokio::select! {
            biased;
            _ = handle.closed() => break,
            next = stream.next() => next,
        };

        let data = match next {
            None | Some(Ok(Frame::Close)) => break,
            Some(Err(e)) => {
                warn!(tag = %handle.tag, session_id = handle.id, error = %e, "Session receive error");
                continue;
            }
            Some(Ok(Frame::Data(data))) => data,
        };

        metrics.message_received();
        let msg = Message::new(handle.tag.clone(), data);
        let forwarded = tokio::select! {
            biased;
            _ = handle.closed() => break,
            res = inbound.send(msg) => res.is_ok(),
        };
        if !forwarded {
            debug!(tag = %handle.tag, session_id = handle.id, "Inbound channel closed");
            break;
        }
    }

    debug!(tag = %handle.tag, session_id = handle.id, "Read pump ended");
}

/// Writes every payload from the session's private queue as one frame.
///
/// A failed write drops that payload and the loop continues. The pump exits
/// once the session is closed or every sender of the queue is gone.
pub async fn write_pump<K>(handle: Arc<SessionHandle>, mut outbound: mpsc::Receiver<Bytes>, mut sink: K)
where
    K: Sink<Bytes> + Unpin,
    K::Error: Display,
{
    loop {
        let data = tokio::select! {
            biased;
            _ = handle.closed() => break,
            data = outbound.recv() => match data {
                Some(data) => data,
                None => break,
            },
        };

        let written = tokio::select! {
            biased;
            _ = handle.closed() => break,
            res = sink.send(data) => res,
        };
        if let Err(e) = written {
            warn!(tag = %handle.tag, session_id = handle.id, error = %e, "Session write failed, payload dropped");
        }
    }

    let _ = tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await;
    debug!(tag = %handle.tag, session_id = handle.id, "Write pump ended");
}
