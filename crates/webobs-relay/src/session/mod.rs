//! A live duplex connection bound to a tag.

pub mod handle;
pub mod pump;

use std::fmt::Display;
use std::sync::Arc;

use bytes::Bytes;
use futures::{Sink, Stream};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::message::Message;
use crate::metrics::RelayMetrics;
use crate::registry::TagRegistry;

pub use handle::{Delivery, SessionHandle, SessionId, SessionInfo};
pub use pump::Frame;

/// A session returned by [`TagRegistry::admit`].
///
/// Owns the receiving end of its private outbound queue and a sender into
/// the shared inbound channel. [`Session::run`] attaches it to a connection.
#[derive(Debug)]
pub struct Session {
    pub(crate) handle: Arc<SessionHandle>,
    pub(crate) inbound: mpsc::Sender<Message>,
    pub(crate) outbound: mpsc::Receiver<Bytes>,
    pub(crate) metrics: Arc<RelayMetrics>,
}

impl Session {
    /// Session id within its tag.
    pub fn id(&self) -> SessionId {
        self.handle.id
    }

    /// Tag the session is bound to.
    pub fn tag(&self) -> &str {
        &self.handle.tag
    }

    /// The handle the registry holds for this session.
    pub fn handle(&self) -> &Arc<SessionHandle> {
        &self.handle
    }

    /// Drive the session over a connection until it ends.
    ///
    /// Spawns the write pump, runs the read pump on the current task, then
    /// dismisses the session from `registry` however the read pump exited
    /// and waits for the write pump to stop.
    pub async fn run<S, E, K>(self, stream: S, sink: K, registry: &TagRegistry)
    where
        S: Stream<Item = Result<Frame, E>> + Unpin,
        E: Display,
        K: Sink<Bytes> + Unpin + Send + 'static,
        K::Error: Display,
    {
        let Session {
            handle,
            inbound,
            outbound,
            metrics,
        } = self;

        info!(tag = %handle.tag, session_id = handle.id, "Session started");

        let writer = tokio::spawn(pump::write_pump(handle.clone(), outbound, sink));

        pump::read_pump(&handle, &inbound, &metrics, stream).await;

        registry.dismiss(&handle.tag, handle.id);
        // No-op for sessions `close_all` already unlisted.
        handle.close();
        if let Err(e) = writer.await {
            if e.is_panic() {
                warn!(tag = %handle.tag, session_id = handle.id, error = %e, "Write pump panicked");
            }
        }

        info!(tag = %handle.tag, session_id = handle.id, "Session ended");
    }
}
