//! Top-level relay engine that ties the registry and both loops together.

use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use futures::{Sink, Stream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use webobs_core::config::relay::RelayConfig;
use webobs_core::error::AppError;
use webobs_core::result::AppResult;

use crate::dispatch::Dispatcher;
use crate::fanout::FanOut;
use crate::listener::Listener;
use crate::message::Message;
use crate::metrics::RelayMetrics;
use crate::registry::TagRegistry;
use crate::session::Frame;

/// Central relay engine. Cheap to clone; every clone drives the same
/// registry and loops.
#[derive(Clone)]
pub struct RelayEngine {
    /// Tag registry.
    registry: Arc<TagRegistry>,
    /// Metrics collector.
    metrics: Arc<RelayMetrics>,
    /// Application → fan-out loop.
    outbound: mpsc::Sender<Message>,
    /// Cancels both loops and every session.
    shutdown: CancellationToken,
    config: Arc<RelayConfig>,
}

impl std::fmt::Debug for RelayEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayEngine")
            .field("tags", &self.registry.tags())
            .field("running", &self.is_running())
            .finish()
    }
}

impl RelayEngine {
    /// Creates the registry and spawns the dispatch and fan-out loops.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(config: &RelayConfig) -> Self {
        let shutdown = CancellationToken::new();
        let metrics = Arc::new(RelayMetrics::new());

        let (inbound_tx, inbound_rx) = mpsc::channel(config.inbound_buffer_size.max(1));
        let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_buffer_size.max(1));

        let registry = Arc::new(TagRegistry::new(
            inbound_tx,
            config.session_buffer_size,
            shutdown.clone(),
            metrics.clone(),
        ));

        let dispatcher = Dispatcher::new(
            registry.clone(),
            metrics.clone(),
            config.dispatch_mode,
            config.listener_buffer_size,
            shutdown.clone(),
        );
        tokio::spawn(dispatcher.run(inbound_rx));

        let fanout = FanOut::new(
            registry.clone(),
            metrics.clone(),
            config.fanout_policy,
            shutdown.clone(),
        );
        tokio::spawn(fanout.run(outbound_rx));

        info!("Relay engine started");

        Self {
            registry,
            metrics,
            outbound: outbound_tx,
            shutdown,
            config: Arc::new(config.clone()),
        }
    }

    /// Binds `tag`: its endpoints serve assets from `asset_path`, and
    /// `listener`, if any, receives the tag's inbound messages.
    pub fn bind(
        &self,
        tag: &str,
        listener: Option<Arc<dyn Listener>>,
        asset_path: impl Into<PathBuf>,
    ) -> AppResult<()> {
        self.registry.bind(tag, listener, asset_path)
    }

    /// Queues a message for delivery to every session of its tag.
    ///
    /// Waits while the outbound channel is full.
    pub async fn send(&self, msg: Message) -> AppResult<()> {
        self.outbound
            .send(msg)
            .await
            .map_err(|_| AppError::service_unavailable("Relay is shut down"))
    }

    /// Convenience for [`RelayEngine::send`].
    pub async fn publish(&self, tag: &str, data: impl Into<Bytes>) -> AppResult<()> {
        self.send(Message::new(tag, data)).await
    }

    /// The application-facing outbound channel, for callers that want to
    /// hold a sender directly (e.g. from a listener via `try_send`).
    pub fn outbound(&self) -> mpsc::Sender<Message> {
        self.outbound.clone()
    }

    /// Admits a session under `tag` and drives it over the given connection
    /// until the peer goes away or the engine shuts down.
    pub async fn attach<S, E, K>(&self, tag: &str, stream: S, sink: K)
    where
        S: Stream<Item = Result<Frame, E>> + Unpin,
        E: Display,
        K: Sink<Bytes> + Unpin + Send + 'static,
        K::Error: Display,
    {
        let session = self.registry.admit(tag);
        session.run(stream, sink, &self.registry).await;
    }

    /// The tag registry.
    pub fn registry(&self) -> &Arc<TagRegistry> {
        &self.registry
    }

    /// Engine metrics.
    pub fn metrics(&self) -> &Arc<RelayMetrics> {
        &self.metrics
    }

    /// The configuration the engine was started with.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Whether the loops are still running.
    pub fn is_running(&self) -> bool {
        !self.shutdown.is_cancelled()
    }

    /// Stops both loops and closes every session.
    pub fn shutdown(&self) {
        info!("Shutting down relay engine");
        self.shutdown.cancel();
        let closed = self.registry.close_all();
        info!(sessions = closed, "Relay engine shut down");
    }
}
