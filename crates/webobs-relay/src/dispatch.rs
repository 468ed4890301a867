//! Inbound dispatch loop: hands messages read from sessions to listeners.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use webobs_core::config::relay::DispatchMode;

use crate::message::Message;
use crate::metrics::RelayMetrics;
use crate::registry::TagRegistry;

/// Drains the shared inbound channel and invokes listeners.
///
/// In [`DispatchMode::Serial`] listeners run inline on the loop, in
/// registration order, so a listener that never returns stalls every tag.
/// In [`DispatchMode::PerTag`] each tag gets a bounded queue drained by its
/// own worker; when that queue is full the newest message is dropped.
#[derive(Debug)]
pub struct Dispatcher {
    registry: Arc<TagRegistry>,
    metrics: Arc<RelayMetrics>,
    mode: DispatchMode,
    listener_buffer: usize,
    workers: DashMap<String, mpsc::Sender<Message>>,
    shutdown: CancellationToken,
}

impl Dispatcher {
    /// Creates a dispatcher.
    pub fn new(
        registry: Arc<TagRegistry>,
        metrics: Arc<RelayMetrics>,
        mode: DispatchMode,
        listener_buffer: usize,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            registry,
            metrics,
            mode,
            listener_buffer: listener_buffer.max(1),
            workers: DashMap::new(),
            shutdown,
        }
    }

    /// Runs until shutdown or until every inbound sender is dropped.
    pub async fn run(self, mut inbound: mpsc::Receiver<Message>) {
        info!(mode = ?self.mode, "Dispatch loop started");

        loop {
            let msg = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                msg = inbound.recv() => match msg {
                    Some(msg) => msg,
                    None => break,
                },
            };

            match self.mode {
                DispatchMode::Serial => invoke_listeners(&self.registry, &self.metrics, &msg),
                DispatchMode::PerTag => self.enqueue(msg),
            }
        }

        info!("Dispatch loop stopped");
    }

    fn enqueue(&self, msg: Message) {
        let sender = self
            .workers
            .entry(msg.tag().to_string())
            .or_insert_with(|| self.spawn_worker(msg.tag()))
            .clone();

        match sender.try_send(msg) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(msg)) => {
                self.metrics.message_dropped();
                warn!(tag = %msg.tag(), "Listener queue full, inbound message dropped");
            }
            Err(mpsc::error::TrySendError::Closed(msg)) => {
                self.workers.remove(msg.tag());
                debug!(tag = %msg.tag(), "Listener worker gone, message dropped");
            }
        }
    }

    fn spawn_worker(&self, tag: &str) -> mpsc::Sender<Message> {
        let (tx, mut rx) = mpsc::channel::<Message>(self.listener_buffer);
        let registry = self.registry.clone();
        let metrics = self.metrics.clone();
        let shutdown = self.shutdown.clone();

        debug!(tag = %tag, "Spawning listener worker");
        tokio::spawn(async move {
            loop {
                let msg = tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Some(msg) => msg,
                        None => break,
                    },
                };
                invoke_listeners(&registry, &metrics, &msg);
            }
        });
        tx
    }
}

/// Calls every listener of the message's tag, in registration order.
///
/// The listener list is snapshotted first, so a listener may bind further
/// listeners without deadlocking; those see the next message only.
///
/// A panicking listener is logged and skipped; the remaining listeners and
/// the loop calling this keep running.
pub fn invoke_listeners(registry: &TagRegistry, metrics: &RelayMetrics, msg: &Message) {
    let listeners = registry.listeners(msg.tag());
    if listeners.is_empty() {
        debug!(tag = %msg.tag(), "No listener for tag, message dropped");
        return;
    }
    for (index, listener) in listeners.iter().enumerate() {
        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| listener.on_message(msg.tag(), msg.data())));
        metrics.listener_invoked();
        if let Err(payload) = outcome {
            error!(
                tag = %msg.tag(),
                listener = index,
                panic = %panic_message(payload.as_ref()),
                "Listener panicked, message skipped for this listener"
            );
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
