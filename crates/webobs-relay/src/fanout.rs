//! Outbound fan-out loop: application → every session of a tag.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use webobs_core::config::relay::FanoutPolicy;

use crate::message::Message;
use crate::metrics::RelayMetrics;
use crate::registry::TagRegistry;
use crate::session::Delivery;

/// Drains the application-facing channel, delivering each payload to the
/// sessions registered under its tag at the time of the pass.
#[derive(Debug)]
pub struct FanOut {
    registry: Arc<TagRegistry>,
    metrics: Arc<RelayMetrics>,
    policy: FanoutPolicy,
    shutdown: CancellationToken,
}

impl FanOut {
    /// Creates a fan-out loop.
    pub fn new(
        registry: Arc<TagRegistry>,
        metrics: Arc<RelayMetrics>,
        policy: FanoutPolicy,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            registry,
            metrics,
            policy,
            shutdown,
        }
    }

    /// Runs until shutdown or until every application sender is dropped.
    pub async fn run(self, mut outbound: mpsc::Receiver<Message>) {
        info!(policy = ?self.policy, "Fan-out loop started");

        loop {
            let msg = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                msg = outbound.recv() => match msg {
                    Some(msg) => msg,
                    None => break,
                },
            };
            self.fan_out(&msg).await;
        }

        info!("Fan-out loop stopped");
    }

    /// One pass: deliver `msg` to every session of its tag, in list order.
    pub async fn fan_out(&self, msg: &Message) -> usize {
        let targets = self.registry.sessions(msg.tag());
        let mut sent = 0;

        for session in &targets {
            match session.deliver(msg.data().clone(), self.policy).await {
                Delivery::Sent => {
                    sent += 1;
                    self.metrics.message_fanned_out();
                }
                Delivery::Dropped => {
                    self.metrics.message_dropped();
                    warn!(
                        tag = %msg.tag(),
                        session_id = session.id,
                        "Session queue full, outbound message dropped"
                    );
                }
                Delivery::Closed => {
                    debug!(tag = %msg.tag(), session_id = session.id, "Skipping closed session");
                }
            }
        }

        sent
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;

    use super::*;

    fn setup(policy: FanoutPolicy, session_buffer: usize) -> (Arc<TagRegistry>, FanOut, Arc<RelayMetrics>) {
        let (tx, _rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();
        let metrics = Arc::new(RelayMetrics::new());
        let registry = Arc::new(TagRegistry::new(
            tx,
            session_buffer,
            shutdown.clone(),
            metrics.clone(),
        ));
        let fanout = FanOut::new(registry.clone(), metrics.clone(), policy, shutdown);
        (registry, fanout, metrics)
    }

    #[tokio::test]
    async fn test_every_session_of_tag_receives_once() {
        let (registry, fanout, _) = setup(FanoutPolicy::DropNewest, 8);
        let mut s1 = registry.admit("chat");
        let mut s2 = registry.admit("chat");
        let mut other = registry.admit("news");

        let sent = fanout.fan_out(&Message::new("chat", "hi")).await;
        assert_eq!(sent, 2);

        assert_eq!(s1.outbound.recv().await.unwrap(), Bytes::from_static(b"hi"));
        assert_eq!(s2.outbound.recv().await.unwrap(), Bytes::from_static(b"hi"));
        assert!(s1.outbound.try_recv().is_err());
        assert!(s2.outbound.try_recv().is_err());
        assert!(other.outbound.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dismissed_session_no_longer_targeted() {
        let (registry, fanout, _) = setup(FanoutPolicy::DropNewest, 8);
        let mut s1 = registry.admit("chat");
        let mut s2 = registry.admit("chat");

        registry.dismiss("chat", s1.id());
        fanout.fan_out(&Message::new("chat", "later")).await;

        assert!(s1.outbound.try_recv().is_err());
        assert_eq!(s2.outbound.recv().await.unwrap(), Bytes::from_static(b"later"));
    }

    #[tokio::test]
    async fn test_unknown_tag_is_noop() {
        let (_registry, fanout, metrics) = setup(FanoutPolicy::DropNewest, 8);
        assert_eq!(fanout.fan_out(&Message::new("ghost", "x")).await, 0);
        assert_eq!(metrics.snapshot().messages_fanned_out, 0);
    }

    #[tokio::test]
    async fn test_drop_newest_isolates_stalled_session() {
        let (registry, fanout, metrics) = setup(FanoutPolicy::DropNewest, 1);
        let _stalled = registry.admit("chat");
        let mut healthy = registry.admit("chat");

        fanout.fan_out(&Message::new("chat", "1")).await;
        assert_eq!(healthy.outbound.recv().await.unwrap(), Bytes::from_static(b"1"));

        // The stalled session's queue is full now; the healthy one still gets it.
        fanout.fan_out(&Message::new("chat", "2")).await;
        assert_eq!(healthy.outbound.recv().await.unwrap(), Bytes::from_static(b"2"));
        assert_eq!(metrics.snapshot().messages_dropped, 1);
    }

    #[tokio::test]
    async fn test_block_policy_stalls_pass_until_drained() {
        let (registry, fanout, _) = setup(FanoutPolicy::Block, 1);
        let mut stalled = registry.admit("chat");
        let mut healthy = registry.admit("chat");

        fanout.fan_out(&Message::new("chat", "1")).await;
        healthy.outbound.recv().await.unwrap();

        let msg = Message::new("chat", "2");
        let pass = fanout.fan_out(&msg);
        tokio::pin!(pass);
        assert!(
            tokio::time::timeout(Duration::from_millis(20), &mut pass)
                .await
                .is_err()
        );
        assert!(healthy.outbound.try_recv().is_err());

        stalled.outbound.recv().await.unwrap();
        assert_eq!(pass.await, 2);
        assert_eq!(healthy.outbound.recv().await.unwrap(), Bytes::from_static(b"2"));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (tx, rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();
        let metrics = Arc::new(RelayMetrics::new());
        let registry = Arc::new(TagRegistry::new(
            tx.clone(),
            8,
            shutdown.clone(),
            metrics.clone(),
        ));
        let fanout = FanOut::new(registry, metrics, FanoutPolicy::DropNewest, shutdown.clone());
        let task = tokio::spawn(fanout.run(rx));

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("fan-out loop did not stop")
            .unwrap();
    }
}
