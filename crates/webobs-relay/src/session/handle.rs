//! Registry-side handle to a single session.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use webobs_core::config::relay::FanoutPolicy;

/// Session identifier, unique among the sessions ever admitted for a tag.
pub type SessionId = u64;

/// Outcome of handing one payload to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Queued on the session's outbound channel.
    Sent,
    /// Queue full; the payload was discarded for this session.
    Dropped,
    /// The session is closed or its write pump is gone.
    Closed,
}

/// The part of a session the registry keeps: identity, the sender for its
/// private outbound queue, and the cancellation token both pumps observe.
///
/// Holding a handle does not keep the connection open. Once the session is
/// dismissed its token is cancelled and the write pump exits.
#[derive(Debug)]
pub struct SessionHandle {
    /// Id within the tag
    pub id: SessionId,
    /// Tag the session is bound to
    pub tag: String,
    /// When the session was admitted
    pub connected_at: DateTime<Utc>,
    sender: mpsc::Sender<Bytes>,
    cancel: CancellationToken,
}

impl SessionHandle {
    pub(crate) fn new(
        id: SessionId,
        tag: String,
        sender: mpsc::Sender<Bytes>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            tag,
            connected_at: Utc::now(),
            sender,
            cancel,
        }
    }

    /// Hand a payload to this session's write pump.
    ///
    /// With [`FanoutPolicy::Block`] this waits for queue space (or for the
    /// session to close); with [`FanoutPolicy::DropNewest`] a full queue
    /// discards the payload immediately.
    pub async fn deliver(&self, data: Bytes, policy: FanoutPolicy) -> Delivery {
        if !self.is_alive() {
            return Delivery::Closed;
        }
        match policy {
            FanoutPolicy::Block => tokio::select! {
                res = self.sender.send(data) => match res {
                    Ok(()) => Delivery::Sent,
                    Err(_) => Delivery::Closed,
                },
                _ = self.cancel.cancelled() => Delivery::Closed,
            },
            FanoutPolicy::DropNewest => match self.sender.try_send(data) {
                Ok(()) => Delivery::Sent,
                Err(mpsc::error::TrySendError::Full(_)) => Delivery::Dropped,
                Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Closed,
            },
        }
    }

    /// Whether the session is still open.
    pub fn is_alive(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Signal both pumps to stop.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Resolves once the session is closed.
    pub async fn closed(&self) {
        self.cancel.cancelled().await
    }

    /// Get a snapshot of session info
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            tag: self.tag.clone(),
            connected_at: self.connected_at,
            queued: self.sender.max_capacity() - self.sender.capacity(),
            alive: self.is_alive(),
        }
    }
}

/// Snapshot of session info (serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Session ID
    pub id: SessionId,
    /// Tag
    pub tag: String,
    /// Admitted at
    pub connected_at: DateTime<Utc>,
    /// Payloads waiting in the outbound queue
    pub queued: usize,
    /// Is alive
    pub alive: bool,
}
