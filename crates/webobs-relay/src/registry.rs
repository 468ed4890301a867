//! Tag registry: live sessions and listeners per tag.
//!
//! Both maps sit behind one mutex. The lock is only held for the map
//! operation itself, never across a channel send or I/O; callers get
//! snapshots (`Vec<Arc<_>>`) and iterate them after the lock is released.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use webobs_core::error::AppError;
use webobs_core::result::AppResult;

use crate::listener::Listener;
use crate::message::Message;
use crate::metrics::RelayMetrics;
use crate::session::{Session, SessionHandle, SessionId, SessionInfo};

/// Suffix of a tag's WebSocket endpoint.
pub const WS_SUFFIX: &str = "_ws";
/// Suffix of a tag's asset endpoint.
pub const RES_SUFFIX: &str = "_res";

#[derive(Debug, Default)]
struct Tables {
    /// Tag → live sessions, in admission order.
    sessions: HashMap<String, Vec<Arc<SessionHandle>>>,
    /// Tag → listeners, in registration order.
    listeners: HashMap<String, Vec<Arc<dyn Listener>>>,
    /// Tag → asset directory given at bind time.
    bindings: HashMap<String, PathBuf>,
    /// Tag → next session id. Never reset, so ids are not reused.
    next_id: HashMap<String, SessionId>,
}

/// Registry of bound tags, their listeners and their live sessions.
#[derive(Debug)]
pub struct TagRegistry {
    tables: Mutex<Tables>,
    /// Shared inbound channel every session's read pump feeds.
    inbound: mpsc::Sender<Message>,
    /// Capacity of each session's private outbound queue.
    session_buffer: usize,
    /// Parent of every session's cancellation token.
    shutdown: CancellationToken,
    metrics: Arc<RelayMetrics>,
}

impl TagRegistry {
    /// Creates an empty registry.
    pub fn new(
        inbound: mpsc::Sender<Message>,
        session_buffer: usize,
        shutdown: CancellationToken,
        metrics: Arc<RelayMetrics>,
    ) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            inbound,
            session_buffer: session_buffer.max(1),
            shutdown,
            metrics,
        }
    }

    /// Binds a tag's endpoint family to `asset_path` and, if given, appends
    /// `listener` to the tag's listeners.
    ///
    /// Binding the same tag again replaces the asset path and appends any
    /// further listener; listeners are never deduplicated. A tag whose
    /// endpoints would collide with another bound tag's (`a` and `a_ws`,
    /// `a` and `a_res`) is rejected.
    pub fn bind(
        &self,
        tag: &str,
        listener: Option<Arc<dyn Listener>>,
        asset_path: impl Into<PathBuf>,
    ) -> AppResult<()> {
        validate_tag(tag)?;
        let asset_path = asset_path.into();

        let listener_count = {
            let mut tables = self.tables.lock();
            if let Some(other) = tables.bindings.keys().find(|bound| shadows(tag, bound)) {
                return Err(AppError::validation(format!(
                    "Tag '{tag}' collides with the endpoints of bound tag '{other}'"
                )));
            }
            tables.bindings.insert(tag.to_string(), asset_path.clone());
            let listeners = tables.listeners.entry(tag.to_string()).or_default();
            if let Some(listener) = listener {
                listeners.push(listener);
            }
            listeners.len()
        };

        info!(
            tag = %tag,
            asset_path = %asset_path.display(),
            listeners = listener_count,
            "Tag bound"
        );
        Ok(())
    }

    /// Admits a new session under `tag`.
    ///
    /// The session gets the next id from the tag's counter, a fresh bounded
    /// outbound queue, a cancellation token derived from the registry's
    /// shutdown token, and is appended to the tag's session list.
    pub fn admit(&self, tag: &str) -> Session {
        let (tx, rx) = mpsc::channel(self.session_buffer);

        let handle = {
            let mut tables = self.tables.lock();
            let counter = tables.next_id.entry(tag.to_string()).or_insert(0);
            let id = *counter;
            *counter += 1;

            let handle = Arc::new(SessionHandle::new(
                id,
                tag.to_string(),
                tx,
                self.shutdown.child_token(),
            ));
            tables
                .sessions
                .entry(tag.to_string())
                .or_default()
                .push(handle.clone());
            handle
        };

        self.metrics.session_opened();
        debug!(tag = %tag, session_id = handle.id, "Session admitted");

        Session {
            handle,
            inbound: self.inbound.clone(),
            outbound: rx,
            metrics: self.metrics.clone(),
        }
    }

    /// Removes the session `id` from `tag` and closes it.
    ///
    /// The remaining sessions keep their order. Returns `false` (and does
    /// nothing else) when the tag or id is unknown.
    pub fn dismiss(&self, tag: &str, id: SessionId) -> bool {
        let removed = {
            let mut tables = self.tables.lock();
            let Some(sessions) = tables.sessions.get_mut(tag) else {
                return false;
            };
            let Some(pos) = sessions.iter().position(|s| s.id == id) else {
                return false;
            };
            let removed = sessions.remove(pos);
            if sessions.is_empty() {
                tables.sessions.remove(tag);
            }
            removed
        };

        removed.close();
        self.metrics.session_closed();
        debug!(tag = %tag, session_id = id, "Session dismissed");
        true
    }

    /// Snapshot of the sessions currently registered under `tag`.
    pub fn sessions(&self, tag: &str) -> Vec<Arc<SessionHandle>> {
        self.tables
            .lock()
            .sessions
            .get(tag)
            .cloned()
            .unwrap_or_default()
    }

    /// Snapshot of the listeners registered for `tag`.
    pub fn listeners(&self, tag: &str) -> Vec<Arc<dyn Listener>> {
        self.tables
            .lock()
            .listeners
            .get(tag)
            .cloned()
            .unwrap_or_default()
    }

    /// Ids of the live sessions of `tag`, in list order.
    pub fn session_ids(&self, tag: &str) -> Vec<SessionId> {
        self.sessions(tag).iter().map(|s| s.id).collect()
    }

    /// Number of live sessions of `tag`.
    pub fn session_count(&self, tag: &str) -> usize {
        self.tables
            .lock()
            .sessions
            .get(tag)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Number of listeners registered for `tag`.
    pub fn listener_count(&self, tag: &str) -> usize {
        self.tables
            .lock()
            .listeners
            .get(tag)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Asset directory of a bound tag.
    pub fn binding(&self, tag: &str) -> Option<PathBuf> {
        self.tables.lock().bindings.get(tag).cloned()
    }

    /// Whether `tag` has been bound.
    pub fn is_bound(&self, tag: &str) -> bool {
        self.tables.lock().bindings.contains_key(tag)
    }

    /// All bound tags, sorted.
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.tables.lock().bindings.keys().cloned().collect();
        tags.sort();
        tags
    }

    /// Info for every live session, grouped by tag.
    pub fn session_infos(&self) -> HashMap<String, Vec<SessionInfo>> {
        self.tables
            .lock()
            .sessions
            .iter()
            .map(|(tag, sessions)| (tag.clone(), sessions.iter().map(|s| s.info()).collect()))
            .collect()
    }

    /// Unlists and closes every session.
    pub fn close_all(&self) -> usize {
        let drained: Vec<Arc<SessionHandle>> = {
            let mut tables = self.tables.lock();
            tables.sessions.drain().flat_map(|(_, s)| s).collect()
        };
        for handle in &drained {
            handle.close();
            self.metrics.session_closed();
        }
        drained.len()
    }

    /// The shared inbound sender; read pumps feed it.
    pub fn inbound(&self) -> &mpsc::Sender<Message> {
        &self.inbound
    }
}

/// Validates a tag for use in URL paths.
pub fn validate_tag(tag: &str) -> AppResult<()> {
    if tag.is_empty() {
        return Err(AppError::validation("Tag must not be empty"));
    }
    if tag
        .chars()
        .any(|c| matches!(c, '/' | '?' | '#' | '%') || c.is_whitespace() || c.is_control())
    {
        return Err(AppError::validation(format!(
            "Tag '{tag}' must not contain '/', '?', '#', '%' or whitespace"
        )));
    }
    Ok(())
}

/// Whether `a` and `b` are distinct tags whose endpoint families overlap.
fn shadows(a: &str, b: &str) -> bool {
    let derived = |base: &str, other: &str| {
        other
            .strip_prefix(base)
            .is_some_and(|rest| rest == WS_SUFFIX || rest == RES_SUFFIX)
    };
    derived(a, b) || derived(b, a)
}
