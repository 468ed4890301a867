//! Application callbacks for inbound messages.

use std::fmt;
use std::sync::Arc;

/// Callback invoked for every inbound message of the tag it is bound to.
///
/// Listeners run synchronously on the dispatch task, so an implementation
/// that blocks delays every message queued behind it.
pub trait Listener: Send + Sync + 'static {
    /// Handle one inbound payload.
    fn on_message(&self, tag: &str, data: &[u8]);
}

impl<F> Listener for F
where
    F: Fn(&str, &[u8]) + Send + Sync + 'static,
{
    fn on_message(&self, tag: &str, data: &[u8]) {
        self(tag, data)
    }
}

impl fmt::Debug for dyn Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Listener")
    }
}

/// Wrap a closure as a shareable listener.
pub fn from_fn<F>(f: F) -> Arc<dyn Listener>
where
    F: Fn(&str, &[u8]) + Send + Sync + 'static,
{
    Arc::new(f)
}
