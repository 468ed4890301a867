//! # webobs-relay
//!
//! Tag-scoped publish/subscribe relay between an application and browser
//! WebSocket sessions. Provides:
//!
//! - A tag registry tracking live sessions and listeners per tag
//! - Per-session read and write pumps over any frame stream/sink
//! - An inbound dispatch loop invoking listeners per tag
//! - An outbound fan-out loop delivering payloads to every session of a tag

pub mod dispatch;
pub mod fanout;
pub mod listener;
pub mod message;
pub mod metrics;
pub mod registry;
pub mod server;
pub mod session;

pub use listener::Listener;
pub use message::Message;
pub use registry::TagRegistry;
pub use server::RelayEngine;
pub use session::{Frame, Session, SessionHandle, SessionId};
