//! Relay engine configuration.

use serde::{Deserialize, Serialize};

/// What the fan-out loop does when a session's outbound queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanoutPolicy {
    /// Wait until the session drains its queue. One stalled session
    /// stalls the whole pass.
    Block,
    /// Drop the message for that session only and move on.
    #[default]
    DropNewest,
}

/// How inbound messages are handed to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// One loop invokes every listener inline; a slow listener delays all tags.
    #[default]
    Serial,
    /// Each tag gets its own bounded queue and worker task.
    PerTag,
}

/// WebSocket frame type used when writing payloads to the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameFormat {
    /// Text frame when the payload is valid UTF-8, binary otherwise.
    #[default]
    Auto,
    /// Always text; non UTF-8 payloads are converted lossily.
    Text,
    /// Always binary.
    Binary,
}

/// Relay engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Capacity of the shared inbound channel (read pumps → dispatch loop).
    #[serde(default = "default_buffer")]
    pub inbound_buffer_size: usize,
    /// Capacity of the application-facing outbound channel.
    #[serde(default = "default_buffer")]
    pub outbound_buffer_size: usize,
    /// Capacity of each session's private outbound queue.
    #[serde(default = "default_buffer")]
    pub session_buffer_size: usize,
    /// Capacity of each per-tag listener queue (`per_tag` dispatch only).
    #[serde(default = "default_buffer")]
    pub listener_buffer_size: usize,
    /// Fan-out overflow policy.
    #[serde(default)]
    pub fanout_policy: FanoutPolicy,
    /// Listener dispatch mode.
    #[serde(default)]
    pub dispatch_mode: DispatchMode,
    /// Outbound frame format.
    #[serde(default)]
    pub frame_format: FrameFormat,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            inbound_buffer_size: default_buffer(),
            outbound_buffer_size: default_buffer(),
            session_buffer_size: default_buffer(),
            listener_buffer_size: default_buffer(),
            fanout_policy: FanoutPolicy::default(),
            dispatch_mode: DispatchMode::default(),
            frame_format: FrameFormat::default(),
        }
    }
}

fn default_buffer() -> usize {
    64
}
