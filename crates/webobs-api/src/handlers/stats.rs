//! Relay introspection handler.

use std::collections::HashMap;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use webobs_relay::metrics::MetricsSnapshot;
use webobs_relay::session::SessionInfo;

use crate::state::AppState;

/// Per-tag registry state.
#[derive(Debug, Serialize)]
pub struct TagStats {
    /// Tag name
    pub tag: String,
    /// Registered listeners
    pub listeners: usize,
    /// Live sessions
    pub sessions: Vec<SessionInfo>,
}

/// Response of `GET /_relay/stats`.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// Engine version
    pub version: String,
    /// Bound tags
    pub tags: Vec<TagStats>,
    /// Engine counters
    pub metrics: MetricsSnapshot,
}

/// GET /_relay/stats
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let registry = state.relay.registry();
    let mut sessions: HashMap<String, Vec<SessionInfo>> = registry.session_infos();

    let tags = registry
        .tags()
        .into_iter()
        .map(|tag| TagStats {
            listeners: registry.listener_count(&tag),
            sessions: sessions.remove(&tag).unwrap_or_default(),
            tag,
        })
        .collect();

    Json(StatsResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        tags,
        metrics: state.relay.metrics().snapshot(),
    })
}
