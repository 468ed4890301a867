//! # webobs-api
//!
//! HTTP layer for WebObs built on Axum.
//!
//! Every bound tag gets an endpoint family resolved at request time, so
//! tags bound after the server starts are served immediately:
//!
//! - `GET /<tag>`: bootstrap page (template or inline)
//! - `GET /<tag>_ws`: WebSocket upgrade, attached to the relay
//! - `GET /<tag>_res/<file>`: static assets from the tag's asset path
//! - `GET /_relay/stats`: registry and metrics snapshot

pub mod app;
pub mod error;
pub mod handlers;
pub mod page;
pub mod router;
pub mod state;
pub mod wire;

pub use app::{build_app, serve};
pub use state::AppState;
