//! Route definitions.
//!
//! Tags are not mounted individually: `/{segment}`, `/{segment}/` and
//! `/{segment}/{*file}` resolve the tag against the registry on every request.

use axum::Router;
use axum::routing::get;

use webobs_core::error::AppError;

use crate::error::ApiError;
use crate::handlers;
use crate::state::AppState;

/// Build the Axum router and attach `state` to every route.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/_relay/stats", get(handlers::stats::stats))
        .route("/{segment}", get(handlers::tag::entry))
        .route("/{segment}/", get(handlers::tag::asset_root))
        .route("/{segment}/{*file}", get(handlers::tag::asset))
        .fallback(not_found)
        .with_state(state)
}

async fn not_found() -> ApiError {
    AppError::not_found("No such endpoint").into()
}
