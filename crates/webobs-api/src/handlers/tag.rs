//! Per-tag endpoint family, resolved against the registry on each request.

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::{Path, Request, State, WebSocketUpgrade};
use axum::http::Uri;
use axum::response::{Html, IntoResponse, Response};
use tower::ServiceExt;
use tower_http::services::ServeDir;

use webobs_core::error::AppError;

use crate::error::ApiResult;
use crate::handlers::ws;
use crate::page::{self, RES_SUFFIX, WS_SUFFIX};
use crate::state::AppState;

/// GET /{segment}: `<tag>_ws` upgrades, `<tag>` serves the bootstrap page.
pub async fn entry(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> ApiResult<Response> {
    let registry = state.relay.registry();

    if let Some(tag) = segment.strip_suffix(WS_SUFFIX) {
        if registry.is_bound(tag) {
            let tag = tag.to_string();
            return Ok(match upgrade {
                Ok(upgrade) => ws::upgrade(state, tag, upgrade),
                Err(rejection) => rejection.into_response(),
            });
        }
    }

    let Some(asset_path) = registry.binding(&segment) else {
        return Err(AppError::not_found(format!("No tag bound at '/{segment}'")).into());
    };

    let html = page::render_page(&asset_path, &segment).await?;
    Ok(Html(html).into_response())
}

/// GET /{segment}/{*file}: static assets for `<tag>_res`.
pub async fn asset(
    State(state): State<AppState>,
    Path((segment, _file)): Path<(String, String)>,
    request: Request,
) -> ApiResult<Response> {
    serve_asset(&state, &segment, request).await
}

/// GET /{segment}/: root of `<tag>_res`, served as `index.html` if present.
pub async fn asset_root(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    request: Request,
) -> ApiResult<Response> {
    serve_asset(&state, &segment, request).await
}

async fn serve_asset(state: &AppState, segment: &str, request: Request) -> ApiResult<Response> {
    let asset_path = segment
        .strip_suffix(RES_SUFFIX)
        .and_then(|tag| state.relay.registry().binding(tag))
        .ok_or_else(|| AppError::not_found(format!("No assets bound at '/{segment}/'")))?;

    let (mut parts, body) = request.into_parts();
    parts.uri = strip_first_segment(&parts.uri)?;
    let request = Request::from_parts(parts, body);

    let response = match ServeDir::new(asset_path).oneshot(request).await {
        Ok(response) => response,
        Err(infallible) => match infallible {},
    };
    Ok(response.into_response())
}

/// `/chat_res/js/app.js?v=1` → `/js/app.js?v=1`, keeping percent-encoding.
fn strip_first_segment(uri: &Uri) -> Result<Uri, AppError> {
    let path = uri.path();
    let rest = path
        .get(1..)
        .and_then(|p| p.find('/'))
        .map(|i| &path[i + 1..])
        .unwrap_or("/");
    let rewritten = match uri.query() {
        Some(query) => format!("{rest}?{query}"),
        None => rest.to_string(),
    };
    rewritten
        .parse()
        .map_err(|e| AppError::internal(format!("Invalid asset path '{rewritten}': {e}")))
}
