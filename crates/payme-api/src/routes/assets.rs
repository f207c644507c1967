//! Static assets served through the offline asset cache

use crate::{ApiError, AppState};
use axum::extract::Path;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

async fn serve(state: &AppState, path: &str, cache_control: &'static str) -> Result<Response, ApiError> {
    let asset = state.cache.fetch(path, state.assets.as_ref()).await?;
    if asset.status == 404 {
        return Err(ApiError::NotFound {
            resource: path.to_string(),
        });
    }
    let status = StatusCode::from_u16(asset.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Ok((
        status,
        [(CONTENT_TYPE, asset.content_type), (CACHE_CONTROL, cache_control.to_string())],
        asset.body,
    )
        .into_response())
}

pub async fn static_asset(
    state: axum::extract::State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    serve(&state, &path, "public, max-age=3600").await
}

/// The worker script must be revalidated so new cache generations roll out
pub async fn service_worker(state: axum::extract::State<AppState>) -> Result<Response, ApiError> {
    serve(&state, "service-worker.js", "no-cache").await
}

pub async fn manifest(state: axum::extract::State<AppState>) -> Result<Response, ApiError> {
    serve(&state, "manifest.json", "public, max-age=3600").await
}
