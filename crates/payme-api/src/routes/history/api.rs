//! History API endpoints - JSON API and HTMX partial responses
//!
//! Endpoints:
//! - api_payments: Current filtered view (JSON)
//! - api_options: Distinct filter values (JSON)
//! - htmx_history_table: Table for the current state (HTML fragment)
//! - htmx_history_filter: Apply the filter bar (HTML fragment)
//! - htmx_history_reset: Clear all filters (HTML fragment)
//! - htmx_history_reload: Fetch a fresh snapshot (HTML fragment)

use super::page::{history_content_html, history_table_html};
use crate::{AppState, DeviceId};
use payme_core::FilterField;
use serde::Serialize;

#[derive(Serialize)]
pub struct OptionsResponse {
    payment_types: Vec<String>,
    banks: Vec<String>,
    addresses: Vec<String>,
}

/// Filtered payments of the current session (JSON API)
pub async fn api_payments(
    state: axum::extract::State<AppState>,
    axum::Extension(device): axum::Extension<DeviceId>,
) -> axum::Json<serde_json::Value> {
    let session_ref = state.session(&device).await;
    let mut session = session_ref.lock().await;
    session.ensure_history(state.backend.records.as_ref()).await;

    let view = session.history();
    axum::Json(serde_json::json!({
        "payments": view.filtered(),
        "filters": view.filters(),
        "total_count": view.snapshot().len(),
        "shown_count": view.filtered_len(),
        "empty_message": view.empty_state().map(|e| e.message()),
        "error": session.fetch_error(),
    }))
}

/// Distinct values offered by the filter bar (JSON API)
pub async fn api_options(
    state: axum::extract::State<AppState>,
    axum::Extension(device): axum::Extension<DeviceId>,
) -> axum::Json<OptionsResponse> {
    let session_ref = state.session(&device).await;
    let mut session = session_ref.lock().await;
    session.ensure_history(state.backend.records.as_ref()).await;

    let view = session.history();
    axum::Json(OptionsResponse {
        payment_types: view.type_options().to_vec(),
        banks: view.bank_options().to_vec(),
        addresses: view.address_options().to_vec(),
    })
}

/// HTMX: Table for the current snapshot and filters
pub async fn htmx_history_table(
    state: axum::extract::State<AppState>,
    axum::Extension(device): axum::Extension<DeviceId>,
) -> axum::response::Html<String> {
    let session_ref = state.session(&device).await;
    let mut session = session_ref.lock().await;
    session.ensure_history(state.backend.records.as_ref()).await;
    axum::response::Html(history_table_html(&session.render_history()))
}

/// HTMX: Set every filter from the submitted filter bar, then apply
pub async fn htmx_history_filter(
    state: axum::extract::State<AppState>,
    axum::Extension(device): axum::Extension<DeviceId>,
    body: String,
) -> axum::response::Html<String> {
    let params = crate::parse_form(&body);
    let session_ref = state.session(&device).await;
    let mut session = session_ref.lock().await;
    session.ensure_history(state.backend.records.as_ref()).await;

    let view = session.history_mut();
    for field in FilterField::ALL {
        let value = params.get(field.form_name()).map(String::as_str).unwrap_or_default();
        view.set_filter(field, value);
    }
    view.apply_filters();
    log::debug!("Filters for {}: {:?}", device.as_str(), view.filters());

    axum::response::Html(history_content_html(&session.render_history()))
}

/// HTMX: Clear all filters
pub async fn htmx_history_reset(
    state: axum::extract::State<AppState>,
    axum::Extension(device): axum::Extension<DeviceId>,
) -> axum::response::Html<String> {
    let session_ref = state.session(&device).await;
    let mut session = session_ref.lock().await;
    session.ensure_history(state.backend.records.as_ref()).await;
    session.history_mut().reset_filters();
    axum::response::Html(history_content_html(&session.render_history()))
}

/// HTMX: Fetch a fresh snapshot; filters are cleared by the load
pub async fn htmx_history_reload(
    state: axum::extract::State<AppState>,
    axum::Extension(device): axum::Extension<DeviceId>,
) -> axum::response::Html<String> {
    let session_ref = state.session(&device).await;
    let mut session = session_ref.lock().await;
    if let Ok(count) = session.activate_history(state.backend.records.as_ref()).await {
        log::debug!("Reloaded {} payments for {}", count, device.as_str());
    }
    axum::response::Html(history_content_html(&session.render_history()))
}
