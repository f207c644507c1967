//! Settings API endpoints - JSON API and device reset

use crate::identity::{cookie_header, new_device_id};
use crate::{AppState, DeviceId};
use axum::http::header::{HeaderName, SET_COOKIE};
use axum::response::{IntoResponse, Response};
use payme_config::Config;

const REDACTED: &str = "***";
const HX_REDIRECT: HeaderName = HeaderName::from_static("hx-redirect");

/// Effective configuration with the anon key redacted
pub async fn api_settings(state: axum::extract::State<AppState>) -> axum::Json<Config> {
    let mut config = state.config.clone();
    if config.backend.anon_key.is_some() {
        config.backend.anon_key = Some(REDACTED.to_string());
    }
    axum::Json(config)
}

/// HTMX: Forget this device's session and issue a fresh identity
pub async fn htmx_session_reset(
    state: axum::extract::State<AppState>,
    axum::Extension(device): axum::Extension<DeviceId>,
) -> Response {
    state.sessions.remove(device.as_str()).await;
    let next_id = new_device_id();
    log::info!("Device {} reset, new id {}", device.as_str(), next_id);
    (
        [(SET_COOKIE, cookie_header(&next_id)), (HX_REDIRECT, "/".to_string())],
        "",
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use axum::http::{header, StatusCode};

    #[tokio::test]
    async fn test_settings_hide_anon_key() {
        let app = test_app();
        let response = app.send(get("/api/settings", USER)).await;
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "application/json");
        let body = body_text(response).await;
        assert!(!body.contains("secret-anon-key"));
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["backend"]["anon_key"], "***");
        assert_eq!(json["cache"]["name"], "payme-v1");
    }

    #[tokio::test]
    async fn test_session_reset_issues_new_identity() {
        let app = test_app();
        app.send(get("/history", USER)).await;
        assert!(app.state.sessions.get(USER).await.is_some());

        let response = app.send(post_form("/session/reset", USER, "")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("hx-redirect").unwrap(), "/");
        let cookies: Vec<_> = response.headers().get_all(header::SET_COOKIE).iter().collect();
        assert_eq!(cookies.len(), 1);
        let cookie = cookies[0].to_str().unwrap();
        assert!(cookie.starts_with("payme_user="));
        assert!(!cookie.contains(USER));
        assert!(app.state.sessions.get(USER).await.is_none());
    }
}
