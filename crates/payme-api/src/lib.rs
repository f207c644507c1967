//! HTTP server with HTMX support
//!
//! Routes are organized into modules:
//! - routes::payments: Payment form and submission
//! - routes::history: Payment history, filters, JSON views
//! - routes::settings: Configuration display and device reset
//! - routes::assets: Static assets through the offline cache

pub mod error;
pub mod identity;
pub mod routes;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    middleware,
    routing::{get, post},
    Router,
};
use payme_backend::Backend;
use payme_config::Config;
use payme_core::{
    AssetCache, AssetSourceRef, CacheStorage, DirAssetSource, PaymentRecorder, SessionRef,
    SessionStore, View,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

pub use error::ApiError;
pub use identity::DeviceId;

/// Upper bound for a payment form submission including the receipt
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// How often idle sessions are swept
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub backend: Backend,
    pub sessions: SessionStore,
    pub recorder: Arc<PaymentRecorder>,
    pub cache: Arc<AssetCache>,
    pub assets: AssetSourceRef,
}

impl AppState {
    pub fn new(config: Config, backend: Backend) -> Self {
        let sessions = SessionStore::new(config.history.clone(), config.sessions.clone());
        let recorder = Arc::new(PaymentRecorder::new(&backend, config.choices.clone()));
        let cache = Arc::new(AssetCache::from_config(&config.cache, CacheStorage::new()));
        let assets: AssetSourceRef = Arc::new(DirAssetSource::new(config.cache.static_dir.clone()));
        Self {
            config,
            backend,
            sessions,
            recorder,
            cache,
            assets,
        }
    }

    /// Session of the requesting device
    pub async fn session(&self, device: &DeviceId) -> SessionRef {
        self.sessions.get_or_create(device.as_str()).await
    }

    /// Pre-cache the configured assets and evict older cache generations.
    /// A failed install only degrades offline use.
    pub async fn prepare_cache(&self) {
        if let Err(e) = self.cache.install(self.assets.as_ref()).await {
            log::warn!("Asset pre-cache for {} failed: {}", self.cache.name(), e);
        }
        self.cache.activate().await;
    }
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    use routes::assets::{manifest, service_worker, static_asset};
    use routes::history::{
        api_options, api_payments, htmx_history_filter, htmx_history_reload, htmx_history_reset,
        htmx_history_table, page_history,
    };
    use routes::payments::{htmx_payment_store, page_home};
    use routes::settings::{api_settings, htmx_session_reset, page_settings};

    // Read-only JSON API, open to other origins
    let api = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/payments", get(api_payments))
        .route("/api/options", get(api_options))
        .route("/api/settings", get(api_settings))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET]),
        );

    Router::new()
        .merge(api)
        // HTMX page routes
        .route("/", get(page_home))
        .route("/history", get(page_history))
        .route("/settings", get(page_settings))
        // HTMX partial routes
        .route("/history/table", get(htmx_history_table))
        .route("/history/filter", post(htmx_history_filter))
        .route("/history/reset", post(htmx_history_reset))
        .route("/history/reload", post(htmx_history_reload))
        .route("/payments", post(htmx_payment_store))
        .route("/session/reset", post(htmx_session_reset))
        // Installable app
        .route("/static/*path", get(static_asset))
        .route("/service-worker.js", get(service_worker))
        .route("/manifest.json", get(manifest))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(middleware::from_fn(identity::device_identity))
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Decode an `application/x-www-form-urlencoded` body
pub fn parse_form(body: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for pair in body.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        params.insert(decode_component(key), decode_component(value));
    }
    params
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced.clone(),
    }
}

// ==================== Template Functions ====================

/// Base HTML template
pub fn base_html(title: &str, content: &str) -> String {
    format!(
        r##"<!DOCTYPE html>
<html lang="ru">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <meta name="theme-color" content="#4f46e5">
    <title>{} - PayMe</title>
    <link rel="manifest" href="/manifest.json">
    <link rel="icon" href="/static/icon.svg" type="image/svg+xml">
    <script src="https://unpkg.com/htmx.org@1.9.10"></script>
    <script src="https://cdn.tailwindcss.com"></script>
    <link rel="stylesheet" href="/static/style.css">
    <script src="/static/app.js" defer></script>
</head>
<body class="bg-gray-50 text-gray-900">
    {}
</body>
</html>"##,
        payme_utils::escape_html(title),
        content
    )
}

/// Navigation sidebar
pub fn nav_sidebar(current_path: &str) -> String {
    let mut links: Vec<(&str, &str, &str)> = View::ALL
        .iter()
        .map(|view| {
            let icon = match view {
                View::Home => "🧾",
                View::History => "📋",
            };
            (view.path(), view.title(), icon)
        })
        .collect();
    links.push(("/settings", "Настройки", "⚙️"));

    let mut nav = String::from("<div class='bg-white border-r h-screen flex flex-col'><div class='p-4 border-b'><h1 class='text-xl font-bold text-indigo-600'>PayMe</h1></div><ul class='flex-1 py-2 space-y-1 px-2'>");

    for (path, label, icon) in &links {
        let is_active = if *path == "/" {
            current_path == "/"
        } else {
            current_path.starts_with(path)
        };
        let active_class = if is_active { "bg-indigo-50 text-indigo-600" } else { "text-gray-600 hover:bg-gray-50" };
        nav.push_str(&format!(
            r#"<li><a href='{}' class='flex items-center gap-2 px-3 py-2 rounded-lg {}'>{}<span>{}</span></a></li>"#,
            path, active_class, icon, label
        ));
    }
    nav.push_str("</ul></div>");
    nav
}

/// Check if request is from HTMX (partial page update)
fn is_htmx_request(headers: &axum::http::HeaderMap) -> bool {
    headers.get("hx-request").is_some()
}

/// Wrap content for full page or HTMX partial
pub fn page_response(headers: &axum::http::HeaderMap, title: &str, current_path: &str, inner_content: &str) -> String {
    if is_htmx_request(headers) {
        format!(
            r#"<main class='flex-1 overflow-auto bg-gray-50 p-6'>{}</main>"#,
            inner_content
        )
    } else {
        base_html(
            title,
            &format!(
                r#"<div class='flex flex-col h-screen'>
    <div class='flex flex-1 overflow-hidden'>
        <aside class='w-64 flex-shrink-0'>{}</aside>
        <main class='flex-1 overflow-auto bg-gray-50 p-6'>{}</main>
    </div>
</div>"#,
                nav_sidebar(current_path),
                inner_content
            ),
        )
    }
}

/// Start the HTTP server and serve until Ctrl-C
pub async fn start_server(state: AppState) -> anyhow::Result<()> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    state.prepare_cache().await;

    let sessions = state.sessions.clone();
    let router = create_router(state);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    let sweeper = tokio::spawn(sweep_sessions(sessions));
    log::info!("Starting PayMe server on http://{}", addr);
    log::info!("Available routes:");
    log::info!("  - / (Payment form)");
    log::info!("  - /history (Payment history)");
    log::info!("  - /settings (Configuration)");
    log::info!("  - /api/* (JSON API endpoints)");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    sweeper.abort();
    log::info!("Server stopped gracefully");
    Ok(())
}

async fn sweep_sessions(sessions: SessionStore) {
    let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
    loop {
        interval.tick().await;
        let evicted = sessions.evict_idle().await;
        if evicted > 0 {
            log::debug!("Evicted {} idle sessions, {} left", evicted, sessions.len().await);
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

// ==================== Tests ====================
