//! Per-device session context
//!
//! One `Session` per device identity holds everything the pages need between
//! requests: the history view model, the last fetch error, the user's
//! metadata and the active view. Sessions are kept in a `SessionStore`.

use crate::display::{render, HistoryDisplay};
use crate::error::{CoreError, CoreResult, DefaultErrorLogger, ErrorContext, ErrorLogger};
use crate::navigation::View;
use crate::view::PaymentListView;
use payme_backend::{BackendResult, MetadataStore, Payment, RecordSource, UserMeta};
use payme_config::{HistoryConfig, SessionConfig};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

#[derive(Debug)]
pub struct Session {
    user_id: String,
    history: PaymentListView,
    fetch_error: Option<String>,
    meta: Option<UserMeta>,
    view: View,
    history_loaded: bool,
}

impl Session {
    pub fn new(user_id: impl Into<String>, config: &HistoryConfig) -> Self {
        Self {
            user_id: user_id.into(),
            history: PaymentListView::from_config(config),
            fetch_error: None,
            meta: None,
            view: View::Home,
            history_loaded: false,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn history(&self) -> &PaymentListView {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut PaymentListView {
        &mut self.history
    }

    pub fn fetch_error(&self) -> Option<&str> {
        self.fetch_error.as_deref()
    }

    pub fn meta(&self) -> Option<&UserMeta> {
        self.meta.as_ref()
    }

    pub fn view(&self) -> View {
        self.view
    }

    /// Whether a fetch has succeeded since the session was created
    pub fn history_loaded(&self) -> bool {
        self.history_loaded
    }

    pub fn navigate(&mut self, view: View) {
        if self.view != view {
            log::debug!("Session {} navigates {:?} -> {:?}", self.user_id, self.view, view);
        }
        self.view = view;
    }

    /// Fetch the snapshot for the history view.
    ///
    /// On failure the error text is kept for display and the previous
    /// snapshot stays in place.
    pub async fn activate_history(&mut self, source: &dyn RecordSource) -> CoreResult<usize> {
        self.navigate(View::History);
        match self.fetch_records(source).await {
            Ok(records) => {
                let count = records.len();
                self.history.load(records);
                self.fetch_error = None;
                self.history_loaded = true;
                Ok(count)
            }
            Err(e) => {
                let error = CoreError::Fetch {
                    message: format!("Ошибка загрузки: {}", e),
                };
                DefaultErrorLogger.log_error(
                    &error,
                    &ErrorContext::new("activate_history").with_user_id(&self.user_id),
                );
                self.fetch_error = Some(error.to_string());
                Err(error)
            }
        }
    }

    /// One retry when the first failure is transient
    async fn fetch_records(&self, source: &dyn RecordSource) -> BackendResult<Vec<Payment>> {
        match source.fetch_payments(&self.user_id).await {
            Err(e) if e.is_transient() => {
                log::warn!("Fetch for {} failed ({}), retrying once", self.user_id, e);
                source.fetch_payments(&self.user_id).await
            }
            result => result,
        }
    }

    /// Load the history unless a snapshot is already present
    pub async fn ensure_history(&mut self, source: &dyn RecordSource) {
        if !self.history_loaded {
            // The error is kept on the session for display
            let _ = self.activate_history(source).await;
        }
    }

    /// Make the next `ensure_history` fetch again, e.g. after a new payment
    pub fn invalidate_history(&mut self) {
        self.history_loaded = false;
    }

    /// Read user metadata for the form; failures leave it absent
    pub async fn activate_home(&mut self, store: &dyn MetadataStore) {
        self.navigate(View::Home);
        self.refresh_meta(store).await;
    }

    pub async fn refresh_meta(&mut self, store: &dyn MetadataStore) {
        match store.fetch_meta(&self.user_id).await {
            Ok(meta) => self.meta = meta,
            Err(e) => {
                let error = CoreError::Metadata {
                    message: format!("Failed to load user metadata: {}", e),
                };
                DefaultErrorLogger.log_error(
                    &error,
                    &ErrorContext::new("refresh_meta").with_user_id(&self.user_id),
                );
                self.meta = None;
            }
        }
    }

    /// Display model of the history including the last fetch error
    pub fn render_history(&self) -> HistoryDisplay {
        let mut display = render(&self.history);
        display.error = self.fetch_error.clone();
        display
    }
}

pub type SessionRef = Arc<Mutex<Session>>;

struct SessionEntry {
    session: SessionRef,
    last_access: Instant,
}

/// Sessions by device identity.
///
/// Bounded: idle sessions expire and, at the limit, the least recently used
/// session makes room for a new one.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
    history: HistoryConfig,
    limits: SessionConfig,
}

impl SessionStore {
    pub fn new(history: HistoryConfig, limits: SessionConfig) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            history,
            limits,
        }
    }

    fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.limits.idle_timeout_secs)
    }

    pub async fn get_or_create(&self, user_id: &str) -> SessionRef {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get_mut(user_id) {
            entry.last_access = now;
            return entry.session.clone();
        }

        let idle = self.idle_timeout();
        sessions.retain(|_, entry| now.duration_since(entry.last_access) < idle);
        while sessions.len() >= self.limits.max_sessions.max(1) {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    log::debug!("Session limit reached, dropping {}", id);
                    sessions.remove(&id);
                }
                None => break,
            }
        }

        log::info!("New session for device {}", user_id);
        let session = Arc::new(Mutex::new(Session::new(user_id, &self.history)));
        sessions.insert(
            user_id.to_string(),
            SessionEntry {
                session: session.clone(),
                last_access: now,
            },
        );
        session
    }

    pub async fn get(&self, user_id: &str) -> Option<SessionRef> {
        self.sessions.read().await.get(user_id).map(|entry| entry.session.clone())
    }

    /// Drop a session; returns whether it existed
    pub async fn remove(&self, user_id: &str) -> bool {
        self.sessions.write().await.remove(user_id).is_some()
    }

    /// Drop sessions idle for longer than the timeout; returns how many
    pub async fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let idle = self.idle_timeout();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_access) < idle);
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use payme_backend::{BackendError, Failure, MemoryBackend, MetaPatch, NewPayment};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn payment(user: &str, kind: &str, day: u32) -> Payment {
        Payment {
            user_id: Some(user.to_string()),
            payment_type: Some(kind.to_string()),
            created_at: Some(Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_activate_history_loads_snapshot() {
        let backend = MemoryBackend::with_payments(vec![
            payment("u-1", "Газ", 1),
            payment("u-1", "Вода", 2),
            payment("u-2", "Мусор", 3),
        ]);
        let mut session = Session::new("u-1", &HistoryConfig::default());
        let count = session.activate_history(&backend).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(session.view(), View::History);
        assert_eq!(session.history().type_options(), ["Вода", "Газ"]);
        assert!(session.fetch_error().is_none());
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_prior_snapshot() {
        let backend = MemoryBackend::with_payments(vec![payment("u-1", "Газ", 1)]);
        let mut session = Session::new("u-1", &HistoryConfig::default());
        session.activate_history(&backend).await.unwrap();

        backend.set_failure(Failure::Fetch, true);
        let err = session.activate_history(&backend).await.unwrap_err();
        assert!(matches!(err, CoreError::Fetch { .. }));
        assert_eq!(session.history().snapshot().len(), 1);
        assert!(session.fetch_error().is_some());

        let display = session.render_history();
        assert_eq!(display.rows.len(), 1);
        assert!(display.error.unwrap().starts_with("Ошибка загрузки"));

        backend.set_failure(Failure::Fetch, false);
        session.activate_history(&backend).await.unwrap();
        assert!(session.fetch_error().is_none());
    }

    #[tokio::test]
    async fn test_ensure_history_fetches_once() {
        let backend = MemoryBackend::with_payments(vec![payment("u-1", "Газ", 1)]);
        let mut session = Session::new("u-1", &HistoryConfig::default());
        session.ensure_history(&backend).await;
        assert!(session.history_loaded());

        backend.set_failure(Failure::Fetch, true);
        session.ensure_history(&backend).await;
        assert!(session.fetch_error().is_none());
    }

    #[tokio::test]
    async fn test_activate_home_swallows_metadata_failure() {
        let backend = MemoryBackend::new();
        let mut patch = MetaPatch::new("u-1");
        patch.last_bank = Some("Сбер".to_string());
        backend.upsert_meta(&patch).await.unwrap();

        let mut session = Session::new("u-1", &HistoryConfig::default());
        session.navigate(View::History);
        session.activate_home(&backend).await;
        assert_eq!(session.view(), View::Home);
        assert_eq!(session.meta().unwrap().last_bank.as_deref(), Some("Сбер"));

        backend.set_failure(Failure::Meta, true);
        session.activate_home(&backend).await;
        assert!(session.meta().is_none());
    }

    /// Fails with the queued errors first, then returns no records
    struct FlakySource {
        errors: std::sync::Mutex<Vec<BackendError>>,
        calls: AtomicUsize,
    }

    impl FlakySource {
        fn failing_with(errors: Vec<BackendError>) -> Self {
            Self {
                errors: std::sync::Mutex::new(errors),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RecordSource for FlakySource {
        async fn fetch_payments(&self, _user_id: &str) -> BackendResult<Vec<Payment>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.errors.lock().unwrap().pop() {
                Some(e) => Err(e),
                None => Ok(vec![payment("u-1", "Газ", 1)]),
            }
        }

        async fn insert_payment(&self, _payment: &NewPayment) -> BackendResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_transient_fetch_failure_is_retried() {
        let source = FlakySource::failing_with(vec![BackendError::Status {
            status: 503,
            body: "busy".to_string(),
        }]);
        let mut session = Session::new("u-1", &HistoryConfig::default());
        assert_eq!(session.activate_history(&source).await.unwrap(), 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert!(session.fetch_error().is_none());
    }

    #[tokio::test]
    async fn test_permanent_fetch_failure_is_not_retried() {
        let source = FlakySource::failing_with(vec![BackendError::Status {
            status: 401,
            body: "bad key".to_string(),
        }]);
        let mut session = Session::new("u-1", &HistoryConfig::default());
        assert!(session.activate_history(&source).await.is_err());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(session.fetch_error().unwrap().contains("401"));
    }

    fn limits(idle_timeout_secs: u64, max_sessions: usize) -> SessionConfig {
        SessionConfig {
            idle_timeout_secs,
            max_sessions,
        }
    }

    #[tokio::test]
    async fn test_store_reuses_and_removes_sessions() {
        let store = SessionStore::new(HistoryConfig::default(), SessionConfig::default());
        let first = store.get_or_create("u-1").await;
        let again = store.get_or_create("u-1").await;
        assert!(Arc::ptr_eq(&first, &again));
        store.get_or_create("u-2").await;
        assert_eq!(store.len().await, 2);

        assert!(store.remove("u-1").await);
        assert!(!store.remove("u-1").await);
        assert!(store.get("u-1").await.is_none());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_store_drops_least_recently_used_at_limit() {
        let store = SessionStore::new(HistoryConfig::default(), limits(3600, 2));
        let tick = Duration::from_millis(5);
        store.get_or_create("u-1").await;
        tokio::time::sleep(tick).await;
        store.get_or_create("u-2").await;
        tokio::time::sleep(tick).await;
        // Touch u-1 so u-2 becomes the oldest
        store.get_or_create("u-1").await;
        tokio::time::sleep(tick).await;
        store.get_or_create("u-3").await;

        assert_eq!(store.len().await, 2);
        assert!(store.get("u-1").await.is_some());
        assert!(store.get("u-2").await.is_none());
        assert!(store.get("u-3").await.is_some());
    }

    #[tokio::test]
    async fn test_store_evicts_idle_sessions() {
        let store = SessionStore::new(HistoryConfig::default(), limits(1, 100));
        store.get_or_create("u-1").await;
        store.get_or_create("u-2").await;
        assert_eq!(store.evict_idle().await, 0);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        store.get_or_create("u-2").await;
        assert_eq!(store.evict_idle().await, 1);
        assert!(store.get("u-1").await.is_none());
        assert!(store.get("u-2").await.is_some());

        // Idle sessions also go when a new one is created
        tokio::time::sleep(Duration::from_millis(1100)).await;
        store.get_or_create("u-3").await;
        assert_eq!(store.len().await, 1);
    }
}
