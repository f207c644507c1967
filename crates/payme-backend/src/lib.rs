//! Hosted backend collaborators
//!
//! Payment rows, receipt files and user preferences all live in a hosted
//! backend-as-a-service. This crate defines the seams the rest of the
//! application talks to, plus two implementations: a Supabase REST client
//! and an in-memory backend.

use async_trait::async_trait;
use payme_config::BackendConfig;
use std::sync::Arc;

pub mod error;
pub mod memory;
pub mod supabase;
pub mod types;

pub use error::{BackendError, BackendResult};
pub use memory::{Failure, MemoryBackend};
pub use supabase::SupabaseBackend;
pub use types::{MetaPatch, NewPayment, Payment, PaymentId, UserMeta};

// ==================== Collaborator Traits ====================

/// Source of payment records
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Records belonging to `user_id`, newest `created_at` first
    async fn fetch_payments(&self, user_id: &str) -> BackendResult<Vec<Payment>>;

    /// Create a record; the backend assigns `created_at`
    async fn insert_payment(&self, payment: &NewPayment) -> BackendResult<()>;
}

/// Binary storage for receipts
#[async_trait]
pub trait ReceiptStorage: Send + Sync {
    /// Store a new object; existing objects are never overwritten
    async fn upload(&self, object_name: &str, bytes: Vec<u8>, content_type: &str) -> BackendResult<()>;

    /// Publicly resolvable URL of a stored object
    fn public_url(&self, object_name: &str) -> String;
}

/// Per-user preference rows
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// `Ok(None)` when the user has no row yet
    async fn fetch_meta(&self, user_id: &str) -> BackendResult<Option<UserMeta>>;

    /// Insert or merge on `user_id`
    async fn upsert_meta(&self, patch: &MetaPatch) -> BackendResult<()>;
}

pub type RecordSourceRef = Arc<dyn RecordSource>;
pub type ReceiptStorageRef = Arc<dyn ReceiptStorage>;
pub type MetadataStoreRef = Arc<dyn MetadataStore>;

/// The three collaborators bundled for application state
#[derive(Clone)]
pub struct Backend {
    pub records: RecordSourceRef,
    pub receipts: ReceiptStorageRef,
    pub meta: MetadataStoreRef,
}

impl Backend {
    /// Supabase when credentials are configured, otherwise the in-memory backend
    pub fn from_config(config: &BackendConfig) -> BackendResult<Self> {
        if config.is_configured() {
            let supabase = Arc::new(SupabaseBackend::new(config)?);
            log::info!("Using hosted backend at {}", config.url.as_deref().unwrap_or_default());
            Ok(Self {
                records: supabase.clone(),
                receipts: supabase.clone(),
                meta: supabase,
            })
        } else {
            log::warn!(
                "Missing backend configuration (backend.url / backend.anon_key); payments are kept in memory only"
            );
            Ok(Self::memory(Arc::new(MemoryBackend::new())))
        }
    }

    pub fn memory(backend: Arc<MemoryBackend>) -> Self {
        Self {
            records: backend.clone(),
            receipts: backend.clone(),
            meta: backend,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_without_credentials_uses_memory() {
        let backend = Backend::from_config(&BackendConfig::default()).unwrap();
        assert!(backend.receipts.public_url("u/1_a.png").starts_with("memory://"));
    }

    #[test]
    fn test_from_config_with_credentials_uses_supabase() {
        let config = BackendConfig {
            url: Some("https://demo.supabase.co".to_string()),
            anon_key: Some("anon".to_string()),
            ..Default::default()
        };
        let backend = Backend::from_config(&config).unwrap();
        assert_eq!(
            backend.receipts.public_url("u/1_a.png"),
            "https://demo.supabase.co/storage/v1/object/public/receipts/u/1_a.png"
        );
    }
}
