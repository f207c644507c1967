//! In-process implementation of every backend trait.
//!
//! Compiled into the production binary as well: with no backend credentials
//! configured the whole application runs against it. Tests use the failure
//! switches to exercise error paths.

use crate::{
    BackendError, BackendResult, MetaPatch, MetadataStore, NewPayment, Payment, PaymentId,
    ReceiptStorage, RecordSource, UserMeta,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use tokio::sync::Mutex;

/// Which collaborator call should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Fetch,
    Insert,
    Upload,
    Meta,
}

/// A stored receipt object
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Default)]
pub struct MemoryBackend {
    payments: Mutex<Vec<Payment>>,
    objects: Mutex<HashMap<String, StoredObject>>,
    meta: Mutex<HashMap<String, UserMeta>>,
    next_id: AtomicI64,
    fail_fetch: AtomicBool,
    fail_insert: AtomicBool,
    fail_upload: AtomicBool,
    fail_meta: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            ..Default::default()
        }
    }

    /// Seed with existing records
    pub fn with_payments(payments: Vec<Payment>) -> Self {
        Self {
            next_id: AtomicI64::new(payments.len() as i64 + 1),
            payments: Mutex::new(payments),
            ..Default::default()
        }
    }

    /// Make the given collaborator call fail until switched off again
    pub fn set_failure(&self, failure: Failure, enabled: bool) {
        let flag = match failure {
            Failure::Fetch => &self.fail_fetch,
            Failure::Insert => &self.fail_insert,
            Failure::Upload => &self.fail_upload,
            Failure::Meta => &self.fail_meta,
        };
        flag.store(enabled, Ordering::SeqCst);
    }

    fn check(&self, failure: Failure) -> BackendResult<()> {
        let flag = match failure {
            Failure::Fetch => &self.fail_fetch,
            Failure::Insert => &self.fail_insert,
            Failure::Upload => &self.fail_upload,
            Failure::Meta => &self.fail_meta,
        };
        if flag.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable {
                message: format!("simulated {:?} failure", failure).to_lowercase(),
            });
        }
        Ok(())
    }

    /// Every stored payment, in insertion order
    pub async fn all_payments(&self) -> Vec<Payment> {
        self.payments.lock().await.clone()
    }

    pub async fn object(&self, name: &str) -> Option<StoredObject> {
        self.objects.lock().await.get(name).cloned()
    }

    pub async fn object_count(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn meta(&self, user_id: &str) -> Option<UserMeta> {
        self.meta.lock().await.get(user_id).cloned()
    }
}

#[async_trait]
impl RecordSource for MemoryBackend {
    async fn fetch_payments(&self, user_id: &str) -> BackendResult<Vec<Payment>> {
        self.check(Failure::Fetch)?;
        let payments = self.payments.lock().await;
        let mut rows: Vec<Payment> = payments
            .iter()
            .filter(|p| p.user_id.as_deref() == Some(user_id))
            .cloned()
            .collect();
        // Newest first; the sort is stable so equal timestamps keep insertion order
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn insert_payment(&self, payment: &NewPayment) -> BackendResult<()> {
        self.check(Failure::Insert)?;
        let mut row = payment.clone().into_payment(Utc::now());
        row.id = Some(PaymentId::Int(self.next_id.fetch_add(1, Ordering::SeqCst)));
        self.payments.lock().await.push(row);
        Ok(())
    }
}

#[async_trait]
impl ReceiptStorage for MemoryBackend {
    async fn upload(&self, object_name: &str, bytes: Vec<u8>, content_type: &str) -> BackendResult<()> {
        self.check(Failure::Upload)?;
        let mut objects = self.objects.lock().await;
        if objects.contains_key(object_name) {
            return Err(BackendError::Conflict {
                name: object_name.to_string(),
            });
        }
        objects.insert(
            object_name.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn public_url(&self, object_name: &str) -> String {
        format!("memory://receipts/{}", object_name)
    }
}

#[async_trait]
impl MetadataStore for MemoryBackend {
    async fn fetch_meta(&self, user_id: &str) -> BackendResult<Option<UserMeta>> {
        self.check(Failure::Meta)?;
        Ok(self.meta.lock().await.get(user_id).cloned())
    }

    async fn upsert_meta(&self, patch: &MetaPatch) -> BackendResult<()> {
        self.check(Failure::Meta)?;
        let mut meta = self.meta.lock().await;
        meta.entry(patch.user_id.clone())
            .or_insert_with(|| UserMeta::new(patch.user_id.clone()))
            .merge(patch);
        Ok(())
    }
}
