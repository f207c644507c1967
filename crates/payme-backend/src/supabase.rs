//! Supabase implementation of the backend traits over plain HTTP.
//!
//! Rows go through the PostgREST endpoints under `/rest/v1`, receipts
//! through the storage API under `/storage/v1`.

use crate::{
    BackendError, BackendResult, MetaPatch, MetadataStore, NewPayment, Payment, ReceiptStorage,
    RecordSource, UserMeta,
};
use async_trait::async_trait;
use log::{debug, trace};
use payme_config::BackendConfig;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;

pub struct SupabaseBackend {
    client: Client,
    base_url: String,
    anon_key: String,
    payments_table: String,
    user_meta_table: String,
    receipts_bucket: String,
}

impl SupabaseBackend {
    pub fn new(config: &BackendConfig) -> BackendResult<Self> {
        let base_url = config
            .url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BackendError::NotConfigured {
                field: "backend.url".to_string(),
            })?
            .trim_end_matches('/')
            .to_string();
        let anon_key = config
            .anon_key
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BackendError::NotConfigured {
                field: "backend.anon_key".to_string(),
            })?
            .to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            anon_key,
            payments_table: config.payments_table.clone(),
            user_meta_table: config.user_meta_table.clone(),
            receipts_bucket: config.receipts_bucket.clone(),
        })
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn object_path(object_name: &str) -> String {
        object_name
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    /// Turn non-2xx responses into `BackendError::Status`
    async fn check(response: Response) -> BackendResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(BackendError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl RecordSource for SupabaseBackend {
    async fn fetch_payments(&self, user_id: &str) -> BackendResult<Vec<Payment>> {
        trace!("fetch_payments for {user_id}");
        let user_filter = format!("eq.{}", user_id);
        let request = self
            .client
            .get(self.rest_url(&self.payments_table))
            .query(&[
                ("select", "*"),
                ("user_id", user_filter.as_str()),
                ("order", "created_at.desc"),
            ]);
        let response = Self::check(self.authed(request).send().await?).await?;
        let rows: Vec<Payment> = response.json().await?;
        debug!("Fetched {} payments for {}", rows.len(), user_id);
        Ok(rows)
    }

    async fn insert_payment(&self, payment: &NewPayment) -> BackendResult<()> {
        trace!("insert_payment for {}", payment.user_id);
        let request = self
            .client
            .post(self.rest_url(&self.payments_table))
            .header("Prefer", "return=minimal")
            .json(&[payment]);
        Self::check(self.authed(request).send().await?).await?;
        Ok(())
    }
}

#[async_trait]
impl ReceiptStorage for SupabaseBackend {
    async fn upload(&self, object_name: &str, bytes: Vec<u8>, content_type: &str) -> BackendResult<()> {
        trace!("upload {} ({} bytes)", object_name, bytes.len());
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            self.receipts_bucket,
            Self::object_path(object_name)
        );
        let request = self
            .client
            .post(url)
            .header("Content-Type", content_type)
            .header("Cache-Control", "max-age=3600")
            .header("x-upsert", "false")
            .body(bytes);
        let response = self.authed(request).send().await?;
        if response.status() == reqwest::StatusCode::CONFLICT {
            return Err(BackendError::Conflict {
                name: object_name.to_string(),
            });
        }
        Self::check(response).await?;
        Ok(())
    }

    fn public_url(&self, object_name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            self.receipts_bucket,
            Self::object_path(object_name)
        )
    }
}

#[async_trait]
impl MetadataStore for SupabaseBackend {
    async fn fetch_meta(&self, user_id: &str) -> BackendResult<Option<UserMeta>> {
        trace!("fetch_meta for {user_id}");
        let user_filter = format!("eq.{}", user_id);
        let request = self
            .client
            .get(self.rest_url(&self.user_meta_table))
            .query(&[("select", "*"), ("user_id", user_filter.as_str())]);
        let response = Self::check(self.authed(request).send().await?).await?;
        // An empty result set is "no row yet", not an error
        let rows: Vec<UserMeta> = response.json().await?;
        Ok(rows.into_iter().next())
    }

    async fn upsert_meta(&self, patch: &MetaPatch) -> BackendResult<()> {
        trace!("upsert_meta for {}", patch.user_id);
        let request = self
            .client
            .post(self.rest_url(&self.user_meta_table))
            .query(&[("on_conflict", "user_id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[patch]);
        Self::check(self.authed(request).send().await?).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: Option<&str>, key: Option<&str>) -> BackendConfig {
        BackendConfig {
            url: url.map(str::to_string),
            anon_key: key.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_requires_url_and_key() {
        let err = SupabaseBackend::new(&config(None, Some("k"))).err().unwrap();
        assert!(matches!(err, BackendError::NotConfigured { ref field } if field == "backend.url"));

        let err = SupabaseBackend::new(&config(Some("https://x.supabase.co"), Some("  "))).err().unwrap();
        assert!(matches!(err, BackendError::NotConfigured { ref field } if field == "backend.anon_key"));
    }

    #[test]
    fn test_urls() {
        let backend = SupabaseBackend::new(&config(Some("https://x.supabase.co/"), Some("k"))).unwrap();
        assert_eq!(backend.rest_url("payments"), "https://x.supabase.co/rest/v1/payments");
        assert_eq!(
            backend.public_url("u-1/17_чек 1.png"),
            "https://x.supabase.co/storage/v1/object/public/receipts/u-1/17_%D1%87%D0%B5%D0%BA%201.png"
        );
    }
}
