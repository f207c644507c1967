//! Wire types shared with the hosted backend

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Backend row identifier (integer or uuid depending on the table definition)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PaymentId {
    Int(i64),
    Text(String),
}

impl std::fmt::Display for PaymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentId::Int(id) => write!(f, "{}", id),
            PaymentId::Text(id) => write!(f, "{}", id),
        }
    }
}

/// A stored payment record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Payment {
    #[serde(default)]
    pub id: Option<PaymentId>,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Set by the backend on insert
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Billing month, `YYYY-MM`
    #[serde(default)]
    pub month_year: Option<String>,
    #[serde(default)]
    pub payment_type: Option<String>,
    /// Older rows carry the category in a `type` column
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub legacy_type: Option<String>,
    #[serde(default)]
    pub bank: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
}

impl Payment {
    /// Category label, preferring `payment_type` over the legacy `type` column
    pub fn kind(&self) -> Option<&str> {
        non_empty(self.payment_type.as_deref()).or_else(|| non_empty(self.legacy_type.as_deref()))
    }

    pub fn bank(&self) -> Option<&str> {
        non_empty(self.bank.as_deref())
    }

    pub fn address(&self) -> Option<&str> {
        non_empty(self.address.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

/// Insert payload for a new payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPayment {
    pub user_id: String,
    pub address: String,
    pub payment_type: String,
    pub bank: String,
    pub month_year: String,
    pub file_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
}

impl NewPayment {
    /// The record as the backend would return it after insertion
    pub fn into_payment(self, created_at: DateTime<Utc>) -> Payment {
        Payment {
            id: None,
            user_id: Some(self.user_id),
            created_at: Some(created_at),
            month_year: Some(self.month_year),
            payment_type: Some(self.payment_type),
            legacy_type: None,
            bank: Some(self.bank),
            address: Some(self.address),
            amount: self.amount,
            purpose: self.purpose,
            file_url: self.file_url,
        }
    }
}

/// Per-user preferences: last used choices and user-defined option lists
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserMeta {
    pub user_id: String,
    #[serde(default)]
    pub last_address: Option<String>,
    #[serde(default)]
    pub last_payment_type: Option<String>,
    #[serde(default)]
    pub last_bank: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub custom_addresses: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub custom_payment_types: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub custom_banks: Vec<String>,
}

impl UserMeta {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    /// Merge a patch into this row; only fields present in the patch change
    pub fn merge(&mut self, patch: &MetaPatch) {
        if let Some(ref v) = patch.last_address {
            self.last_address = Some(v.clone());
        }
        if let Some(ref v) = patch.last_payment_type {
            self.last_payment_type = Some(v.clone());
        }
        if let Some(ref v) = patch.last_bank {
            self.last_bank = Some(v.clone());
        }
        if let Some(ref v) = patch.custom_addresses {
            self.custom_addresses = v.clone();
        }
        if let Some(ref v) = patch.custom_payment_types {
            self.custom_payment_types = v.clone();
        }
        if let Some(ref v) = patch.custom_banks {
            self.custom_banks = v.clone();
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<String>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Partial update of a user metadata row, merged on `user_id`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetaPatch {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_payment_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_bank: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_addresses: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_payment_types: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_banks: Option<Vec<String>>,
}

impl MetaPatch {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    /// True when the patch carries nothing besides the user id
    pub fn is_empty(&self) -> bool {
        self.last_address.is_none()
            && self.last_payment_type.is_none()
            && self.last_bank.is_none()
            && self.custom_addresses.is_none()
            && self.custom_payment_types.is_none()
            && self.custom_banks.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_payment_from_backend_row() {
        let row = serde_json::json!({
            "id": 17,
            "user_id": "u-1",
            "created_at": "2024-01-05T10:20:30.123456+00:00",
            "month_year": "2023-12",
            "payment_type": "Газ",
            "bank": "Сбер",
            "address": "A",
            "amount": 1520.75,
            "purpose": null,
            "file_url": null
        });
        let payment: Payment = serde_json::from_value(row).unwrap();
        assert_eq!(payment.id, Some(PaymentId::Int(17)));
        assert_eq!(payment.kind(), Some("Газ"));
        assert_eq!(payment.amount, Some(Decimal::from_str("1520.75").unwrap()));
        assert_eq!(payment.created_at.unwrap().to_rfc3339(), "2024-01-05T10:20:30.123456+00:00");
    }

    #[test]
    fn test_payment_legacy_type_column() {
        let row = serde_json::json!({ "type": "Вода", "payment_type": "" });
        let payment: Payment = serde_json::from_value(row).unwrap();
        assert_eq!(payment.kind(), Some("Вода"));
        assert_eq!(payment.bank(), None);
    }

    #[test]
    fn test_user_meta_null_lists() {
        let row = serde_json::json!({
            "user_id": "u-1",
            "last_bank": "Альфа",
            "custom_addresses": null,
            "custom_banks": ["Почта Банк"]
        });
        let meta: UserMeta = serde_json::from_value(row).unwrap();
        assert!(meta.custom_addresses.is_empty());
        assert!(meta.custom_payment_types.is_empty());
        assert_eq!(meta.custom_banks, vec!["Почта Банк".to_string()]);
    }

    #[test]
    fn test_meta_patch_serializes_only_present_fields() {
        let mut patch = MetaPatch::new("u-1");
        assert!(patch.is_empty());
        patch.last_bank = Some("Сбер".to_string());
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({ "user_id": "u-1", "last_bank": "Сбер" }));
    }

    #[test]
    fn test_user_meta_merge() {
        let mut meta = UserMeta::new("u-1");
        meta.last_address = Some("A".to_string());
        let mut patch = MetaPatch::new("u-1");
        patch.custom_banks = Some(vec!["X".to_string()]);
        meta.merge(&patch);
        assert_eq!(meta.last_address.as_deref(), Some("A"));
        assert_eq!(meta.custom_banks, vec!["X".to_string()]);
    }
}
