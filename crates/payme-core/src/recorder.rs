//! Recording new payments
//!
//! A submitted `PaymentForm` goes through validation, the optional receipt
//! upload, the insert, and finally two best-effort metadata updates (last
//! used values, custom option lists).

use crate::error::{CoreError, CoreResult, DefaultErrorLogger, ErrorContext, ErrorLogger};
use crate::filter::month_start;
use chrono::{Datelike, NaiveDate};
use payme_backend::{
    Backend, BackendError, MetaPatch, MetadataStoreRef, NewPayment, ReceiptStorageRef, RecordSourceRef, UserMeta,
};
use payme_config::ChoicesConfig;
use payme_utils::receipt_object_name;
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;

pub const REQUIRED_FIELDS_MESSAGE: &str = "Please fill in all required fields.";
pub const SAVED_MESSAGE: &str = "Payment saved successfully!";

/// Attached receipt file
#[derive(Debug, Clone, Default)]
pub struct Receipt {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Raw payment form input; empty strings mean "not provided"
#[derive(Debug, Clone, Default)]
pub struct PaymentForm {
    pub address: String,
    pub new_address: String,
    pub payment_type: String,
    pub new_payment_type: String,
    pub bank: String,
    pub new_bank: String,
    pub month_year: String,
    pub amount: String,
    pub purpose: String,
    pub receipt: Option<Receipt>,
}

impl PaymentForm {
    /// A typed-in new value overrides the selected option
    fn choice(selected: &str, new_value: &str) -> String {
        let new_value = new_value.trim();
        if new_value.is_empty() {
            selected.trim().to_string()
        } else {
            new_value.to_string()
        }
    }

    pub fn resolved_address(&self) -> String {
        Self::choice(&self.address, &self.new_address)
    }

    pub fn resolved_payment_type(&self) -> String {
        Self::choice(&self.payment_type, &self.new_payment_type)
    }

    pub fn resolved_bank(&self) -> String {
        Self::choice(&self.bank, &self.new_bank)
    }

    /// Check required fields and build the insert payload (without receipt URL)
    pub fn validate(&self, user_id: &str) -> CoreResult<NewPayment> {
        let address = required("address", self.resolved_address())?;
        let payment_type = required("payment_type", self.resolved_payment_type())?;
        let bank = required("bank", self.resolved_bank())?;
        let month = required("month_year", self.month_year.trim().to_string())?;
        let month_year = month_start(&month)
            .map(|d| d.format("%Y-%m").to_string())
            .ok_or_else(|| CoreError::Validation {
                field: "month_year".to_string(),
                message: format!("Billing month must be YYYY-MM, got {}", month),
            })?;

        Ok(NewPayment {
            user_id: user_id.to_string(),
            address,
            payment_type,
            bank,
            month_year,
            file_url: None,
            amount: parse_amount(&self.amount)?,
            purpose: Some(self.purpose.trim().to_string()).filter(|p| !p.is_empty()),
        })
    }
}

fn required(field: &str, value: String) -> CoreResult<String> {
    if value.is_empty() {
        Err(CoreError::Validation {
            field: field.to_string(),
            message: REQUIRED_FIELDS_MESSAGE.to_string(),
        })
    } else {
        Ok(value)
    }
}

/// Optional amount; accepts a decimal comma and space-grouped digits
fn parse_amount(raw: &str) -> CoreResult<Option<Decimal>> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return Ok(None);
    }
    let amount = Decimal::from_str(&cleaned).map_err(|_| CoreError::Validation {
        field: "amount".to_string(),
        message: format!("Amount must be a number, got {}", raw.trim()),
    })?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(CoreError::Validation {
            field: "amount".to_string(),
            message: "Amount cannot be negative".to_string(),
        });
    }
    Ok(Some(amount))
}

/// Billing month preselected in the form: the month before `today`
pub fn default_month(today: NaiveDate) -> String {
    let (year, month) = if today.month() == 1 {
        (today.year() - 1, 12)
    } else {
        (today.year(), today.month() - 1)
    };
    format!("{:04}-{:02}", year, month)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoiceOption {
    pub value: String,
    pub selected: bool,
}

/// Option lists for the payment form
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormChoices {
    pub addresses: Vec<ChoiceOption>,
    pub payment_types: Vec<ChoiceOption>,
    pub banks: Vec<ChoiceOption>,
    pub month_year: String,
}

impl FormChoices {
    /// Re-select the values of a rejected submission, adding typed-in ones
    pub fn keep_submitted(&mut self, form: &PaymentForm) {
        select(&mut self.addresses, &form.resolved_address());
        select(&mut self.payment_types, &form.resolved_payment_type());
        select(&mut self.banks, &form.resolved_bank());
        if !form.month_year.trim().is_empty() {
            self.month_year = form.month_year.trim().to_string();
        }
    }
}

fn select(options: &mut Vec<ChoiceOption>, value: &str) {
    if value.is_empty() {
        return;
    }
    if !options.iter().any(|o| o.value == value) {
        options.push(ChoiceOption {
            value: value.to_string(),
            selected: false,
        });
    }
    for option in options.iter_mut() {
        option.selected = option.value == value;
    }
}

/// Fixed options followed by the user's custom ones, last used values selected
pub fn form_choices(config: &ChoicesConfig, meta: Option<&UserMeta>, month_year: &str) -> FormChoices {
    FormChoices {
        addresses: merge_options(
            &config.addresses,
            meta.map(|m| m.custom_addresses.as_slice()).unwrap_or_default(),
            meta.and_then(|m| m.last_address.as_deref()),
        ),
        payment_types: merge_options(
            &config.payment_types,
            meta.map(|m| m.custom_payment_types.as_slice()).unwrap_or_default(),
            meta.and_then(|m| m.last_payment_type.as_deref()),
        ),
        banks: merge_options(
            &config.banks,
            meta.map(|m| m.custom_banks.as_slice()).unwrap_or_default(),
            meta.and_then(|m| m.last_bank.as_deref()),
        ),
        month_year: month_year.to_string(),
    }
}

fn merge_options(fixed: &[String], custom: &[String], last: Option<&str>) -> Vec<ChoiceOption> {
    let mut out: Vec<ChoiceOption> = Vec::new();
    for value in fixed.iter().chain(custom) {
        if value.is_empty() || out.iter().any(|o| &o.value == value) {
            continue;
        }
        out.push(ChoiceOption {
            value: value.clone(),
            selected: last == Some(value.as_str()),
        });
    }
    out
}

/// `current` extended by `value`, or `None` when nothing changes
pub fn extend_custom(current: &[String], fixed: &[String], value: &str) -> Option<Vec<String>> {
    if value.is_empty() || current.iter().any(|v| v == value) || fixed.iter().any(|v| v == value) {
        return None;
    }
    let mut next = current.to_vec();
    next.push(value.to_string());
    Some(next)
}

pub struct PaymentRecorder {
    records: RecordSourceRef,
    receipts: ReceiptStorageRef,
    meta: MetadataStoreRef,
    choices: ChoicesConfig,
    logger: DefaultErrorLogger,
}

impl PaymentRecorder {
    pub fn new(backend: &Backend, choices: ChoicesConfig) -> Self {
        Self {
            records: backend.records.clone(),
            receipts: backend.receipts.clone(),
            meta: backend.meta.clone(),
            choices,
            logger: DefaultErrorLogger,
        }
    }

    /// Validate, upload, insert, then update metadata.
    ///
    /// `now_millis` names the receipt object. Nothing is inserted unless the
    /// upload succeeded; metadata failures are logged only.
    pub async fn record(&self, user_id: &str, form: &PaymentForm, now_millis: u128) -> CoreResult<NewPayment> {
        let mut payment = form.validate(user_id)?;

        if let Some(receipt) = form.receipt.as_ref().filter(|r| !r.bytes.is_empty()) {
            payment.file_url = Some(self.upload_receipt(user_id, receipt, now_millis).await?);
        }

        if let Err(e) = self.records.insert_payment(&payment).await {
            let error = CoreError::Insert { message: e.to_string() };
            self.logger
                .log_error(&error, &ErrorContext::new("insert_payment").with_user_id(user_id));
            return Err(error);
        }
        log::info!(
            "Recorded {} payment for {} ({})",
            payment.payment_type,
            payment.month_year,
            user_id
        );

        self.remember_last_used(&payment).await;
        self.extend_custom_lists(&payment).await;
        Ok(payment)
    }

    async fn upload_receipt(&self, user_id: &str, receipt: &Receipt, now_millis: u128) -> CoreResult<String> {
        let name = receipt_object_name(user_id, now_millis, &receipt.file_name);
        let content_type = if receipt.content_type.is_empty() {
            "application/octet-stream"
        } else {
            receipt.content_type.as_str()
        };
        log::debug!("Uploading receipt {} ({} bytes)", name, receipt.bytes.len());
        match self.receipts.upload(&name, receipt.bytes.clone(), content_type).await {
            Ok(()) => Ok(self.receipts.public_url(&name)),
            Err(e) => {
                let error = CoreError::Upload { message: e.to_string() };
                self.logger
                    .log_error(&error, &ErrorContext::new("upload_receipt").with_user_id(user_id));
                Err(error)
            }
        }
    }

    async fn remember_last_used(&self, payment: &NewPayment) {
        let mut patch = MetaPatch::new(payment.user_id.clone());
        patch.last_address = Some(payment.address.clone());
        patch.last_payment_type = Some(payment.payment_type.clone());
        patch.last_bank = Some(payment.bank.clone());
        if let Err(e) = self.meta.upsert_meta(&patch).await {
            self.metadata_failed("remember_last_used", &payment.user_id, "Error updating user metadata", e);
        }
    }

    async fn extend_custom_lists(&self, payment: &NewPayment) {
        let current = match self.meta.fetch_meta(&payment.user_id).await {
            Ok(meta) => meta.unwrap_or_else(|| UserMeta::new(payment.user_id.clone())),
            Err(e) => {
                self.metadata_failed("extend_custom_lists", &payment.user_id, "Error updating custom lists", e);
                return;
            }
        };

        let mut patch = MetaPatch::new(payment.user_id.clone());
        patch.custom_addresses =
            extend_custom(&current.custom_addresses, &self.choices.addresses, &payment.address);
        patch.custom_payment_types = extend_custom(
            &current.custom_payment_types,
            &self.choices.payment_types,
            &payment.payment_type,
        );
        patch.custom_banks = extend_custom(&current.custom_banks, &self.choices.banks, &payment.bank);
        if patch.is_empty() {
            return;
        }
        if let Err(e) = self.meta.upsert_meta(&patch).await {
            self.metadata_failed("extend_custom_lists", &payment.user_id, "Error updating custom lists", e);
        }
    }

    /// Metadata is best-effort: the failure is logged and the save stands
    fn metadata_failed(&self, operation: &str, user_id: &str, summary: &str, cause: BackendError) {
        let error = CoreError::Metadata {
            message: format!("{}: {}", summary, cause),
        };
        self.logger
            .log_error(&error, &ErrorContext::new(operation).with_user_id(user_id));
    }
}
