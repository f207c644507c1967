//! Payment submission - HTMX multipart form handler

use super::page::{payment_form_html, FormStatus};
use crate::{ApiError, AppState, DeviceId};
use axum::extract::Multipart;
use payme_core::recorder::SAVED_MESSAGE;
use payme_core::{default_month, form_choices, CoreError, PaymentForm, Receipt};
use std::time::{SystemTime, UNIX_EPOCH};

async fn read_form(mut multipart: Multipart) -> Result<PaymentForm, ApiError> {
    let mut form = PaymentForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "receipt" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().unwrap_or_default().to_string();
            let bytes = field.bytes().await?.to_vec();
            form.receipt = Some(Receipt {
                file_name,
                content_type,
                bytes,
            });
            continue;
        }
        let value = field.text().await?;
        match name.as_str() {
            "address" => form.address = value,
            "new_address" => form.new_address = value,
            "payment_type" => form.payment_type = value,
            "new_payment_type" => form.new_payment_type = value,
            "bank" => form.bank = value,
            "new_bank" => form.new_bank = value,
            "month_year" => form.month_year = value,
            "amount" => form.amount = value,
            "purpose" => form.purpose = value,
            other => log::debug!("Ignoring form field {}", other),
        }
    }
    Ok(form)
}

/// HTMX: Store a new payment and re-render the form
pub async fn htmx_payment_store(
    state: axum::extract::State<AppState>,
    axum::Extension(device): axum::Extension<DeviceId>,
    multipart: Multipart,
) -> Result<axum::response::Html<String>, ApiError> {
    let form = read_form(multipart).await?;
    let now_millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let result = state.recorder.record(device.as_str(), &form, now_millis).await;

    let session_ref = state.session(&device).await;
    let mut session = session_ref.lock().await;
    session.refresh_meta(state.backend.meta.as_ref()).await;

    let month = default_month(chrono::Local::now().date_naive());
    let mut choices = form_choices(&state.config.choices, session.meta(), &month);
    let status = match result {
        Ok(payment) => {
            session.invalidate_history();
            // The form resets but keeps the month just used
            choices.month_year = payment.month_year;
            FormStatus::Success(SAVED_MESSAGE.to_string())
        }
        Err(CoreError::Validation { message, .. }) => {
            choices.keep_submitted(&form);
            FormStatus::Error(message)
        }
        Err(e) => {
            choices.keep_submitted(&form);
            FormStatus::Error(format!("Error saving payment: {}", e))
        }
    };

    Ok(axum::response::Html(payment_form_html(&choices, Some(&status))))
}
