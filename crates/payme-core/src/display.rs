//! Display model for the history view
//!
//! `render` maps the view model onto plain rows, option lists and messages.
//! The HTML layer binds this model and never inspects payments directly.

use crate::filter::FilterField;
use crate::view::{EmptyState, PaymentListView};
use chrono::{Local, TimeZone};
use payme_backend::Payment;
use std::fmt::Display;
use payme_utils::format_amount;
use serde::Serialize;

/// Placeholder for missing values
pub const MISSING: &str = "-";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentRow {
    /// Creation day in the server's local time, `DD.MM.YYYY`
    pub date: String,
    /// Billing month, `YYYY-MM`
    pub month: String,
    pub payment_type: String,
    pub address: String,
    pub bank: String,
    pub amount: String,
    pub purpose: String,
    pub receipt_url: Option<String>,
}

impl PaymentRow {
    pub fn from_payment(payment: &Payment) -> Self {
        Self::from_payment_in(payment, &Local)
    }

    /// Row with the creation day taken in `tz`
    pub fn from_payment_in<Tz>(payment: &Payment, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        Self {
            date: payment
                .created_at
                .map(|ts| ts.with_timezone(tz).format("%d.%m.%Y").to_string())
                .unwrap_or_else(|| MISSING.to_string()),
            month: text_or_missing(payment.month_year.as_deref()),
            payment_type: text_or_missing(payment.kind()),
            address: text_or_missing(payment.address()),
            bank: text_or_missing(payment.bank()),
            amount: payment
                .amount
                .as_ref()
                .map(format_amount)
                .unwrap_or_else(|| MISSING.to_string()),
            purpose: text_or_missing(payment.purpose.as_deref()),
            receipt_url: payment.file_url.clone().filter(|url| !url.is_empty()),
        }
    }
}

fn text_or_missing(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => MISSING.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOption {
    pub value: String,
    pub selected: bool,
}

fn options(values: &[String], selected: Option<&str>) -> Vec<FilterOption> {
    values
        .iter()
        .map(|value| FilterOption {
            value: value.clone(),
            selected: selected == Some(value.as_str()),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryDisplay {
    pub rows: Vec<PaymentRow>,
    pub empty: Option<EmptyState>,
    pub empty_message: Option<String>,
    /// Last fetch failure, shown above the table
    pub error: Option<String>,
    pub type_options: Vec<FilterOption>,
    pub bank_options: Vec<FilterOption>,
    pub address_options: Vec<FilterOption>,
    pub date_from: String,
    pub date_to: String,
    pub total_count: usize,
    pub shown_count: usize,
}

pub fn render(view: &PaymentListView) -> HistoryDisplay {
    let filters = view.filters();
    let empty = view.empty_state();
    let rows: Vec<PaymentRow> = view.filtered().into_iter().map(PaymentRow::from_payment).collect();

    HistoryDisplay {
        shown_count: rows.len(),
        total_count: view.snapshot().len(),
        rows,
        empty,
        empty_message: empty.map(|e| e.message().to_string()),
        error: None,
        type_options: options(view.type_options(), filters.payment_type.as_deref()),
        bank_options: options(view.bank_options(), filters.bank.as_deref()),
        address_options: options(view.address_options(), filters.address.as_deref()),
        date_from: filters.value(FilterField::DateFrom),
        date_to: filters.value(FilterField::DateTo),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone, Utc};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn full_payment() -> Payment {
        Payment {
            created_at: Some(Utc.with_ymd_and_hms(2024, 1, 5, 10, 0, 0).unwrap()),
            month_year: Some("2023-12".to_string()),
            payment_type: Some("Газ".to_string()),
            bank: Some("Сбер".to_string()),
            address: Some("ул. Ленина, 1".to_string()),
            amount: Some(Decimal::from_str("1520.5").unwrap()),
            purpose: Some("за декабрь".to_string()),
            file_url: Some("https://x/receipt.png".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_row_formatting() {
        let row = PaymentRow::from_payment_in(&full_payment(), &Utc);
        assert_eq!(row.date, "05.01.2024");
        assert_eq!(row.month, "2023-12");
        assert_eq!(row.amount, "1 520.50 ₽");
        assert_eq!(row.receipt_url.as_deref(), Some("https://x/receipt.png"));
    }

    #[test]
    fn test_row_date_follows_timezone() {
        let mut payment = full_payment();
        payment.created_at = Some(Utc.with_ymd_and_hms(2024, 1, 31, 22, 30, 0).unwrap());
        assert_eq!(PaymentRow::from_payment_in(&payment, &Utc).date, "31.01.2024");
        let moscow = FixedOffset::east_opt(3 * 3600).unwrap();
        assert_eq!(PaymentRow::from_payment_in(&payment, &moscow).date, "01.02.2024");
        let expected = payment.created_at.unwrap().with_timezone(&Local).format("%d.%m.%Y").to_string();
        assert_eq!(PaymentRow::from_payment(&payment).date, expected);
    }

    #[test]
    fn test_row_missing_values() {
        let row = PaymentRow::from_payment(&Payment::default());
        assert_eq!(row.date, MISSING);
        assert_eq!(row.payment_type, MISSING);
        assert_eq!(row.amount, MISSING);
        assert_eq!(row.purpose, MISSING);
        assert_eq!(row.receipt_url, None);
    }

    #[test]
    fn test_render_marks_selection_and_counts() {
        let mut other = full_payment();
        other.bank = Some("Альфа".to_string());
        let mut view = PaymentListView::default();
        view.load(vec![full_payment(), other]);
        view.set_filter(FilterField::Bank, "Альфа");
        view.set_filter(FilterField::DateFrom, "2024-01-01");
        view.apply_filters();

        let display = render(&view);
        assert_eq!(display.total_count, 2);
        assert_eq!(display.shown_count, 1);
        assert_eq!(display.date_from, "2024-01-01");
        assert_eq!(display.date_to, "");
        let selected: Vec<_> = display.bank_options.iter().filter(|o| o.selected).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].value, "Альфа");
        assert!(display.empty_message.is_none());
    }

    #[test]
    fn test_render_empty_message() {
        let mut view = PaymentListView::default();
        view.load(Vec::new());
        let display = render(&view);
        assert_eq!(display.empty, Some(EmptyState::NoRecords));
        assert_eq!(display.empty_message.as_deref(), Some("Нет записей о платежах"));
    }
}
