//! Filter state for the payment history

use chrono::NaiveDate;
use payme_backend::Payment;
use payme_config::DateBasis;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One of the five independent history filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    DateFrom,
    DateTo,
    PaymentType,
    Bank,
    Address,
}

impl FilterField {
    pub const ALL: [FilterField; 5] = [
        FilterField::DateFrom,
        FilterField::DateTo,
        FilterField::PaymentType,
        FilterField::Bank,
        FilterField::Address,
    ];

    /// Form field name used by the filter bar
    pub fn form_name(&self) -> &'static str {
        match self {
            FilterField::DateFrom => "date_from",
            FilterField::DateTo => "date_to",
            FilterField::PaymentType => "type",
            FilterField::Bank => "bank",
            FilterField::Address => "address",
        }
    }

    pub fn is_date(&self) -> bool {
        matches!(self, FilterField::DateFrom | FilterField::DateTo)
    }
}

impl FromStr for FilterField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "date_from" | "start_date" => Ok(FilterField::DateFrom),
            "date_to" | "end_date" => Ok(FilterField::DateTo),
            "type" | "payment_type" => Ok(FilterField::PaymentType),
            "bank" => Ok(FilterField::Bank),
            "address" => Ok(FilterField::Address),
            _ => Err(format!("Unknown filter field: {}", s)),
        }
    }
}

impl std::fmt::Display for FilterField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.form_name())
    }
}

/// Current filter values; `None` means the filter imposes no constraint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub payment_type: Option<String>,
    pub bank: Option<String>,
    pub address: Option<String>,
}

impl FilterState {
    /// Set one field from raw form input.
    ///
    /// An empty value unsets the field, and so does a date that is not
    /// `YYYY-MM-DD`. Choice values are kept verbatim so they compare equal to
    /// the record values they were taken from.
    pub fn set(&mut self, field: FilterField, value: &str) {
        match field {
            FilterField::DateFrom => self.date_from = parse_date(value),
            FilterField::DateTo => self.date_to = parse_date(value),
            FilterField::PaymentType => self.payment_type = non_empty(value),
            FilterField::Bank => self.bank = non_empty(value),
            FilterField::Address => self.address = non_empty(value),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Current value of a field as form input text (empty when unset)
    pub fn value(&self, field: FilterField) -> String {
        match field {
            FilterField::DateFrom => self.date_from.map(|d| d.to_string()).unwrap_or_default(),
            FilterField::DateTo => self.date_to.map(|d| d.to_string()).unwrap_or_default(),
            FilterField::PaymentType => self.payment_type.clone().unwrap_or_default(),
            FilterField::Bank => self.bank.clone().unwrap_or_default(),
            FilterField::Address => self.address.clone().unwrap_or_default(),
        }
    }

    /// Whether the date bounds admit `date`
    ///
    /// Bounds are whole days: a record made late on `date_to` still matches,
    /// not only one stamped at its midnight.
    pub fn contains(&self, date: &NaiveDate) -> bool {
        match (self.date_from, self.date_to) {
            (None, None) => true,
            (Some(s), None) => *date >= s,
            (None, Some(e)) => *date <= e,
            (Some(s), Some(e)) => *date >= s && *date <= e,
        }
    }

    /// Conjunction of every set predicate
    pub fn matches(&self, payment: &Payment, basis: DateBasis) -> bool {
        if self.date_from.is_some() || self.date_to.is_some() {
            match payment.relevant_date(basis) {
                Some(date) if self.contains(&date) => {}
                _ => return false,
            }
        }
        equals(self.payment_type.as_deref(), payment.kind())
            && equals(self.bank.as_deref(), payment.bank())
            && equals(self.address.as_deref(), payment.address())
    }
}

/// Unset filter matches anything, a set one needs an equal value
fn equals(filter: Option<&str>, value: Option<&str>) -> bool {
    match filter {
        None => true,
        Some(wanted) => value == Some(wanted),
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            log::debug!("Ignoring unparseable filter date {:?}", value);
            None
        }
    }
}

/// First day of a `YYYY-MM` billing month
pub fn month_start(month_year: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", month_year.trim()), "%Y-%m-%d").ok()
}

/// Date used by the date-range filters
pub trait DatedRecord {
    fn relevant_date(&self, basis: DateBasis) -> Option<NaiveDate>;
}

impl DatedRecord for Payment {
    fn relevant_date(&self, basis: DateBasis) -> Option<NaiveDate> {
        match basis {
            DateBasis::CreatedAt => self.created_at.map(|ts| ts.date_naive()),
            DateBasis::MonthYear => self.month_year.as_deref().and_then(month_start),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn payment_on(y: i32, m: u32, d: u32) -> Payment {
        Payment {
            created_at: Some(Utc.with_ymd_and_hms(y, m, d, 23, 59, 0).unwrap()),
            payment_type: Some("Газ".to_string()),
            bank: Some("Сбер".to_string()),
            address: Some("A".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_field_names() {
        for field in FilterField::ALL {
            assert_eq!(FilterField::from_str(field.form_name()).unwrap(), field);
        }
        assert_eq!(FilterField::from_str("start_date").unwrap(), FilterField::DateFrom);
        assert!(FilterField::from_str("amount").is_err());
    }

    #[test]
    fn test_set_and_unset() {
        let mut state = FilterState::default();
        state.set(FilterField::DateFrom, "2024-01-10");
        state.set(FilterField::Bank, "Сбер");
        assert_eq!(state.date_from, Some(date(2024, 1, 10)));
        assert_eq!(state.value(FilterField::Bank), "Сбер");

        state.set(FilterField::Bank, "");
        state.set(FilterField::DateFrom, "10.01.2024");
        assert!(state.is_empty());
    }

    #[test]
    fn test_end_bound_is_inclusive_whole_day() {
        let mut state = FilterState::default();
        state.set(FilterField::DateTo, "2024-01-31");
        assert!(state.matches(&payment_on(2024, 1, 31), DateBasis::CreatedAt));
        assert!(!state.matches(&payment_on(2024, 2, 1), DateBasis::CreatedAt));
    }

    #[test]
    fn test_missing_values_excluded_when_filter_set() {
        let bare = Payment::default();
        let mut state = FilterState::default();
        assert!(state.matches(&bare, DateBasis::CreatedAt));

        state.set(FilterField::DateFrom, "2024-01-01");
        assert!(!state.matches(&bare, DateBasis::CreatedAt));

        state.clear();
        state.set(FilterField::Address, "A");
        assert!(!state.matches(&bare, DateBasis::CreatedAt));
    }

    #[test]
    fn test_month_year_basis() {
        let payment = Payment {
            month_year: Some("2023-12".to_string()),
            created_at: Some(Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap()),
            ..Default::default()
        };
        assert_eq!(payment.relevant_date(DateBasis::MonthYear), Some(date(2023, 12, 1)));
        assert_eq!(payment.relevant_date(DateBasis::CreatedAt), Some(date(2024, 1, 5)));

        let mut state = FilterState::default();
        state.set(FilterField::DateTo, "2023-12-31");
        assert!(state.matches(&payment, DateBasis::MonthYear));
        assert!(!state.matches(&payment, DateBasis::CreatedAt));
        assert_eq!(month_start("2023-13"), None);
    }
}
