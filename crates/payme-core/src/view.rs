//! Payment list view model
//!
//! Owns the snapshot of payment records fetched for the history view and the
//! current filter state. Every operation is synchronous and performs no I/O;
//! fetching is the session's job.

use crate::filter::{FilterField, FilterState};
use payme_backend::Payment;
use payme_config::{DateBasis, HistoryConfig};
use std::collections::HashSet;

/// Why the filtered view is empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyState {
    /// The snapshot itself is empty
    NoRecords,
    /// The snapshot has records but none pass the filters
    NoMatches,
}

impl EmptyState {
    pub fn message(&self) -> &'static str {
        match self {
            EmptyState::NoRecords => "Нет записей о платежах",
            EmptyState::NoMatches => "Нет платежей по указанным фильтрам",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaymentListView {
    basis: DateBasis,
    sort_options: bool,
    snapshot: Vec<Payment>,
    filters: FilterState,
    /// Indices into `snapshot`, ascending
    filtered: Vec<usize>,
    type_options: Vec<String>,
    bank_options: Vec<String>,
    address_options: Vec<String>,
}

impl Default for PaymentListView {
    fn default() -> Self {
        Self::new(DateBasis::CreatedAt, false)
    }
}

impl PaymentListView {
    pub fn new(basis: DateBasis, sort_options: bool) -> Self {
        Self {
            basis,
            sort_options,
            snapshot: Vec::new(),
            filters: FilterState::default(),
            filtered: Vec::new(),
            type_options: Vec::new(),
            bank_options: Vec::new(),
            address_options: Vec::new(),
        }
    }

    pub fn from_config(config: &HistoryConfig) -> Self {
        Self::new(config.date_basis, config.sort_filter_options)
    }

    /// Replace the snapshot, keeping the order as received.
    ///
    /// Clears the filter state, so the filtered view equals the new snapshot.
    pub fn load(&mut self, records: Vec<Payment>) {
        self.snapshot = records;
        self.type_options = distinct(self.snapshot.iter().map(Payment::kind), self.sort_options);
        self.bank_options = distinct(self.snapshot.iter().map(Payment::bank), self.sort_options);
        self.address_options = distinct(self.snapshot.iter().map(Payment::address), self.sort_options);
        self.filters.clear();
        self.apply_filters();
        log::debug!(
            "Loaded {} payments ({} types, {} banks, {} addresses)",
            self.snapshot.len(),
            self.type_options.len(),
            self.bank_options.len(),
            self.address_options.len()
        );
    }

    /// Set one filter field; takes effect on the next `apply_filters`
    pub fn set_filter(&mut self, field: FilterField, value: &str) {
        self.filters.set(field, value);
    }

    pub fn apply_filters(&mut self) {
        let basis = self.basis;
        let filters = &self.filters;
        self.filtered = self
            .snapshot
            .iter()
            .enumerate()
            .filter(|(_, payment)| filters.matches(payment, basis))
            .map(|(i, _)| i)
            .collect();
    }

    pub fn reset_filters(&mut self) {
        self.filters.clear();
        self.apply_filters();
    }

    pub fn snapshot(&self) -> &[Payment] {
        &self.snapshot
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn date_basis(&self) -> DateBasis {
        self.basis
    }

    /// Filtered records in snapshot order
    pub fn filtered(&self) -> Vec<&Payment> {
        self.filtered.iter().map(|&i| &self.snapshot[i]).collect()
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    pub fn type_options(&self) -> &[String] {
        &self.type_options
    }

    pub fn bank_options(&self) -> &[String] {
        &self.bank_options
    }

    pub fn address_options(&self) -> &[String] {
        &self.address_options
    }

    /// `None` while at least one record is shown
    pub fn empty_state(&self) -> Option<EmptyState> {
        if self.snapshot.is_empty() {
            Some(EmptyState::NoRecords)
        } else if self.filtered.is_empty() {
            Some(EmptyState::NoMatches)
        } else {
            None
        }
    }
}

/// Non-empty values without duplicates, in first-seen order unless `sort`
fn distinct<'a>(values: impl Iterator<Item = Option<&'a str>>, sort: bool) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for value in values.flatten() {
        if !value.is_empty() && seen.insert(value) {
            out.push(value.to_string());
        }
    }
    if sort {
        out.sort();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(kind: &str, bank: &str, address: &str, (y, m, d): (i32, u32, u32)) -> Payment {
        Payment {
            payment_type: Some(kind.to_string()),
            bank: Some(bank.to_string()),
            address: Some(address.to_string()),
            created_at: Some(Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()),
            ..Default::default()
        }
    }

    /// Two records, oldest last as the backend returns them
    fn sample() -> Vec<Payment> {
        vec![
            record("Газ", "Сбер", "A", (2024, 1, 5)),
            record("Мусор", "Альфа", "B", (2024, 2, 10)),
        ]
    }

    fn larger() -> Vec<Payment> {
        vec![
            record("Газ", "Сбер", "A", (2024, 3, 1)),
            record("Вода", "Сбер", "B", (2024, 2, 20)),
            record("Газ", "Альфа", "A", (2024, 2, 1)),
            Payment::default(),
            record("Мусор", "", "C", (2024, 1, 15)),
            record("Газ", "ВТБ", "B", (2023, 12, 31)),
        ]
    }

    fn loaded(records: Vec<Payment>) -> PaymentListView {
        let mut view = PaymentListView::default();
        view.load(records);
        view
    }

    fn is_subsequence(sub: &[&Payment], of: &[Payment]) -> bool {
        let mut it = of.iter();
        sub.iter().all(|wanted| it.any(|p| p == *wanted))
    }

    #[test]
    fn test_filter_by_type() {
        let mut view = loaded(sample());
        view.set_filter(FilterField::PaymentType, "Газ");
        view.apply_filters();
        assert_eq!(view.filtered(), vec![&sample()[0]]);
    }

    #[test]
    fn test_filter_by_date_from() {
        let mut view = loaded(sample());
        view.set_filter(FilterField::DateFrom, "2024-02-01");
        view.apply_filters();
        assert_eq!(view.filtered(), vec![&sample()[1]]);
    }

    #[test]
    fn test_set_filter_waits_for_apply() {
        let mut view = loaded(sample());
        view.set_filter(FilterField::Bank, "Альфа");
        assert_eq!(view.filtered_len(), 2);
        view.apply_filters();
        assert_eq!(view.filtered_len(), 1);
    }

    #[test]
    fn test_empty_snapshot_message() {
        let view = loaded(Vec::new());
        assert!(view.filtered().is_empty());
        assert_eq!(view.empty_state(), Some(EmptyState::NoRecords));
        assert_eq!(view.empty_state().unwrap().message(), "Нет записей о платежах");
    }

    #[test]
    fn test_no_matches_is_distinct_from_no_records() {
        let mut view = loaded(sample());
        view.set_filter(FilterField::DateFrom, "2030-01-01");
        view.set_filter(FilterField::DateTo, "2030-12-31");
        view.set_filter(FilterField::PaymentType, "Интернет");
        view.set_filter(FilterField::Bank, "ВТБ");
        view.set_filter(FilterField::Address, "Z");
        view.apply_filters();
        assert!(view.filtered().is_empty());
        assert_eq!(view.empty_state(), Some(EmptyState::NoMatches));
        assert_eq!(view.empty_state().unwrap().message(), "Нет платежей по указанным фильтрам");
    }

    #[test]
    fn test_second_load_clears_filters() {
        let mut view = loaded(sample());
        view.set_filter(FilterField::Bank, "Сбер");
        view.apply_filters();
        assert_eq!(view.filtered_len(), 1);

        view.load(larger());
        assert!(view.filters().is_empty());
        assert_eq!(view.filtered_len(), larger().len());
    }

    #[test]
    fn test_reset_restores_full_snapshot() {
        let mut view = loaded(larger());
        view.set_filter(FilterField::Address, "B");
        view.set_filter(FilterField::DateTo, "2024-01-01");
        view.apply_filters();
        assert_eq!(view.filtered_len(), 1);

        view.reset_filters();
        view.apply_filters();
        let all: Vec<&Payment> = view.snapshot().iter().collect();
        assert_eq!(view.filtered(), all);
        assert_eq!(view.empty_state(), None);
    }

    #[test]
    fn test_filtered_is_ordered_subsequence() {
        let settings: Vec<Vec<(FilterField, &str)>> = vec![
            vec![],
            vec![(FilterField::PaymentType, "Газ")],
            vec![(FilterField::Bank, "Сбер")],
            vec![(FilterField::Address, "B"), (FilterField::PaymentType, "Газ")],
            vec![(FilterField::DateFrom, "2024-01-01"), (FilterField::DateTo, "2024-02-29")],
            vec![(FilterField::DateTo, "2023-12-31")],
            vec![(FilterField::Bank, "nope")],
        ];
        for filters in settings {
            let mut view = loaded(larger());
            for (field, value) in &filters {
                view.set_filter(*field, value);
            }
            view.apply_filters();
            assert!(is_subsequence(&view.filtered(), view.snapshot()), "filters {:?}", filters);
        }
    }

    #[test]
    fn test_combined_filters_are_conjunctive() {
        let mut view = loaded(larger());
        view.set_filter(FilterField::PaymentType, "Газ");
        view.set_filter(FilterField::Address, "A");
        view.apply_filters();
        let kinds: Vec<_> = view.filtered().iter().map(|p| p.bank()).collect();
        assert_eq!(kinds, vec![Some("Сбер"), Some("Альфа")]);
    }

    #[test]
    fn test_record_missing_field_excluded() {
        let mut view = loaded(larger());
        view.set_filter(FilterField::Bank, "Сбер");
        view.apply_filters();
        assert!(view.filtered().iter().all(|p| p.bank() == Some("Сбер")));
        assert_eq!(view.filtered_len(), 2);
    }

    #[test]
    fn test_distinct_options_first_seen() {
        let view = loaded(larger());
        assert_eq!(view.type_options(), ["Газ", "Вода", "Мусор"]);
        assert_eq!(view.bank_options(), ["Сбер", "Альфа", "ВТБ"]);
        assert_eq!(view.address_options(), ["A", "B", "C"]);
        for options in [view.type_options(), view.bank_options(), view.address_options()] {
            let unique: HashSet<_> = options.iter().collect();
            assert_eq!(unique.len(), options.len());
            assert!(options.iter().all(|o| !o.is_empty()));
        }
    }

    #[test]
    fn test_distinct_options_sorted_when_configured() {
        let mut view = PaymentListView::new(DateBasis::CreatedAt, true);
        view.load(larger());
        assert_eq!(view.type_options(), ["Вода", "Газ", "Мусор"]);
    }

    #[test]
    fn test_legacy_type_column_counts_as_type() {
        let legacy = Payment {
            legacy_type: Some("Вода".to_string()),
            ..Default::default()
        };
        let mut view = loaded(vec![legacy]);
        assert_eq!(view.type_options(), ["Вода"]);
        view.set_filter(FilterField::PaymentType, "Вода");
        view.apply_filters();
        assert_eq!(view.filtered_len(), 1);
    }

    #[test]
    fn test_month_basis_from_config() {
        let config = HistoryConfig {
            date_basis: DateBasis::MonthYear,
            ..Default::default()
        };
        let mut view = PaymentListView::from_config(&config);
        let mut december = record("Газ", "Сбер", "A", (2024, 1, 5));
        december.month_year = Some("2023-12".to_string());
        view.load(vec![december]);
        view.set_filter(FilterField::DateFrom, "2024-01-01");
        view.apply_filters();
        assert_eq!(view.empty_state(), Some(EmptyState::NoMatches));
    }
}
