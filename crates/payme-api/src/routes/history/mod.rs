//! History routes - Payment list, filters, reload

pub mod api;
pub mod page;

pub use api::{
    api_options, api_payments, htmx_history_filter, htmx_history_reload, htmx_history_reset,
    htmx_history_table,
};
pub use page::page_history;
