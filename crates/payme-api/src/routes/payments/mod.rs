//! Payment routes - Form page and submission

pub mod api;
pub mod page;

pub use api::htmx_payment_store;
pub use page::page_home;
