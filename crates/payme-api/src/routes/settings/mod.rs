//! Settings routes - Configuration display and device reset

pub mod api;
pub mod page;

pub use api::{api_settings, htmx_session_reset};
pub use page::page_settings;
