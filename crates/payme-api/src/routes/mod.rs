//! Route modules for the API server
//!
//! - payments: Payment form and submission
//! - history: Payment history with filters
//! - settings: Settings page and device reset
//! - assets: Static assets, service worker, web app manifest
//!
//! Each page module follows a consistent structure:
//! - mod.rs: Module declaration and exports
//! - api.rs: JSON API endpoints and HTMX actions
//! - page.rs: HTMX page rendering

pub mod assets;
pub mod history;
pub mod payments;
pub mod settings;
