//! Core application logic for PayMe
//!
//! The payment history view model and its display model, per-device
//! sessions, the payment recorder and the offline asset cache.

pub mod cache;
pub mod display;
pub mod error;
pub mod filter;
pub mod navigation;
pub mod recorder;
pub mod session;
pub mod view;

pub use cache::{AssetCache, AssetResponse, AssetSource, AssetSourceRef, CacheStorage, DirAssetSource};
pub use display::{render, FilterOption, HistoryDisplay, PaymentRow};
pub use error::{CoreError, CoreResult, ErrorCode, ErrorDetails, ErrorSeverity};
pub use filter::{DatedRecord, FilterField, FilterState};
pub use navigation::View;
pub use recorder::{default_month, form_choices, FormChoices, PaymentForm, PaymentRecorder, Receipt};
pub use session::{Session, SessionRef, SessionStore};
pub use view::{EmptyState, PaymentListView};

// Re-export the wire types so callers need not depend on the backend crate
pub use payme_backend::{Payment, UserMeta};
