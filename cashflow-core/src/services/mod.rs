//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod form;
pub mod home;
pub mod listing;
pub mod logging;
pub mod navigation;
pub mod notifications;
pub mod query_cache;
mod transactions;

pub use form::{FormMode, SubmitOutcome, TransactionForm};
pub use home::{HomePage, HomeView, RowAction};
pub use listing::{FallbackReason, ListOutcome, ServerPaging};
pub use logging::{EntryPoint, EventCount, LogEntry, LogEvent, LoggingService};
pub use navigation::UrlStateController;
pub use notifications::{empty_state, EmptyState, Notification, NotificationKind};
pub use query_cache::{FetchState, Lookup, QueryCache, DEFAULT_GC_TIME, DEFAULT_STALE_TIME};
pub use transactions::{retry_once, MutationKind, TransactionService};
