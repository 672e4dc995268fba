// Backend Application Layer

pub mod blocking;
pub mod commands;
pub mod error;
pub mod metrics;
pub mod ops;
pub mod queries;
pub mod state;

pub use commands::SyncReconciler;
pub use error::AppError;
pub use metrics::Metrics;
pub use ops::{IdleTimer, ScanFeedHub};
pub use state::AppState;
