// Domain entities and wire models

pub mod config;
pub mod event;
pub mod model;
pub mod registry;
pub mod scan_log;
pub mod scanner_session;
pub mod sync;
pub mod ticket;

pub use config::*;
pub use event::*;
pub use model::*;
pub use registry::*;
pub use scan_log::*;
pub use scanner_session::*;
pub use sync::*;
pub use ticket::*;
