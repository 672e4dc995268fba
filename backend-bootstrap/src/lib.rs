pub mod cli;
pub mod context;
pub mod lifecycle;

pub use cli::{run, Command};
pub use lifecycle::{shutdown_signal, ScanServer, ServerError};
