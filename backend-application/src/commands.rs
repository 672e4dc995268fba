pub mod registry_commands;
pub mod scanner_commands;
pub mod sync_commands;
pub mod verify_commands;

pub use sync_commands::SyncReconciler;
