// Domain value objects
pub mod identifiers;
pub mod scan_status;
pub mod server_phase;

pub use identifiers::*;
pub use scan_status::*;
pub use server_phase::*;
