pub mod idle_timer;
pub mod scan_feed_hub;

pub use idle_timer::IdleTimer;
pub use scan_feed_hub::ScanFeedHub;
