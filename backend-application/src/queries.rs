pub mod admin_queries;
pub mod event_queries;
