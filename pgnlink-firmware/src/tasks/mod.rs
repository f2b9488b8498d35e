//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels/signals.

pub mod app;
pub mod link;

pub use app::app_task;
pub use link::link_task;
