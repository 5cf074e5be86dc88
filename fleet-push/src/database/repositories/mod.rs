//! Repository layer for database access.

pub mod notification_log;
pub mod subscription;

pub use notification_log::*;
pub use subscription::*;
