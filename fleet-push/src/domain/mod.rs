//! Domain types shared by the API, delivery and persistence layers.

pub mod notification;
pub mod subscription;

pub use notification::{Notification, NotificationOverrides};
pub use subscription::Subscription;
