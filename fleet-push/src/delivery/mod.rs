//! Web Push delivery: fan-out, outcome classification and reconciliation.

pub mod coordinator;
pub mod outcome;

pub use coordinator::DeliveryCoordinator;
pub use outcome::{DeliveryOutcome, DeliveryReport, SubscriberReport};
