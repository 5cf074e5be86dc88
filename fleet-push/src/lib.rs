//! Web Push fan-out service.
//!
//! Stores browser push subscriptions in SQLite and, on an authenticated
//! trigger, encrypts one notification per subscription, delivers it with
//! VAPID credentials and prunes subscriptions the push services report gone.

pub mod api;
pub mod config;
pub mod database;
pub mod delivery;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod logging;

pub use error::{Error, Result};
