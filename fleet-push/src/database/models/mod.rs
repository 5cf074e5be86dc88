//! Row models mapping directly to the database schema.

pub mod push;

pub use push::*;
