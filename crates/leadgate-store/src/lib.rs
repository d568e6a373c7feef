//! # leadgate-store
//!
//! SQLite-backed persistent store for leads, interactions, form fragments,
//! and the transactional job outbox.

mod store;

pub use store::*;
