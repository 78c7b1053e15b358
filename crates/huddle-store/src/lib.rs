//! # huddle-store
//!
//! SQLite persistence for the Huddle backend.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every domain
//! model. Multi-row mutations (approving a join request, replacing a pool,
//! deleting a post) run inside a transaction so no reader ever observes a
//! half-applied operation.

pub mod database;
pub mod groups;
pub mod migrations;
pub mod models;
pub mod pools;
pub mod posts;
pub mod users;

mod error;

#[cfg(test)]
pub(crate) mod test_util;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
