//! # huddle-core
//!
//! The domain layer of the Huddle backend: account lifecycle, group
//! membership rules, post/comment content rules, and the contribution-pool
//! ledger.  Every operation is a synchronous load-mutate-save against a
//! [`huddle_store::Database`]; the transport layer owns no business rules
//! and only hands in the acting user's id.
//!
//! Invariants upheld here, after any sequence of operations:
//! - a group's admin is always a member, and can only be removed by
//!   deleting the group;
//! - no user is ever in a group's member list and request queue at once;
//! - anonymous comments never record their real author;
//! - contributions are never removed, only amount-corrected and approved.

pub mod accounts;
pub mod content;
pub mod membership;
pub mod pool;

mod error;

pub use error::DomainError;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
pub(crate) mod test_util;
