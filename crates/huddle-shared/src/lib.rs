//! # huddle-shared
//!
//! Plain types shared by every layer of the Huddle backend: newtype
//! identifiers, invite-code generation, credential hashing, and the
//! constants that bound user-supplied content.

pub mod constants;
pub mod credential;
pub mod invite;
pub mod types;

pub use invite::InviteCode;
pub use types::{ContributionId, GroupId, PostId, UserId};
