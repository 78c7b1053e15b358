use thiserror::Error;

use huddle_shared::credential::CredentialError;
use huddle_store::StoreError;

/// The domain error taxonomy.  Every operation returns one of these as a
/// typed outcome; nothing in the domain layer panics on bad input.
#[derive(Error, Debug)]
pub enum DomainError {
    /// The actor lacks the required role (always admin-vs-non-admin).
    #[error("Only the group admin may do this")]
    Unauthorized,

    /// An address (group, post display index, user) does not resolve
    /// against current state.
    #[error("Not found")]
    NotFound,

    /// A contribution index does not resolve against the current ledger.
    #[error("No contribution at that index")]
    InvalidIndex,

    /// A required field was missing or empty after trimming.
    #[error("Invalid input: {0}")]
    InvalidInput(&'static str),

    /// The username is already taken.
    #[error("Username already taken")]
    DuplicateUsername,

    /// The invite code does not match any group.
    #[error("Invalid invite code")]
    InvalidCode,

    /// The user already belongs to the group.
    #[error("Already a member of this group")]
    AlreadyMember,

    /// The user already has a pending join request for the group.
    #[error("Join request already pending")]
    AlreadyRequested,

    /// The target user has no pending request to approve or deny.
    #[error("No pending request for that user")]
    NotPending,

    /// The target user is not a member of the group.
    #[error("Not a member of this group")]
    NotMember,

    /// The admin may not leave their own group; they must delete it.
    #[error("The admin cannot leave the group")]
    AdminCannotLeave,

    /// The admin may not kick themselves.
    #[error("The admin cannot kick themselves")]
    SelfKick,

    /// The supplied credential did not verify.
    #[error("Credential verification failed")]
    BadCredential,

    /// The group has no contribution pool.
    #[error("The group has no pool")]
    NoPool,

    /// A contribution amount must be strictly positive.
    #[error("Contribution amount must be positive")]
    InvalidAmount,

    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Credential hashing failure.
    #[error(transparent)]
    Credential(#[from] CredentialError),
}
