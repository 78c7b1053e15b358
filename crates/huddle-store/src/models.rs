//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the transport layer as a JSON payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use huddle_shared::{ContributionId, GroupId, PostId, UserId};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A registered user.  The primary key is an immutable UUID; the username is
/// only a renameable login key, so renames never orphan references.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Stable identity referenced by groups, posts and contributions.
    pub id: UserId,
    /// Unique lowercase login name.
    pub username: String,
    /// Human-readable display name.
    pub display_name: String,
    /// Argon2id PHC string.  Never serialized into API responses.
    #[serde(skip_serializing)]
    pub credential_hash: String,
    /// Opaque reference to a stored profile image (may be empty).
    pub avatar_ref: String,
    /// When the user registered.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Group
// ---------------------------------------------------------------------------

/// A collaboration group.  Owns its members, join requests, invite codes,
/// posts, and at most one contribution pool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Group {
    /// Unique group identifier.
    pub id: GroupId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Opaque reference to a stored group image (may be empty).
    pub image_ref: String,
    /// The single admin.  Always a member; only removable by deleting
    /// the group.
    pub admin: UserId,
    /// When the group was created.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Post
// ---------------------------------------------------------------------------

/// A post inside a group.  `seq` is the append-only storage order; the
/// newest-first display index is derived from it at read time and is never
/// stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    /// Stable post identifier.
    pub id: PostId,
    /// The group this post belongs to.
    pub group_id: GroupId,
    /// Author of the post.
    pub author: UserId,
    pub title: String,
    pub description: String,
    /// Opaque image references, at most four.
    pub image_refs: Vec<String>,
    /// When the post was created.
    pub created_at: DateTime<Utc>,
    /// Position in the group's append-only storage order.
    pub seq: i64,
}

// ---------------------------------------------------------------------------
// Comment
// ---------------------------------------------------------------------------

/// A comment on a post.  For anonymous comments `author` is `None` and
/// `author_name` holds the sentinel; the real author is never recorded,
/// so anonymity cannot be revoked by a later admin action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    /// Unique comment identifier.
    pub id: Uuid,
    /// The post this comment belongs to.
    pub post_id: PostId,
    /// Author, unless the comment was posted anonymously.
    pub author: Option<UserId>,
    /// Name shown to readers (the sentinel for anonymous comments).
    pub author_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Pool & contributions
// ---------------------------------------------------------------------------

/// A group-scoped contribution ledger with a target amount.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pool {
    /// The owning group (one pool per group at most).
    pub group_id: GroupId,
    pub name: String,
    /// Non-negative target amount.
    pub target: f64,
}

/// A single ledger entry.  Entries are never removed, only amount-corrected
/// and approved by the admin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Contribution {
    /// Stable contribution identifier.
    pub id: ContributionId,
    /// The group whose pool this entry belongs to.
    pub group_id: GroupId,
    pub contributor: UserId,
    pub amount: f64,
    pub approved: bool,
    /// Position in the pool's append-only storage order.
    pub seq: i64,
}
