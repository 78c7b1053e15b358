//! Helpers shared by the store test modules.

use chrono::Utc;
use tempfile::TempDir;

use huddle_shared::{GroupId, InviteCode, UserId};

use crate::database::Database;
use crate::models::{Group, User};

/// Open a fresh database in a temp dir.  The `TempDir` must be kept alive
/// for the lifetime of the database.
pub(crate) fn test_db() -> (TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_at(&dir.path().join("test.db")).unwrap();
    (dir, db)
}

/// Insert and return a user with the given username.
pub(crate) fn sample_user(db: &Database, username: &str) -> User {
    let user = User {
        id: UserId::new(),
        username: username.to_string(),
        display_name: username.to_string(),
        credential_hash: "$argon2id$stub".to_string(),
        avatar_ref: String::new(),
        created_at: Utc::now(),
    };
    db.create_user(&user).unwrap();
    user
}

/// Insert and return a group administered by `admin`, with one invite code.
pub(crate) fn sample_group(db: &mut Database, admin: UserId, name: &str) -> Group {
    let group = Group {
        id: GroupId::new(),
        name: name.to_string(),
        description: format!("{name} description"),
        image_ref: String::new(),
        admin,
        created_at: Utc::now(),
    };
    db.create_group(&group, &InviteCode::generate()).unwrap();
    group
}
