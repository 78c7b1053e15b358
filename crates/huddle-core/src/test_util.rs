//! Helpers shared by the domain test modules.

use tempfile::TempDir;

use huddle_store::{Database, User};

use crate::accounts;

/// Open a fresh database in a temp dir.  The `TempDir` must be kept alive
/// for the lifetime of the database.
pub(crate) fn test_db() -> (TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_at(&dir.path().join("test.db")).unwrap();
    (dir, db)
}

/// Register a user through the real domain path (argon2 hash included).
pub(crate) fn register(db: &mut Database, username: &str) -> User {
    accounts::register(db, username, username, "correct horse").unwrap()
}
