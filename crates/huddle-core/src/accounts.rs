//! Account lifecycle: registration, credential checks, renames, profile
//! updates.
//!
//! Users carry a stable UUID that everything else references; the username
//! is only a unique, lowercase login key.  Renames therefore never cascade
//! into membership lists or authorship records.

use chrono::Utc;
use tracing::info;

use huddle_shared::{credential, types::normalize_username, UserId};
use huddle_store::{Database, StoreError, User};

use crate::{DomainError, Result};

/// Optional profile fields; `None` leaves the stored value untouched.
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub avatar_ref: Option<String>,
    pub new_credential: Option<String>,
}

/// Register a new user.  The username is trimmed and lowercased; duplicates
/// (case-insensitive by construction) are rejected.
pub fn register(
    db: &mut Database,
    username: &str,
    display_name: &str,
    plaintext_credential: &str,
) -> Result<User> {
    let username = normalize_username(username);
    if username.is_empty() {
        return Err(DomainError::InvalidInput("username must not be empty"));
    }
    if plaintext_credential.is_empty() {
        return Err(DomainError::InvalidInput("credential must not be empty"));
    }

    let display_name = display_name.trim();
    let user = User {
        id: UserId::new(),
        username: username.clone(),
        display_name: if display_name.is_empty() {
            username.clone()
        } else {
            display_name.to_string()
        },
        credential_hash: credential::hash(plaintext_credential)?,
        avatar_ref: String::new(),
        created_at: Utc::now(),
    };

    match db.create_user(&user) {
        Ok(()) => {}
        Err(StoreError::AlreadyExists) => return Err(DomainError::DuplicateUsername),
        Err(e) => return Err(e.into()),
    }

    info!(user_id = %user.id, username = %username, "user registered");
    Ok(user)
}

/// Verify a login attempt.  Returns the user on success; a wrong username
/// and a wrong credential are indistinguishable to the caller.
pub fn authenticate(db: &Database, username: &str, plaintext_credential: &str) -> Result<User> {
    let username = normalize_username(username);
    let user = match db.get_user_by_username(&username) {
        Ok(user) => user,
        Err(StoreError::NotFound) => return Err(DomainError::BadCredential),
        Err(e) => return Err(e.into()),
    };

    if !credential::verify(&user.credential_hash, plaintext_credential)? {
        return Err(DomainError::BadCredential);
    }
    Ok(user)
}

/// Change a user's login name.  All references are by id, so nothing else
/// needs to change.
pub fn rename(db: &mut Database, user: UserId, new_username: &str) -> Result<User> {
    let new_username = normalize_username(new_username);
    if new_username.is_empty() {
        return Err(DomainError::InvalidInput("username must not be empty"));
    }

    match db.rename_user(user, &new_username) {
        Ok(()) => {}
        Err(StoreError::AlreadyExists) => return Err(DomainError::DuplicateUsername),
        Err(StoreError::NotFound) => return Err(DomainError::NotFound),
        Err(e) => return Err(e.into()),
    }

    info!(user_id = %user, username = %new_username, "user renamed");
    Ok(db.get_user(user)?)
}

/// Apply the supplied profile changes.
pub fn update_profile(db: &mut Database, user: UserId, update: ProfileUpdate) -> Result<User> {
    // Existence check up front so partial updates cannot target a ghost.
    match db.get_user(user) {
        Ok(_) => {}
        Err(StoreError::NotFound) => return Err(DomainError::NotFound),
        Err(e) => return Err(e.into()),
    }

    if let Some(display_name) = update.display_name {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(DomainError::InvalidInput("display name must not be empty"));
        }
        db.set_display_name(user, display_name)?;
    }
    if let Some(avatar_ref) = update.avatar_ref {
        db.set_avatar_ref(user, &avatar_ref)?;
    }
    if let Some(plaintext) = update.new_credential {
        if plaintext.is_empty() {
            return Err(DomainError::InvalidInput("credential must not be empty"));
        }
        db.set_credential_hash(user, &credential::hash(&plaintext)?)?;
    }

    Ok(db.get_user(user)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::test_db;

    #[test]
    fn register_normalizes_and_rejects_duplicates() {
        let (_dir, mut db) = test_db();

        let alice = register(&mut db, "  Alice ", "Alice A.", "pw").unwrap();
        assert_eq!(alice.username, "alice");

        assert!(matches!(
            register(&mut db, "ALICE", "Shadow", "pw"),
            Err(DomainError::DuplicateUsername)
        ));
    }

    #[test]
    fn authenticate_checks_credential() {
        let (_dir, mut db) = test_db();
        register(&mut db, "alice", "Alice", "pw").unwrap();

        assert!(authenticate(&db, "Alice", "pw").is_ok());
        assert!(matches!(
            authenticate(&db, "alice", "wrong"),
            Err(DomainError::BadCredential)
        ));
        assert!(matches!(
            authenticate(&db, "nobody", "pw"),
            Err(DomainError::BadCredential)
        ));
    }

    #[test]
    fn rename_preserves_identity() {
        let (_dir, mut db) = test_db();
        let alice = register(&mut db, "alice", "Alice", "pw").unwrap();

        let renamed = rename(&mut db, alice.id, "Alicia").unwrap();
        assert_eq!(renamed.id, alice.id);
        assert_eq!(renamed.username, "alicia");

        // Old login name is gone, new one authenticates.
        assert!(matches!(
            authenticate(&db, "alice", "pw"),
            Err(DomainError::BadCredential)
        ));
        assert!(authenticate(&db, "alicia", "pw").is_ok());
    }

    #[test]
    fn update_profile_changes_credential() {
        let (_dir, mut db) = test_db();
        let alice = register(&mut db, "alice", "Alice", "old").unwrap();

        update_profile(
            &mut db,
            alice.id,
            ProfileUpdate {
                new_credential: Some("new".into()),
                ..Default::default()
            },
        )
        .unwrap();

        assert!(matches!(
            authenticate(&db, "alice", "old"),
            Err(DomainError::BadCredential)
        ));
        assert!(authenticate(&db, "alice", "new").is_ok());
    }
}
