//! CRUD operations for [`User`] records.

use chrono::{DateTime, Utc};
use rusqlite::params;

use huddle_shared::UserId;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::User;

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new user.  Fails with [`StoreError::AlreadyExists`] if the
    /// username is already taken.
    pub fn create_user(&self, user: &User) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO users (id, username, display_name, credential_hash, avatar_ref, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    user.id.to_string(),
                    user.username,
                    user.display_name,
                    user.credential_hash,
                    user.avatar_ref,
                    user.created_at.to_rfc3339(),
                ],
            )
            .map_err(map_unique_violation)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single user by stable id.
    pub fn get_user(&self, id: UserId) -> Result<User> {
        self.conn()
            .query_row(
                "SELECT id, username, display_name, credential_hash, avatar_ref, created_at
                 FROM users
                 WHERE id = ?1",
                params![id.to_string()],
                row_to_user,
            )
            .map_err(StoreError::from_query)
    }

    /// Fetch a single user by (already normalized) username.
    pub fn get_user_by_username(&self, username: &str) -> Result<User> {
        self.conn()
            .query_row(
                "SELECT id, username, display_name, credential_hash, avatar_ref, created_at
                 FROM users
                 WHERE username = ?1",
                params![username],
                row_to_user,
            )
            .map_err(StoreError::from_query)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Change a user's login name.  References elsewhere are by id, so
    /// nothing cascades.  Fails with [`StoreError::AlreadyExists`] if the
    /// new name is taken.
    pub fn rename_user(&self, id: UserId, new_username: &str) -> Result<()> {
        let affected = self
            .conn()
            .execute(
                "UPDATE users SET username = ?2 WHERE id = ?1",
                params![id.to_string(), new_username],
            )
            .map_err(map_unique_violation)?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Update a user's display name.
    pub fn set_display_name(&self, id: UserId, display_name: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE users SET display_name = ?2 WHERE id = ?1",
            params![id.to_string(), display_name],
        )?;
        Ok(())
    }

    /// Update a user's profile image reference.
    pub fn set_avatar_ref(&self, id: UserId, avatar_ref: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE users SET avatar_ref = ?2 WHERE id = ?1",
            params![id.to_string(), avatar_ref],
        )?;
        Ok(())
    }

    /// Replace a user's stored credential hash.
    pub fn set_credential_hash(&self, id: UserId, credential_hash: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE users SET credential_hash = ?2 WHERE id = ?1",
            params![id.to_string(), credential_hash],
        )?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`User`].
pub(crate) fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId(parse_uuid(row, 0)?),
        username: row.get(1)?,
        display_name: row.get(2)?,
        credential_hash: row.get(3)?,
        avatar_ref: row.get(4)?,
        created_at: parse_timestamp(row, 5)?,
    })
}

/// Parse a UUID column, converting parse failures into `rusqlite` errors.
pub(crate) fn parse_uuid(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<uuid::Uuid> {
    let text: String = row.get(idx)?;
    uuid::Uuid::parse_str(&text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Parse an RFC-3339 timestamp column.
pub(crate) fn parse_timestamp(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Map SQLite uniqueness violations onto [`StoreError::AlreadyExists`].
pub(crate) fn map_unique_violation(e: rusqlite::Error) -> StoreError {
    match e.sqlite_error_code() {
        Some(rusqlite::ErrorCode::ConstraintViolation) => StoreError::AlreadyExists,
        _ => StoreError::Sqlite(e),
    }
}
