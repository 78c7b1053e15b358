//! CRUD operations for [`Group`] records, membership, join requests, and
//! invite codes.
//!
//! Multi-row mutations (group creation, request approval) run inside a
//! transaction so the membership invariants can never be observed
//! half-applied.

use chrono::Utc;
use rusqlite::params;

use huddle_shared::{GroupId, InviteCode, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Group;
use crate::users::{map_unique_violation, parse_timestamp, parse_uuid};

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new group together with its admin membership row and an
    /// initial invite code, atomically.
    pub fn create_group(&mut self, group: &Group, initial_code: &InviteCode) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn_mut().transaction()?;

        tx.execute(
            "INSERT INTO groups (id, name, description, image_ref, admin_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                group.id.to_string(),
                group.name,
                group.description,
                group.image_ref,
                group.admin.to_string(),
                group.created_at.to_rfc3339(),
            ],
        )?;
        tx.execute(
            "INSERT INTO group_members (group_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
            params![group.id.to_string(), group.admin.to_string(), now],
        )?;
        tx.execute(
            "INSERT INTO invite_codes (code, group_id, created_at) VALUES (?1, ?2, ?3)",
            params![initial_code.as_str(), group.id.to_string(), now],
        )
        .map_err(map_unique_violation)?;

        tx.commit()?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single group by id.
    pub fn get_group(&self, id: GroupId) -> Result<Group> {
        self.conn()
            .query_row(
                "SELECT id, name, description, image_ref, admin_id, created_at
                 FROM groups
                 WHERE id = ?1",
                params![id.to_string()],
                row_to_group,
            )
            .map_err(StoreError::from_query)
    }

    /// List the groups a user belongs to, oldest membership first.
    pub fn list_groups_for_user(&self, user: UserId) -> Result<Vec<Group>> {
        let mut stmt = self.conn().prepare(
            "SELECT g.id, g.name, g.description, g.image_ref, g.admin_id, g.created_at
             FROM groups g
             JOIN group_members m ON m.group_id = g.id
             WHERE m.user_id = ?1
             ORDER BY m.joined_at, m.rowid",
        )?;

        let rows = stmt.query_map(params![user.to_string()], row_to_group)?;

        let mut groups = Vec::new();
        for row in rows {
            groups.push(row?);
        }
        Ok(groups)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a group.  Members, requests, invite codes, posts, comments,
    /// the pool and its contributions all go with it (FK cascades).
    /// Returns `true` if a row was deleted.
    pub fn delete_group(&self, id: GroupId) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM groups WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }

    // ------------------------------------------------------------------
    // Membership
    // ------------------------------------------------------------------

    /// List member ids in join order (the admin is always first).
    pub fn list_members(&self, group: GroupId) -> Result<Vec<UserId>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id FROM group_members
             WHERE group_id = ?1
             ORDER BY joined_at, rowid",
        )?;

        let rows = stmt.query_map(params![group.to_string()], |row| {
            parse_uuid(row, 0).map(UserId)
        })?;

        let mut members = Vec::new();
        for row in rows {
            members.push(row?);
        }
        Ok(members)
    }

    /// Whether `user` is currently a member of `group`.
    pub fn is_member(&self, group: GroupId, user: UserId) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM group_members WHERE group_id = ?1 AND user_id = ?2",
            params![group.to_string(), user.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Remove a member.  Returns `true` if a row was deleted.
    pub fn remove_member(&self, group: GroupId, user: UserId) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM group_members WHERE group_id = ?1 AND user_id = ?2",
            params![group.to_string(), user.to_string()],
        )?;
        Ok(affected > 0)
    }

    // ------------------------------------------------------------------
    // Join requests
    // ------------------------------------------------------------------

    /// List pending request ids in arrival order.
    pub fn list_requests(&self, group: GroupId) -> Result<Vec<UserId>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id FROM join_requests
             WHERE group_id = ?1
             ORDER BY requested_at, rowid",
        )?;

        let rows = stmt.query_map(params![group.to_string()], |row| {
            parse_uuid(row, 0).map(UserId)
        })?;

        let mut requests = Vec::new();
        for row in rows {
            requests.push(row?);
        }
        Ok(requests)
    }

    /// Whether `user` has a pending request for `group`.
    pub fn is_requested(&self, group: GroupId, user: UserId) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM join_requests WHERE group_id = ?1 AND user_id = ?2",
            params![group.to_string(), user.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Append a pending join request.
    pub fn add_request(&self, group: GroupId, user: UserId) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO join_requests (group_id, user_id, requested_at) VALUES (?1, ?2, ?3)",
                params![
                    group.to_string(),
                    user.to_string(),
                    Utc::now().to_rfc3339()
                ],
            )
            .map_err(map_unique_violation)?;
        Ok(())
    }

    /// Remove a pending request (deny).  Returns `true` if a row was deleted.
    pub fn remove_request(&self, group: GroupId, user: UserId) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM join_requests WHERE group_id = ?1 AND user_id = ?2",
            params![group.to_string(), user.to_string()],
        )?;
        Ok(affected > 0)
    }

    /// Move a user from the request queue into the member list, atomically.
    /// Fails with [`StoreError::NotFound`] if no request was pending.
    pub fn approve_request(&mut self, group: GroupId, user: UserId) -> Result<()> {
        let tx = self.conn_mut().transaction()?;

        let removed = tx.execute(
            "DELETE FROM join_requests WHERE group_id = ?1 AND user_id = ?2",
            params![group.to_string(), user.to_string()],
        )?;
        if removed == 0 {
            return Err(StoreError::NotFound);
        }
        tx.execute(
            "INSERT INTO group_members (group_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
            params![
                group.to_string(),
                user.to_string(),
                Utc::now().to_rfc3339()
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Invite codes
    // ------------------------------------------------------------------

    /// Append a new invite code.  Prior codes stay valid.  Fails with
    /// [`StoreError::AlreadyExists`] on a (globally unique) code collision.
    pub fn add_invite_code(&self, group: GroupId, code: &InviteCode) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO invite_codes (code, group_id, created_at) VALUES (?1, ?2, ?3)",
                params![
                    code.as_str(),
                    group.to_string(),
                    Utc::now().to_rfc3339()
                ],
            )
            .map_err(map_unique_violation)?;
        Ok(())
    }

    /// Resolve an invite code to its group.  Codes are globally unique, so
    /// this is an exact lookup rather than a scan.
    pub fn find_group_by_invite(&self, code: &InviteCode) -> Result<Group> {
        self.conn()
            .query_row(
                "SELECT g.id, g.name, g.description, g.image_ref, g.admin_id, g.created_at
                 FROM groups g
                 JOIN invite_codes c ON c.group_id = g.id
                 WHERE c.code = ?1",
                params![code.as_str()],
                row_to_group,
            )
            .map_err(StoreError::from_query)
    }

    /// List the active invite codes for a group, oldest first.
    pub fn list_invite_codes(&self, group: GroupId) -> Result<Vec<String>> {
        let mut stmt = self.conn().prepare(
            "SELECT code FROM invite_codes
             WHERE group_id = ?1
             ORDER BY created_at, rowid",
        )?;

        let rows = stmt.query_map(params![group.to_string()], |row| row.get::<_, String>(0))?;

        let mut codes = Vec::new();
        for row in rows {
            codes.push(row?);
        }
        Ok(codes)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Group`].
fn row_to_group(row: &rusqlite::Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: GroupId(parse_uuid(row, 0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        image_ref: row.get(3)?,
        admin: UserId(parse_uuid(row, 4)?),
        created_at: parse_timestamp(row, 5)?,
    })
}
