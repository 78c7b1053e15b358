//! CRUD operations for [`Pool`] and [`Contribution`] records.
//!
//! A group owns at most one pool.  Contributions are append-only: they are
//! never deleted individually, only amount-corrected and approved, and they
//! only disappear when their pool (or group) is replaced or deleted.

use rusqlite::params;

use huddle_shared::{ContributionId, GroupId, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Contribution, Pool};
use crate::users::parse_uuid;

impl Database {
    // ------------------------------------------------------------------
    // Pool lifecycle
    // ------------------------------------------------------------------

    /// Install a pool for a group, destructively replacing any existing one
    /// (prior contributions are discarded via the FK cascade).  Returns
    /// `true` if a previous pool was replaced.
    pub fn replace_pool(&mut self, pool: &Pool) -> Result<bool> {
        let tx = self.conn_mut().transaction()?;

        let replaced = tx.execute(
            "DELETE FROM pools WHERE group_id = ?1",
            params![pool.group_id.to_string()],
        )? > 0;

        tx.execute(
            "INSERT INTO pools (group_id, name, target) VALUES (?1, ?2, ?3)",
            params![pool.group_id.to_string(), pool.name, pool.target],
        )?;

        tx.commit()?;
        Ok(replaced)
    }

    /// Fetch a group's pool, if it has one.
    pub fn get_pool(&self, group: GroupId) -> Result<Pool> {
        self.conn()
            .query_row(
                "SELECT group_id, name, target FROM pools WHERE group_id = ?1",
                params![group.to_string()],
                row_to_pool,
            )
            .map_err(StoreError::from_query)
    }

    // ------------------------------------------------------------------
    // Contributions
    // ------------------------------------------------------------------

    /// Append a contribution to the pool's storage order.  The `seq` on the
    /// input is ignored; the next free sequence number is assigned inside
    /// the transaction and the stored entry is returned.
    pub fn add_contribution(&mut self, contribution: &Contribution) -> Result<Contribution> {
        let tx = self.conn_mut().transaction()?;

        let seq: i64 = tx.query_row(
            "SELECT COALESCE(MAX(seq) + 1, 0) FROM contributions WHERE group_id = ?1",
            params![contribution.group_id.to_string()],
            |row| row.get(0),
        )?;

        tx.execute(
            "INSERT INTO contributions (id, group_id, contributor_id, amount, approved, seq)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                contribution.id.to_string(),
                contribution.group_id.to_string(),
                contribution.contributor.to_string(),
                contribution.amount,
                contribution.approved as i64,
                seq,
            ],
        )?;

        tx.commit()?;

        Ok(Contribution {
            seq,
            ..contribution.clone()
        })
    }

    /// List a pool's contributions in storage (submission) order.
    pub fn list_contributions(&self, group: GroupId) -> Result<Vec<Contribution>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, group_id, contributor_id, amount, approved, seq
             FROM contributions
             WHERE group_id = ?1
             ORDER BY seq",
        )?;

        let rows = stmt.query_map(params![group.to_string()], row_to_contribution)?;

        let mut contributions = Vec::new();
        for row in rows {
            contributions.push(row?);
        }
        Ok(contributions)
    }

    /// Resolve a storage-order index against the current ledger.  An index
    /// past `i64::MAX` can never address a row, so it misses.
    pub fn get_contribution_by_index(&self, group: GroupId, index: u64) -> Result<Contribution> {
        let index = i64::try_from(index).map_err(|_| StoreError::NotFound)?;
        self.conn()
            .query_row(
                "SELECT id, group_id, contributor_id, amount, approved, seq
                 FROM contributions
                 WHERE group_id = ?1
                 ORDER BY seq
                 LIMIT 1 OFFSET ?2",
                params![group.to_string(), index],
                row_to_contribution,
            )
            .map_err(StoreError::from_query)
    }

    /// Set a contribution's amount and mark it approved in a single UPDATE,
    /// so the correction and the approval can never be observed separately.
    pub fn approve_contribution(&self, id: ContributionId, amount: f64) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE contributions SET amount = ?2, approved = 1 WHERE id = ?1",
            params![id.to_string(), amount],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Pool`].
fn row_to_pool(row: &rusqlite::Row<'_>) -> rusqlite::Result<Pool> {
    Ok(Pool {
        group_id: GroupId(parse_uuid(row, 0)?),
        name: row.get(1)?,
        target: row.get(2)?,
    })
}

/// Map a `rusqlite::Row` to a [`Contribution`].
fn row_to_contribution(row: &rusqlite::Row<'_>) -> rusqlite::Result<Contribution> {
    let approved: i64 = row.get(4)?;
    Ok(Contribution {
        id: ContributionId(parse_uuid(row, 0)?),
        group_id: GroupId(parse_uuid(row, 1)?),
        contributor: UserId(parse_uuid(row, 2)?),
        amount: row.get(3)?,
        approved: approved != 0,
        seq: row.get(5)?,
    })
}
