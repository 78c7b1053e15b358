//! CRUD operations for [`Post`] and [`Comment`] records.
//!
//! Posts are stored in append-only order: each insert takes the next `seq`
//! for its group inside a transaction.  The newest-first display index used
//! by the UI is purely a read-time view (`ORDER BY seq DESC` plus an
//! offset), so it is recomputed on every call and never cached.

use rusqlite::params;

use huddle_shared::{GroupId, PostId, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Comment, Post};
use crate::users::{parse_timestamp, parse_uuid};

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Append a post to its group's storage order.  The `seq` on the input
    /// is ignored; the next free sequence number is assigned inside the
    /// transaction and the stored post is returned.
    pub fn create_post(&mut self, post: &Post) -> Result<Post> {
        let tx = self.conn_mut().transaction()?;

        let seq: i64 = tx.query_row(
            "SELECT COALESCE(MAX(seq) + 1, 0) FROM posts WHERE group_id = ?1",
            params![post.group_id.to_string()],
            |row| row.get(0),
        )?;

        tx.execute(
            "INSERT INTO posts (id, group_id, author_id, title, description, created_at, seq)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                post.id.to_string(),
                post.group_id.to_string(),
                post.author.to_string(),
                post.title,
                post.description,
                post.created_at.to_rfc3339(),
                seq,
            ],
        )?;

        for (position, image_ref) in post.image_refs.iter().enumerate() {
            tx.execute(
                "INSERT INTO post_images (post_id, position, image_ref) VALUES (?1, ?2, ?3)",
                params![post.id.to_string(), position as i64, image_ref],
            )?;
        }

        tx.commit()?;

        Ok(Post {
            seq,
            ..post.clone()
        })
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Number of posts in a group.
    pub fn count_posts(&self, group: GroupId) -> Result<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM posts WHERE group_id = ?1",
            params![group.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// A newest-first page of posts.  `offset` counts posts, not pages.
    /// An offset past `i64::MAX` is past any possible row count, so it
    /// yields an empty page rather than a negative SQL OFFSET.
    pub fn list_posts_page(&self, group: GroupId, offset: u64, limit: u64) -> Result<Vec<Post>> {
        let Ok(offset) = i64::try_from(offset) else {
            return Ok(Vec::new());
        };
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let mut stmt = self.conn().prepare(
            "SELECT id, group_id, author_id, title, description, created_at, seq
             FROM posts
             WHERE group_id = ?1
             ORDER BY seq DESC
             LIMIT ?2 OFFSET ?3",
        )?;

        let rows = stmt.query_map(params![group.to_string(), limit, offset], row_to_post)?;

        let mut posts = Vec::new();
        for row in rows {
            posts.push(row?);
        }
        drop(stmt);

        for post in &mut posts {
            post.image_refs = self.load_image_refs(post.id)?;
        }
        Ok(posts)
    }

    /// Resolve a newest-first display index against the *current* storage
    /// order.  A stale index from an earlier render simply misses, and an
    /// index past `i64::MAX` can never address a row, so it misses too.
    pub fn get_post_by_display_index(&self, group: GroupId, index: u64) -> Result<Post> {
        let index = i64::try_from(index).map_err(|_| StoreError::NotFound)?;
        let mut post = self
            .conn()
            .query_row(
                "SELECT id, group_id, author_id, title, description, created_at, seq
                 FROM posts
                 WHERE group_id = ?1
                 ORDER BY seq DESC
                 LIMIT 1 OFFSET ?2",
                params![group.to_string(), index],
                row_to_post,
            )
            .map_err(StoreError::from_query)?;

        post.image_refs = self.load_image_refs(post.id)?;
        Ok(post)
    }

    fn load_image_refs(&self, post: PostId) -> Result<Vec<String>> {
        let mut stmt = self.conn().prepare(
            "SELECT image_ref FROM post_images WHERE post_id = ?1 ORDER BY position",
        )?;

        let rows = stmt.query_map(params![post.to_string()], |row| row.get::<_, String>(0))?;

        let mut refs = Vec::new();
        for row in rows {
            refs.push(row?);
        }
        Ok(refs)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a post (its images and comments cascade).  Returns `true` if
    /// a row was deleted.
    pub fn delete_post(&self, id: PostId) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM posts WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }

    // ------------------------------------------------------------------
    // Comments
    // ------------------------------------------------------------------

    /// Append a comment to a post.
    pub fn add_comment(&self, comment: &Comment) -> Result<()> {
        self.conn().execute(
            "INSERT INTO comments (id, post_id, author_id, author_name, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                comment.id.to_string(),
                comment.post_id.to_string(),
                comment.author.map(|a| a.to_string()),
                comment.author_name,
                comment.content,
                comment.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// List a post's comments, oldest first.
    pub fn list_comments(&self, post: PostId) -> Result<Vec<Comment>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, post_id, author_id, author_name, content, created_at
             FROM comments
             WHERE post_id = ?1
             ORDER BY created_at, rowid",
        )?;

        let rows = stmt.query_map(params![post.to_string()], row_to_comment)?;

        let mut comments = Vec::new();
        for row in rows {
            comments.push(row?);
        }
        Ok(comments)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Post`] (without image refs).
fn row_to_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: PostId(parse_uuid(row, 0)?),
        group_id: GroupId(parse_uuid(row, 1)?),
        author: UserId(parse_uuid(row, 2)?),
        title: row.get(3)?,
        description: row.get(4)?,
        image_refs: Vec::new(),
        created_at: parse_timestamp(row, 5)?,
        seq: row.get(6)?,
    })
}

/// Map a `rusqlite::Row` to a [`Comment`].
fn row_to_comment(row: &rusqlite::Row<'_>) -> rusqlite::Result<Comment> {
    let author: Option<String> = row.get(2)?;
    let author = match author {
        None => None,
        Some(text) => Some(UserId(uuid::Uuid::parse_str(&text).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?)),
    };

    Ok(Comment {
        id: parse_uuid(row, 0)?,
        post_id: PostId(parse_uuid(row, 1)?),
        author,
        author_name: row.get(3)?,
        content: row.get(4)?,
        created_at: parse_timestamp(row, 5)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::test_util::{sample_group, sample_user, test_db};

    fn make_post(db: &mut Database, group: GroupId, author: UserId, title: &str) -> Post {
        let post = Post {
            id: PostId::new(),
            group_id: group,
            author,
            title: title.to_string(),
            description: format!("{title} body"),
            image_refs: Vec::new(),
            created_at: Utc::now(),
            seq: 0,
        };
        db.create_post(&post).unwrap()
    }

    #[test]
    fn posts_get_monotonic_seq() {
        let (_dir, mut db) = test_db();
        let alice = sample_user(&db, "alice");
        let group = sample_group(&mut db, alice.id, "Camp");

        let p0 = make_post(&mut db, group.id, alice.id, "first");
        let p1 = make_post(&mut db, group.id, alice.id, "second");
        assert_eq!(p0.seq, 0);
        assert_eq!(p1.seq, 1);
    }

    #[test]
    fn display_index_is_newest_first() {
        let (_dir, mut db) = test_db();
        let alice = sample_user(&db, "alice");
        let group = sample_group(&mut db, alice.id, "Camp");

        make_post(&mut db, group.id, alice.id, "oldest");
        make_post(&mut db, group.id, alice.id, "middle");
        make_post(&mut db, group.id, alice.id, "newest");

        assert_eq!(
            db.get_post_by_display_index(group.id, 0).unwrap().title,
            "newest"
        );
        assert_eq!(
            db.get_post_by_display_index(group.id, 2).unwrap().title,
            "oldest"
        );
        assert!(matches!(
            db.get_post_by_display_index(group.id, 3),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn display_index_beyond_i64_misses() {
        let (_dir, mut db) = test_db();
        let alice = sample_user(&db, "alice");
        let group = sample_group(&mut db, alice.id, "Camp");

        make_post(&mut db, group.id, alice.id, "only");

        // An index that does not fit a SQL OFFSET must miss, never wrap
        // around to the newest row.
        assert!(matches!(
            db.get_post_by_display_index(group.id, 1 << 63),
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            db.get_post_by_display_index(group.id, u64::MAX),
            Err(StoreError::NotFound)
        ));
        assert!(db
            .list_posts_page(group.id, u64::MAX, 5)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn pagination_with_out_of_range_page() {
        let (_dir, mut db) = test_db();
        let alice = sample_user(&db, "alice");
        let group = sample_group(&mut db, alice.id, "Camp");

        for i in 0..7 {
            make_post(&mut db, group.id, alice.id, &format!("post-{i}"));
        }

        let page1 = db.list_posts_page(group.id, 0, 5).unwrap();
        assert_eq!(page1.len(), 5);
        assert_eq!(page1[0].title, "post-6");

        let page2 = db.list_posts_page(group.id, 5, 5).unwrap();
        assert_eq!(page2.len(), 2);
        assert_eq!(page2[1].title, "post-0");

        assert!(db.list_posts_page(group.id, 10, 5).unwrap().is_empty());
        assert_eq!(db.count_posts(group.id).unwrap(), 7);
    }

    #[test]
    fn image_refs_round_trip_in_order() {
        let (_dir, mut db) = test_db();
        let alice = sample_user(&db, "alice");
        let group = sample_group(&mut db, alice.id, "Camp");

        let post = Post {
            id: PostId::new(),
            group_id: group.id,
            author: alice.id,
            title: "pics".into(),
            description: "holiday".into(),
            image_refs: vec!["a.png".into(), "b.png".into()],
            created_at: Utc::now(),
            seq: 0,
        };
        db.create_post(&post).unwrap();

        let fetched = db.get_post_by_display_index(group.id, 0).unwrap();
        assert_eq!(fetched.image_refs, vec!["a.png", "b.png"]);
    }

    #[test]
    fn delete_post_cascades_comments() {
        let (_dir, mut db) = test_db();
        let alice = sample_user(&db, "alice");
        let group = sample_group(&mut db, alice.id, "Camp");
        let post = make_post(&mut db, group.id, alice.id, "doomed");

        db.add_comment(&Comment {
            id: uuid::Uuid::new_v4(),
            post_id: post.id,
            author: Some(alice.id),
            author_name: alice.display_name.clone(),
            content: "nice".into(),
            created_at: Utc::now(),
        })
        .unwrap();

        assert!(db.delete_post(post.id).unwrap());
        assert!(db.list_comments(post.id).unwrap().is_empty());
    }
}
