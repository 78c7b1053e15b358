//! Post and comment lifecycle.
//!
//! Posts are stored append-only and shown newest first.  A display index
//! `i` addresses storage position `len - 1 - i` *of the current state*;
//! callers re-resolve it on every operation, so an index computed from an
//! old page render simply comes back `NotFound` after the list shrank.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use huddle_shared::constants::{ANONYMOUS_AUTHOR, MAX_POST_IMAGES};
use huddle_shared::{GroupId, PostId, UserId};
use huddle_store::{Comment, Database, Post, StoreError};

use crate::membership::require_admin;
use crate::{DomainError, Result};

/// Input for [`create_post`].
#[derive(Debug)]
pub struct NewPost {
    pub title: String,
    pub description: String,
    pub image_refs: Vec<String>,
}

/// A post together with its comments, as shown on the post page.
#[derive(Debug)]
pub struct PostDetail {
    pub post: Post,
    pub comments: Vec<Comment>,
}

/// One page of the newest-first feed plus the total post count (for the
/// pagination UI).
#[derive(Debug)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub total: u64,
}

/// Create a post in the group.  Only members may post; title and
/// description must be non-empty after trimming; image references beyond
/// the maximum are silently dropped.
pub fn create_post(
    db: &mut Database,
    group: GroupId,
    author: UserId,
    input: NewPost,
) -> Result<Post> {
    let title = input.title.trim();
    let description = input.description.trim();
    if title.is_empty() {
        return Err(DomainError::InvalidInput("title must not be empty"));
    }
    if description.is_empty() {
        return Err(DomainError::InvalidInput("description must not be empty"));
    }
    if !db.is_member(group, author)? {
        return Err(DomainError::NotMember);
    }

    let mut image_refs = input.image_refs;
    image_refs.truncate(MAX_POST_IMAGES);

    let post = db.create_post(&Post {
        id: PostId::new(),
        group_id: group,
        author,
        title: title.to_string(),
        description: description.to_string(),
        image_refs,
        created_at: Utc::now(),
        seq: 0,
    })?;

    info!(group_id = %group, post_id = %post.id, "post created");
    Ok(post)
}

/// One newest-first page of a group's posts.  Pages are 1-indexed; an
/// out-of-range page yields an empty slice, not an error.
pub fn list_posts(db: &Database, group: GroupId, page: u64, page_size: u64) -> Result<PostPage> {
    let page = page.max(1);
    // Saturate: an offset past u64::MAX is past any post count anyway,
    // and the store returns an empty page for out-of-range offsets.
    let offset = (page - 1).saturating_mul(page_size);

    Ok(PostPage {
        posts: db.list_posts_page(group, offset, page_size)?,
        total: db.count_posts(group)?,
    })
}

/// Fetch the post at a newest-first display index, with its comments.
pub fn get_post(db: &Database, group: GroupId, display_index: u64) -> Result<PostDetail> {
    let post = resolve_display_index(db, group, display_index)?;
    let comments = db.list_comments(post.id)?;
    Ok(PostDetail { post, comments })
}

/// Append a comment to the post at a display index.  An anonymous comment
/// records only the sentinel name; the real author is never written, so
/// anonymity cannot be revoked later.
pub fn add_comment(
    db: &mut Database,
    group: GroupId,
    display_index: u64,
    author: UserId,
    content: &str,
    anonymous: bool,
) -> Result<Comment> {
    let content = content.trim();
    if content.is_empty() {
        return Err(DomainError::InvalidInput("comment must not be empty"));
    }

    let post = resolve_display_index(db, group, display_index)?;

    let (author_id, author_name) = if anonymous {
        (None, ANONYMOUS_AUTHOR.to_string())
    } else {
        (Some(author), db.get_user(author)?.display_name)
    };

    let comment = Comment {
        id: Uuid::new_v4(),
        post_id: post.id,
        author: author_id,
        author_name,
        content: content.to_string(),
        created_at: Utc::now(),
    };
    db.add_comment(&comment)?;

    info!(group_id = %group, post_id = %post.id, anonymous, "comment added");
    Ok(comment)
}

/// Delete the post at a display index.  Admin-only.  Every younger post's
/// display index shifts down by one, which is why indices are re-resolved
/// on each call rather than cached.
pub fn delete_post(
    db: &mut Database,
    group: GroupId,
    actor: UserId,
    display_index: u64,
) -> Result<()> {
    require_admin(db, group, actor)?;

    let post = resolve_display_index(db, group, display_index)?;
    db.delete_post(post.id)?;

    info!(group_id = %group, post_id = %post.id, "post deleted");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn resolve_display_index(db: &Database, group: GroupId, display_index: u64) -> Result<Post> {
    match db.get_post_by_display_index(group, display_index) {
        Ok(post) => Ok(post),
        Err(StoreError::NotFound) => Err(DomainError::NotFound),
        Err(e) => Err(e.into()),
    }
}
