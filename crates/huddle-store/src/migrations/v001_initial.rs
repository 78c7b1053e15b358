//! v001 -- Initial schema creation.
//!
//! Creates the core tables: `users`, `groups`, `group_members`,
//! `join_requests`, `invite_codes`, `posts`, `post_images`, `comments`,
//! `pools`, and `contributions`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id              TEXT PRIMARY KEY NOT NULL,   -- UUID v4, immutable
    username        TEXT NOT NULL UNIQUE,        -- lowercase login key, renameable
    display_name    TEXT NOT NULL,
    credential_hash TEXT NOT NULL,               -- Argon2id PHC string
    avatar_ref      TEXT NOT NULL DEFAULT '',    -- opaque media reference
    created_at      TEXT NOT NULL                -- ISO-8601 / RFC-3339
);

-- ----------------------------------------------------------------
-- Groups
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS groups (
    id          TEXT PRIMARY KEY NOT NULL,       -- UUID v4
    name        TEXT NOT NULL,
    description TEXT NOT NULL,
    image_ref   TEXT NOT NULL DEFAULT '',
    admin_id    TEXT NOT NULL,                   -- FK -> users(id)
    created_at  TEXT NOT NULL,

    FOREIGN KEY (admin_id) REFERENCES users(id)
);

-- ----------------------------------------------------------------
-- Membership (ordered by join time; the admin row is created with the group)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS group_members (
    group_id  TEXT NOT NULL,
    user_id   TEXT NOT NULL,
    joined_at TEXT NOT NULL,

    PRIMARY KEY (group_id, user_id),
    FOREIGN KEY (group_id) REFERENCES groups(id) ON DELETE CASCADE,
    FOREIGN KEY (user_id)  REFERENCES users(id)
);

-- ----------------------------------------------------------------
-- Pending join requests (a user is never in both members and requests)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS join_requests (
    group_id     TEXT NOT NULL,
    user_id      TEXT NOT NULL,
    requested_at TEXT NOT NULL,

    PRIMARY KEY (group_id, user_id),
    FOREIGN KEY (group_id) REFERENCES groups(id) ON DELETE CASCADE,
    FOREIGN KEY (user_id)  REFERENCES users(id)
);

-- ----------------------------------------------------------------
-- Invite codes (globally unique; several may be active per group)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS invite_codes (
    code       TEXT PRIMARY KEY NOT NULL,
    group_id   TEXT NOT NULL,
    created_at TEXT NOT NULL,

    FOREIGN KEY (group_id) REFERENCES groups(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_invite_codes_group ON invite_codes(group_id);

-- ----------------------------------------------------------------
-- Posts (seq is the append-only storage order within a group)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS posts (
    id          TEXT PRIMARY KEY NOT NULL,       -- UUID v4, stable address
    group_id    TEXT NOT NULL,
    author_id   TEXT NOT NULL,
    title       TEXT NOT NULL,
    description TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    seq         INTEGER NOT NULL,

    UNIQUE (group_id, seq),
    FOREIGN KEY (group_id)  REFERENCES groups(id) ON DELETE CASCADE,
    FOREIGN KEY (author_id) REFERENCES users(id)
);

CREATE INDEX IF NOT EXISTS idx_posts_group_seq ON posts(group_id, seq DESC);

-- ----------------------------------------------------------------
-- Post image references (max 4 per post, enforced in the domain layer)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS post_images (
    post_id   TEXT NOT NULL,
    position  INTEGER NOT NULL,
    image_ref TEXT NOT NULL,

    PRIMARY KEY (post_id, position),
    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Comments (author_id is NULL for anonymous comments; only the
-- sentinel author_name is ever recorded in that case)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS comments (
    id          TEXT PRIMARY KEY NOT NULL,       -- UUID v4
    post_id     TEXT NOT NULL,
    author_id   TEXT,                            -- nullable FK -> users(id)
    author_name TEXT NOT NULL,
    content     TEXT NOT NULL,
    created_at  TEXT NOT NULL,

    FOREIGN KEY (post_id)   REFERENCES posts(id) ON DELETE CASCADE,
    FOREIGN KEY (author_id) REFERENCES users(id)
);

CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id);

-- ----------------------------------------------------------------
-- Pools (at most one per group)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS pools (
    group_id TEXT PRIMARY KEY NOT NULL,
    name     TEXT NOT NULL,
    target   REAL NOT NULL,

    FOREIGN KEY (group_id) REFERENCES groups(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Contributions (never deleted except with their pool; seq is the
-- storage order used for index-based approval)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS contributions (
    id             TEXT PRIMARY KEY NOT NULL,    -- UUID v4, stable address
    group_id       TEXT NOT NULL,
    contributor_id TEXT NOT NULL,
    amount         REAL NOT NULL,
    approved       INTEGER NOT NULL DEFAULT 0,   -- boolean 0/1
    seq            INTEGER NOT NULL,

    UNIQUE (group_id, seq),
    FOREIGN KEY (group_id)       REFERENCES pools(group_id) ON DELETE CASCADE,
    FOREIGN KEY (contributor_id) REFERENCES users(id)
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
