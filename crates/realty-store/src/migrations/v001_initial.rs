//! v001 -- Initial schema creation.
//!
//! Creates the listing tables: `users`, `properties`, `property_images`
//! and `comments`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT NOT NULL UNIQUE,
    email         TEXT NOT NULL UNIQUE,
    first_name    TEXT NOT NULL,
    last_name     TEXT NOT NULL,
    user_type     TEXT NOT NULL,               -- 'realtor' | 'client'
    phone         TEXT NOT NULL DEFAULT '',
    bio           TEXT NOT NULL DEFAULT '',
    gender        TEXT,                        -- 'M' | 'F' | NULL
    password_hash TEXT NOT NULL,               -- argon2 PHC string
    date_joined   TEXT NOT NULL                -- RFC-3339, microseconds
);

CREATE INDEX IF NOT EXISTS idx_users_user_type ON users(user_type);

-- ----------------------------------------------------------------
-- Properties
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS properties (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    title         TEXT NOT NULL,
    description   TEXT NOT NULL,
    price         INTEGER NOT NULL,            -- minor currency units
    property_type TEXT NOT NULL,
    area          REAL NOT NULL,               -- square metres
    rooms         INTEGER,
    location      TEXT NOT NULL,
    created_by    INTEGER NOT NULL,
    status        TEXT NOT NULL DEFAULT 'active',
    views         INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,

    FOREIGN KEY (created_by) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_properties_status_created
    ON properties(status, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_properties_owner ON properties(created_by);

-- ----------------------------------------------------------------
-- Property images (paths only, bytes live elsewhere)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS property_images (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    property_id INTEGER NOT NULL,
    image_path  TEXT NOT NULL,
    is_main     INTEGER NOT NULL DEFAULT 0,    -- boolean 0/1

    FOREIGN KEY (property_id) REFERENCES properties(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_property_images_property ON property_images(property_id);

-- ----------------------------------------------------------------
-- Comments
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS comments (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    property_id INTEGER NOT NULL,
    author_id   INTEGER NOT NULL,
    text        TEXT NOT NULL,
    created_at  TEXT NOT NULL,

    FOREIGN KEY (property_id) REFERENCES properties(id) ON DELETE CASCADE,
    FOREIGN KEY (author_id)   REFERENCES users(id)      ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_comments_property_ts
    ON comments(property_id, created_at DESC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
