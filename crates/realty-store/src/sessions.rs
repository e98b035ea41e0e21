//! Bearer sessions. A token is an opaque UUID bound to one user.

use rusqlite::params;
use uuid::Uuid;

use realty_shared::UserId;

use crate::database::{now_ts, ts_to_sql, Database};
use crate::error::{Result, StoreError};
use crate::models::User;

impl Database {
    pub fn create_session(&self, user: UserId) -> Result<String> {
        let token = Uuid::new_v4().to_string();
        self.conn().execute(
            "INSERT INTO sessions (token, user_id, created_at) VALUES (?1, ?2, ?3)",
            params![token, user.0, ts_to_sql(&now_ts())],
        )?;
        tracing::debug!(user_id = %user, "session created");
        Ok(token)
    }

    /// Resolve a token to its user; `NotFound` for unknown tokens.
    pub fn session_user(&self, token: &str) -> Result<User> {
        let user_id: i64 = self
            .conn()
            .query_row(
                "SELECT user_id FROM sessions WHERE token = ?1",
                params![token],
                |row| row.get(0),
            )
            .map_err(StoreError::from_query)?;
        self.get_user(UserId(user_id))
    }

    /// Returns `true` if a session was removed.
    pub fn delete_session(&self, token: &str) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
        Ok(affected > 0)
    }
}
