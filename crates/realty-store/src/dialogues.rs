//! Dialogue listing: one row per conversation partner.
//!
//! Dialogues are not stored. Each call groups the user's messages by
//! counterparty in a single statement, picking the newest message of each
//! group and counting what the counterparty sent that is still unread.

use rusqlite::params;

use realty_shared::UserId;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::messages::{row_to_message, MESSAGE_COLUMNS};
use crate::models::Dialogue;
use crate::users::{summary_from_row, SUMMARY_COLUMNS};

impl Database {
    /// Conversations of `user`, most recently active first.
    ///
    /// Self-addressed rows are ignored, so `user` never appears as its own
    /// counterparty.
    pub fn list_dialogues(&self, user: UserId) -> Result<Vec<Dialogue>> {
        let mut stmt = self.conn().prepare(&format!(
            "WITH mine AS (
                 SELECT id, created_at, receiver_id, is_read,
                        CASE WHEN sender_id = ?1 THEN receiver_id ELSE sender_id END AS counterparty
                 FROM messages
                 WHERE (sender_id = ?1 OR receiver_id = ?1) AND sender_id <> receiver_id
             ),
             grouped AS (
                 SELECT id, counterparty,
                        ROW_NUMBER() OVER (
                            PARTITION BY counterparty ORDER BY created_at DESC, id DESC
                        ) AS rn,
                        SUM(CASE WHEN receiver_id = ?1 AND is_read = 0 THEN 1 ELSE 0 END) OVER (
                            PARTITION BY counterparty
                        ) AS unread
                 FROM mine
             )
             SELECT {MESSAGE_COLUMNS}, g.unread, {SUMMARY_COLUMNS}
             FROM grouped g
             JOIN messages m ON m.id = g.id
             JOIN users u ON u.id = g.counterparty
             WHERE g.rn = 1
             ORDER BY m.created_at DESC, m.id DESC"
        ))?;

        let rows = stmt.query_map(params![user.0], |row| {
            let unread: i64 = row.get(6)?;
            Ok(Dialogue {
                last_message: row_to_message(row, 0)?,
                unread_count: unread as u64,
                counterparty: summary_from_row(row, 7)?,
            })
        })?;
        let dialogues = rows
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)?;

        tracing::debug!(user = %user, count = dialogues.len(), "dialogues listed");
        Ok(dialogues)
    }

    /// Unread messages addressed to `user` across all dialogues.
    pub fn unread_total(&self, user: UserId) -> Result<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM messages
             WHERE receiver_id = ?1 AND is_read = 0 AND sender_id <> receiver_id",
            params![user.0],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
