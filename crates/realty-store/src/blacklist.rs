//! Blacklist: `user` blocks `blocked_user`.
//!
//! Blocking also deletes what the blocked user already sent to the blocker.
//! The purge is one-directional; messages the blocker sent are kept.

use rusqlite::params;

use realty_shared::{UserId, ValidationError};

use crate::database::{now_ts, ts_from_sql, ts_to_sql, Database};
use crate::error::{Result, StoreError};
use crate::models::{BlacklistEntry, BlockOutcome};

const ENTRY_COLUMNS: &str = "id, user_id, blocked_user_id, created_at";

impl Database {
    /// Block `target` on behalf of `user` and purge `target -> user` messages.
    ///
    /// Entry and purge commit together or not at all. Blocking someone twice
    /// returns the existing entry.
    pub fn block_user(&self, user: UserId, target: UserId) -> Result<BlockOutcome> {
        if user == target {
            return Err(ValidationError::single("blocked_user", "You cannot block yourself").into());
        }
        if !self.user_exists(target)? {
            return Err(StoreError::NotFound);
        }

        let tx = self.conn().unchecked_transaction()?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO blacklist (user_id, blocked_user_id, created_at)
             VALUES (?1, ?2, ?3)",
            params![user.0, target.0, ts_to_sql(&now_ts())],
        )?;
        let entry = tx.query_row(
            &format!(
                "SELECT {ENTRY_COLUMNS} FROM blacklist WHERE user_id = ?1 AND blocked_user_id = ?2"
            ),
            params![user.0, target.0],
            row_to_entry,
        )?;
        let purged = tx.execute(
            "DELETE FROM messages WHERE sender_id = ?1 AND receiver_id = ?2",
            params![target.0, user.0],
        )?;
        tx.commit()?;

        tracing::info!(
            user = %user,
            blocked = %target,
            created = inserted > 0,
            purged,
            "user blacklisted"
        );

        Ok(BlockOutcome {
            entry,
            created: inserted > 0,
            purged,
        })
    }

    /// Whether `user` has blocked `target`.
    pub fn is_blocked(&self, user: UserId, target: UserId) -> Result<bool> {
        let blocked = self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM blacklist WHERE user_id = ?1 AND blocked_user_id = ?2)",
            params![user.0, target.0],
            |row| row.get(0),
        )?;
        Ok(blocked)
    }

    /// Entries created by `user`, newest first.
    pub fn list_blocked(&self, user: UserId) -> Result<Vec<BlacklistEntry>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM blacklist
             WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC"
        ))?;
        let rows = stmt.query_map(params![user.0], row_to_entry)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<BlacklistEntry> {
    let created: String = row.get(3)?;
    Ok(BlacklistEntry {
        id: row.get(0)?,
        user_id: UserId(row.get(1)?),
        blocked_user_id: UserId(row.get(2)?),
        created_at: ts_from_sql(3, &created)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{new_user, test_db};

    #[test]
    fn test_block_purges_one_direction() {
        let (db, _dir) = test_db();
        let a = db.create_user(&new_user("alice")).unwrap();
        let b = db.create_user(&new_user("bob")).unwrap();

        db.send_message(b.id, a.id, "x").unwrap();
        db.send_message(a.id, b.id, "y").unwrap();

        let outcome = db.block_user(a.id, b.id).unwrap();
        assert!(outcome.created);
        assert_eq!(outcome.purged, 1);
        assert_eq!(outcome.entry.user_id, a.id);
        assert_eq!(outcome.entry.blocked_user_id, b.id);

        let thread = db.list_between(a.id, b.id).unwrap();
        let contents: Vec<_> = thread.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["y"]);

        assert!(db.is_blocked(a.id, b.id).unwrap());
        assert!(!db.is_blocked(b.id, a.id).unwrap());
    }

    #[test]
    fn test_duplicate_block_is_noop() {
        let (db, _dir) = test_db();
        let a = db.create_user(&new_user("alice")).unwrap();
        let b = db.create_user(&new_user("bob")).unwrap();

        let first = db.block_user(a.id, b.id).unwrap();
        let second = db.block_user(a.id, b.id).unwrap();

        assert!(!second.created);
        assert_eq!(second.entry, first.entry);
        assert_eq!(db.list_blocked(a.id).unwrap(), vec![first.entry]);
    }

    #[test]
    fn test_blocked_sender_cannot_send() {
        let (db, _dir) = test_db();
        let a = db.create_user(&new_user("alice")).unwrap();
        let b = db.create_user(&new_user("bob")).unwrap();
        db.block_user(a.id, b.id).unwrap();

        assert!(matches!(
            db.send_message(b.id, a.id, "let me explain"),
            Err(StoreError::Blocked)
        ));
        // The blocker may still write.
        db.send_message(a.id, b.id, "no").unwrap();
        assert_eq!(db.list_between(a.id, b.id).unwrap().len(), 1);
    }

    #[test]
    fn test_block_rejections() {
        let (db, _dir) = test_db();
        let a = db.create_user(&new_user("alice")).unwrap();

        assert!(matches!(
            db.block_user(a.id, a.id),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            db.block_user(a.id, UserId(777)),
            Err(StoreError::NotFound)
        ));
        assert!(db.list_blocked(a.id).unwrap().is_empty());
    }

    #[test]
    fn test_failed_purge_rolls_back_entry() {
        let (db, _dir) = test_db();
        let a = db.create_user(&new_user("alice")).unwrap();
        let b = db.create_user(&new_user("bob")).unwrap();
        db.send_message(b.id, a.id, "x").unwrap();

        db.conn()
            .execute_batch(
                "CREATE TRIGGER fail_purge BEFORE DELETE ON messages
                 BEGIN SELECT RAISE(ABORT, 'purge failed'); END;",
            )
            .unwrap();

        assert!(db.block_user(a.id, b.id).is_err());
        assert!(!db.is_blocked(a.id, b.id).unwrap());
        assert_eq!(db.list_between(a.id, b.id).unwrap().len(), 1);
    }
}
