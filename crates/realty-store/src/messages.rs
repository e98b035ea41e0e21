//! Direct messages between two users.
//!
//! A message is a directed edge `sender -> receiver`. The only mutation after
//! insert is the read flag, which goes from unread to read once. Rows are
//! removed only by the blacklist purge or by [`Database::purge_orphaned_messages`].

use rusqlite::params;

use realty_shared::{MessageId, UserId, ValidationError};

use crate::database::{now_ts, ts_from_sql, ts_to_sql, Database};
use crate::error::{Result, StoreError};
use crate::models::Message;

/// Column list for [`row_to_message`], qualified with the `m` alias.
pub(crate) const MESSAGE_COLUMNS: &str =
    "m.id, m.sender_id, m.receiver_id, m.content, m.is_read, m.created_at";

impl Database {
    /// Store a message from `sender` to `receiver`.
    ///
    /// Fails with a validation error for blank content or a self-addressed
    /// message, `NotFound` for an unknown receiver, and `Blocked` when the
    /// receiver has blacklisted the sender.
    pub fn send_message(&self, sender: UserId, receiver: UserId, content: &str) -> Result<Message> {
        let content = content.trim();

        let mut errors = ValidationError::new();
        if content.is_empty() {
            errors.add("content", "Message cannot be empty");
        }
        if sender == receiver {
            errors.add("receiver", "You cannot send a message to yourself");
        }
        errors.into_result()?;

        if !self.user_exists(receiver)? {
            return Err(StoreError::NotFound);
        }
        if self.is_blocked(receiver, sender)? {
            tracing::info!(sender = %sender, receiver = %receiver, "message refused: sender is blacklisted");
            return Err(StoreError::Blocked);
        }

        let created_at = now_ts();
        self.conn().execute(
            "INSERT INTO messages (sender_id, receiver_id, content, is_read, created_at)
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![sender.0, receiver.0, content, ts_to_sql(&created_at)],
        )?;
        let id = MessageId(self.conn().last_insert_rowid());

        tracing::info!(message_id = %id, sender = %sender, receiver = %receiver, "message sent");

        Ok(Message {
            id,
            sender_id: sender,
            receiver_id: receiver,
            content: content.to_string(),
            is_read: false,
            created_at,
        })
    }

    /// Mark everything `counterparty` sent to `user` as read.
    ///
    /// Returns the number of messages that flipped; repeated calls return 0.
    pub fn mark_read(&self, user: UserId, counterparty: UserId) -> Result<usize> {
        let affected = self.conn().execute(
            "UPDATE messages SET is_read = 1
             WHERE sender_id = ?1 AND receiver_id = ?2 AND is_read = 0",
            params![counterparty.0, user.0],
        )?;
        if affected > 0 {
            tracing::debug!(user = %user, counterparty = %counterparty, count = affected, "messages marked read");
        }
        Ok(affected)
    }

    /// Both directions of the conversation, oldest first. Messages with the
    /// same timestamp keep insertion order.
    pub fn list_between(&self, a: UserId, b: UserId) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MESSAGE_COLUMNS}
             FROM messages m
             WHERE (m.sender_id = ?1 AND m.receiver_id = ?2)
                OR (m.sender_id = ?2 AND m.receiver_id = ?1)
             ORDER BY m.created_at ASC, m.id ASC"
        ))?;

        let rows = stmt.query_map(params![a.0, b.0], |row| row_to_message(row, 0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Delete messages whose sender or receiver no longer exists.
    ///
    /// With foreign keys enforced this only finds rows written by a
    /// connection that had them switched off.
    pub fn purge_orphaned_messages(&self) -> Result<usize> {
        let deleted = self.conn().execute(
            "DELETE FROM messages
             WHERE sender_id NOT IN (SELECT id FROM users)
                OR receiver_id NOT IN (SELECT id FROM users)",
            [],
        )?;
        tracing::info!(deleted, "orphaned messages purged");
        Ok(deleted)
    }
}

/// Read [`MESSAGE_COLUMNS`] starting at column `offset`.
pub(crate) fn row_to_message(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Message> {
    let created: String = row.get(offset + 5)?;
    Ok(Message {
        id: MessageId(row.get(offset)?),
        sender_id: UserId(row.get(offset + 1)?),
        receiver_id: UserId(row.get(offset + 2)?),
        content: row.get(offset + 3)?,
        is_read: row.get(offset + 4)?,
        created_at: ts_from_sql(offset + 5, &created)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{new_user, test_db};

    #[test]
    fn test_send_then_list_between() {
        let (db, _dir) = test_db();
        let alice = db.create_user(&new_user("alice")).unwrap();
        let bob = db.create_user(&new_user("bob")).unwrap();

        let first = db.send_message(alice.id, bob.id, "  hi  ").unwrap();
        assert_eq!(first.content, "hi");
        let second = db.send_message(bob.id, alice.id, "hello").unwrap();

        let thread = db.list_between(alice.id, bob.id).unwrap();
        assert_eq!(thread, vec![first.clone(), second.clone()]);
        assert_eq!(thread.iter().filter(|m| m.id == first.id).count(), 1);

        // Same thread from the other side.
        assert_eq!(db.list_between(bob.id, alice.id).unwrap(), thread);
    }

    #[test]
    fn test_send_rejections() {
        let (db, _dir) = test_db();
        let alice = db.create_user(&new_user("alice")).unwrap();
        let bob = db.create_user(&new_user("bob")).unwrap();

        let Err(StoreError::Validation(errors)) = db.send_message(alice.id, bob.id, " \n ") else {
            panic!("expected validation error");
        };
        assert!(errors.has("content"));

        let Err(StoreError::Validation(errors)) = db.send_message(alice.id, alice.id, "me") else {
            panic!("expected validation error");
        };
        assert!(errors.has("receiver"));

        assert!(matches!(
            db.send_message(alice.id, UserId(404), "anyone?"),
            Err(StoreError::NotFound)
        ));
        assert!(db.list_between(alice.id, bob.id).unwrap().is_empty());
    }

    #[test]
    fn test_mark_read_is_idempotent() {
        let (db, _dir) = test_db();
        let alice = db.create_user(&new_user("alice")).unwrap();
        let bob = db.create_user(&new_user("bob")).unwrap();

        db.send_message(bob.id, alice.id, "one").unwrap();
        db.send_message(bob.id, alice.id, "two").unwrap();
        db.send_message(alice.id, bob.id, "mine").unwrap();

        assert_eq!(db.mark_read(alice.id, bob.id).unwrap(), 2);
        assert_eq!(db.mark_read(alice.id, bob.id).unwrap(), 0);

        let thread = db.list_between(alice.id, bob.id).unwrap();
        // alice's own message is still unread on bob's side
        assert!(thread
            .iter()
            .all(|m| m.is_read == (m.receiver_id == alice.id)));
    }

    #[test]
    fn test_purge_orphaned_messages() {
        let (db, _dir) = test_db();
        let alice = db.create_user(&new_user("alice")).unwrap();
        let bob = db.create_user(&new_user("bob")).unwrap();
        db.send_message(alice.id, bob.id, "kept").unwrap();

        // Simulate rows left behind by a writer without FK enforcement.
        db.conn().pragma_update(None, "foreign_keys", "OFF").unwrap();
        db.conn()
            .execute(
                "INSERT INTO messages (sender_id, receiver_id, content, is_read, created_at)
                 VALUES (?1, 999, 'ghost', 0, '2024-01-01T00:00:00.000000Z')",
                params![alice.id.0],
            )
            .unwrap();
        db.conn().pragma_update(None, "foreign_keys", "ON").unwrap();

        assert_eq!(db.purge_orphaned_messages().unwrap(), 1);
        assert_eq!(db.purge_orphaned_messages().unwrap(), 0);
        assert_eq!(db.list_between(alice.id, bob.id).unwrap().len(), 1);
    }
}
