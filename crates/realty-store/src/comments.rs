use rusqlite::params;

use realty_shared::validation;
use realty_shared::{CommentId, PropertyId, UserId, ValidationError};

use crate::database::{now_ts, ts_from_sql, ts_to_sql, Database};
use crate::error::{Result, StoreError};
use crate::models::{Comment, UserSummary};
use crate::users::{summary_from_row, SUMMARY_COLUMNS};

impl Database {
    pub fn add_comment(&self, author: UserId, property: PropertyId, text: &str) -> Result<Comment> {
        let mut errors = ValidationError::new();
        let text = validation::required_text("text", text, None, &mut errors);
        errors.into_result()?;

        // Surface a missing listing as NotFound rather than an FK failure.
        self.get_property(property)?;

        let created_at = now_ts();
        self.conn().execute(
            "INSERT INTO comments (property_id, author_id, text, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![property.0, author.0, text, ts_to_sql(&created_at)],
        )?;
        let id = CommentId(self.conn().last_insert_rowid());

        tracing::info!(comment_id = %id, property_id = %property, author = %author, "comment added");

        Ok(Comment {
            id,
            property_id: property,
            author: UserSummary::from(&self.get_user(author)?),
            text,
            created_at,
        })
    }

    /// Newest first.
    pub fn comments_for_property(&self, property: PropertyId) -> Result<Vec<Comment>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT c.id, c.property_id, c.text, c.created_at, {SUMMARY_COLUMNS}
             FROM comments c
             JOIN users u ON u.id = c.author_id
             WHERE c.property_id = ?1
             ORDER BY c.created_at DESC, c.id DESC"
        ))?;

        let rows = stmt.query_map(params![property.0], |row| {
            let created: String = row.get(3)?;
            Ok(Comment {
                id: CommentId(row.get(0)?),
                property_id: PropertyId(row.get(1)?),
                text: row.get(2)?,
                created_at: ts_from_sql(3, &created)?,
                author: summary_from_row(row, 4)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }
}
