use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::catalog::{check_reference, Resource};
use crate::db::repository::Record;
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::payload::Fields;
use crate::query::FilterSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub author_id: i64,
    pub food_id: i64,
    pub text: String,
    pub created_at: String,
}

pub struct CommentDraft {
    pub author_id: i64,
    pub food_id: i64,
    pub text: String,
}

impl Record for Comment {
    const TABLE: &'static str = "comments";
    const COLUMNS: &'static str = "id, author_id, food_id, text, created_at";
    const FILTERS: FilterSet = FilterSet {
        exact: &["author_id", "food_id"],
        search: &["text"],
        ordering: &[
            ("id", "id"),
            ("pk", "id"),
            ("author_id", "author_id"),
            ("food_id", "food_id"),
            ("text", "text"),
            ("created_at", "created_at"),
        ],
        default_order: "id ASC",
    };

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            author_id: row.get(1)?,
            food_id: row.get(2)?,
            text: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

impl Resource for Comment {
    const PATH: &'static str = "comments";
    const NAME: &'static str = "comment";
    type Draft = CommentDraft;

    /// The author defaults to the requesting user on create and to the
    /// stored author on update.
    fn draft(
        conn: &Connection,
        mut fields: Fields<'_>,
        current: Option<&Self>,
        user: &CurrentUser,
    ) -> AppResult<CommentDraft> {
        let author_id = fields.id_or("author_id", current.map_or(user.id, |c| c.author_id));
        check_reference(conn, &mut fields, "author_id", "users", author_id)?;
        let food_id = fields.id("food_id", current.map(|c| c.food_id));
        check_reference(conn, &mut fields, "food_id", "foods", food_id)?;
        let text = fields.string("text", None, current.map(|c| c.text.as_str()));

        match (author_id, food_id, text) {
            (Some(author_id), Some(food_id), Some(text)) if fields.is_clean() => Ok(CommentDraft {
                author_id,
                food_id,
                text,
            }),
            _ => Err(fields.into_error()),
        }
    }

    fn insert(conn: &Connection, draft: &CommentDraft) -> AppResult<i64> {
        conn.execute(
            "INSERT INTO comments (author_id, food_id, text, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![draft.author_id, draft.food_id, draft.text, crate::db::now()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update(conn: &Connection, id: i64, draft: &CommentDraft) -> AppResult<()> {
        conn.execute(
            "UPDATE comments SET author_id = ?1, food_id = ?2, text = ?3 WHERE id = ?4",
            params![draft.author_id, draft.food_id, draft.text, id],
        )?;
        Ok(())
    }
}
