use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::catalog::Resource;
use crate::db::repository::Record;
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::payload::Fields;
use crate::query::FilterSet;

/// A food category such as "Soups" or "Desserts".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodType {
    pub id: i64,
    pub title: String,
}

pub struct TypeDraft {
    pub title: String,
}

impl Record for FoodType {
    const TABLE: &'static str = "types";
    const COLUMNS: &'static str = "id, title";
    const FILTERS: FilterSet = FilterSet {
        exact: &[],
        search: &["title"],
        ordering: &[("id", "id"), ("pk", "id"), ("title", "title")],
        default_order: "id ASC",
    };

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
        })
    }
}

impl Resource for FoodType {
    const PATH: &'static str = "types";
    const NAME: &'static str = "type";
    type Draft = TypeDraft;

    fn draft(
        _conn: &Connection,
        mut fields: Fields<'_>,
        current: Option<&Self>,
        _user: &CurrentUser,
    ) -> AppResult<TypeDraft> {
        let title = fields.string("title", Some(100), current.map(|t| t.title.as_str()));
        match title {
            Some(title) if fields.is_clean() => Ok(TypeDraft { title }),
            _ => Err(fields.into_error()),
        }
    }

    fn insert(conn: &Connection, draft: &TypeDraft) -> AppResult<i64> {
        conn.execute("INSERT INTO types (title) VALUES (?1)", params![draft.title])?;
        Ok(conn.last_insert_rowid())
    }

    fn update(conn: &Connection, id: i64, draft: &TypeDraft) -> AppResult<()> {
        conn.execute(
            "UPDATE types SET title = ?1 WHERE id = ?2",
            params![draft.title, id],
        )?;
        Ok(())
    }
}
