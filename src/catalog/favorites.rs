use rusqlite::{params, Connection, ErrorCode, Row};
use serde::{Deserialize, Serialize};

use crate::catalog::{check_reference, Resource};
use crate::db::repository::Record;
use crate::error::{AppError, AppResult, NON_FIELD_ERRORS};
use crate::extractors::CurrentUser;
use crate::payload::Fields;
use crate::query::FilterSet;

const DUPLICATE: &str = "The fields user_id, food_id must make a unique set.";

/// A food a user has saved. Each (user, food) pair appears at most once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favorite {
    pub id: i64,
    pub user_id: i64,
    pub food_id: i64,
    pub created_at: String,
}

pub struct FavoriteDraft {
    pub user_id: i64,
    pub food_id: i64,
}

impl Record for Favorite {
    const TABLE: &'static str = "favorites";
    const COLUMNS: &'static str = "id, user_id, food_id, created_at";
    const FILTERS: FilterSet = FilterSet {
        exact: &["user_id", "food_id"],
        search: &[],
        ordering: &[
            ("id", "id"),
            ("pk", "id"),
            ("user_id", "user_id"),
            ("food_id", "food_id"),
            ("created_at", "created_at"),
        ],
        default_order: "id ASC",
    };

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            food_id: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

fn pair_taken(conn: &Connection, user_id: i64, food_id: i64, except: Option<i64>) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM favorites WHERE user_id = ?1 AND food_id = ?2 AND id != ?3)",
        params![user_id, food_id, except.unwrap_or(0)],
        |row| row.get(0),
    )
}

/// The UNIQUE constraint catches a concurrent insert that slipped past the pre-check.
fn duplicate_as_validation(err: rusqlite::Error) -> AppError {
    match err {
        rusqlite::Error::SqliteFailure(ref e, _) if e.code == ErrorCode::ConstraintViolation => {
            AppError::field(NON_FIELD_ERRORS, DUPLICATE)
        }
        other => AppError::Database(other),
    }
}

impl Resource for Favorite {
    const PATH: &'static str = "favorites";
    const NAME: &'static str = "favorite";
    type Draft = FavoriteDraft;

    fn draft(
        conn: &Connection,
        mut fields: Fields<'_>,
        current: Option<&Self>,
        user: &CurrentUser,
    ) -> AppResult<FavoriteDraft> {
        let user_id = fields.id_or("user_id", current.map_or(user.id, |f| f.user_id));
        check_reference(conn, &mut fields, "user_id", "users", user_id)?;
        let food_id = fields.id("food_id", current.map(|f| f.food_id));
        check_reference(conn, &mut fields, "food_id", "foods", food_id)?;

        let (Some(user_id), Some(food_id)) = (user_id, food_id) else {
            return Err(fields.into_error());
        };
        if !fields.is_clean() {
            return Err(fields.into_error());
        }
        if pair_taken(conn, user_id, food_id, current.map(|f| f.id))? {
            fields.reject(NON_FIELD_ERRORS, DUPLICATE);
            return Err(fields.into_error());
        }
        Ok(FavoriteDraft { user_id, food_id })
    }

    fn insert(conn: &Connection, draft: &FavoriteDraft) -> AppResult<i64> {
        conn.execute(
            "INSERT INTO favorites (user_id, food_id, created_at) VALUES (?1, ?2, ?3)",
            params![draft.user_id, draft.food_id, crate::db::now()],
        )
        .map_err(duplicate_as_validation)?;
        Ok(conn.last_insert_rowid())
    }

    fn update(conn: &Connection, id: i64, draft: &FavoriteDraft) -> AppResult<()> {
        conn.execute(
            "UPDATE favorites SET user_id = ?1, food_id = ?2 WHERE id = ?3",
            params![draft.user_id, draft.food_id, id],
        )
        .map_err(duplicate_as_validation)?;
        Ok(())
    }
}
