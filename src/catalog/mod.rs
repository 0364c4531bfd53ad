pub mod comments;
pub mod favorites;
pub mod foods;
pub mod types;

use rusqlite::Connection;

pub use comments::Comment;
pub use favorites::Favorite;
pub use foods::Food;
pub use types::FoodType;

use crate::db::repository::{self, Record};
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::payload::Fields;

/// A catalog entity exposed as a REST collection.
pub trait Resource: Record + Sync {
    /// Collection path segment, e.g. `foods`.
    const PATH: &'static str;
    /// Singular name used in logs.
    const NAME: &'static str;

    /// Validated values for an insert or update.
    type Draft: Send;

    /// Validate a payload. `current` is the stored row on PUT/PATCH.
    fn draft(
        conn: &Connection,
        fields: Fields<'_>,
        current: Option<&Self>,
        user: &CurrentUser,
    ) -> AppResult<Self::Draft>;

    fn insert(conn: &Connection, draft: &Self::Draft) -> AppResult<i64>;

    fn update(conn: &Connection, id: i64, draft: &Self::Draft) -> AppResult<()>;
}

/// Record an error unless `id` names an existing row of `table`.
pub(crate) fn check_reference(
    conn: &Connection,
    fields: &mut Fields<'_>,
    name: &str,
    table: &str,
    id: Option<i64>,
) -> AppResult<()> {
    if let Some(id) = id {
        if !repository::exists(conn, table, id)? {
            fields.reject(name, format!("Invalid pk \"{id}\" - object does not exist."));
        }
    }
    Ok(())
}
