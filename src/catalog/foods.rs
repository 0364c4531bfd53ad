use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::{check_reference, Resource};
use crate::db::repository::Record;
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::payload::Fields;
use crate::query::FilterSet;

const PRICE_DIGITS: u32 = 6;
const PRICE_PLACES: u32 = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Food {
    pub id: i64,
    pub type_id: i64,
    pub title: String,
    pub ingredient: String,
    pub price: Decimal,
    pub created_at: String,
    pub updated_at: String,
}

pub struct FoodDraft {
    pub type_id: i64,
    pub title: String,
    pub ingredient: String,
    pub price_cents: i64,
}

impl Record for Food {
    const TABLE: &'static str = "foods";
    const COLUMNS: &'static str =
        "id, type_id, title, ingredient, price_cents, created_at, updated_at";
    const FILTERS: FilterSet = FilterSet {
        exact: &["type_id"],
        search: &["title", "ingredient"],
        ordering: &[
            ("id", "id"),
            ("pk", "id"),
            ("type_id", "type_id"),
            ("title", "title"),
            ("ingredient", "ingredient"),
            ("price", "price_cents"),
            ("created_at", "created_at"),
            ("updated_at", "updated_at"),
        ],
        default_order: "created_at DESC, id DESC",
    };

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            type_id: row.get(1)?,
            title: row.get(2)?,
            ingredient: row.get(3)?,
            price: Decimal::new(row.get(4)?, PRICE_PLACES),
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

/// Price stored as an integer number of cents.
fn to_cents(price: Decimal) -> i64 {
    let mut scaled = price;
    scaled.rescale(PRICE_PLACES);
    scaled.mantissa() as i64
}

impl Resource for Food {
    const PATH: &'static str = "foods";
    const NAME: &'static str = "food";
    type Draft = FoodDraft;

    fn draft(
        conn: &Connection,
        mut fields: Fields<'_>,
        current: Option<&Self>,
        _user: &CurrentUser,
    ) -> AppResult<FoodDraft> {
        let type_id = fields.id("type_id", current.map(|f| f.type_id));
        check_reference(conn, &mut fields, "type_id", "types", type_id)?;
        let title = fields.string("title", Some(255), current.map(|f| f.title.as_str()));
        let ingredient = fields.string("ingredient", None, current.map(|f| f.ingredient.as_str()));
        let price = fields.decimal("price", PRICE_DIGITS, PRICE_PLACES, current.map(|f| f.price));

        match (type_id, title, ingredient, price) {
            (Some(type_id), Some(title), Some(ingredient), Some(price)) if fields.is_clean() => {
                Ok(FoodDraft {
                    type_id,
                    title,
                    ingredient,
                    price_cents: to_cents(price),
                })
            }
            _ => Err(fields.into_error()),
        }
    }

    fn insert(conn: &Connection, draft: &FoodDraft) -> AppResult<i64> {
        conn.execute(
            "INSERT INTO foods (type_id, title, ingredient, price_cents, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                draft.type_id,
                draft.title,
                draft.ingredient,
                draft.price_cents,
                crate::db::now()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update(conn: &Connection, id: i64, draft: &FoodDraft) -> AppResult<()> {
        conn.execute(
            "UPDATE foods
             SET type_id = ?1, title = ?2, ingredient = ?3, price_cents = ?4, updated_at = ?5
             WHERE id = ?6",
            params![
                draft.type_id,
                draft.title,
                draft.ingredient,
                draft.price_cents,
                crate::db::now(),
                id
            ],
        )?;
        Ok(())
    }
}
