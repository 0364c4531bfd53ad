// Generic read/delete access for catalog tables
use rusqlite::{params, params_from_iter, Connection, Row};
use serde::Serialize;

use crate::query::{FilterSet, QueryPlan};

/// A row type backed by one table with an integer `id` primary key.
pub trait Record: Serialize + Sized + Send + 'static {
    const TABLE: &'static str;
    /// Column list in the order `from_row` reads them.
    const COLUMNS: &'static str;
    const FILTERS: FilterSet;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

pub fn count<R: Record>(conn: &Connection, plan: &QueryPlan) -> rusqlite::Result<u64> {
    let sql = format!("SELECT COUNT(*) FROM {}{}", R::TABLE, plan.where_clause());
    let count: i64 = conn.query_row(&sql, params_from_iter(plan.params()), |row| row.get(0))?;
    Ok(count.max(0) as u64)
}

pub fn fetch<R: Record>(
    conn: &Connection,
    plan: &QueryPlan,
    limit: u64,
    offset: u64,
) -> rusqlite::Result<Vec<R>> {
    let sql = format!(
        "SELECT {} FROM {}{} ORDER BY {} LIMIT {} OFFSET {}",
        R::COLUMNS,
        R::TABLE,
        plan.where_clause(),
        plan.order_clause(),
        limit,
        offset
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(plan.params()), |row| R::from_row(row))?;
    rows.collect()
}

pub fn find<R: Record>(conn: &Connection, id: i64) -> rusqlite::Result<Option<R>> {
    let sql = format!("SELECT {} FROM {} WHERE id = ?1", R::COLUMNS, R::TABLE);
    match conn.query_row(&sql, params![id], |row| R::from_row(row)) {
        Ok(record) => Ok(Some(record)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Returns false when no row had that id.
pub fn delete<R: Record>(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    let sql = format!("DELETE FROM {} WHERE id = ?1", R::TABLE);
    Ok(conn.execute(&sql, params![id])? > 0)
}

/// Whether `table` has a row with this id. Used to validate foreign keys.
pub fn exists(conn: &Connection, table: &str, id: i64) -> rusqlite::Result<bool> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1)");
    conn.query_row(&sql, params![id], |row| row.get(0))
}
