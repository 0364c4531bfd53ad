pub mod models;
pub mod repository;

use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection};
use std::path::Path;

use crate::state::DbPool;

pub const MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_initial",
        include_str!("../../migrations/001_initial.sql"),
    ),
    (
        "002_revoked_tokens",
        include_str!("../../migrations/002_revoked_tokens.sql"),
    ),
];

/// Per-connection settings. Foreign keys are off by default in SQLite and
/// the cascade deletes depend on them, so every pooled connection needs this.
const CONNECTION_PRAGMAS: &str = "
    PRAGMA foreign_keys = ON;
    PRAGMA busy_timeout = 5000;
";

/// SQL function lowercasing text with full Unicode rules. NULL stays NULL.
pub const FOLD: &str = "fold";

fn init_connection(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.execute_batch(CONNECTION_PRAGMAS)?;
    conn.create_scalar_function(
        FOLD,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(ctx.get_raw(0).as_str().ok().map(str::to_lowercase)),
    )
}

pub fn create_pool(db_path: &Path) -> anyhow::Result<DbPool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let manager = SqliteConnectionManager::file(db_path)
        .with_init(init_connection);
    let pool = Pool::builder().max_size(8).build(manager)?;

    let conn = pool.get()?;
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        ",
    )?;

    Ok(pool)
}

pub fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    let conn = pool.get()?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    for (name, sql) in MIGRATIONS {
        let already_applied: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM schema_version WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;

        if !already_applied {
            tracing::info!("Applying migration: {}", name);
            conn.execute_batch(sql)?;
            conn.execute(
                "INSERT INTO schema_version (name) VALUES (?1)",
                params![name],
            )?;
        }
    }

    tracing::info!("Database migrations complete");
    Ok(())
}

/// Fixed-width UTC timestamp. Lexical order of the stored text matches
/// chronological order, which the `created_at` orderings rely on.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

pub fn now() -> String {
    timestamp(Utc::now())
}

#[cfg(test)]
pub(crate) fn test_pool() -> DbPool {
    let manager = SqliteConnectionManager::memory()
        .with_init(init_connection);
    let pool = Pool::builder().max_size(1).build(manager).unwrap();
    run_migrations(&pool).unwrap();
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_pool_creates_db_file() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("sub/dir/test.db");
        let pool = create_pool(&db_path).unwrap();
        assert!(db_path.exists());
        let conn = pool.get().unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "wal");
    }

    #[test]
    fn every_pooled_connection_enforces_foreign_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let pool = create_pool(&tmp.path().join("fk.db")).unwrap();
        let first = pool.get().unwrap();
        let second = pool.get().unwrap();
        for conn in [&first, &second] {
            let enabled: bool = conn
                .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
                .unwrap();
            assert!(enabled);
        }
    }

    #[test]
    fn migrations_create_expected_tables() {
        let pool = test_pool();
        let conn = pool.get().unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, MIGRATIONS.len() as i64);

        let tables: Vec<String> = {
            let mut stmt = conn
                .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
                .unwrap();
            stmt.query_map([], |row| row.get(0))
                .unwrap()
                .filter_map(|r| r.ok())
                .collect()
        };
        for table in ["users", "types", "foods", "comments", "favorites", "revoked_tokens"] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
    }

    #[test]
    fn fold_lowercases_beyond_ascii() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let folded: String = conn
            .query_row("SELECT fold('БОРЩ Ёлка ABC')", [], |row| row.get(0))
            .unwrap();
        assert_eq!(folded, "борщ ёлка abc");

        let matched: bool = conn
            .query_row("SELECT fold('Свёкла') LIKE fold('%СВЁК%')", [], |row| row.get(0))
            .unwrap();
        assert!(matched);

        let null: Option<String> = conn
            .query_row("SELECT fold(NULL)", [], |row| row.get(0))
            .unwrap();
        assert!(null.is_none());
    }

    #[test]
    fn migrations_are_idempotent() {
        let pool = test_pool();
        run_migrations(&pool).unwrap();

        let conn = pool.get().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, MIGRATIONS.len() as i64);
    }

    #[test]
    fn foreign_keys_enforced() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let result = conn.execute(
            "INSERT INTO foods (type_id, title, ingredient, price_cents, created_at, updated_at)
             VALUES (?1, 'Soup', 'water', 100, ?2, ?2)",
            params![999, now()],
        );
        assert!(result.is_err());
    }

    #[test]
    fn deleting_a_type_cascades_to_foods_comments_and_favorites() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let ts = now();
        conn.execute_batch(&format!(
            "INSERT INTO users (id, username, password_hash, date_joined) VALUES (1, 'alice', 'x', '{ts}');
             INSERT INTO types (id, title) VALUES (1, 'Soups');
             INSERT INTO foods (id, type_id, title, ingredient, price_cents, created_at, updated_at)
                 VALUES (1, 1, 'Borscht', 'beet', 1250, '{ts}', '{ts}');
             INSERT INTO comments (author_id, food_id, text, created_at) VALUES (1, 1, 'tasty', '{ts}');
             INSERT INTO favorites (user_id, food_id, created_at) VALUES (1, 1, '{ts}');"
        ))
        .unwrap();

        conn.execute("DELETE FROM types WHERE id = 1", []).unwrap();

        for table in ["foods", "comments", "favorites"] {
            let remaining: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
                .unwrap();
            assert_eq!(remaining, 0, "{table} should be empty");
        }
    }

    #[test]
    fn timestamps_sort_lexically() {
        let earlier = "2024-01-02T03:04:05Z".parse::<DateTime<Utc>>().unwrap();
        let later = "2024-01-02T03:04:05.5Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(timestamp(earlier), "2024-01-02T03:04:05.000000Z");
        assert!(timestamp(earlier) < timestamp(later));
    }
}
