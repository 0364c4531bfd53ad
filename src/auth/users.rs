use rusqlite::{params, Connection};

use crate::db::models::User;

pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

pub fn find(conn: &Connection, id: i64) -> rusqlite::Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?1", User::COLUMNS);
    optional(conn.query_row(&sql, params![id], User::from_row))
}

pub fn find_by_username(conn: &Connection, username: &str) -> rusqlite::Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE username = ?1", User::COLUMNS);
    optional(conn.query_row(&sql, params![username], User::from_row))
}

pub fn insert(conn: &Connection, user: &NewUser) -> rusqlite::Result<User> {
    conn.execute(
        "INSERT INTO users (username, email, first_name, last_name, password_hash, date_joined)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user.username,
            user.email,
            user.first_name,
            user.last_name,
            user.password_hash,
            crate::db::now()
        ],
    )?;
    let id = conn.last_insert_rowid();
    find(conn, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

/// Letters, digits and `@ . + - _`, at most 150 characters.
pub fn valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.chars().count() <= 150
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

pub fn valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    !local.is_empty()
        && !email.chars().any(char::is_whitespace)
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

fn optional<T>(result: rusqlite::Result<T>) -> rusqlite::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: String::new(),
            first_name: "Ada".into(),
            last_name: String::new(),
            password_hash: "hash".into(),
        }
    }

    #[test]
    fn insert_and_find() {
        let pool = crate::db::test_pool();
        let conn = pool.get().unwrap();
        let user = insert(&conn, &new_user("ada")).unwrap();
        assert!(user.is_active);
        assert_eq!(user.first_name, "Ada");

        let by_name = find_by_username(&conn, "ada").unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
        assert!(find(&conn, user.id + 1).unwrap().is_none());
    }

    #[test]
    fn usernames_are_unique() {
        let pool = crate::db::test_pool();
        let conn = pool.get().unwrap();
        insert(&conn, &new_user("ada")).unwrap();
        assert!(insert(&conn, &new_user("ada")).is_err());
    }

    #[test]
    fn username_and_email_rules() {
        assert!(valid_username("ada.lovelace+1@x_y-z"));
        assert!(!valid_username("ada lovelace"));
        assert!(!valid_username(""));
        assert!(valid_email("ada@example.com"));
        assert!(!valid_email("ada@localhost"));
        assert!(!valid_email("@example.com"));
        assert!(!valid_email("ada example@x.com"));
    }
}
