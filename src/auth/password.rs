use crate::error::AppError;

const MIN_LENGTH: usize = 8;

const COMMON_PASSWORDS: &[&str] = &[
    "123456", "12345678", "123456789", "1234567890", "password", "password1", "password123",
    "qwerty", "qwerty123", "qwertyuiop", "abc123", "abcd1234", "111111", "000000", "iloveyou",
    "letmein", "welcome", "welcome1", "admin", "admin123", "monkey", "dragon", "football",
    "baseball", "sunshine", "princess", "master", "superman", "trustno1", "passw0rd",
    "1q2w3e4r", "zaq12wsx", "starwars", "whatever", "shadow", "michael", "computer",
];

/// Problems with a proposed password, in the order they are checked.
pub fn validate(password: &str, username: Option<&str>) -> Vec<String> {
    let mut problems = Vec::new();

    if let Some(username) = username.filter(|u| u.len() >= 3) {
        let lowered = password.to_lowercase();
        let user = username.to_lowercase();
        if lowered.contains(&user) || user.contains(&lowered) {
            problems.push("The password is too similar to the username.".to_string());
        }
    }

    if password.chars().count() < MIN_LENGTH {
        problems.push(format!(
            "This password is too short. It must contain at least {MIN_LENGTH} characters."
        ));
    }

    if COMMON_PASSWORDS.contains(&password.to_lowercase().as_str()) {
        problems.push("This password is too common.".to_string());
    }

    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".to_string());
    }

    problems
}

/// Runs on the blocking pool.
pub async fn hash(password: String, cost: u32) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("Hashing task failed: {e}")))?
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {e}")))
}

pub async fn verify(password: String, hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("Hashing task failed: {e}")))?
        .or(Ok(false))
}
