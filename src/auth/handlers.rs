use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::auth::password;
use crate::auth::revocation::RevocationError;
use crate::auth::tokens::{TokenError, TokenKind, TokenPair};
use crate::auth::users::{self, NewUser};
use crate::db::models::{RevokedToken, User};
use crate::db::{now, timestamp};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::payload::{Fields, Payload};
use crate::state::AppState;

const USERNAME_TAKEN: &str = "A user with that username already exists.";

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

// -- Register --

/// POST /register/ creates an account. The response never carries the hash.
pub async fn register(
    State(state): State<AppState>,
    payload: Payload,
) -> AppResult<(StatusCode, Json<User>)> {
    let mut fields = Fields::new(&payload, false);
    let username = fields.string("username", Some(150), None);
    let email = fields.optional_string("email", 254, None);
    let first_name = fields.optional_string("first_name", 150, None);
    let last_name = fields.optional_string("last_name", 150, None);
    let password = fields.string("password", None, None);
    let password2 = fields.string("password2", None, None);

    if let Some(name) = username.as_deref() {
        if !users::valid_username(name) {
            fields.reject(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        } else if users::find_by_username(&*state.db.get()?, name)?.is_some() {
            fields.reject("username", USERNAME_TAKEN);
        }
    }

    if let Some(address) = email.as_deref() {
        if !address.is_empty() && !users::valid_email(address) {
            fields.reject("email", "Enter a valid email address.");
        }
    }

    if let (Some(first), Some(second)) = (password.as_deref(), password2.as_deref()) {
        if first != second {
            fields.reject("password", "Password fields didn't match.");
        } else {
            for problem in password::validate(first, username.as_deref()) {
                fields.reject("password", problem);
            }
        }
    }

    let (Some(username), Some(email), Some(first_name), Some(last_name), Some(password)) =
        (username, email, first_name, last_name, password)
    else {
        return Err(fields.into_error());
    };
    if !fields.is_clean() {
        return Err(fields.into_error());
    }

    let password_hash = password::hash(password, state.config.auth.bcrypt_cost).await?;
    let conn = state.db.get()?;
    let user = users::insert(
        &conn,
        &NewUser {
            username,
            email,
            first_name,
            last_name,
            password_hash,
        },
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(ref f, _)
            if f.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            AppError::field("username", USERNAME_TAKEN)
        }
        other => AppError::Database(other),
    })?;

    tracing::info!(user_id = user.id, username = %user.username, "Registered user");
    Ok((StatusCode::CREATED, Json(user)))
}

// -- Tokens --

/// POST /token/ exchanges credentials for an access/refresh pair.
pub async fn obtain_token(
    State(state): State<AppState>,
    payload: Payload,
) -> AppResult<Json<TokenPair>> {
    let mut fields = Fields::new(&payload, false);
    let username = fields.string("username", None, None);
    let password = fields.string("password", None, None);
    let (Some(username), Some(password)) = (username, password) else {
        return Err(fields.into_error());
    };

    let user = {
        let conn = state.db.get()?;
        users::find_by_username(&conn, &username)?
    };
    let rejected =
        || AppError::Unauthorized("No active account found with the given credentials".into());

    let Some(user) = user.filter(|u| u.is_active) else {
        return Err(rejected());
    };
    if !password::verify(password, user.password_hash.clone()).await? {
        tracing::warn!(username = %user.username, "Failed login attempt");
        return Err(rejected());
    }

    let pair = state
        .tokens
        .pair(user.id)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    tracing::info!(user_id = user.id, "Issued token pair");
    Ok(Json(pair))
}

/// POST /token/refresh/ trades a live refresh token for a new access token.
pub async fn refresh_token(
    State(state): State<AppState>,
    payload: Payload,
) -> AppResult<Response> {
    let mut fields = Fields::new(&payload, false);
    let Some(refresh) = fields.string("refresh", None, None) else {
        return Err(fields.into_error());
    };

    let claims = state
        .tokens
        .decode(&refresh, TokenKind::Refresh)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    let revoked = state
        .revocations
        .is_revoked(&claims.jti)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if revoked {
        return Err(AppError::Unauthorized(
            RevocationError::AlreadyRevoked.to_string(),
        ));
    }

    let access = state
        .tokens
        .issue(claims.user_id, TokenKind::Access)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(json!({ "access": access })).into_response())
}

// -- Logout --

#[derive(Debug, thiserror::Error)]
pub enum LogoutError {
    #[error("refresh_token is required")]
    MissingToken,

    #[error("{0}")]
    Body(String),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Revocation(#[from] RevocationError),
}

/// POST /logout/ revokes a refresh token.
///
/// Answers 205 with no body on success. Every failure, whatever its cause,
/// becomes a 400 with the failure text under `message`.
pub async fn logout(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Result<Json<LogoutRequest>, JsonRejection>,
) -> Response {
    match revoke(&state, body).await {
        Ok(jti) => {
            tracing::info!(user = %user.username, %jti, "Logged out");
            StatusCode::RESET_CONTENT.into_response()
        }
        Err(e) => {
            tracing::warn!(user = %user.username, "Logout failed: {}", e);
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn revoke(
    state: &AppState,
    body: Result<Json<LogoutRequest>, JsonRejection>,
) -> Result<String, LogoutError> {
    let Json(request) = body.map_err(|rejection| LogoutError::Body(rejection.body_text()))?;
    let token = request
        .refresh_token
        .filter(|t| !t.trim().is_empty())
        .ok_or(LogoutError::MissingToken)?;

    let claims = state.tokens.decode(token.trim(), TokenKind::Refresh)?;
    state
        .revocations
        .revoke(&RevokedToken {
            jti: claims.jti.clone(),
            user_id: claims.user_id,
            expires_at: timestamp(claims.expires_at()),
            revoked_at: now(),
        })
        .await?;

    Ok(claims.jti)
}
