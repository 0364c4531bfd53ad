use axum::extract::{FromRequestParts, OriginalUri};
use axum::http::header;
use axum::http::request::Parts;
use url::Url;

use crate::auth::tokens::TokenKind;
use crate::auth::users;
use crate::error::AppError;
use crate::state::AppState;

/// The user behind a valid bearer access token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
}

/// Extractor that requires authentication.
/// Returns 401 unless an `Authorization: Bearer <access token>` header
/// names an active user.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(parts).ok_or_else(|| {
            AppError::Unauthorized("Authentication credentials were not provided.".into())
        })?;

        let claims = state
            .tokens
            .decode(token, TokenKind::Access)
            .map_err(|_| AppError::Unauthorized("Given token not valid for any token type".into()))?;

        let conn = state.db.get()?;
        let user = users::find(&conn, claims.user_id)?
            .filter(|user| user.is_active)
            .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

        Ok(CurrentUser {
            id: user.id,
            username: user.username,
        })
    }
}

/// Absolute URI of the request as the client addressed it.
pub struct AbsoluteUri(pub Url);

impl FromRequestParts<AppState> for AbsoluteUri {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let scheme = parts
            .headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("http");

        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}:{}", state.config.server.host, state.config.server.port));

        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map(|original| original.0.clone())
            .unwrap_or_else(|| parts.uri.clone());
        let path_and_query = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");

        Url::parse(&format!("{scheme}://{host}{path_and_query}"))
            .map(AbsoluteUri)
            .map_err(|e| AppError::BadRequest(format!("Invalid request URI: {e}")))
    }
}

fn extract_bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        Some(token.trim()).filter(|t| !t.is_empty())
    } else {
        None
    }
}
