use axum::routing::post;
use axum::Router;

use crate::auth::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/register/", post(handlers::register))
        .route("/token", post(handlers::obtain_token))
        .route("/token/", post(handlers::obtain_token))
        .route("/token/refresh", post(handlers::refresh_token))
        .route("/token/refresh/", post(handlers::refresh_token))
        .route("/logout", post(handlers::logout))
        .route("/logout/", post(handlers::logout))
}
