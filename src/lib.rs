//! Food catalog REST API: types, foods, comments and favorites behind
//! JWT authentication, with filtering, ordering and page-number pagination.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod pagination;
pub mod payload;
pub mod query;
pub mod routes;
pub mod state;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::catalog::{Comment, Favorite, Food, FoodType};
use crate::state::AppState;

/// The full HTTP surface, ready to serve.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::resource::router::<FoodType>())
        .merge(routes::resource::router::<Food>())
        .merge(routes::resource::router::<Comment>())
        .merge(routes::resource::router::<Favorite>())
        .merge(routes::auth::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
