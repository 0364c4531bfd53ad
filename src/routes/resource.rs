//! One generic controller serving every catalog collection.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, MethodRouter};
use axum::{Json, Router};

use crate::catalog::Resource;
use crate::db::repository;
use crate::error::{AppError, AppResult};
use crate::extractors::{AbsoluteUri, CurrentUser};
use crate::pagination::{Page, Paginator};
use crate::payload::{Fields, Payload};
use crate::state::AppState;

/// `/{path}/` and `/{path}/{id}/`, each also served without the trailing slash.
pub fn router<R: Resource>() -> Router<AppState> {
    let collection: MethodRouter<AppState> = get(list::<R>).post(create::<R>);
    let item: MethodRouter<AppState> = get(retrieve::<R>)
        .put(update::<R>)
        .patch(partial_update::<R>)
        .delete(destroy::<R>);

    let base = format!("/{}", R::PATH);
    Router::new()
        .route(&base, collection.clone())
        .route(&format!("{base}/"), collection)
        .route(&format!("{base}/{{id}}"), item.clone())
        .route(&format!("{base}/{{id}}/"), item)
}

/// Ids that do not parse cannot exist.
fn parse_id(raw: &str) -> AppResult<i64> {
    raw.parse().map_err(|_| AppError::NotFound)
}

async fn list<R: Resource>(
    State(state): State<AppState>,
    _user: CurrentUser,
    AbsoluteUri(current): AbsoluteUri,
    Query(query): Query<HashMap<String, String>>,
) -> AppResult<Json<Page<R>>> {
    let plan = R::FILTERS.plan(&query);
    let paginator = Paginator::new(&state.config.pagination);

    let conn = state.db.get()?;
    let count = repository::count::<R>(&conn, &plan)?;
    let window = paginator.window(&query, count)?;
    let results = repository::fetch::<R>(&conn, &plan, window.limit(), window.offset())?;

    Ok(Json(paginator.page(&current, &window, count, results)))
}

async fn retrieve<R: Resource>(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<R>> {
    let id = parse_id(&id)?;
    let conn = state.db.get()?;
    repository::find::<R>(&conn, id)?
        .map(Json)
        .ok_or(AppError::NotFound)
}

async fn create<R: Resource>(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Payload,
) -> AppResult<(StatusCode, Json<R>)> {
    let conn = state.db.get()?;
    let draft = R::draft(&conn, Fields::new(&payload, false), None, &user)?;
    let id = R::insert(&conn, &draft)?;
    tracing::info!(id, user = %user.username, "Created {}", R::NAME);

    let record = repository::find::<R>(&conn, id)?.ok_or(AppError::NotFound)?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn update<R: Resource>(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    payload: Payload,
) -> AppResult<Json<R>> {
    save::<R>(&state, &user, &id, &payload, false).map(Json)
}

async fn partial_update<R: Resource>(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    payload: Payload,
) -> AppResult<Json<R>> {
    save::<R>(&state, &user, &id, &payload, true).map(Json)
}

fn save<R: Resource>(
    state: &AppState,
    user: &CurrentUser,
    id: &str,
    payload: &Payload,
    partial: bool,
) -> AppResult<R> {
    let id = parse_id(id)?;
    let conn = state.db.get()?;
    let current = repository::find::<R>(&conn, id)?.ok_or(AppError::NotFound)?;

    let draft = R::draft(&conn, Fields::new(payload, partial), Some(&current), user)?;
    R::update(&conn, id, &draft)?;
    tracing::info!(id, partial, user = %user.username, "Updated {}", R::NAME);

    repository::find::<R>(&conn, id)?.ok_or(AppError::NotFound)
}

async fn destroy<R: Resource>(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let id = parse_id(&id)?;
    let conn = state.db.get()?;
    if !repository::delete::<R>(&conn, id)? {
        return Err(AppError::NotFound);
    }
    tracing::info!(id, user = %user.username, "Deleted {}", R::NAME);
    Ok(StatusCode::NO_CONTENT)
}
