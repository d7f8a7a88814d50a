//! User endpoints

use axum::extract::{OriginalUri, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;

use super::extract::{Json, Path, Query};
use super::{ApiError, ApiResult, AppState, Page, PageQuery};
use crate::db::{
    create_user, delete_user, get_user_by_id, list_users, toggle_user_active, update_user,
    NewUser, PageRequest, UserChanges, UserFilter,
};
use crate::models::User;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list).post(create))
        .route(
            "/api/users/{id}",
            get(retrieve).put(update).patch(update).delete(destroy),
        )
        .route("/api/users/{id}/toggle_active", post(toggle_active))
}

#[derive(Debug, Serialize)]
pub struct ToggleActiveResponse {
    pub status: &'static str,
    pub is_active: bool,
}

async fn list(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(page): Query<PageQuery>,
    Query(filter): Query<UserFilter>,
) -> ApiResult<Json<Page<User>>> {
    let request = PageRequest::from(page);
    let users = list_users(&state.pool, &filter, request).await?;
    Ok(Json(Page::new(users, request, &uri)))
}

async fn create(
    State(state): State<AppState>,
    Json(new_user): Json<NewUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    if new_user.first_name.trim().is_empty() {
        return Err(ApiError::BadRequest("first_name must not be blank".to_string()));
    }
    let user = create_user(&state.pool, &new_user).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn retrieve(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<User>> {
    get_user_by_id(&state.pool, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("user"))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(changes): Json<UserChanges>,
) -> ApiResult<Json<User>> {
    if changes
        .first_name
        .as_deref()
        .is_some_and(|name| name.trim().is_empty())
    {
        return Err(ApiError::BadRequest("first_name must not be blank".to_string()));
    }
    update_user(&state.pool, id, &changes)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("user"))
}

async fn destroy(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    if delete_user(&state.pool, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("user"))
    }
}

async fn toggle_active(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ToggleActiveResponse>> {
    let user = toggle_user_active(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("user"))?;

    Ok(Json(ToggleActiveResponse {
        status: "success",
        is_active: user.is_active,
    }))
}
