//! User REST handlers

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use validator::Validate;

use crate::domain::User;
use crate::interfaces::http::error::ApiError;
use crate::interfaces::http::router::ApiState;

use super::dto::{CreateUserRequest, UserDto};

pub async fn list_users(State(state): State<ApiState>) -> Result<Json<Vec<UserDto>>, ApiError> {
    let users = state.repos.users().find_all().await?;
    Ok(Json(users.iter().map(UserDto::from).collect()))
}

pub async fn create_user(
    State(state): State<ApiState>,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserDto>), ApiError> {
    body.validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let mut user = User::new(body.username, body.id_token);
    user.token_expiry = body.token_expiry;

    state.repos.users().insert(user.clone()).await?;
    Ok((StatusCode::CREATED, Json(UserDto::from(&user))))
}
