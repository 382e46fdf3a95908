//! User endpoints
//!
//! Mounted under `/v1/public`:
//! - `GET    /user`      list
//! - `POST   /user`      create
//! - `GET    /user/{id}` get
//! - `PUT    /user/{id}` partial update
//! - `DELETE /user/{id}` delete

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::http::error::ApiError;
use crate::http::extractors::{UserId, ValidJson};
use crate::models::{EmailAddress, NewUser, PersonName, User, UserChanges, UserList, ValidationError};
use crate::state::AppState;

/// Create user request
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl CreateUserRequest {
    pub fn validate(&self) -> Result<NewUser, ValidationError> {
        NewUser::new(&self.first_name, &self.last_name, &self.email)
    }
}

/// Update user request.
///
/// Outer `None`: field absent, leave unchanged. `Some(None)`: explicit
/// null, rejected since no user field is nullable.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default, deserialize_with = "present")]
    pub first_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub last_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub email: Option<Option<String>>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> Result<UserChanges, ValidationError> {
        Ok(UserChanges {
            first_name: provided(&self.first_name, "first_name", |s| {
                PersonName::new("first_name", s)
            })?,
            last_name: provided(&self.last_name, "last_name", |s| {
                PersonName::new("last_name", s)
            })?,
            email: provided(&self.email, "email", EmailAddress::new)?,
        })
    }
}

/// Marks a field as present whenever its key appears, even as null.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn provided<T>(
    value: &Option<Option<String>>,
    field: &'static str,
    parse: impl FnOnce(&str) -> Result<T, ValidationError>,
) -> Result<Option<T>, ValidationError> {
    match value {
        None => Ok(None),
        Some(None) => Err(ValidationError::Null { field }),
        Some(Some(s)) => parse(s).map(Some),
    }
}

/// Create/update response
#[derive(Debug, Serialize)]
pub struct UserMessageResponse {
    pub message: &'static str,
    pub user: User,
}

/// Delete response
#[derive(Debug, Serialize)]
pub struct DeletedUserResponse {
    pub message: &'static str,
    pub deleted_user: User,
}

/// GET /user - list all users
async fn list_users(State(state): State<AppState>) -> Result<Json<UserList>, ApiError> {
    let list = state.users().list().await?;
    Ok(Json(list))
}

/// GET /user/{id} - get a single user
async fn get_user(
    State(state): State<AppState>,
    UserId(id): UserId,
) -> Result<Json<User>, ApiError> {
    let user = state.users().get(id).await?;
    Ok(Json(user))
}

/// POST /user - create a new user
async fn create_user(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserMessageResponse>), ApiError> {
    let new_user = req.validate()?;
    let user = state.users().create(new_user).await.inspect_err(|e| {
        tracing::info!(error = %e, "user create rejected");
    })?;

    tracing::info!(user_id = user.id, "user created");
    Ok((
        StatusCode::CREATED,
        Json(UserMessageResponse {
            message: "User created successfully",
            user,
        }),
    ))
}

/// PUT /user/{id} - update provided fields of a user
async fn update_user(
    State(state): State<AppState>,
    UserId(id): UserId,
    ValidJson(req): ValidJson<UpdateUserRequest>,
) -> Result<Json<UserMessageResponse>, ApiError> {
    let changes = req.validate()?;
    let user = state.users().update(id, changes).await.inspect_err(|e| {
        tracing::info!(user_id = id, error = %e, "user update rejected");
    })?;

    tracing::info!(user_id = id, "user updated");
    Ok(Json(UserMessageResponse {
        message: "User updated successfully",
        user,
    }))
}

/// DELETE /user/{id} - delete a user
async fn delete_user(
    State(state): State<AppState>,
    UserId(id): UserId,
) -> Result<Json<DeletedUserResponse>, ApiError> {
    let deleted_user = state.users().delete(id).await?;

    tracing::info!(user_id = id, "user deleted");
    Ok(Json(DeletedUserResponse {
        message: "User deleted successfully",
        deleted_user,
    }))
}

/// User routes
///
/// The collection answers with and without a trailing slash.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user", get(list_users).post(create_user))
        .route("/user/", get(list_users).post(create_user))
        .route(
            "/user/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
}
