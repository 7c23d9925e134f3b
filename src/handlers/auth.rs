use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{auth::AuthUser, entities::user, errors::ServiceError, ApiResponse, AppState};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    #[schema(value_type = Object)]
    pub user: user::Model,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Register a new user account
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Username or email taken", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    request.validate()?;

    let user = state
        .services
        .auth
        .register(request.username, request.email, request.password)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

/// Log in with username and password, receiving a JWT and the account's
/// API key
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login succeeded"),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    request.validate()?;

    let (token, user) = state
        .services
        .auth
        .login(&request.username, &request.password)
        .await?;

    let api_key = user.api_key.clone();
    Ok(Json(ApiResponse::success(LoginResponse {
        token,
        user,
        api_key,
    })))
}

/// Return the authenticated caller's account
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Current user returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn me(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state
        .services
        .auth
        .get_user(auth_user.user_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("user not found".to_string()))?;

    Ok(Json(ApiResponse::success(user)))
}
