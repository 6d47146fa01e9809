use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{jwt, password};
use crate::state::AppState;
use crate::store::models::User;
use crate::store::StoreError;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// POST /auth/register
/// Create an account. Username and email must be unused; the password is
/// stored as an Argon2id hash.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), (StatusCode, String)> {
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_string();

    if username.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Username cannot be empty".to_string()));
    }
    if email.is_empty() || !email.contains('@') {
        return Err((
            StatusCode::BAD_REQUEST,
            "A valid email address is required".to_string(),
        ));
    }
    if req.password.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Password cannot be empty".to_string()));
    }

    // Argon2 hashing is CPU-bound; keep it off the async workers.
    let password_hash = tokio::task::spawn_blocking(move || password::hash_password(&req.password))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join error: {}", e)))?
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Password hashing failed: {}", e),
            )
        })?;

    let user = User {
        id: Uuid::now_v7().to_string(),
        username,
        email,
        password_hash,
        created_at: Utc::now(),
    };

    let user = state.store.insert_user(user).map_err(|e| match e {
        StoreError::EmailTaken => (StatusCode::CONFLICT, "Email is already registered".to_string()),
        StoreError::UsernameTaken => (StatusCode::CONFLICT, "Username is already taken".to_string()),
    })?;

    tracing::info!(user_id = %user.id, username = %user.username, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            id: user.id,
            username: user.username,
            email: user.email,
        }),
    ))
}

/// POST /auth/login
/// Verify credentials and issue a bearer access token. Unknown email and
/// wrong password are indistinguishable to the caller.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, (StatusCode, String)> {
    let invalid = || (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string());

    let user = state
        .store
        .user_by_email(req.email.trim())
        .ok_or_else(invalid)?;

    let stored_hash = user.password_hash.clone();
    let verified =
        tokio::task::spawn_blocking(move || password::verify_password(&req.password, &stored_hash))
            .await
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join error: {}", e)))?;
    if !verified {
        return Err(invalid());
    }

    let access_token = jwt::issue_access_token(&state.jwt_secret, &user.id, &user.email)
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Token issuance failed: {}", e),
            )
        })?;

    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}
