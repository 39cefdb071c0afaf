use axum::{extract::State, response::Json};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use argon2::{
    password_hash::{PasswordHash, PasswordVerifier},
    Argon2,
};
use base64::{engine::general_purpose, Engine as _};
use jsonwebtoken::{encode, EncodingKey, Header};
use rand::Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::get_config;
use crate::entities::{
    refresh_token::{self, Entity as RefreshToken},
    user::{self, Entity as User},
};
use crate::error::AppError;
use crate::middleware::auth::Claims;
use crate::response::{message_only, ApiResponse};

const ACCESS_TOKEN_TTL_SECS: usize = 900; // 15 minutes

#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    access_token: String,
    refresh_token: String,
    expires_in: usize,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct RefreshRequest {
    refresh_token: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RefreshResponse {
    access_token: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct LogoutRequest {
    refresh_token: String,
}

fn generate_refresh_token() -> String {
    let mut random_bytes = [0u8; 32];
    rand::thread_rng().fill(&mut random_bytes);
    general_purpose::STANDARD.encode(random_bytes)
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn issue_access_token(user: &user::Model) -> Result<String, AppError> {
    let expiration = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_err(|_| AppError::InternalServerError("System clock error".to_string()))?
        .as_secs() as usize
        + ACCESS_TOKEN_TTL_SECS;

    let claims = Claims {
        sub: user.email.clone(),
        uid: user.id,
        is_admin: user.is_admin,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(get_config().jwt_secret.as_ref()),
    )
    .map_err(|e| {
        eprintln!("Token Encode Error: {}", e);
        AppError::InternalServerError("Failed to generate token".to_string())
    })
}

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, AppError> {
    println!("Auth | POST /login | email={}", payload.email);

    let user = User::find()
        .filter(user::Column::Email.eq(&payload.email))
        .one(&db)
        .await?
        .ok_or(AppError::Unauthorized("Invalid credentials".to_string()))?;

    let parsed_hash = PasswordHash::new(&user.password).map_err(|e| {
        eprintln!("Hash Parse Error: {}", e);
        AppError::InternalServerError("Stored credential is invalid".to_string())
    })?;

    if Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    let access_token = issue_access_token(&user)?;

    let refresh_token_str = generate_refresh_token();
    let token_hash = hash_token(&refresh_token_str);
    let refresh_expires_at = chrono::Utc::now().naive_utc() + chrono::Duration::days(1);

    refresh_token::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.id),
        token_hash: Set(token_hash),
        expires_at: Set(refresh_expires_at),
        revoked: Set(false),
        created_at: Set(chrono::Utc::now().naive_utc()),
    }
    .insert(&db)
    .await?;

    println!("Auth | POST /login | email={} | res=200", user.email);
    Ok(Json(ApiResponse::data(LoginResponse {
        access_token,
        refresh_token: refresh_token_str,
        expires_in: ACCESS_TOKEN_TTL_SECS,
    })))
}

#[utoipa::path(
    post,
    path = "/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Token refreshed successfully", body = RefreshResponse),
        (status = 401, description = "Invalid or expired refresh token")
    ),
    tag = "Authentication"
)]
pub async fn refresh(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<ApiResponse<RefreshResponse>>, AppError> {
    let token_hash = hash_token(&payload.refresh_token);

    let token = RefreshToken::find()
        .filter(refresh_token::Column::TokenHash.eq(&token_hash))
        .one(&db)
        .await?
        .ok_or(AppError::Unauthorized(
            "Invalid refresh token. Please re-login.".to_string(),
        ))?;

    if token.revoked {
        return Err(AppError::Unauthorized(
            "User logged out. Please re-login.".to_string(),
        ));
    }

    if token.expires_at < chrono::Utc::now().naive_utc() {
        return Err(AppError::Unauthorized(
            "Refresh token expired. Please re-login.".to_string(),
        ));
    }

    let user = User::find_by_id(token.user_id)
        .one(&db)
        .await?
        .ok_or(AppError::Unauthorized(
            "User not found. Please re-login.".to_string(),
        ))?;

    let access_token = issue_access_token(&user)?;

    println!("Auth | POST /refresh | email={} | res=200", user.email);
    Ok(Json(ApiResponse::data(RefreshResponse { access_token })))
}

#[utoipa::path(
    post,
    path = "/logout",
    request_body = LogoutRequest,
    responses(
        (status = 200, description = "Logged out successfully"),
        (status = 404, description = "Refresh token not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Authentication"
)]
pub async fn logout(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<LogoutRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let token_hash = hash_token(&payload.refresh_token);

    let token = RefreshToken::find()
        .filter(refresh_token::Column::TokenHash.eq(&token_hash))
        .one(&db)
        .await?
        .ok_or(AppError::NotFound("Refresh token not found".to_string()))?;

    let mut active: refresh_token::ActiveModel = token.into();
    active.revoked = Set(true);
    active.update(&db).await?;

    println!("Auth | POST /logout | res=200");
    Ok(Json(message_only("Logged out successfully")))
}
