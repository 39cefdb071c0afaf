use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::get_config;
use crate::error::AppError;

/// Explicit principal carried through request extensions; handlers and
/// gates read this instead of any ambient auth context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: i32,
    pub email: String,
    pub is_admin: bool,
}

#[derive(Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub uid: i32,
    pub is_admin: bool,
    pub exp: usize,
}

pub async fn auth_middleware(mut req: Request, next: Next) -> Result<Response, AppError> {
    // Extract Authorization header
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized(
            "Missing authorization header".to_string(),
        ))?;

    if !auth_header.starts_with("Bearer ") {
        return Err(AppError::Unauthorized("Invalid token format".to_string()));
    }

    let token = &auth_header[7..];

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(get_config().jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|e| {
        eprintln!("JWT decode error: {}", e);
        AppError::Unauthorized("Invalid or expired token".to_string())
    })?;

    let auth_user = AuthUser {
        id: token_data.claims.uid,
        email: token_data.claims.sub,
        is_admin: token_data.claims.is_admin,
    };

    req.extensions_mut().insert(auth_user);

    Ok(next.run(req).await)
}
