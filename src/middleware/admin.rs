use axum::{extract::Request, middleware::Next, response::Response};

use crate::error::AppError;
use crate::middleware::auth::AuthUser;

/// The single mutation gate: the caller must be an authenticated
/// principal with the admin flag set. Runs before any handler
/// validation.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    let auth_user = req
        .extensions()
        .get::<AuthUser>()
        .ok_or(AppError::Unauthorized(
            "Authentication required".to_string(),
        ))?;

    if !auth_user.is_admin {
        eprintln!("Access denied: user '{}' is not an admin", auth_user.email);
        return Err(AppError::Forbidden("Unauthorized".to_string()));
    }

    Ok(next.run(req).await)
}
