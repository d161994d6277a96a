//! Bearer token authentication and role guards.
//!
//! `require_auth` resolves `Authorization: Bearer <token>` to a live
//! session and injects `AuthUser` and `BearerToken` into request
//! extensions. The role guards run inside it and only read `AuthUser`.

use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, BearerToken};
use crate::auth::{self, AuthUser};
use crate::models::Role;

/// Require a valid bearer token.
///
/// On success the response carries `Cache-Control: no-store` and the
/// caller's `AuthUser` in its extensions for the audit log.
pub async fn require_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_auth_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_auth_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::Unauthorized("No token"))?
        .to_string();

    let user = {
        let conn = ctx.core.db()?;
        auth::authenticate(&conn, &token)?
    }; // MutexGuard dropped here, before any .await
    let user = user.ok_or(ApiError::Unauthorized("Invalid token"))?;

    req.extensions_mut().insert(user.clone());
    req.extensions_mut().insert(BearerToken(token));

    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert("Cache-Control", HeaderValue::from_static("no-store"));
    response.extensions_mut().insert(user);

    Ok(response)
}

fn check_role(req: &Request<axum::body::Body>, allowed: &[Role]) -> Result<(), ApiError> {
    let user = req
        .extensions()
        .get::<AuthUser>()
        .ok_or(ApiError::Unauthorized("No token"))?;
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Forbidden".into()))
    }
}

/// Admin-only routes.
pub async fn require_admin(req: Request<axum::body::Body>, next: Next) -> Response {
    match check_role(&req, &[Role::Admin]) {
        Ok(()) => next.run(req).await,
        Err(err) => err.into_response(),
    }
}

/// Routes for clinic staff who handle prescriptions.
pub async fn require_staff(req: Request<axum::body::Body>, next: Next) -> Response {
    match check_role(&req, &[Role::Admin, Role::Doctor]) {
        Ok(()) => next.run(req).await,
        Err(err) => err.into_response(),
    }
}
