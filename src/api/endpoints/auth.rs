//! Staff authentication endpoints.
//!
//! - `POST /api/auth/login`: exchange credentials for a bearer token
//! - `POST /api/auth/register`: admin creates a staff account
//! - `GET /api/auth/me`: the caller's identity
//! - `POST /api/auth/logout`: revoke the presented token

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, BearerToken};
use crate::auth::{self, AuthUser, LoginRequest, LoginResult, RegisterRequest};
use crate::models::UserSummary;

#[derive(Serialize)]
pub struct UserResponse<T> {
    pub user: T,
}

/// `POST /api/auth/login`
pub async fn login(
    State(ctx): State<ApiContext>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResult>, ApiError> {
    let Json(req) = payload?;
    let ttl = ctx.token_ttl();
    let result = {
        let conn = ctx.core.db()?;
        auth::login(&conn, &req, ttl)?
    };
    Ok(Json(result))
}

/// `POST /api/auth/register`: admin only.
pub async fn register(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<AuthUser>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse<UserSummary>>), ApiError> {
    let Json(req) = payload?;
    let user = {
        let conn = ctx.core.db()?;
        auth::register(&conn, &req)?
    };
    tracing::info!(by = %actor.id, user_id = %user.id, "Staff account registered");
    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            user: UserSummary::from(&user),
        }),
    ))
}

/// `GET /api/auth/me`
pub async fn me(Extension(user): Extension<AuthUser>) -> Json<UserResponse<AuthUser>> {
    Json(UserResponse { user })
}

/// `POST /api/auth/logout`
pub async fn logout(
    State(ctx): State<ApiContext>,
    Extension(token): Extension<BearerToken>,
) -> Result<StatusCode, ApiError> {
    {
        let conn = ctx.core.db()?;
        auth::logout(&conn, &token.0)?;
    }
    Ok(StatusCode::NO_CONTENT)
}
