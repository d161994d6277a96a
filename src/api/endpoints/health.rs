//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

#[derive(Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub version: &'static str,
}

/// `GET /api/health`: liveness plus a database round trip.
pub async fn check(State(ctx): State<ApiContext>) -> Result<Json<HealthResponse>, ApiError> {
    {
        let conn = ctx.core.db()?;
        crate::db::count_tables(&conn)?;
    }

    Ok(Json(HealthResponse {
        ok: true,
        version: crate::config::APP_VERSION,
    }))
}
