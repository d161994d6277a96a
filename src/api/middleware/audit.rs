//! Audit logging middleware.
//!
//! Logs every API request with method, path, response status, the
//! authenticated user (when auth ran) and elapsed time.

use std::time::Instant;

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::auth::AuthUser;

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    // Set on the response by the auth middleware
    let user_id = response
        .extensions()
        .get::<AuthUser>()
        .map(|u| u.id.to_string())
        .unwrap_or_else(|| "-".to_string());
    let status = response.status().as_u16();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    tracing::info!(%method, %path, status, %user_id, elapsed_ms, "API request");

    response
}
