//! Prescription endpoints (admin and doctor only).
//!
//! - `GET|POST /api/prescriptions`
//! - `GET /api/prescriptions/:id`
//! - `GET /api/prescriptions/:id/pdf`: attachment download

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::auth::AuthUser;
use crate::models::Prescription;
use crate::prescription::{self, parse_prescription_id, PrescriptionInput, PrescriptionQuery};

#[derive(Serialize)]
pub struct PrescriptionResponse {
    pub prescription: Prescription,
}

#[derive(Serialize)]
pub struct PrescriptionsResponse {
    pub prescriptions: Vec<Prescription>,
}

/// `POST /api/prescriptions`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<AuthUser>,
    payload: Result<Json<PrescriptionInput>, JsonRejection>,
) -> Result<(StatusCode, Json<PrescriptionResponse>), ApiError> {
    let Json(input) = payload?;
    let prescription = {
        let conn = ctx.core.db()?;
        prescription::issue_prescription(&conn, &actor, &input)?
    };
    Ok((StatusCode::CREATED, Json(PrescriptionResponse { prescription })))
}

/// `GET /api/prescriptions`
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<AuthUser>,
    query: Result<Query<PrescriptionQuery>, QueryRejection>,
) -> Result<Json<PrescriptionsResponse>, ApiError> {
    let Query(query) = query?;
    let prescriptions = {
        let conn = ctx.core.db()?;
        prescription::list_prescriptions(&conn, &actor, &query)?
    };
    Ok(Json(PrescriptionsResponse { prescriptions }))
}

/// `GET /api/prescriptions/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<PrescriptionResponse>, ApiError> {
    let id = parse_prescription_id(&id)?;
    let prescription = {
        let conn = ctx.core.db()?;
        prescription::get_prescription(&conn, &actor, &id)?
    };
    Ok(Json(PrescriptionResponse { prescription }))
}

/// Header values only carry visible ASCII.
fn header_safe_filename(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '"' | '\\'))
        .map(|c| if c.is_ascii_graphic() { c } else { '_' })
        .collect()
}

/// `GET /api/prescriptions/:id/pdf`
pub async fn pdf(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_prescription_id(&id)?;
    let document = {
        let conn = ctx.core.db()?;
        prescription::prescription_document(&conn, &actor, &id, &ctx.pdf_theme)?
    };

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        header_safe_filename(&document.filename)
    ))
    .map_err(|e| ApiError::Internal(format!("bad filename header: {e}")))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document.pdf.bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_header_is_ascii_only() {
        assert_eq!(
            header_safe_filename("prescription_Jane_Doe.pdf"),
            "prescription_Jane_Doe.pdf"
        );
        assert_eq!(header_safe_filename("prescription_Zoë\".pdf"), "prescription_Zo_.pdf");
        assert!(HeaderValue::from_str(&header_safe_filename("prescription_李雷.pdf")).is_ok());
    }
}
