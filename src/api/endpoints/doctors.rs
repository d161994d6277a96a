//! Doctor roster endpoints.
//!
//! - `GET /api/doctors`: any signed-in staff member
//! - `POST /api/doctors`, `PUT|PATCH|DELETE /api/doctors/:id`: admin only

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::api::endpoints::OkResponse;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::doctor::{self, parse_doctor_id, DoctorUpdateRequest, NewDoctorRequest};
use crate::models::DoctorView;

#[derive(Serialize)]
pub struct DoctorResponse {
    pub doctor: DoctorView,
}

#[derive(Serialize)]
pub struct DoctorsResponse {
    pub doctors: Vec<DoctorView>,
}

/// `GET /api/doctors`
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<DoctorsResponse>, ApiError> {
    let doctors = {
        let conn = ctx.core.db()?;
        doctor::list_doctors(&conn)?
    };
    Ok(Json(DoctorsResponse { doctors }))
}

/// `POST /api/doctors`
pub async fn create(
    State(ctx): State<ApiContext>,
    payload: Result<Json<NewDoctorRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DoctorResponse>), ApiError> {
    let Json(req) = payload?;
    let doctor = {
        let conn = ctx.core.db()?;
        doctor::create_doctor(&conn, &req)?
    };
    Ok((StatusCode::CREATED, Json(DoctorResponse { doctor })))
}

/// `PUT|PATCH /api/doctors/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    payload: Result<Json<DoctorUpdateRequest>, JsonRejection>,
) -> Result<Json<DoctorResponse>, ApiError> {
    let Json(req) = payload?;
    let id = parse_doctor_id(&id)?;
    let doctor = {
        let conn = ctx.core.db()?;
        doctor::update_doctor(&conn, &id, &req)?
    };
    Ok(Json(DoctorResponse { doctor }))
}

/// `DELETE /api/doctors/:id`
pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiError> {
    let id = parse_doctor_id(&id)?;
    {
        let conn = ctx.core.db()?;
        doctor::delete_doctor(&conn, &id)?;
    }
    Ok(Json(OkResponse::default()))
}
