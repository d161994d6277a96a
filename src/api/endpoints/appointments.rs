//! Appointment endpoints.
//!
//! - `POST /api/appointments`: public booking, no token needed
//! - `GET /api/appointments`: list with `doctor` / `status` filters
//! - `GET|PUT|PATCH|DELETE /api/appointments/:id`

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::endpoints::OkResponse;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::appointment::{self, parse_appointment_id, AppointmentInput, AppointmentQuery};
use crate::auth::AuthUser;
use crate::models::AppointmentView;

#[derive(Serialize)]
pub struct AppointmentResponse {
    pub appointment: AppointmentView,
}

#[derive(Serialize)]
pub struct AppointmentsResponse {
    pub appointments: Vec<AppointmentView>,
}

/// `POST /api/appointments`: guest-friendly booking.
pub async fn create(
    State(ctx): State<ApiContext>,
    payload: Result<Json<AppointmentInput>, JsonRejection>,
) -> Result<(StatusCode, Json<AppointmentResponse>), ApiError> {
    let Json(input) = payload?;
    let appointment = {
        let conn = ctx.core.db()?;
        appointment::create_appointment(&conn, &input)?
    };
    Ok((StatusCode::CREATED, Json(AppointmentResponse { appointment })))
}

/// `GET /api/appointments`: admins see all, doctors their own.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<AuthUser>,
    query: Result<Query<AppointmentQuery>, QueryRejection>,
) -> Result<Json<AppointmentsResponse>, ApiError> {
    let Query(query) = query?;
    let appointments = {
        let conn = ctx.core.db()?;
        appointment::list_appointments(&conn, &actor, &query)?
    };
    Ok(Json(AppointmentsResponse { appointments }))
}

/// `GET /api/appointments/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let id = parse_appointment_id(&id)?;
    let appointment = {
        let conn = ctx.core.db()?;
        appointment::get_appointment(&conn, &actor, &id)?
    };
    Ok(Json(AppointmentResponse { appointment }))
}

/// `PUT|PATCH /api/appointments/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<AppointmentInput>, JsonRejection>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let Json(input) = payload?;
    let id = parse_appointment_id(&id)?;
    let appointment = {
        let conn = ctx.core.db()?;
        appointment::update_appointment(&conn, &actor, &id, &input)?
    };
    Ok(Json(AppointmentResponse { appointment }))
}

/// `DELETE /api/appointments/:id`
pub async fn remove(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiError> {
    let id = parse_appointment_id(&id)?;
    {
        let conn = ctx.core.db()?;
        appointment::delete_appointment(&conn, &actor, &id)?;
    }
    Ok(Json(OkResponse::default()))
}
