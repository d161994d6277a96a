//! Appointment booking and record keeping.
//!
//! Booking is open to guests: a visitor picks an active doctor and a time
//! and leaves a name and e-mail. Staff read and edit the records afterwards;
//! a doctor only ever sees appointments booked with them.

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db::{self, repository};
use crate::doctor::doctor_scope;
use crate::error::{present, ClinicError};
use crate::models::{
    normalize_email, Appointment, AppointmentFilter, AppointmentStatus, AppointmentView,
};

/// Fields accepted when booking or editing an appointment. Everything is
/// optional at the wire level; each operation checks what it needs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentInput {
    pub student_id: Option<String>,
    pub student_name: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub problem: Option<String>,
    pub doctor: Option<String>,
    pub scheduled_at: Option<String>,
    pub status: Option<String>,
}

/// Raw listing filters from the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentQuery {
    pub doctor: Option<String>,
    pub status: Option<String>,
}

const LOCAL_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Accepts RFC 3339, or a zone-less `YYYY-MM-DDTHH:MM[:SS]` read as UTC.
pub fn parse_schedule(raw: &str) -> Result<DateTime<Utc>, ClinicError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc).trunc_subsecs(0));
    }
    LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc().trunc_subsecs(0))
        .ok_or_else(|| ClinicError::invalid("scheduledAt must be a valid date-time"))
}

fn parse_status(raw: &str) -> Result<AppointmentStatus, ClinicError> {
    raw.trim()
        .parse()
        .map_err(|_| ClinicError::invalid("status must be pending, completed or cancelled"))
}

fn parse_uuid(raw: &str, what: &str) -> Result<Uuid, ClinicError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ClinicError::invalid(format!("Invalid {what} id")))
}

fn optional_text(value: &Option<String>) -> Option<String> {
    present(value).map(str::to_string)
}

/// Resolve a doctor reference for booking. Unknown doctors are 404; a
/// doctor who is no longer active cannot take new bookings.
fn bookable_doctor(conn: &Connection, raw: &str) -> Result<Uuid, ClinicError> {
    let id = parse_uuid(raw, "doctor")?;
    let doctor = repository::get_doctor(conn, &id)?
        .ok_or_else(|| ClinicError::not_found("Doctor not found"))?;
    if !doctor.is_active {
        return Err(ClinicError::invalid("Doctor is not accepting appointments"));
    }
    Ok(doctor.id)
}

fn load_view(conn: &Connection, id: &Uuid) -> Result<AppointmentView, ClinicError> {
    repository::get_appointment_view(conn, id)?
        .ok_or_else(|| ClinicError::not_found("Appointment not found"))
}

/// Load an appointment the actor is allowed to touch.
pub(crate) fn accessible_appointment(
    conn: &Connection,
    actor: &AuthUser,
    id: &Uuid,
) -> Result<Appointment, ClinicError> {
    let appt = repository::get_appointment(conn, id)?
        .ok_or_else(|| ClinicError::not_found("Appointment not found"))?;
    if let Some(own) = doctor_scope(conn, actor)? {
        if appt.doctor_id != own {
            return Err(ClinicError::forbidden("Not your appointment"));
        }
    }
    Ok(appt)
}

pub fn parse_appointment_id(raw: &str) -> Result<Uuid, ClinicError> {
    parse_uuid(raw, "appointment")
}

/// Book an appointment. New bookings always start out `pending`; any other
/// supplied status is rejected.
pub fn create_appointment(
    conn: &Connection,
    input: &AppointmentInput,
) -> Result<AppointmentView, ClinicError> {
    let doctor_ref =
        present(&input.doctor).ok_or_else(|| ClinicError::invalid("doctor is required"))?;
    let scheduled_raw = present(&input.scheduled_at)
        .ok_or_else(|| ClinicError::invalid("scheduledAt is required"))?;

    let student_id = optional_text(&input.student_id);
    let (Some(student_name), Some(email)) = (present(&input.student_name), present(&input.email))
    else {
        return Err(ClinicError::invalid(if student_id.is_none() {
            "studentName and email are required for guest booking"
        } else {
            "studentName and email are required"
        }));
    };

    if let Some(raw) = present(&input.status) {
        if parse_status(raw)? != AppointmentStatus::Pending {
            return Err(ClinicError::invalid("New appointments must be pending"));
        }
    }
    let scheduled_at = parse_schedule(scheduled_raw)?;
    let doctor_id = bookable_doctor(conn, doctor_ref)?;

    let now = db::now();
    let appt = Appointment {
        id: Uuid::new_v4(),
        student_id,
        student_name: student_name.to_string(),
        email: normalize_email(email),
        contact: optional_text(&input.contact),
        problem: optional_text(&input.problem),
        doctor_id,
        scheduled_at,
        status: AppointmentStatus::Pending,
        created_at: now,
        updated_at: now,
    };
    repository::insert_appointment(conn, &appt)?;

    tracing::info!(appointment_id = %appt.id, doctor_id = %doctor_id, "Appointment booked");
    load_view(conn, &appt.id)
}

pub fn list_appointments(
    conn: &Connection,
    actor: &AuthUser,
    query: &AppointmentQuery,
) -> Result<Vec<AppointmentView>, ClinicError> {
    let mut filter = AppointmentFilter {
        doctor_id: present(&query.doctor)
            .map(|raw| parse_uuid(raw, "doctor"))
            .transpose()?,
        status: present(&query.status).map(parse_status).transpose()?,
    };

    if let Some(own) = doctor_scope(conn, actor)? {
        match filter.doctor_id {
            Some(requested) if requested != own => return Ok(Vec::new()),
            _ => filter.doctor_id = Some(own),
        }
    }

    Ok(repository::list_appointment_views(conn, &filter)?)
}

pub fn get_appointment(
    conn: &Connection,
    actor: &AuthUser,
    id: &Uuid,
) -> Result<AppointmentView, ClinicError> {
    accessible_appointment(conn, actor, id)?;
    load_view(conn, id)
}

/// Apply the editable fields present in `input`. Fields that are absent are
/// left alone; present ones are validated before anything is written.
pub fn update_appointment(
    conn: &Connection,
    actor: &AuthUser,
    id: &Uuid,
    input: &AppointmentInput,
) -> Result<AppointmentView, ClinicError> {
    let mut appt = accessible_appointment(conn, actor, id)?;

    if input.student_name.is_some() {
        appt.student_name = present(&input.student_name)
            .ok_or_else(|| ClinicError::invalid("studentName cannot be empty"))?
            .to_string();
    }
    if input.email.is_some() {
        let email =
            present(&input.email).ok_or_else(|| ClinicError::invalid("email cannot be empty"))?;
        appt.email = normalize_email(email);
    }
    if input.contact.is_some() {
        appt.contact = optional_text(&input.contact);
    }
    if input.problem.is_some() {
        appt.problem = optional_text(&input.problem);
    }
    if input.student_id.is_some() {
        appt.student_id = optional_text(&input.student_id);
    }
    if let Some(raw) = &input.status {
        appt.status = parse_status(raw)?;
    }
    if let Some(raw) = &input.scheduled_at {
        appt.scheduled_at = parse_schedule(raw)?;
    }
    if let Some(raw) = &input.doctor {
        let doctor_id = parse_uuid(raw, "doctor")?;
        if repository::get_doctor(conn, &doctor_id)?.is_none() {
            return Err(ClinicError::not_found("Doctor not found"));
        }
        appt.doctor_id = doctor_id;
    }

    appt.updated_at = db::now();
    repository::update_appointment(conn, &appt)?;

    tracing::info!(appointment_id = %id, status = %appt.status, "Appointment updated");
    load_view(conn, id)
}

/// Delete an appointment; its prescription goes with it.
pub fn delete_appointment(conn: &Connection, actor: &AuthUser, id: &Uuid) -> Result<(), ClinicError> {
    accessible_appointment(conn, actor, id)?;
    repository::delete_appointment(conn, id)?;
    tracing::info!(appointment_id = %id, "Appointment deleted");
    Ok(())
}
