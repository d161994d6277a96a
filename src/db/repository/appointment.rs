use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{parse_db_enum, parse_db_time, parse_db_uuid, to_db_time, DatabaseError};
use crate::models::*;

const APPOINTMENT_COLUMNS: &str = "id, student_id, student_name, email, contact, problem, doctor_id,
     scheduled_at, status, created_at, updated_at";

const APPOINTMENT_VIEW_SELECT: &str =
    "SELECT a.id, a.student_id, a.student_name, a.email, a.contact, a.problem,
            a.scheduled_at, a.status, a.created_at, a.updated_at,
            d.id, u.name, u.email, d.specialization
     FROM appointments a
     JOIN doctors d ON d.id = a.doctor_id
     JOIN users u ON u.id = d.user_id";

fn appointment_from_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: parse_db_uuid(0, &row.get::<_, String>(0)?)?,
        student_id: row.get(1)?,
        student_name: row.get(2)?,
        email: row.get(3)?,
        contact: row.get(4)?,
        problem: row.get(5)?,
        doctor_id: parse_db_uuid(6, &row.get::<_, String>(6)?)?,
        scheduled_at: parse_db_time(7, &row.get::<_, String>(7)?)?,
        status: parse_db_enum(8, &row.get::<_, String>(8)?)?,
        created_at: parse_db_time(9, &row.get::<_, String>(9)?)?,
        updated_at: parse_db_time(10, &row.get::<_, String>(10)?)?,
    })
}

fn appointment_view_from_row(row: &Row<'_>) -> rusqlite::Result<AppointmentView> {
    Ok(AppointmentView {
        id: parse_db_uuid(0, &row.get::<_, String>(0)?)?,
        student_id: row.get(1)?,
        student_name: row.get(2)?,
        email: row.get(3)?,
        contact: row.get(4)?,
        problem: row.get(5)?,
        scheduled_at: parse_db_time(6, &row.get::<_, String>(6)?)?,
        status: parse_db_enum(7, &row.get::<_, String>(7)?)?,
        created_at: parse_db_time(8, &row.get::<_, String>(8)?)?,
        updated_at: parse_db_time(9, &row.get::<_, String>(9)?)?,
        doctor: DoctorRef {
            id: parse_db_uuid(10, &row.get::<_, String>(10)?)?,
            name: row.get(11)?,
            email: row.get(12)?,
            specialization: row.get(13)?,
        },
    })
}

pub fn insert_appointment(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    conn.execute(
        &format!(
            "INSERT INTO appointments ({APPOINTMENT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        ),
        params![
            appt.id.to_string(),
            appt.student_id,
            appt.student_name,
            appt.email,
            appt.contact,
            appt.problem,
            appt.doctor_id.to_string(),
            to_db_time(&appt.scheduled_at),
            appt.status.as_str(),
            to_db_time(&appt.created_at),
            to_db_time(&appt.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_appointment(conn: &Connection, id: &Uuid) -> Result<Option<Appointment>, DatabaseError> {
    let appt = conn
        .query_row(
            &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"),
            params![id.to_string()],
            appointment_from_row,
        )
        .optional()?;
    Ok(appt)
}

pub fn get_appointment_view(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<AppointmentView>, DatabaseError> {
    let view = conn
        .query_row(
            &format!("{APPOINTMENT_VIEW_SELECT} WHERE a.id = ?1"),
            params![id.to_string()],
            appointment_view_from_row,
        )
        .optional()?;
    Ok(view)
}

/// Lists appointments matching the filter, earliest first.
pub fn list_appointment_views(
    conn: &Connection,
    filter: &AppointmentFilter,
) -> Result<Vec<AppointmentView>, DatabaseError> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut values: Vec<String> = Vec::new();
    if let Some(doctor_id) = &filter.doctor_id {
        values.push(doctor_id.to_string());
        clauses.push("a.doctor_id = ?");
    }
    if let Some(status) = &filter.status {
        values.push(status.as_str().to_string());
        clauses.push("a.status = ?");
    }

    let mut sql = APPOINTMENT_VIEW_SELECT.to_string();
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY a.scheduled_at ASC, a.created_at ASC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values.iter()), appointment_view_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// Writes every mutable column of an existing appointment.
pub fn update_appointment(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET
            student_id = ?2, student_name = ?3, email = ?4, contact = ?5, problem = ?6,
            doctor_id = ?7, scheduled_at = ?8, status = ?9, updated_at = ?10
         WHERE id = ?1",
        params![
            appt.id.to_string(),
            appt.student_id,
            appt.student_name,
            appt.email,
            appt.contact,
            appt.problem,
            appt.doctor_id.to_string(),
            to_db_time(&appt.scheduled_at),
            appt.status.as_str(),
            to_db_time(&appt.updated_at),
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Appointment", appt.id));
    }
    Ok(())
}

pub fn set_appointment_status(
    conn: &Connection,
    id: &Uuid,
    status: AppointmentStatus,
    updated_at: &DateTime<Utc>,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET status = ?2, updated_at = ?3 WHERE id = ?1",
        params![id.to_string(), status.as_str(), to_db_time(updated_at)],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Appointment", id));
    }
    Ok(())
}

pub fn delete_appointment(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let changed = conn.execute("DELETE FROM appointments WHERE id = ?1", params![id.to_string()])?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Appointment", id));
    }
    Ok(())
}
