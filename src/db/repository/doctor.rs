use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{parse_db_enum, parse_db_time, parse_db_uuid, to_db_time, DatabaseError};
use crate::models::*;

const DOCTOR_COLUMNS: &str =
    "id, user_id, specialization, phone, room, is_active, created_at, updated_at";

const DOCTOR_VIEW_SELECT: &str =
    "SELECT d.id, d.specialization, d.phone, d.room, d.is_active, d.created_at, d.updated_at,
            u.id, u.name, u.email, u.role
     FROM doctors d JOIN users u ON u.id = d.user_id";

/// Partial update for a doctor record. `None` leaves the column unchanged;
/// an empty `phone`/`room` clears it.
#[derive(Debug, Clone, Default)]
pub struct DoctorChanges {
    pub specialization: Option<String>,
    pub phone: Option<String>,
    pub room: Option<String>,
    pub is_active: Option<bool>,
}

fn doctor_from_row(row: &Row<'_>) -> rusqlite::Result<Doctor> {
    Ok(Doctor {
        id: parse_db_uuid(0, &row.get::<_, String>(0)?)?,
        user_id: parse_db_uuid(1, &row.get::<_, String>(1)?)?,
        specialization: row.get(2)?,
        phone: row.get(3)?,
        room: row.get(4)?,
        is_active: row.get(5)?,
        created_at: parse_db_time(6, &row.get::<_, String>(6)?)?,
        updated_at: parse_db_time(7, &row.get::<_, String>(7)?)?,
    })
}

fn doctor_view_from_row(row: &Row<'_>) -> rusqlite::Result<DoctorView> {
    Ok(DoctorView {
        id: parse_db_uuid(0, &row.get::<_, String>(0)?)?,
        specialization: row.get(1)?,
        phone: row.get(2)?,
        room: row.get(3)?,
        is_active: row.get(4)?,
        created_at: parse_db_time(5, &row.get::<_, String>(5)?)?,
        updated_at: parse_db_time(6, &row.get::<_, String>(6)?)?,
        user: UserSummary {
            id: parse_db_uuid(7, &row.get::<_, String>(7)?)?,
            name: row.get(8)?,
            email: row.get(9)?,
            role: parse_db_enum(10, &row.get::<_, String>(10)?)?,
        },
    })
}

pub fn insert_doctor(conn: &Connection, doctor: &Doctor) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO doctors (id, user_id, specialization, phone, room, is_active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            doctor.id.to_string(),
            doctor.user_id.to_string(),
            doctor.specialization,
            doctor.phone,
            doctor.room,
            doctor.is_active,
            to_db_time(&doctor.created_at),
            to_db_time(&doctor.updated_at),
        ],
    )
    .map_err(|e| DatabaseError::on_unique(e, "User already has a doctor profile"))?;
    Ok(())
}

pub fn get_doctor(conn: &Connection, id: &Uuid) -> Result<Option<Doctor>, DatabaseError> {
    let doctor = conn
        .query_row(
            &format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE id = ?1"),
            params![id.to_string()],
            doctor_from_row,
        )
        .optional()?;
    Ok(doctor)
}

pub fn find_doctor_by_user(conn: &Connection, user_id: &Uuid) -> Result<Option<Doctor>, DatabaseError> {
    let doctor = conn
        .query_row(
            &format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE user_id = ?1"),
            params![user_id.to_string()],
            doctor_from_row,
        )
        .optional()?;
    Ok(doctor)
}

pub fn get_doctor_view(conn: &Connection, id: &Uuid) -> Result<Option<DoctorView>, DatabaseError> {
    let view = conn
        .query_row(
            &format!("{DOCTOR_VIEW_SELECT} WHERE d.id = ?1"),
            params![id.to_string()],
            doctor_view_from_row,
        )
        .optional()?;
    Ok(view)
}

/// Lists all doctors with their user populated, ordered by name.
pub fn list_doctor_views(conn: &Connection) -> Result<Vec<DoctorView>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("{DOCTOR_VIEW_SELECT} ORDER BY u.name ASC, d.created_at ASC"))?;
    let rows = stmt.query_map([], doctor_view_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

pub fn update_doctor(conn: &Connection, id: &Uuid, changes: &DoctorChanges) -> Result<(), DatabaseError> {
    // Empty strings clear optional columns; NULL parameters keep the current value.
    let phone = changes.phone.as_deref().map(str::trim);
    let room = changes.room.as_deref().map(str::trim);
    let changed = conn.execute(
        "UPDATE doctors SET
            specialization = COALESCE(?2, specialization),
            phone = CASE WHEN ?3 IS NULL THEN phone ELSE NULLIF(?3, '') END,
            room = CASE WHEN ?4 IS NULL THEN room ELSE NULLIF(?4, '') END,
            is_active = COALESCE(?5, is_active),
            updated_at = ?6
         WHERE id = ?1",
        params![
            id.to_string(),
            changes.specialization.as_deref().map(str::trim),
            phone,
            room,
            changes.is_active,
            to_db_time(&crate::db::now()),
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Doctor", id));
    }
    Ok(())
}

pub fn delete_doctor(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let changed = conn
        .execute("DELETE FROM doctors WHERE id = ?1", params![id.to_string()])
        .map_err(|e| DatabaseError::on_constraint(e, "Doctor still has appointments"))?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Doctor", id));
    }
    Ok(())
}

pub fn count_doctor_appointments(conn: &Connection, id: &Uuid) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM appointments WHERE doctor_id = ?1",
        params![id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}
