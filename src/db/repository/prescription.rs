use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{parse_db_enum, parse_db_time, parse_db_uuid, to_db_time, DatabaseError};
use crate::models::*;

const PRESCRIPTION_SELECT: &str =
    "SELECT p.id, p.appointment_id, p.issued_by, p.patient_name, p.patient_email,
            p.doctor_name, p.advice, p.created_at, p.updated_at
     FROM prescriptions p";

/// Restricts a prescription listing.
#[derive(Debug, Clone, Default)]
pub struct PrescriptionFilter {
    pub appointment_id: Option<Uuid>,
    /// Only prescriptions for appointments booked with this doctor.
    pub doctor_id: Option<Uuid>,
}

fn prescription_from_row(row: &Row<'_>) -> rusqlite::Result<Prescription> {
    Ok(Prescription {
        id: parse_db_uuid(0, &row.get::<_, String>(0)?)?,
        appointment_id: parse_db_uuid(1, &row.get::<_, String>(1)?)?,
        issued_by: row
            .get::<_, Option<String>>(2)?
            .map(|raw| parse_db_uuid(2, &raw))
            .transpose()?,
        patient_name: row.get(3)?,
        patient_email: row.get(4)?,
        doctor_name: row.get(5)?,
        advice: row.get(6)?,
        created_at: parse_db_time(7, &row.get::<_, String>(7)?)?,
        updated_at: parse_db_time(8, &row.get::<_, String>(8)?)?,
        items: Vec::new(),
    })
}

/// Inserts the prescription and its items. Run inside a transaction so a
/// failed item insert does not leave a partial prescription behind.
pub fn insert_prescription(conn: &Connection, presc: &Prescription) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO prescriptions (id, appointment_id, issued_by, patient_name, patient_email,
                                    doctor_name, advice, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            presc.id.to_string(),
            presc.appointment_id.to_string(),
            presc.issued_by.map(|id| id.to_string()),
            presc.patient_name,
            presc.patient_email,
            presc.doctor_name,
            presc.advice,
            to_db_time(&presc.created_at),
            to_db_time(&presc.updated_at),
        ],
    )
    .map_err(|e| DatabaseError::on_unique(e, "Appointment already has a prescription"))?;

    let mut stmt = conn.prepare(
        "INSERT INTO prescription_items (prescription_id, position, name, dose, timing)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for (position, item) in presc.items.iter().enumerate() {
        stmt.execute(params![
            presc.id.to_string(),
            position as i64,
            item.name,
            item.dose,
            item.timing.as_str(),
        ])?;
    }
    Ok(())
}

fn load_items(conn: &Connection, prescription_id: &Uuid) -> Result<Vec<PrescriptionItem>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT name, dose, timing FROM prescription_items
         WHERE prescription_id = ?1 ORDER BY position ASC",
    )?;
    let rows = stmt.query_map(params![prescription_id.to_string()], |row| {
        Ok(PrescriptionItem {
            name: row.get(0)?,
            dose: row.get(1)?,
            timing: parse_db_enum(2, &row.get::<_, String>(2)?)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

pub fn get_prescription(conn: &Connection, id: &Uuid) -> Result<Option<Prescription>, DatabaseError> {
    let presc = conn
        .query_row(
            &format!("{PRESCRIPTION_SELECT} WHERE p.id = ?1"),
            params![id.to_string()],
            prescription_from_row,
        )
        .optional()?;
    match presc {
        Some(mut presc) => {
            presc.items = load_items(conn, &presc.id)?;
            Ok(Some(presc))
        }
        None => Ok(None),
    }
}

/// Lists prescriptions newest first, items included.
pub fn list_prescriptions(
    conn: &Connection,
    filter: &PrescriptionFilter,
) -> Result<Vec<Prescription>, DatabaseError> {
    let mut sql = PRESCRIPTION_SELECT.to_string();
    let mut clauses: Vec<&str> = Vec::new();
    let mut values: Vec<String> = Vec::new();
    if let Some(doctor_id) = &filter.doctor_id {
        sql.push_str(" JOIN appointments a ON a.id = p.appointment_id");
        clauses.push("a.doctor_id = ?");
        values.push(doctor_id.to_string());
    }
    if let Some(appointment_id) = &filter.appointment_id {
        clauses.push("p.appointment_id = ?");
        values.push(appointment_id.to_string());
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY p.created_at DESC");

    let mut stmt = conn.prepare(&sql)?;
    let mut prescriptions = stmt
        .query_map(params_from_iter(values.iter()), prescription_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    for presc in &mut prescriptions {
        presc.items = load_items(conn, &presc.id)?;
    }
    Ok(prescriptions)
}
