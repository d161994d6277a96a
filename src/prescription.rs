//! Prescriptions issued against appointments.
//!
//! Issuing a prescription snapshots the patient and doctor names so the
//! document stays stable if the appointment is edited later, and closes the
//! appointment as `completed` in the same transaction.

use std::sync::LazyLock;

use regex::Regex;
use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

use crate::appointment::accessible_appointment;
use crate::auth::AuthUser;
use crate::db::{self, repository, PrescriptionFilter};
use crate::doctor::doctor_scope;
use crate::error::{present, ClinicError};
use crate::models::{AppointmentStatus, MedicineTiming, Prescription, PrescriptionItem};
use crate::prescription_pdf::{self, PdfTheme, RenderedPdf};

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

const FALLBACK_DOCTOR_NAME: &str = "Doctor";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MedicineInput {
    pub name: Option<String>,
    pub dose: Option<String>,
    pub timing: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionInput {
    pub appointment_id: Option<String>,
    pub medicines: Option<Vec<MedicineInput>>,
    pub advice: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrescriptionQuery {
    pub appointment: Option<String>,
}

/// Trim each entry and drop the ones missing a name or a dose.
pub fn normalize_medicines(input: &[MedicineInput]) -> Vec<PrescriptionItem> {
    input
        .iter()
        .filter_map(|m| {
            Some(PrescriptionItem {
                name: present(&m.name)?.to_string(),
                dose: present(&m.dose)?.to_string(),
                timing: MedicineTiming::from_input(m.timing.as_deref()),
            })
        })
        .collect()
}

pub fn parse_prescription_id(raw: &str) -> Result<Uuid, ClinicError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ClinicError::invalid("Invalid prescription id"))
}

/// Download name for a prescription PDF: `prescription_<Patient_Name>.pdf`.
pub fn pdf_filename(patient_name: &str) -> String {
    let name = WHITESPACE_RUN.replace_all(patient_name.trim(), "_");
    format!("prescription_{name}.pdf")
}

pub fn issue_prescription(
    conn: &Connection,
    actor: &AuthUser,
    input: &PrescriptionInput,
) -> Result<Prescription, ClinicError> {
    let (Some(appointment_ref), Some(medicines)) = (
        present(&input.appointment_id),
        input.medicines.as_deref().filter(|m| !m.is_empty()),
    ) else {
        return Err(ClinicError::invalid("appointmentId and medicines[] are required"));
    };
    let appointment_id = Uuid::parse_str(appointment_ref)
        .map_err(|_| ClinicError::not_found("Appointment not found"))?;

    let appt = accessible_appointment(conn, actor, &appointment_id)?;

    let items = normalize_medicines(medicines);
    if items.is_empty() {
        return Err(ClinicError::invalid("At least one valid medicine is required"));
    }

    let doctor_name = repository::get_doctor_view(conn, &appt.doctor_id)?
        .map(|d| d.display_name().to_string())
        .unwrap_or_else(|| FALLBACK_DOCTOR_NAME.to_string());

    let now = db::now();
    let presc = Prescription {
        id: Uuid::new_v4(),
        appointment_id: appt.id,
        issued_by: Some(actor.id),
        patient_name: appt.student_name.clone(),
        patient_email: appt.email.clone(),
        doctor_name,
        items,
        advice: present(&input.advice).map(str::to_string),
        created_at: now,
        updated_at: now,
    };

    let tx = conn.unchecked_transaction()?;
    repository::insert_prescription(&tx, &presc).map_err(|e| match e {
        db::DatabaseError::ConstraintViolation(msg) => ClinicError::Conflict(msg),
        other => other.into(),
    })?;
    repository::set_appointment_status(&tx, &appt.id, AppointmentStatus::Completed, &now)?;
    tx.commit()?;

    tracing::info!(
        prescription_id = %presc.id,
        appointment_id = %appt.id,
        items = presc.items.len(),
        "Prescription issued"
    );
    Ok(presc)
}

/// Fetch a prescription the actor may read.
pub fn get_prescription(
    conn: &Connection,
    actor: &AuthUser,
    id: &Uuid,
) -> Result<Prescription, ClinicError> {
    let presc = repository::get_prescription(conn, id)?
        .ok_or_else(|| ClinicError::not_found("Prescription not found"))?;
    accessible_appointment(conn, actor, &presc.appointment_id)?;
    Ok(presc)
}

pub fn list_prescriptions(
    conn: &Connection,
    actor: &AuthUser,
    query: &PrescriptionQuery,
) -> Result<Vec<Prescription>, ClinicError> {
    let filter = PrescriptionFilter {
        appointment_id: present(&query.appointment)
            .map(|raw| {
                Uuid::parse_str(raw).map_err(|_| ClinicError::invalid("Invalid appointment id"))
            })
            .transpose()?,
        doctor_id: doctor_scope(conn, actor)?,
    };
    Ok(repository::list_prescriptions(conn, &filter)?)
}

/// A rendered prescription ready to be sent as an attachment.
#[derive(Debug)]
pub struct PrescriptionDocument {
    pub filename: String,
    pub pdf: RenderedPdf,
}

pub fn prescription_document(
    conn: &Connection,
    actor: &AuthUser,
    id: &Uuid,
    theme: &PdfTheme,
) -> Result<PrescriptionDocument, ClinicError> {
    let presc = get_prescription(conn, actor, id)?;
    let appt = repository::get_appointment(conn, &presc.appointment_id)?
        .ok_or_else(|| ClinicError::not_found("Appointment not found"))?;

    let pdf = prescription_pdf::render_prescription(&presc, &appt.scheduled_at, theme)?;
    tracing::info!(prescription_id = %id, pages = pdf.pages, "Prescription PDF rendered");
    Ok(PrescriptionDocument {
        filename: pdf_filename(&presc.patient_name),
        pdf,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appointment::tests::{as_actor, guest_booking, seed_doctor};
    use crate::appointment::{create_appointment, get_appointment};
    use crate::auth::create_user;
    use crate::db::sqlite::open_memory_database;
    use crate::models::{AppointmentView, Role};

    fn real_admin(conn: &Connection) -> AuthUser {
        create_user(conn, "Admin", "admin@clinic.org", "admin123", Role::Admin)
            .unwrap()
            .into()
    }

    fn medicine(name: &str, dose: &str, timing: Option<&str>) -> MedicineInput {
        MedicineInput {
            name: Some(name.into()),
            dose: Some(dose.into()),
            timing: timing.map(str::to_string),
        }
    }

    fn input_for(appt: &AppointmentView) -> PrescriptionInput {
        PrescriptionInput {
            appointment_id: Some(appt.id.to_string()),
            medicines: Some(vec![
                medicine(" Paracetamol 500mg ", "1/0/1", Some("after")),
                medicine("Omeprazole 20mg", "1/0/0", Some("before")),
            ]),
            advice: Some("Drink plenty of water.".into()),
        }
    }

    #[test]
    fn normalize_trims_defaults_and_drops_incomplete() {
        let items = normalize_medicines(&[
            medicine("  Cetirizine ", " 0/0/1 ", None),
            medicine("", "1/0/0", Some("before")),
            MedicineInput {
                name: Some("Zinc".into()),
                ..Default::default()
            },
            medicine("Omeprazole", "1/0/0", Some("before")),
        ]);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Cetirizine");
        assert_eq!(items[0].dose, "0/0/1");
        assert_eq!(items[0].timing, MedicineTiming::After);
        assert_eq!(items[1].timing, MedicineTiming::Before);
    }

    #[test]
    fn pdf_filename_replaces_whitespace_runs() {
        assert_eq!(pdf_filename("Asha  Rahman"), "prescription_Asha_Rahman.pdf");
        assert_eq!(pdf_filename(" Li\tWei Chen "), "prescription_Li_Wei_Chen.pdf");
    }

    #[test]
    fn issuing_snapshots_names_and_completes_appointment() {
        let conn = open_memory_database().unwrap();
        let chen = seed_doctor(&conn, "chen@clinic.org");
        let appt = create_appointment(&conn, &guest_booking(&chen, "2026-03-01T09:00")).unwrap();

        let actor = as_actor(&chen);
        let presc = issue_prescription(&conn, &actor, &input_for(&appt)).unwrap();
        assert_eq!(presc.patient_name, "Asha Rahman");
        assert_eq!(presc.patient_email, "asha@uni.edu");
        assert_eq!(presc.doctor_name, chen.user.name);
        assert_eq!(presc.issued_by, Some(chen.user.id));
        assert_eq!(presc.items[0].name, "Paracetamol 500mg");

        let after = get_appointment(&conn, &actor, &appt.id).unwrap();
        assert_eq!(after.status, AppointmentStatus::Completed);

        let stored = get_prescription(&conn, &actor, &presc.id).unwrap();
        assert_eq!(stored, presc);
    }

    #[test]
    fn second_prescription_conflicts_and_rolls_back() {
        let conn = open_memory_database().unwrap();
        let chen = seed_doctor(&conn, "chen@clinic.org");
        let appt = create_appointment(&conn, &guest_booking(&chen, "2026-03-01T09:00")).unwrap();
        let admin = real_admin(&conn);

        issue_prescription(&conn, &admin, &input_for(&appt)).unwrap();
        let err = issue_prescription(&conn, &admin, &input_for(&appt)).unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(_)));
        assert_eq!(
            list_prescriptions(&conn, &admin, &PrescriptionQuery::default()).unwrap().len(),
            1
        );
    }

    #[test]
    fn issue_validation_errors() {
        let conn = open_memory_database().unwrap();
        let chen = seed_doctor(&conn, "chen@clinic.org");
        let appt = create_appointment(&conn, &guest_booking(&chen, "2026-03-01T09:00")).unwrap();
        let admin = real_admin(&conn);

        let mut input = input_for(&appt);
        input.medicines = Some(Vec::new());
        let err = issue_prescription(&conn, &admin, &input).unwrap_err();
        assert_eq!(err.to_string(), "appointmentId and medicines[] are required");

        let mut input = input_for(&appt);
        input.medicines = Some(vec![medicine(" ", "1/0/1", None)]);
        let err = issue_prescription(&conn, &admin, &input).unwrap_err();
        assert_eq!(err.to_string(), "At least one valid medicine is required");

        let mut input = input_for(&appt);
        input.appointment_id = Some(Uuid::new_v4().to_string());
        let err = issue_prescription(&conn, &admin, &input).unwrap_err();
        assert_eq!(err.to_string(), "Appointment not found");
    }

    #[test]
    fn doctor_must_own_the_appointment() {
        let conn = open_memory_database().unwrap();
        let chen = seed_doctor(&conn, "chen@clinic.org");
        let roy = seed_doctor(&conn, "roy@clinic.org");
        let appt = create_appointment(&conn, &guest_booking(&chen, "2026-03-01T09:00")).unwrap();

        let err = issue_prescription(&conn, &as_actor(&roy), &input_for(&appt)).unwrap_err();
        assert!(matches!(err, ClinicError::Forbidden(_)));
        assert_eq!(err.to_string(), "Not your appointment");
    }

    #[test]
    fn other_doctors_cannot_read_or_download() {
        let conn = open_memory_database().unwrap();
        let chen = seed_doctor(&conn, "chen@clinic.org");
        let roy = seed_doctor(&conn, "roy@clinic.org");
        let appt = create_appointment(&conn, &guest_booking(&chen, "2026-03-01T09:00")).unwrap();
        let presc = issue_prescription(&conn, &as_actor(&chen), &input_for(&appt)).unwrap();
        let intruder = as_actor(&roy);

        let err = get_prescription(&conn, &intruder, &presc.id).unwrap_err();
        assert!(matches!(err, ClinicError::Forbidden(_)));
        assert_eq!(err.to_string(), "Not your appointment");

        let err = prescription_document(&conn, &intruder, &presc.id, &PdfTheme::default()).unwrap_err();
        assert!(matches!(err, ClinicError::Forbidden(_)));

        let by_appt = PrescriptionQuery {
            appointment: Some(appt.id.to_string()),
        };
        assert!(list_prescriptions(&conn, &intruder, &by_appt).unwrap().is_empty());
        assert_eq!(get_prescription(&conn, &as_actor(&chen), &presc.id).unwrap().id, presc.id);
    }

    #[test]
    fn listing_is_scoped_and_filterable() {
        let conn = open_memory_database().unwrap();
        let chen = seed_doctor(&conn, "chen@clinic.org");
        let roy = seed_doctor(&conn, "roy@clinic.org");
        let a1 = create_appointment(&conn, &guest_booking(&chen, "2026-03-01T09:00")).unwrap();
        let a2 = create_appointment(&conn, &guest_booking(&roy, "2026-03-01T10:00")).unwrap();
        let admin = real_admin(&conn);
        issue_prescription(&conn, &admin, &input_for(&a1)).unwrap();
        issue_prescription(&conn, &admin, &input_for(&a2)).unwrap();

        let all = list_prescriptions(&conn, &admin, &PrescriptionQuery::default()).unwrap();
        assert_eq!(all.len(), 2);

        let chens = list_prescriptions(&conn, &as_actor(&chen), &PrescriptionQuery::default()).unwrap();
        assert_eq!(chens.len(), 1);
        assert_eq!(chens[0].appointment_id, a1.id);

        let by_appt = PrescriptionQuery {
            appointment: Some(a2.id.to_string()),
        };
        let filtered = list_prescriptions(&conn, &admin, &by_appt).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].appointment_id, a2.id);
    }

    #[test]
    fn document_has_filename_and_pdf_bytes() {
        let conn = open_memory_database().unwrap();
        let chen = seed_doctor(&conn, "chen@clinic.org");
        let appt = create_appointment(&conn, &guest_booking(&chen, "2026-03-01T09:00")).unwrap();
        let presc = issue_prescription(&conn, &as_actor(&chen), &input_for(&appt)).unwrap();

        let doc =
            prescription_document(&conn, &as_actor(&chen), &presc.id, &PdfTheme::default()).unwrap();
        assert_eq!(doc.filename, "prescription_Asha_Rahman.pdf");
        assert!(doc.pdf.bytes.starts_with(b"%PDF"));
        assert_eq!(doc.pdf.pages, 1);

        let missing = prescription_document(&conn, &as_actor(&chen), &Uuid::new_v4(), &PdfTheme::default());
        assert!(matches!(missing.unwrap_err(), ClinicError::NotFound(_)));
    }
}
