//! Doctor roster management. Each doctor is backed by a `doctor`-role user
//! account that they log in with.

use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{self, AuthUser};
use crate::db::{self, repository, DoctorChanges};
use crate::error::{present, ClinicError};
use crate::models::{Doctor, DoctorView, Role};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewDoctorRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub specialization: Option<String>,
    pub phone: Option<String>,
    pub room: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorUpdateRequest {
    pub specialization: Option<String>,
    pub phone: Option<String>,
    pub room: Option<String>,
    pub is_active: Option<bool>,
    pub name: Option<String>,
    pub email: Option<String>,
}

pub(crate) fn parse_doctor_id(raw: &str) -> Result<Uuid, ClinicError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ClinicError::invalid("Invalid doctor id"))
}

fn load_view(conn: &Connection, id: &Uuid) -> Result<DoctorView, ClinicError> {
    repository::get_doctor_view(conn, id)?.ok_or_else(|| ClinicError::not_found("Doctor not found"))
}

/// Create the user account and doctor profile together.
pub fn create_doctor(conn: &Connection, req: &NewDoctorRequest) -> Result<DoctorView, ClinicError> {
    let (Some(name), Some(email), Some(password), Some(specialization)) = (
        present(&req.name),
        present(&req.email),
        req.password.as_deref().filter(|p| !p.is_empty()),
        present(&req.specialization),
    ) else {
        return Err(ClinicError::invalid(
            "name, email, password and specialization are required",
        ));
    };

    let tx = conn.unchecked_transaction()?;
    let user = auth::create_user(&tx, name, email, password, Role::Doctor)?;
    let now = db::now();
    let doctor = Doctor {
        id: Uuid::new_v4(),
        user_id: user.id,
        specialization: specialization.to_string(),
        phone: present(&req.phone).map(str::to_string),
        room: present(&req.room).map(str::to_string),
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    repository::insert_doctor(&tx, &doctor)?;
    tx.commit()?;

    tracing::info!(doctor_id = %doctor.id, "Doctor created");
    load_view(conn, &doctor.id)
}

pub fn list_doctors(conn: &Connection) -> Result<Vec<DoctorView>, ClinicError> {
    Ok(repository::list_doctor_views(conn)?)
}

pub fn update_doctor(
    conn: &Connection,
    id: &Uuid,
    req: &DoctorUpdateRequest,
) -> Result<DoctorView, ClinicError> {
    let doctor = repository::get_doctor(conn, id)?
        .ok_or_else(|| ClinicError::not_found("Doctor not found"))?;

    if req.specialization.is_some() && present(&req.specialization).is_none() {
        return Err(ClinicError::invalid("specialization cannot be empty"));
    }
    if req.name.is_some() && present(&req.name).is_none() {
        return Err(ClinicError::invalid("name cannot be empty"));
    }
    let email = match &req.email {
        Some(raw) => Some(auth::validate_email(raw)?),
        None => None,
    };

    let tx = conn.unchecked_transaction()?;
    repository::update_doctor(
        &tx,
        id,
        &DoctorChanges {
            specialization: req.specialization.clone(),
            phone: req.phone.clone(),
            room: req.room.clone(),
            is_active: req.is_active,
        },
    )?;
    if req.name.is_some() || email.is_some() {
        repository::update_user_profile(&tx, &doctor.user_id, present(&req.name), email.as_deref())
            .map_err(|e| match e {
                db::DatabaseError::ConstraintViolation(_) => {
                    ClinicError::Conflict("Email already registered".into())
                }
                other => other.into(),
            })?;
    }
    tx.commit()?;

    tracing::info!(doctor_id = %id, "Doctor updated");
    load_view(conn, id)
}

/// Remove a doctor and their login. Doctors with booked appointments must
/// be deactivated instead.
pub fn delete_doctor(conn: &Connection, id: &Uuid) -> Result<(), ClinicError> {
    let doctor = repository::get_doctor(conn, id)?
        .ok_or_else(|| ClinicError::not_found("Doctor not found"))?;
    if repository::count_doctor_appointments(conn, id)? > 0 {
        return Err(ClinicError::Conflict(
            "Doctor has appointments; deactivate instead of deleting".into(),
        ));
    }

    let tx = conn.unchecked_transaction()?;
    repository::delete_doctor(&tx, id)?;
    repository::delete_user(&tx, &doctor.user_id)?;
    tx.commit()?;

    tracing::info!(doctor_id = %id, "Doctor deleted");
    Ok(())
}

/// Limits a caller to their own doctor profile: admins see everything
/// (`None`), doctors see only their own record.
pub fn doctor_scope(conn: &Connection, actor: &AuthUser) -> Result<Option<Uuid>, ClinicError> {
    match actor.role {
        Role::Admin => Ok(None),
        Role::Doctor => {
            let doctor = repository::find_doctor_by_user(conn, &actor.id)?
                .ok_or_else(|| ClinicError::forbidden("No doctor profile for this account"))?;
            Ok(Some(doctor.id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn new_doctor(email: &str) -> NewDoctorRequest {
        NewDoctorRequest {
            name: Some("Dr. Chen".into()),
            email: Some(email.into()),
            password: Some("doctor123".into()),
            specialization: Some("Cardiology".into()),
            phone: Some(" 0171 ".into()),
            room: None,
        }
    }

    #[test]
    fn create_doctor_creates_login_and_profile() {
        let conn = open_memory_database().unwrap();
        let view = create_doctor(&conn, &new_doctor("chen@clinic.org")).unwrap();
        assert_eq!(view.user.name, "Dr. Chen");
        assert_eq!(view.user.role, Role::Doctor);
        assert_eq!(view.phone.as_deref(), Some("0171"));
        assert!(view.is_active);

        let creds = repository::find_credentials_by_email(&conn, "chen@clinic.org")
            .unwrap()
            .unwrap();
        assert!(crate::crypto::verify_password("doctor123", &creds.password_hash).unwrap());
    }

    #[test]
    fn create_doctor_requires_fields() {
        let conn = open_memory_database().unwrap();
        let mut req = new_doctor("chen@clinic.org");
        req.specialization = Some("  ".into());
        assert!(matches!(create_doctor(&conn, &req).unwrap_err(), ClinicError::Invalid(_)));
    }

    #[test]
    fn duplicate_email_leaves_no_partial_rows() {
        let conn = open_memory_database().unwrap();
        create_doctor(&conn, &new_doctor("chen@clinic.org")).unwrap();
        let err = create_doctor(&conn, &new_doctor("chen@clinic.org")).unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(_)));
        assert_eq!(list_doctors(&conn).unwrap().len(), 1);
        assert_eq!(repository::count_users(&conn).unwrap(), 1);
    }

    #[test]
    fn update_touches_doctor_and_user() {
        let conn = open_memory_database().unwrap();
        let view = create_doctor(&conn, &new_doctor("chen@clinic.org")).unwrap();

        let updated = update_doctor(
            &conn,
            &view.id,
            &DoctorUpdateRequest {
                room: Some("C-3".into()),
                is_active: Some(false),
                name: Some("Dr. Mei Chen".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.room.as_deref(), Some("C-3"));
        assert!(!updated.is_active);
        assert_eq!(updated.user.name, "Dr. Mei Chen");
        assert_eq!(updated.user.email, "chen@clinic.org");
        assert_eq!(updated.specialization, "Cardiology");
    }

    #[test]
    fn update_to_taken_email_conflicts() {
        let conn = open_memory_database().unwrap();
        create_doctor(&conn, &new_doctor("chen@clinic.org")).unwrap();
        let roy = create_doctor(&conn, &new_doctor("roy@clinic.org")).unwrap();
        let err = update_doctor(
            &conn,
            &roy.id,
            &DoctorUpdateRequest {
                email: Some("chen@clinic.org".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(_)));
    }

    #[test]
    fn update_unknown_is_not_found() {
        let conn = open_memory_database().unwrap();
        let err = update_doctor(&conn, &Uuid::new_v4(), &DoctorUpdateRequest::default()).unwrap_err();
        assert!(matches!(err, ClinicError::NotFound(_)));
    }

    #[test]
    fn delete_removes_doctor_and_login() {
        let conn = open_memory_database().unwrap();
        let view = create_doctor(&conn, &new_doctor("chen@clinic.org")).unwrap();
        delete_doctor(&conn, &view.id).unwrap();
        assert!(list_doctors(&conn).unwrap().is_empty());
        assert_eq!(repository::count_users(&conn).unwrap(), 0);
        assert!(matches!(
            delete_doctor(&conn, &view.id).unwrap_err(),
            ClinicError::NotFound(_)
        ));
    }

    #[test]
    fn scope_for_admin_and_doctor() {
        let conn = open_memory_database().unwrap();
        let view = create_doctor(&conn, &new_doctor("chen@clinic.org")).unwrap();
        let doctor_actor = AuthUser {
            id: view.user.id,
            role: Role::Doctor,
            name: view.user.name.clone(),
            email: view.user.email.clone(),
        };
        assert_eq!(doctor_scope(&conn, &doctor_actor).unwrap(), Some(view.id));

        let admin = AuthUser {
            id: Uuid::new_v4(),
            role: Role::Admin,
            name: "Admin".into(),
            email: "admin@clinic.org".into(),
        };
        assert_eq!(doctor_scope(&conn, &admin).unwrap(), None);

        let orphan = AuthUser {
            role: Role::Doctor,
            ..admin
        };
        assert!(matches!(doctor_scope(&conn, &orphan).unwrap_err(), ClinicError::Forbidden(_)));
    }
}
