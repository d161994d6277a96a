use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{parse_db_enum, parse_db_time, parse_db_uuid, to_db_time, DatabaseError};
use crate::models::*;

const USER_COLUMNS: &str = "id, name, email, role, created_at, updated_at";

pub(crate) fn user_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<User> {
    Ok(User {
        id: parse_db_uuid(offset, &row.get::<_, String>(offset)?)?,
        name: row.get(offset + 1)?,
        email: row.get(offset + 2)?,
        role: parse_db_enum(offset + 3, &row.get::<_, String>(offset + 3)?)?,
        created_at: parse_db_time(offset + 4, &row.get::<_, String>(offset + 4)?)?,
        updated_at: parse_db_time(offset + 5, &row.get::<_, String>(offset + 5)?)?,
    })
}

pub fn insert_user(conn: &Connection, user: &User, password_hash: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user.id.to_string(),
            user.name,
            user.email,
            password_hash,
            user.role.as_str(),
            to_db_time(&user.created_at),
            to_db_time(&user.updated_at),
        ],
    )
    .map_err(|e| DatabaseError::on_unique(e, "Email already registered"))?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: &Uuid) -> Result<Option<User>, DatabaseError> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id.to_string()],
            |row| user_from_row(row, 0),
        )
        .optional()?;
    Ok(user)
}

/// Looks up a user and its password hash by (normalized) e-mail.
pub fn find_credentials_by_email(
    conn: &Connection,
    email: &str,
) -> Result<Option<UserCredentials>, DatabaseError> {
    let creds = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = ?1"),
            params![normalize_email(email)],
            |row| {
                Ok(UserCredentials {
                    user: user_from_row(row, 0)?,
                    password_hash: row.get(6)?,
                })
            },
        )
        .optional()?;
    Ok(creds)
}

pub fn email_exists(conn: &Connection, email: &str) -> Result<bool, DatabaseError> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
        params![normalize_email(email)],
        |row| row.get::<_, bool>(0),
    )?;
    Ok(exists)
}

/// Updates name and/or e-mail. `None` leaves the column unchanged.
pub fn update_user_profile(
    conn: &Connection,
    id: &Uuid,
    name: Option<&str>,
    email: Option<&str>,
) -> Result<(), DatabaseError> {
    let changed = conn
        .execute(
            "UPDATE users SET name = COALESCE(?2, name), email = COALESCE(?3, email), updated_at = ?4
             WHERE id = ?1",
            params![
                id.to_string(),
                name,
                email.map(normalize_email),
                to_db_time(&crate::db::now()),
            ],
        )
        .map_err(|e| DatabaseError::on_unique(e, "Email already registered"))?;
    if changed == 0 {
        return Err(DatabaseError::not_found("User", id));
    }
    Ok(())
}

pub fn delete_user(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let changed = conn.execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;
    if changed == 0 {
        return Err(DatabaseError::not_found("User", id));
    }
    Ok(())
}

pub fn count_users(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    Ok(count)
}
