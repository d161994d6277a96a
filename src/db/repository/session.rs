use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::{to_db_time, DatabaseError};
use crate::models::User;

use super::user::user_from_row;

/// Stores the SHA-256 hash of a bearer token. The token itself is never persisted.
pub fn insert_session(
    conn: &Connection,
    token_hash: &[u8; 32],
    user_id: &Uuid,
    created_at: &DateTime<Utc>,
    expires_at: &DateTime<Utc>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            token_hash.as_slice(),
            user_id.to_string(),
            to_db_time(created_at),
            to_db_time(expires_at),
        ],
    )?;
    Ok(())
}

/// Resolves an unexpired session to its user.
pub fn resolve_session(
    conn: &Connection,
    token_hash: &[u8; 32],
    now: &DateTime<Utc>,
) -> Result<Option<User>, DatabaseError> {
    let user = conn
        .query_row(
            "SELECT u.id, u.name, u.email, u.role, u.created_at, u.updated_at
             FROM sessions s JOIN users u ON u.id = s.user_id
             WHERE s.token_hash = ?1 AND s.expires_at > ?2",
            params![token_hash.as_slice(), to_db_time(now)],
            |row| user_from_row(row, 0),
        )
        .optional()?;
    Ok(user)
}

/// Returns `true` if a session was removed.
pub fn delete_session(conn: &Connection, token_hash: &[u8; 32]) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "DELETE FROM sessions WHERE token_hash = ?1",
        params![token_hash.as_slice()],
    )?;
    Ok(changed > 0)
}

pub fn purge_expired_sessions(conn: &Connection, now: &DateTime<Utc>) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM sessions WHERE expires_at <= ?1",
        params![to_db_time(now)],
    )?;
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::insert_user;
    use crate::db::sqlite::open_memory_database;
    use crate::models::Role;
    use chrono::Duration;

    fn seed_user(conn: &Connection) -> User {
        let now = crate::db::now();
        let user = User {
            id: Uuid::new_v4(),
            name: "Admin".into(),
            email: "admin@clinic.org".into(),
            role: Role::Admin,
            created_at: now,
            updated_at: now,
        };
        insert_user(conn, &user, "h").unwrap();
        user
    }

    #[test]
    fn live_session_resolves_to_user() {
        let conn = open_memory_database().unwrap();
        let user = seed_user(&conn);
        let now = crate::db::now();
        insert_session(&conn, &[7u8; 32], &user.id, &now, &(now + Duration::hours(1))).unwrap();

        let resolved = resolve_session(&conn, &[7u8; 32], &now).unwrap().unwrap();
        assert_eq!(resolved.id, user.id);
        assert!(resolve_session(&conn, &[8u8; 32], &now).unwrap().is_none());
    }

    #[test]
    fn expired_session_does_not_resolve() {
        let conn = open_memory_database().unwrap();
        let user = seed_user(&conn);
        let now = crate::db::now();
        insert_session(&conn, &[1u8; 32], &user.id, &(now - Duration::hours(2)), &(now - Duration::hours(1)))
            .unwrap();

        assert!(resolve_session(&conn, &[1u8; 32], &now).unwrap().is_none());
        assert_eq!(purge_expired_sessions(&conn, &now).unwrap(), 1);
    }

    #[test]
    fn delete_session_revokes() {
        let conn = open_memory_database().unwrap();
        let user = seed_user(&conn);
        let now = crate::db::now();
        insert_session(&conn, &[3u8; 32], &user.id, &now, &(now + Duration::hours(1))).unwrap();

        assert!(delete_session(&conn, &[3u8; 32]).unwrap());
        assert!(!delete_session(&conn, &[3u8; 32]).unwrap());
        assert!(resolve_session(&conn, &[3u8; 32], &now).unwrap().is_none());
    }

    #[test]
    fn sessions_cascade_with_user() {
        let conn = open_memory_database().unwrap();
        let user = seed_user(&conn);
        let now = crate::db::now();
        insert_session(&conn, &[4u8; 32], &user.id, &now, &(now + Duration::hours(1))).unwrap();
        crate::db::repository::delete_user(&conn, &user.id).unwrap();

        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
