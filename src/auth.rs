//! Staff authentication: registration, login, session resolution, logout.

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use uuid::Uuid;

use crate::crypto;
use crate::db::{self, repository};
use crate::error::{present, ClinicError};
use crate::models::{normalize_email, Role, User, UserSummary};

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

/// Checked on the unknown-email path so both login failures cost one PBKDF2 run.
static UNKNOWN_USER_HASH: LazyLock<String> =
    LazyLock::new(|| crypto::hash_password("zappoint-unknown-user"));

/// Minimum accepted password length for new accounts.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// The authenticated caller, resolved from a bearer token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
    pub name: String,
    pub email: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            role: user.role,
            name: user.name,
            email: user.email,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserSummary,
}

/// Validate and normalize an e-mail address.
pub fn validate_email(raw: &str) -> Result<String, ClinicError> {
    let email = normalize_email(raw);
    if !EMAIL_PATTERN.is_match(&email) {
        return Err(ClinicError::invalid("A valid email is required"));
    }
    Ok(email)
}

pub fn validate_password(raw: &str) -> Result<(), ClinicError> {
    if raw.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ClinicError::invalid(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Create a staff user. Shared by registration, doctor onboarding and the
/// admin seeding binary.
pub fn create_user(
    conn: &Connection,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
) -> Result<User, ClinicError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ClinicError::invalid("name is required"));
    }
    let email = validate_email(email)?;
    validate_password(password)?;

    if repository::email_exists(conn, &email)? {
        return Err(ClinicError::Conflict("Email already registered".into()));
    }

    let now = db::now();
    let user = User {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email,
        role,
        created_at: now,
        updated_at: now,
    };
    let hash = crypto::hash_password(password);
    repository::insert_user(conn, &user, &hash)?;
    tracing::info!(user_id = %user.id, role = %user.role, "User created");
    Ok(user)
}

pub fn register(conn: &Connection, req: &RegisterRequest) -> Result<User, ClinicError> {
    let (Some(name), Some(email), Some(password), Some(role)) = (
        present(&req.name),
        present(&req.email),
        req.password.as_deref().filter(|p| !p.is_empty()),
        present(&req.role),
    ) else {
        return Err(ClinicError::invalid("name, email, password and role are required"));
    };
    let role: Role = role
        .parse()
        .map_err(|_| ClinicError::invalid("role must be one of: admin, doctor"))?;
    create_user(conn, name, email, password, role)
}

/// Verify credentials and open a session lasting `ttl`.
pub fn login(conn: &Connection, req: &LoginRequest, ttl: Duration) -> Result<LoginResult, ClinicError> {
    let (Some(email), Some(password)) = (present(&req.email), req.password.as_deref()) else {
        return Err(ClinicError::invalid("email and password are required"));
    };

    let Some(creds) = repository::find_credentials_by_email(conn, email)? else {
        let _ = crypto::verify_password(password, &UNKNOWN_USER_HASH);
        tracing::info!("Login rejected: unknown email");
        return Err(ClinicError::InvalidCredentials);
    };
    if !crypto::verify_password(password, &creds.password_hash)? {
        tracing::info!(user_id = %creds.user.id, "Login rejected: wrong password");
        return Err(ClinicError::InvalidCredentials);
    }

    let now = db::now();
    let purged = repository::purge_expired_sessions(conn, &now)?;
    if purged > 0 {
        tracing::debug!(purged, "Expired sessions removed");
    }

    let expires_at = now
        .checked_add_signed(ttl)
        .ok_or_else(|| ClinicError::Internal("Session lifetime out of range".into()))?;
    let token = crypto::generate_token();
    repository::insert_session(conn, &crypto::hash_token(&token), &creds.user.id, &now, &expires_at)?;
    tracing::info!(user_id = %creds.user.id, "Login succeeded");

    Ok(LoginResult {
        token,
        expires_at,
        user: UserSummary::from(&creds.user),
    })
}

/// Resolve a bearer token to its user, if the session is live.
pub fn authenticate(conn: &Connection, token: &str) -> Result<Option<AuthUser>, ClinicError> {
    let user = repository::resolve_session(conn, &crypto::hash_token(token), &db::now())?;
    Ok(user.map(AuthUser::from))
}

/// Revoke a session. Returns `true` if the token was live.
pub fn logout(conn: &Connection, token: &str) -> Result<bool, ClinicError> {
    Ok(repository::delete_session(conn, &crypto::hash_token(token))?)
}
