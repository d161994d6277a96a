//! Create the first admin account so someone can log in and register staff.
//!
//! Reads `ADMIN_EMAIL`, `ADMIN_PASS` and `ADMIN_NAME`; the database location
//! comes from the usual `ZAPPOINT_DB_PATH` configuration.

use std::env;
use std::process::ExitCode;

use zappoint::config::Config;
use zappoint::core_state::CoreState;
use zappoint::db::repository;
use zappoint::models::{normalize_email, Role};

const DEFAULT_ADMIN_EMAIL: &str = "admin@example.com";
const DEFAULT_ADMIN_PASS: &str = "admin123";
const DEFAULT_ADMIN_NAME: &str = "Admin";

fn var_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn seed() -> Result<(), Box<dyn std::error::Error>> {
    let email = normalize_email(&var_or("ADMIN_EMAIL", DEFAULT_ADMIN_EMAIL));
    let password = var_or("ADMIN_PASS", DEFAULT_ADMIN_PASS);
    let name = var_or("ADMIN_NAME", DEFAULT_ADMIN_NAME);

    let config = Config::load()?;
    let core = CoreState::open(config)?;
    let conn = core.db()?;

    if repository::email_exists(&conn, &email)? {
        tracing::info!(%email, "Admin already exists");
        return Ok(());
    }

    let user = zappoint::auth::create_user(&conn, &name, &email, &password, Role::Admin)?;
    tracing::info!(user_id = %user.id, %email, "Admin created");
    Ok(())
}

fn main() -> ExitCode {
    zappoint::init_tracing();

    match seed() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Seeding failed: {e}");
            ExitCode::FAILURE
        }
    }
}
