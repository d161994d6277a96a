//! API endpoint handlers.
//!
//! Handlers are thin: they lock the connection, call into the domain
//! modules and shape the JSON envelope.

use serde::Serialize;

pub mod appointments;
pub mod auth;
pub mod doctors;
pub mod health;
pub mod prescriptions;

/// `{"ok": true}` acknowledgement for deletions.
#[derive(Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl Default for OkResponse {
    fn default() -> Self {
        Self { ok: true }
    }
}
