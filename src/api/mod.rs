//! Clinic REST API.
//!
//! Routes are nested under `/api/`. Authenticated routes pass through
//! Audit → Auth → (Role guard) → Handler.
//!
//! The router is composable: `clinic_api_router()` returns a `Router`
//! that can be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::clinic_api_router;
pub use server::{shutdown_signal, start_api_server, ApiServer, ServerError};
pub use types::ApiContext;
