//! Repository layer: entity-scoped database operations.
//!
//! Plain functions over a borrowed `Connection`. Callers that need several
//! writes to land together open a transaction and pass it in (a
//! `Transaction` derefs to `Connection`).

mod appointment;
mod doctor;
mod prescription;
mod session;
mod user;

pub use appointment::*;
pub use doctor::*;
pub use prescription::*;
pub use session::*;
pub use user::*;
