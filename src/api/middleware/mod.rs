//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Audit logger (sees the final status and the user set by auth)
//! 2. Auth validator
//! 3. Role guard, on routes that need one

pub mod audit;
pub mod auth;
