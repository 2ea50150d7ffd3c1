//! Shared client-side state modules.
//!
//! DESIGN
//! ======
//! State is split by concern (`store`, `auth`, `notice`) so callers can
//! depend on small focused models.

pub mod auth;
pub mod notice;
pub mod store;
