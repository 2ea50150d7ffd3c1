//! # tenant-console
//!
//! Session lifecycle for the tenant administration console: token storage,
//! the private-view session guard, advisory role extraction from access
//! tokens, and client-side validation of the tenant onboarding form.
//!
//! The crate is UI-agnostic. A rendering layer (the `cli/` binary in this
//! repository) calls into [`services`] and acts on the returned
//! [`routes::Route`] redirects and [`state::notice::Notice`] messages.

pub mod config;
pub mod net;
pub mod routes;
pub mod services;
pub mod state;
