//! Backend HTTP access and wire types.

pub mod api;
pub mod types;
