//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way:
//! camelCase field names and RFC 3339 datetimes, unlike the BSON-oriented
//! types in [`crate::model::db`].

pub mod auth;
pub mod election;
pub mod results;
pub mod voter;
