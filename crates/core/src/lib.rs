//! Shared domain types for the vinxen workspace.
//!
//! Everything here is transport-agnostic: the API server serializes these
//! types and the client runtime deserializes the very same definitions.

pub mod auth;
pub mod envelope;
pub mod error;
pub mod hazard;
pub mod pagination;
pub mod types;
pub mod validation;
