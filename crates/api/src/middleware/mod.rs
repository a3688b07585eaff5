//! Request extractors for authentication and ownership checks.

pub mod auth;
