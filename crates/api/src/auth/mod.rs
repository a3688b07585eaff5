//! Authentication primitives.
//!
//! - [`password`] -- Argon2id hashing behind the [`password::CredentialHasher`] seam.
//! - [`jwt`] -- Access/refresh token issuing and verification.
//! - [`cookies`] -- The `accessToken` / `refreshToken` cookie pair.

pub mod cookies;
pub mod jwt;
pub mod password;
