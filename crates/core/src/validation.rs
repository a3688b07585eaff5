//! Input validation rules shared by the server and the client.

use std::borrow::Cow;

use validator::{ValidateEmail, ValidationError};

use crate::error::CoreError;
use crate::types::DbId;

/// Minimum accepted password length for new accounts.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Return `true` when `email` is a syntactically valid address.
pub fn is_valid_email(email: &str) -> bool {
    !email.is_empty() && email.validate_email()
}

/// Check a password against the account password policy.
///
/// Requires at least [`MIN_PASSWORD_LENGTH`] characters with one lowercase
/// letter, one uppercase letter and one digit. Returns the message of the first
/// rule that fails.
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        ));
    }
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_lower && has_upper && has_digit) {
        return Err(
            "Password must contain at least one uppercase letter, one lowercase letter, and one number"
                .to_string(),
        );
    }
    Ok(())
}

/// `validator` adapter for [`validate_password_strength`].
pub fn password_rule(password: &str) -> Result<(), ValidationError> {
    validate_password_strength(password)
        .map_err(|msg| ValidationError::new("password_strength").with_message(Cow::Owned(msg)))
}

/// Reject ids that cannot name a row (zero or negative).
pub fn validate_id(id: DbId) -> Result<DbId, CoreError> {
    if id <= 0 {
        return Err(CoreError::Validation(
            "Invalid ID: must be a positive number".into(),
        ));
    }
    Ok(id)
}

/// Pick a single human-readable message out of a set of field errors.
///
/// Fields are visited in name order so the result is deterministic.
pub fn first_message(errors: &validator::ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    for (field, errs) in fields {
        if let Some(e) = errs.first() {
            return match &e.message {
                Some(msg) => msg.to_string(),
                None => format!("Invalid value for {field}"),
            };
        }
    }
    "Validation error".to_string()
}
