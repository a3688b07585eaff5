//! Runtime shape checks for data received from the network.
//!
//! A [`Schema`] couples serde deserialization with a `validator` pass, so a
//! value that parses but breaks a field rule is still rejected.

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;
use validator::{Validate, ValidationErrors};

/// Why a value failed its schema.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("{schema}: malformed payload: {source}")]
    Parse {
        schema: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{schema}: {errors}")]
    Invalid {
        schema: &'static str,
        errors: ValidationErrors,
    },
}

/// Deserialize-then-validate contract for a type `T`.
pub struct Schema<T> {
    name: &'static str,
    check: fn(&T) -> Result<(), ValidationErrors>,
}

impl<T> Clone for Schema<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Schema<T> {}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema").field("name", &self.name).finish()
    }
}

impl<T: Validate> Schema<T> {
    /// Schema using the type's own `#[validate]` rules.
    pub fn validated(name: &'static str) -> Self {
        Self {
            name,
            check: |value: &T| value.validate(),
        }
    }
}

impl<T> Schema<T> {
    /// Schema with a custom validation function.
    pub fn with_check(name: &'static str, check: fn(&T) -> Result<(), ValidationErrors>) -> Self {
        Self { name, check }
    }

    /// Schema that only requires the value to deserialize.
    pub fn shape_only(name: &'static str) -> Self {
        Self {
            name,
            check: |_| Ok(()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn check(&self, value: &T) -> Result<(), SchemaError> {
        (self.check)(value).map_err(|errors| SchemaError::Invalid {
            schema: self.name,
            errors,
        })
    }
}

impl<T: DeserializeOwned> Schema<T> {
    pub fn parse_value(&self, value: Value) -> Result<T, SchemaError> {
        let parsed = serde_json::from_value(value).map_err(|source| self.parse_error(source))?;
        self.check(&parsed)?;
        Ok(parsed)
    }

    pub fn parse_str(&self, text: &str) -> Result<T, SchemaError> {
        let parsed = serde_json::from_str(text).map_err(|source| self.parse_error(source))?;
        self.check(&parsed)?;
        Ok(parsed)
    }

    pub fn parse_slice(&self, bytes: &[u8]) -> Result<T, SchemaError> {
        let parsed = serde_json::from_slice(bytes).map_err(|source| self.parse_error(source))?;
        self.check(&parsed)?;
        Ok(parsed)
    }

    fn parse_error(&self, source: serde_json::Error) -> SchemaError {
        SchemaError::Parse {
            schema: self.name,
            source,
        }
    }
}
