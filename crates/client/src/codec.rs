//! JSON byte-buffer codec with schema checks on both directions.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::schema::{Schema, SchemaError};

/// Validate `value` against `schema`, then encode it as JSON bytes.
pub fn encode_to_buffer<T: Serialize>(schema: &Schema<T>, value: &T) -> Result<Vec<u8>, SchemaError> {
    schema.check(value)?;
    serde_json::to_vec(value).map_err(|source| SchemaError::Parse {
        schema: schema.name(),
        source,
    })
}

/// Decode JSON bytes and validate the result against `schema`.
pub fn decode_from_buffer<T: DeserializeOwned>(
    schema: &Schema<T>,
    bytes: &[u8],
) -> Result<T, SchemaError> {
    schema.parse_slice(bytes)
}

/// Encode without any validation.
pub fn encode_unchecked<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(value)
}

/// Decode without any validation beyond the type's shape.
pub fn decode_unchecked<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, serde_json::Error> {
    serde_json::from_slice(bytes)
}
