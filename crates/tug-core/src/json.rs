//! JSON decoding with the offending source attached to errors.

use crate::{Error, Result};
use serde::{Serialize, de::DeserializeOwned};

/// Decode a JSON body fetched from `url`.
///
/// # Errors
/// Returns [`Error::InvalidJson`] naming `url` if the body is not valid JSON
/// for `T`.
pub fn decode<T: DeserializeOwned>(url: &str, body: &str) -> Result<T> {
    sonic_rs::from_str(body).map_err(|e| Error::InvalidJson {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Serialize to compact JSON.
///
/// # Errors
/// Returns error if serialization fails.
pub fn encode<T: Serialize>(value: &T) -> Result<String> {
    sonic_rs::to_string(value).map_err(Error::from)
}
