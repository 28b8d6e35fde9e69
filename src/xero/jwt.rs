//! JWT payload decoding
//!
//! Claims are read for display only. Signatures are not verified here.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::{Map, Value};

use super::error::XeroError;

/// Decoded claims of a JWT
pub type Claims = Map<String, Value>;

/// Decode the payload segment of `token` into its claims
pub fn decode_claims(token: &str) -> Result<Claims, XeroError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(XeroError::Decode(format!(
            "JWT has {} segments, expected 3",
            parts.len()
        )));
    }

    let payload = URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| XeroError::Decode(format!("JWT payload is not base64url: {}", e)))?;

    serde_json::from_slice(&payload)
        .map_err(|e| XeroError::Decode(format!("JWT payload is not a JSON object: {}", e)))
}
