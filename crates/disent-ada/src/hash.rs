use disent_core::{DisentError, ErrorInfo};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Serializes `value` to JSON with object keys in sorted order.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, DisentError> {
    let canonical = serde_json::to_value(value)
        .map_err(|err| DisentError::Serde(ErrorInfo::new("canonical-json", err.to_string())))?;
    serde_json::to_vec(&canonical)
        .map_err(|err| DisentError::Serde(ErrorInfo::new("canonical-json", err.to_string())))
}

/// Computes a stable hexadecimal SHA-256 hash for the provided serializable payload.
pub fn stable_hash_string<T: Serialize>(value: &T) -> Result<String, DisentError> {
    let bytes = to_canonical_json_bytes(value)?;
    let digest = Sha256::digest(bytes);
    Ok(format!("{:x}", digest))
}
