//! Content hashing helpers.
//!
//! Everything that is hashed goes through `canonical_json` first so key order
//! never changes a digest.

use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

use crate::core::error::VerdictError;

pub fn sha256_bytes_hex(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    format!("{:x}", hasher.finalize())
}

/// Prefixed form stored in manifests and provenance records.
pub fn sha256_hex(input: &[u8]) -> String {
    format!("sha256:{}", sha256_bytes_hex(input))
}

/// `<prefix>_<first 12 hex chars>` identifier derived from content.
pub fn short_id(prefix: &str, content: &str) -> String {
    let digest = sha256_bytes_hex(content.as_bytes());
    format!("{}_{}", prefix, &digest[..12])
}

/// Trim and collapse interior whitespace.
pub fn normalize_text(raw: &str) -> String {
    static WS: OnceLock<Regex> = OnceLock::new();
    let ws = WS.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"));
    ws.replace_all(raw.trim(), " ").into_owned()
}

pub fn normalize_json_value(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut normalized = serde_json::Map::new();
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                normalized.insert(key.clone(), normalize_json_value(&map[key]));
            }
            serde_json::Value::Object(normalized)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(normalize_json_value).collect())
        }
        _ => value.clone(),
    }
}

pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, VerdictError> {
    let raw = serde_json::to_value(value)?;
    Ok(serde_json::to_string(&normalize_json_value(&raw))?)
}

pub fn hash_canonical<T: Serialize>(value: &T) -> Result<String, VerdictError> {
    Ok(sha256_hex(canonical_json(value)?.as_bytes()))
}
