use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Prefix that marks a string as one of our API keys.
pub const API_KEY_PREFIX: &str = "atk_";

/// A freshly generated API key. `raw` is shown to the operator once; only `hash` is stored.
#[derive(Debug, Clone)]
pub struct IssuedKey {
    pub raw: String,
    pub hash: String,
}

/// Generate a random API key (`atk_` + 48 hex chars) and its stored hash.
pub fn generate_api_key() -> IssuedKey {
    let bytes: [u8; 24] = rand::random();
    let raw = format!("{API_KEY_PREFIX}{}", hex::encode(bytes));
    let hash = hash_api_key(&raw);
    IssuedKey { raw, hash }
}

/// SHA-256 hex digest of a presented key.
pub fn hash_api_key(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// Compare two hex digests in constant time. Unequal lengths never match.
pub fn hashes_match(presented: &str, stored: &str) -> bool {
    let a = presented.as_bytes();
    let b = stored.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Compare a presented secret against the configured one without leaking
/// the position of the first differing byte or the secret's length.
pub fn secrets_match(presented: &str, expected: &str) -> bool {
    let a = Sha256::digest(presented.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    a.as_slice().ct_eq(b.as_slice()).into()
}
