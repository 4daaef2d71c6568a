use chrono::Utc;
use rand::Rng;

use super::error::StorageError;

const KEY_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Replace every character outside `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_filename(filename: &str) -> String {
    let cleaned: String = filename
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    // A leading dot would hide the object on the filesystem backend.
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Build a collision-resistant key: `{prefix}/{base36 millis}-{6 random}-{sanitised name}`.
pub fn disambiguated_key(prefix: &str, filename: &str) -> String {
    let millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
    let mut rng = rand::rng();
    let suffix: String = (0..6)
        .map(|_| KEY_ALPHABET[rng.random_range(0..KEY_ALPHABET.len())] as char)
        .collect();

    format!(
        "{}/{}-{}-{}",
        prefix.trim_matches('/'),
        to_base36(millis),
        suffix,
        sanitize_filename(filename)
    )
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".into();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(KEY_ALPHABET[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

/// Validate an object key supplied by a caller.
pub fn validate_object_key(key: &str) -> Result<&str, StorageError> {
    let invalid = |msg: &str| Err(StorageError::InvalidKey(msg.to_string()));

    if key.is_empty() {
        return invalid("key cannot be empty");
    }
    if key.len() > 512 {
        return invalid("key exceeds maximum length of 512 characters");
    }
    if key.contains('\0') || key.chars().any(|c| c.is_ascii_control()) {
        return invalid("key must not contain control characters");
    }
    if key.contains('\\') {
        return invalid("key must not contain backslashes");
    }
    if key.starts_with('/') || key.ends_with('/') {
        return invalid("key must not start or end with '/'");
    }
    for segment in key.split('/') {
        if segment.is_empty() {
            return invalid("key must not contain empty segments");
        }
        if segment.starts_with('.') {
            return invalid("key segments must not start with '.'");
        }
    }
    Ok(key)
}
