use crate::error::{instance_error, AppResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sha2::{Digest, Sha256};

/// PINs are 4 to 8 digits
pub fn validate_pin(pin: &str) -> AppResult<()> {
    if (4..=8).contains(&pin.len()) && pin.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(instance_error("PIN must be 4 to 8 digits"))
    }
}

/// Fresh random salt
pub fn generate_salt() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Salted SHA-256 of the PIN
pub fn hash_pin(salt: &str, pin: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(pin.as_bytes());
    STANDARD.encode(hasher.finalize())
}

/// Check a PIN against a stored hash
pub fn verify_pin(salt: &str, pin: &str, pin_hash: &str) -> bool {
    hash_pin(salt, pin) == pin_hash
}
