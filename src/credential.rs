//! One-time login code generation and digesting.
//!
//! Codes are 6-digit numerics meant for manual entry. Only a SHA-256 digest
//! over `"{normalized_email}|{code}"` is ever stored, so a database leak
//! cannot replay outstanding codes, and a code presented with the wrong
//! email never matches.

use crate::domain::ValidationError;
use rand::rngs::OsRng;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Number of digits in a login code.
pub const CODE_LEN: usize = 6;

/// Lowercases and trims an email for storage and comparison.
pub fn normalize_email(raw: &str) -> String {
    // ---
    raw.trim().to_lowercase()
}

/// Validates and normalizes a submitted email.
///
/// Syntactic bar is deliberately low (the address is proven by delivery,
/// not by parsing): it must be non-empty and contain `@`.
pub fn validate_email(raw: &str) -> Result<String, ValidationError> {
    // ---
    let email = normalize_email(raw);
    if email.is_empty() || !email.contains('@') {
        return Err(ValidationError::new("invalid email"));
    }
    Ok(email)
}

/// Rejects anything that is not exactly six ASCII digits.
pub fn validate_code_shape(code: &str) -> Result<(), ValidationError> {
    // ---
    if code.len() != CODE_LEN || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::new("invalid code"));
    }
    Ok(())
}

/// Generates a cryptographically secure 6-digit code, zero-padded.
pub fn generate_code() -> String {
    // ---
    // gen_range is uniform over the interval, so leading zeros are as
    // likely as any other digit.
    let n: u32 = OsRng.gen_range(0..1_000_000);
    format!("{n:06}")
}

/// Hex-encoded SHA-256 digest binding a code to its normalized email.
pub fn code_digest(normalized_email: &str, code: &str) -> String {
    // ---
    let mut hasher = Sha256::new();
    hasher.update(normalized_email.as_bytes());
    hasher.update(b"|");
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn email_normalization_lowercases_and_trims() {
        // ---
        assert_eq!(
            validate_email("  Traveler@Example.COM ").unwrap(),
            "traveler@example.com"
        );
    }

    #[test]
    fn email_without_at_rejected() {
        // ---
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("   ").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn code_shape_enforced() {
        // ---
        assert!(validate_code_shape("042137").is_ok());
        assert!(validate_code_shape("12345").is_err());
        assert!(validate_code_shape("1234567").is_err());
        assert!(validate_code_shape("12a456").is_err());
        assert!(validate_code_shape("").is_err());
    }

    #[test]
    fn generated_codes_are_six_digits() {
        // ---
        for _ in 0..100 {
            let code = generate_code();
            assert!(validate_code_shape(&code).is_ok(), "bad code: {code}");
        }
    }

    #[test]
    fn digest_is_stable_and_email_bound() {
        // ---
        let a = code_digest("traveler@example.com", "123456");
        let b = code_digest("traveler@example.com", "123456");
        let c = code_digest("other@example.com", "123456");
        let d = code_digest("traveler@example.com", "654321");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(a.len(), 64); // hex-encoded SHA-256
    }
}
