//! Cryptographic utilities for device token generation and hashing.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use sha2::{Digest, Sha256};

/// Prefix carried by every child device token.
pub const DEVICE_TOKEN_PREFIX: &str = "fgd_";

/// Number of random bytes behind a device token.
const DEVICE_TOKEN_RANDOM_BYTES: usize = 32;

/// Length of the lookup prefix stored next to the token hash.
const TOKEN_LOOKUP_PREFIX_LEN: usize = 8;

/// Computes SHA-256 hash of the input and returns it as a hex string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generates a new opaque device token (`fgd_` + url-safe base64).
pub fn generate_device_token() -> String {
    let mut rng = rand::thread_rng();
    let random_bytes: Vec<u8> = (0..DEVICE_TOKEN_RANDOM_BYTES).map(|_| rng.gen()).collect();
    format!("{}{}", DEVICE_TOKEN_PREFIX, URL_SAFE_NO_PAD.encode(&random_bytes))
}

/// Extracts the lookup prefix from a device token (first 8 characters after "fgd_").
pub fn extract_token_prefix(token: &str) -> Option<&str> {
    let rest = token.strip_prefix(DEVICE_TOKEN_PREFIX)?;
    if rest.len() >= TOKEN_LOOKUP_PREFIX_LEN && rest.is_char_boundary(TOKEN_LOOKUP_PREFIX_LEN) {
        Some(&rest[..TOKEN_LOOKUP_PREFIX_LEN])
    } else {
        None
    }
}

/// Generates a uniformly distributed numeric code with the given number of digits.
///
/// Leading zeros are kept, so `"004217"` is a valid 6-digit code.
pub fn random_numeric_code(digits: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..digits)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        let hash = sha256_hex("test");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[test]
    fn test_sha256_hex_deterministic() {
        assert_eq!(sha256_hex("same_input"), sha256_hex("same_input"));
        assert_ne!(sha256_hex("input1"), sha256_hex("input2"));
    }

    #[test]
    fn test_generate_device_token_format() {
        let token = generate_device_token();
        assert!(token.starts_with(DEVICE_TOKEN_PREFIX));
        // 32 bytes -> 43 base64 chars without padding
        assert_eq!(token.len(), DEVICE_TOKEN_PREFIX.len() + 43);
        assert!(!token.contains('='));
    }

    #[test]
    fn test_generate_device_token_unique() {
        assert_ne!(generate_device_token(), generate_device_token());
    }

    #[test]
    fn test_extract_token_prefix() {
        assert_eq!(extract_token_prefix("fgd_abcdefgh12345"), Some("abcdefgh"));
        assert_eq!(extract_token_prefix("fgd_12345678"), Some("12345678"));
        assert_eq!(extract_token_prefix("fgd_short"), None);
        assert_eq!(extract_token_prefix("pm_abcdefgh12345"), None);
        assert_eq!(extract_token_prefix(""), None);
    }

    #[test]
    fn test_extract_prefix_of_generated_token() {
        let token = generate_device_token();
        let prefix = extract_token_prefix(&token).unwrap();
        assert_eq!(prefix.len(), 8);
        assert!(token[4..].starts_with(prefix));
    }

    #[test]
    fn test_random_numeric_code() {
        for _ in 0..100 {
            let code = random_numeric_code(6);
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
