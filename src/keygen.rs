//! License key generation and format validation.
//!
//! Keys look like `KW-F7QD-M3XN-PR8K-WZ2H-A1B2`: the product prefix, four
//! 4-character segments from a visually unambiguous alphabet, and a 2-byte
//! random hex suffix. All randomness comes from the OS CSPRNG.
//!
//! The generator does NOT check the store for collisions; at ~90 bits of
//! entropy a collision is not a practical concern.

use rand::rngs::OsRng;
use rand::{Rng, RngCore};

/// No I, O, 0, 1 - avoids support tickets from misread keys.
const KEY_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

const SEGMENTS: usize = 4;
const SEGMENT_LEN: usize = 4;
const SUFFIX_BYTES: usize = 2;

/// Shortest string accepted as a plausible key by the format check.
const MIN_KEY_LEN: usize = 10;

#[derive(Debug, Clone)]
pub struct KeyGenerator {
    prefix: String,
}

impl KeyGenerator {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.trim_end_matches('-').to_uppercase(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Generate a new license key.
    pub fn generate(&self) -> String {
        let mut rng = OsRng;

        let mut key = self.prefix.clone();
        for _ in 0..SEGMENTS {
            key.push('-');
            for _ in 0..SEGMENT_LEN {
                key.push(KEY_ALPHABET[rng.gen_range(0..KEY_ALPHABET.len())] as char);
            }
        }

        let mut suffix = [0u8; SUFFIX_BYTES];
        rng.fill_bytes(&mut suffix);
        key.push('-');
        key.push_str(&hex::encode_upper(suffix));

        key
    }

    /// Cheap format check to reject garbage before hitting the store.
    ///
    /// Accepts any `PREFIX-`-prefixed string of uppercase alphanumerics and
    /// dashes of plausible length, not only keys this generator would mint -
    /// older key layouts must keep verifying.
    pub fn is_valid_format(&self, key: &str) -> bool {
        let Some(rest) = key.strip_prefix(&self.prefix) else {
            return false;
        };

        key.len() >= MIN_KEY_LEN
            && rest.starts_with('-')
            && rest[1..]
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'-')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_shape() {
        let keygen = KeyGenerator::new("KW");
        let key = keygen.generate();

        assert!(key.starts_with("KW-"));
        // KW + 4 segments of 4 + 4 hex chars, dash-separated
        assert_eq!(key.len(), 2 + 5 * SEGMENTS + 5);

        let parts: Vec<&str> = key.split('-').collect();
        assert_eq!(parts.len(), SEGMENTS + 2);
        for segment in &parts[1..=SEGMENTS] {
            assert_eq!(segment.len(), SEGMENT_LEN);
            assert!(
                segment.bytes().all(|b| KEY_ALPHABET.contains(&b)),
                "segment {} contains a character outside the key alphabet",
                segment
            );
        }
        assert_eq!(parts[SEGMENTS + 1].len(), SUFFIX_BYTES * 2);
    }

    #[test]
    fn test_keys_are_unique() {
        let keygen = KeyGenerator::new("KW");
        let keys: std::collections::HashSet<String> =
            (0..100).map(|_| keygen.generate()).collect();
        assert_eq!(keys.len(), 100);
    }

    #[test]
    fn test_generated_keys_pass_format_check() {
        let keygen = KeyGenerator::new("KW");
        for _ in 0..20 {
            let key = keygen.generate();
            assert!(keygen.is_valid_format(&key), "generated key rejected: {}", key);
        }
    }

    #[test]
    fn test_format_check_rejects_garbage() {
        let keygen = KeyGenerator::new("KW");

        assert!(!keygen.is_valid_format(""));
        assert!(!keygen.is_valid_format("KW"));
        assert!(!keygen.is_valid_format("KW-SHORT")); // under minimum length
        assert!(!keygen.is_valid_format("XX-AAAA-BBBB-CCCC-DDDD-1234")); // wrong prefix
        assert!(!keygen.is_valid_format("KWAAAA-BBBB-CCCC-DDDD-1234")); // no separator
        assert!(!keygen.is_valid_format("KW-aaaa-bbbb-cccc-dddd-1234")); // lowercase
        assert!(!keygen.is_valid_format("KW-AAAA-BBBB CCCC-DDDD-1234")); // whitespace
    }

    #[test]
    fn test_format_check_accepts_older_layouts() {
        // Earlier builds shipped base-36 timestamp keys; they must keep verifying
        let keygen = KeyGenerator::new("KW");
        assert!(keygen.is_valid_format("KW-M2X9K1F3-7A2B9C0D"));
    }

    #[test]
    fn test_prefix_is_normalized() {
        let keygen = KeyGenerator::new("kw-");
        assert_eq!(keygen.prefix(), "KW");
        assert!(keygen.generate().starts_with("KW-"));
    }
}
