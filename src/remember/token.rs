//! Random token generation.

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

/// Number of random bytes behind each token.
pub const TOKEN_BYTES: usize = 32;

/// Source of opaque tokens for new and rotated triplets.
pub trait TokenSource: Send + Sync {
    /// Create a fresh token.
    ///
    /// # Errors
    /// Returns an error if the entropy source fails.
    fn create_token(&self) -> Result<String>;
}

/// Tokens from the operating system CSPRNG, encoded as unpadded URL-safe
/// base64 (43 characters for 32 bytes).
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRngTokenSource;

impl TokenSource for OsRngTokenSource {
    fn create_token(&self) -> Result<String> {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .context("failed to generate remember-me token")?;
        Ok(Base64UrlUnpadded::encode_string(&bytes))
    }
}

/// SHA-256 digest of a token, for storage and comparison without keeping
/// the raw value.
#[must_use]
pub fn hash_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn tokens_have_fixed_length() {
        let source = OsRngTokenSource;
        for _ in 0..16 {
            assert_eq!(source.create_token().unwrap().len(), 43);
        }
    }

    #[test]
    fn tokens_decode_to_token_bytes() {
        let token = OsRngTokenSource.create_token().unwrap();
        let decoded = Base64UrlUnpadded::decode_vec(&token).unwrap();
        assert_eq!(decoded.len(), TOKEN_BYTES);
    }

    #[test]
    fn tokens_never_contain_delimiter() {
        let source = OsRngTokenSource;
        for _ in 0..64 {
            let token = source.create_token().unwrap();
            assert!(!token.contains(crate::remember::triplet::DELIMITER));
            assert!(token.chars().all(|c| c.is_ascii_graphic()));
        }
    }

    #[test]
    fn hash_token_is_sha256() {
        let digest = hash_token("token");
        assert_eq!(digest.len(), 32);
        assert_eq!(digest, hash_token("token"));
        assert_ne!(digest, hash_token("token-salt"));
    }

    #[test]
    fn tokens_do_not_repeat() {
        let source = OsRngTokenSource;
        let tokens: HashSet<String> = (0..256).map(|_| source.create_token().unwrap()).collect();
        assert_eq!(tokens.len(), 256);
    }
}
