//! Password-based token encryption.
//!
//! A 256-bit key is derived from the password with PBKDF2-HMAC-SHA256 and a
//! fresh 32-byte salt, then the token is sealed with AES-256-GCM. The random
//! 96-bit nonce is stored in front of the sealed bytes, so one base64 string
//! carries everything except the salt.

use base64::{engine::general_purpose::URL_SAFE, Engine};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use zeroize::Zeroizing;

use super::error::EncryptionError;

pub const SALT_LEN: usize = 32;
pub const KEY_LEN: usize = 32;
pub const PBKDF2_ITERATIONS: u32 = 100_000;
/// Highest iteration count accepted from a stored blob.
pub const MAX_ITERATIONS: u32 = 10 * PBKDF2_ITERATIONS;
pub const ALGORITHM: &str = "PBKDF2-SHA256";

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Everything needed to decrypt a token, minus the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedToken {
    pub encrypted_token: String,
    pub salt: String,
    pub algorithm: String,
    pub iterations: u32,
}

/// Derive a key from `password`, generating a random salt when none is given.
///
/// Returns the key together with the salt that produced it.
pub fn derive_key(
    password: &str,
    salt: Option<&[u8]>,
) -> Result<(Zeroizing<[u8; KEY_LEN]>, Vec<u8>), EncryptionError> {
    let salt = match salt {
        Some(salt) => salt.to_vec(),
        None => generate_salt()?,
    };
    let key = derive_with_iterations(password, &salt, PBKDF2_ITERATIONS)?;
    Ok((key, salt))
}

fn derive_with_iterations(
    password: &str,
    salt: &[u8],
    iterations: u32,
) -> Result<Zeroizing<[u8; KEY_LEN]>, EncryptionError> {
    if salt.is_empty() {
        return Err(EncryptionError::Key("salt must not be empty".to_string()));
    }
    let iterations = NonZeroU32::new(iterations)
        .ok_or_else(|| EncryptionError::Key("iteration count must be non-zero".to_string()))?;

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        salt,
        password.as_bytes(),
        &mut key[..],
    );
    Ok(key)
}

pub fn generate_salt() -> Result<Vec<u8>, EncryptionError> {
    let mut salt = vec![0u8; SALT_LEN];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| EncryptionError::Key("failed to generate random salt".to_string()))?;
    Ok(salt)
}

/// Encrypt `plaintext` under a key derived from `password` and a fresh salt.
pub fn encrypt(plaintext: &str, password: &str) -> Result<EncryptedToken, EncryptionError> {
    let (key, salt) = derive_key(password, None)
        .map_err(|e| EncryptionError::Data(format!("failed to encrypt token: {e}")))?;
    let sealed = seal(&key, plaintext.as_bytes())?;

    Ok(EncryptedToken {
        encrypted_token: URL_SAFE.encode(sealed),
        salt: URL_SAFE.encode(&salt),
        algorithm: ALGORITHM.to_string(),
        iterations: PBKDF2_ITERATIONS,
    })
}

/// Decrypt a blob produced by [`encrypt`].
///
/// A wrong password and a damaged blob both surface as
/// [`EncryptionError::Data`].
pub fn decrypt(blob: &EncryptedToken, password: &str) -> Result<String, EncryptionError> {
    if blob.algorithm != ALGORITHM {
        return Err(EncryptionError::Data(format!(
            "unsupported algorithm: {}",
            blob.algorithm
        )));
    }

    if blob.iterations > MAX_ITERATIONS {
        return Err(EncryptionError::Data(format!(
            "iteration count {} exceeds the limit of {}",
            blob.iterations, MAX_ITERATIONS
        )));
    }

    let sealed = URL_SAFE
        .decode(&blob.encrypted_token)
        .map_err(|e| EncryptionError::Data(format!("invalid ciphertext encoding: {e}")))?;
    let salt = URL_SAFE
        .decode(&blob.salt)
        .map_err(|e| EncryptionError::Data(format!("invalid salt encoding: {e}")))?;

    let key = derive_with_iterations(password, &salt, blob.iterations)
        .map_err(|e| EncryptionError::Data(format!("failed to decrypt token: {e}")))?;
    let plaintext = open(&key, &sealed)?;

    String::from_utf8(plaintext)
        .map_err(|_| EncryptionError::Data("decrypted token is not valid UTF-8".to_string()))
}

fn seal(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| EncryptionError::Key("failed to create AES-256-GCM key".to_string()))?;
    let less_safe = LessSafeKey::new(unbound);

    let mut nonce_bytes = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut nonce_bytes)
        .map_err(|_| EncryptionError::Data("failed to generate random nonce".to_string()))?;

    let mut in_out = plaintext.to_vec();
    less_safe
        .seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::empty(),
            &mut in_out,
        )
        .map_err(|_| EncryptionError::Data("AES-256-GCM encryption failed".to_string()))?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&in_out);
    Ok(sealed)
}

fn open(key: &[u8; KEY_LEN], sealed: &[u8]) -> Result<Vec<u8>, EncryptionError> {
    if sealed.len() < NONCE_LEN + TAG_LEN {
        return Err(EncryptionError::Data("ciphertext is truncated".to_string()));
    }
    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
        .map_err(|_| EncryptionError::Data("invalid nonce".to_string()))?;

    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| EncryptionError::Key("failed to create AES-256-GCM key".to_string()))?;
    let less_safe = LessSafeKey::new(unbound);

    let mut in_out = ciphertext.to_vec();
    let plaintext = less_safe
        .open_in_place(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| {
            EncryptionError::Data("decryption failed: wrong password or corrupted data".to_string())
        })?;

    Ok(plaintext.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_key_is_deterministic() {
        let salt = [7u8; SALT_LEN];
        let (key1, salt1) = derive_key("correct horse", Some(&salt)).unwrap();
        let (key2, salt2) = derive_key("correct horse", Some(&salt)).unwrap();

        assert_eq!(*key1, *key2);
        assert_eq!(salt1, salt2);
        assert_eq!(key1.len(), KEY_LEN);
    }

    #[test]
    fn test_derive_key_generates_salt() {
        let (key1, salt1) = derive_key("password", None).unwrap();
        let (key2, salt2) = derive_key("password", None).unwrap();

        assert_eq!(salt1.len(), SALT_LEN);
        assert_ne!(salt1, salt2);
        assert_ne!(*key1, *key2);
    }

    #[test]
    fn test_derive_key_rejects_empty_salt() {
        let result = derive_key("password", Some(&[]));
        assert!(matches!(result, Err(EncryptionError::Key(_))));
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let blob = encrypt("api-token-123", "pw1").unwrap();
        assert_eq!(blob.algorithm, ALGORITHM);
        assert_eq!(blob.iterations, PBKDF2_ITERATIONS);

        let token = decrypt(&blob, "pw1").unwrap();
        assert_eq!(token, "api-token-123");
    }

    #[test]
    fn test_encrypt_randomizes_salt_and_ciphertext() {
        let first = encrypt("same token", "same password").unwrap();
        let second = encrypt("same token", "same password").unwrap();

        assert_ne!(first.salt, second.salt);
        assert_ne!(first.encrypted_token, second.encrypted_token);
    }

    #[test]
    fn test_decrypt_with_wrong_password_fails() {
        let blob = encrypt("secret", "pw1").unwrap();
        let result = decrypt(&blob, "pw2");
        assert!(matches!(result, Err(EncryptionError::Data(_))));
    }

    #[test]
    fn test_decrypt_tampered_ciphertext_fails() {
        let mut blob = encrypt("do not tamper", "pw").unwrap();
        let mut sealed = URL_SAFE.decode(&blob.encrypted_token).unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        blob.encrypted_token = URL_SAFE.encode(sealed);

        assert!(matches!(decrypt(&blob, "pw"), Err(EncryptionError::Data(_))));
    }

    #[test]
    fn test_decrypt_truncated_ciphertext_fails() {
        let mut blob = encrypt("token", "pw").unwrap();
        blob.encrypted_token = URL_SAFE.encode([1u8; 8]);

        assert!(matches!(decrypt(&blob, "pw"), Err(EncryptionError::Data(_))));
    }

    #[test]
    fn test_decrypt_unknown_algorithm_fails() {
        let mut blob = encrypt("token", "pw").unwrap();
        blob.algorithm = "ROT13".to_string();

        assert!(matches!(decrypt(&blob, "pw"), Err(EncryptionError::Data(_))));
    }

    #[test]
    fn test_excessive_iterations_are_rejected() {
        let mut blob = encrypt("token", "pw").unwrap();
        blob.iterations = u32::MAX;

        assert!(matches!(decrypt(&blob, "pw"), Err(EncryptionError::Data(_))));
    }

    #[test]
    fn test_encoded_fields_are_url_safe() {
        let blob = encrypt("token", "pw").unwrap();
        for field in [&blob.encrypted_token, &blob.salt] {
            assert!(!field.contains('+'));
            assert!(!field.contains('/'));
        }
        assert_eq!(URL_SAFE.decode(&blob.salt).unwrap().len(), SALT_LEN);
    }
}
