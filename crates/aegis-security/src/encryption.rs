//! AES-256-GCM authenticated encryption (spec §4.4.3).
//!
//! The envelope format is `hex(iv) : hex(ciphertext) : hex(tag)` — three
//! hex fields separated by a single `:`, matching the source system's
//! wire format exactly (spec §3, §4.4.3). `aes-gcm`'s `Aes256Gcm` appends
//! the 16-byte tag to the ciphertext on encrypt and expects it appended on
//! decrypt, so this module splits/rejoins it at the envelope boundary
//! rather than carrying it as a fourth field.

use aegis_core::config;
use aegis_core::{Error, ErrorKind};
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;

/// AES-256 key size in bytes.
pub const KEY_SIZE: usize = 32;
/// GCM IV size in bytes — 96 bits, generated fresh per call and never
/// reused with the same key (spec §3, SPEC_FULL additions).
pub const IV_SIZE: usize = 12;
/// GCM authentication tag size in bytes.
pub const TAG_SIZE: usize = 16;

/// Resolved encryption configuration (spec §6.1: `ENCRYPTION_KEY`, a
/// hex-encoded 32-byte key).
#[derive(Clone)]
pub struct EncryptionConfig {
    key: [u8; KEY_SIZE],
}

impl EncryptionConfig {
    /// Resolves `ENCRYPTION_KEY` (explicit argument wins) and hex-decodes
    /// it to exactly [`KEY_SIZE`] bytes. Fails with [`ErrorKind::Configuration`]
    /// if absent or malformed.
    pub fn resolve(explicit_hex_key: Option<String>) -> Result<Self, Error> {
        let hex_key = config::resolve_required_string(explicit_hex_key, "ENCRYPTION_KEY")
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::Configuration,
                    "ENCRYPTION_KEY is required to construct encryption primitives",
                )
            })?;

        let bytes = hex::decode(&hex_key)
            .map_err(|e| Error::new(ErrorKind::Configuration, format!("ENCRYPTION_KEY is not valid hex: {e}")))?;

        if bytes.len() != KEY_SIZE {
            return Err(Error::new(
                ErrorKind::Configuration,
                format!("ENCRYPTION_KEY must decode to {KEY_SIZE} bytes, got {}", bytes.len()),
            ));
        }

        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&bytes);
        Ok(Self { key })
    }

    pub fn key_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }
}

/// Draws a fresh 32-byte key from the OS CSPRNG and hex-encodes it —
/// `generateKey()` from spec §4.4.3.
pub fn generate_key() -> String {
    let mut key = [0u8; KEY_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut key);
    hex::encode(key)
}

fn build_cipher(key: &[u8]) -> Result<Aes256Gcm, Error> {
    if key.len() != KEY_SIZE {
        return Err(Error::new(
            ErrorKind::InvalidArgument,
            format!("encryption key must be {KEY_SIZE} bytes, got {}", key.len()),
        ));
    }
    Ok(Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)))
}

/// Encrypts `plaintext` under `key` (exactly [`KEY_SIZE`] bytes), binding
/// `aad` as associated data. Returns the hex envelope
/// `iv:ciphertext:tag`. Rejects empty plaintext and wrong-length keys.
pub fn encrypt(plaintext: &[u8], key: &[u8], aad: &[u8]) -> Result<String, Error> {
    if plaintext.is_empty() {
        return Err(Error::invalid_argument("plaintext must not be empty"));
    }

    let cipher = build_cipher(key)?;

    let mut iv_bytes = [0u8; IV_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut iv_bytes);
    let nonce = Nonce::from_slice(&iv_bytes);

    let sealed = cipher
        .encrypt(nonce, Payload { msg: plaintext, aad })
        .map_err(|_| Error::new(ErrorKind::AuthenticationFailed, "encryption failed"))?;

    let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_SIZE);

    Ok(format!(
        "{}:{}:{}",
        hex::encode(iv_bytes),
        hex::encode(ciphertext),
        hex::encode(tag)
    ))
}

/// Decrypts an envelope produced by [`encrypt`]. Fails with
/// [`ErrorKind::InvalidArgument`] for a malformed envelope (wrong part
/// count, bad hex, wrong IV/tag length) and [`ErrorKind::AuthenticationFailed`]
/// if the GCM tag doesn't verify — deliberately not distinguishing
/// tampering from a wrong AAD, per spec §4.4.3.
pub fn decrypt(envelope: &str, key: &[u8], aad: &[u8]) -> Result<Vec<u8>, Error> {
    let cipher = build_cipher(key)?;

    let parts: Vec<&str> = envelope.split(':').collect();
    if parts.len() != 3 {
        return Err(Error::invalid_argument("envelope must have exactly 3 ':'-separated fields"));
    }

    let iv = hex::decode(parts[0]).map_err(|_| Error::invalid_argument("malformed iv hex"))?;
    let ciphertext = hex::decode(parts[1]).map_err(|_| Error::invalid_argument("malformed ciphertext hex"))?;
    let tag = hex::decode(parts[2]).map_err(|_| Error::invalid_argument("malformed tag hex"))?;

    if iv.len() != IV_SIZE {
        return Err(Error::invalid_argument(format!("iv must be {IV_SIZE} bytes")));
    }
    if tag.len() != TAG_SIZE {
        return Err(Error::invalid_argument(format!("tag must be {TAG_SIZE} bytes")));
    }

    let mut sealed = ciphertext;
    sealed.extend_from_slice(&tag);

    let nonce = Nonce::from_slice(&iv);
    cipher
        .decrypt(nonce, Payload { msg: &sealed, aad })
        .map_err(|_| Error::new(ErrorKind::AuthenticationFailed, "GCM authentication failed"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_with_matching_aad() {
        let key = hex::decode(generate_key()).unwrap();
        let envelope = encrypt(b"secret", &key, b"user:1").unwrap();
        let plaintext = decrypt(&envelope, &key, b"user:1").unwrap();
        assert_eq!(plaintext, b"secret");
    }

    #[test]
    fn wrong_aad_fails_authentication() {
        let key = hex::decode(generate_key()).unwrap();
        let envelope = encrypt(b"secret", &key, b"user:1").unwrap();
        let err = decrypt(&envelope, &key, b"user:2").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthenticationFailed);
    }

    #[test]
    fn bit_flip_in_ciphertext_fails_authentication() {
        let key = hex::decode(generate_key()).unwrap();
        let envelope = encrypt(b"secret", &key, b"").unwrap();
        let parts: Vec<&str> = envelope.split(':').collect();
        let mut ciphertext_bytes = hex::decode(parts[1]).unwrap();
        ciphertext_bytes[0] ^= 0x01;
        let tampered = format!("{}:{}:{}", parts[0], hex::encode(ciphertext_bytes), parts[2]);

        let err = decrypt(&tampered, &key, b"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthenticationFailed);
    }

    #[test]
    fn empty_plaintext_is_rejected() {
        let key = hex::decode(generate_key()).unwrap();
        let err = encrypt(b"", &key, b"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn wrong_key_length_is_rejected() {
        let err = encrypt(b"secret", &[0u8; 10], b"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn malformed_envelope_shape_is_rejected() {
        let key = hex::decode(generate_key()).unwrap();
        let err = decrypt("only-one-part", &key, b"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn generated_keys_are_64_hex_characters() {
        let key = generate_key();
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn iv_is_unique_across_many_encryptions_of_same_plaintext() {
        let key = hex::decode(generate_key()).unwrap();
        let mut ivs = std::collections::HashSet::new();
        for _ in 0..200 {
            let envelope = encrypt(b"same plaintext", &key, b"").unwrap();
            let iv = envelope.split(':').next().unwrap().to_string();
            assert!(ivs.insert(iv), "IV collision observed within 200 encryptions");
        }
    }

    #[test]
    fn encryption_config_resolves_from_explicit_hex_key() {
        let key_hex = generate_key();
        let cfg = EncryptionConfig::resolve(Some(key_hex.clone())).unwrap();
        assert_eq!(hex::encode(cfg.key_bytes()), key_hex);
    }

    #[test]
    fn encryption_config_rejects_missing_key() {
        // SAFETY: this test owns no other env var named ENCRYPTION_KEY.
        std::env::remove_var("ENCRYPTION_KEY");
        let err = EncryptionConfig::resolve(None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
