//! Authenticated at-rest encryption for provider client secrets and
//! federated access/refresh tokens.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

const NONCE_LENGTH: usize = 12;
const TAG_LENGTH: usize = 16;

/// Fixed per-deployment salt for stretching the vault passphrase.
/// Rotating the passphrase invalidates every previously sealed secret.
const KEY_SALT: &[u8] = b"keygate-vault-v1";

/// An encrypted secret in its storage form: three colon-joined hex
/// components (ciphertext, initialization vector, authentication tag).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedSecret {
    ciphertext: Vec<u8>,
    iv: [u8; NONCE_LENGTH],
    tag: [u8; TAG_LENGTH],
}

impl fmt::Display for SealedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            hex::encode(&self.ciphertext),
            hex::encode(self.iv),
            hex::encode(self.tag)
        )
    }
}

impl FromStr for SealedSecret {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 {
            return Err(AppError::Crypto(format!(
                "sealed secret must have 3 components, found {}",
                parts.len()
            )));
        }

        let ciphertext = hex::decode(parts[0])
            .map_err(|_| AppError::Crypto("ciphertext is not valid hex".to_string()))?;
        let iv_bytes = hex::decode(parts[1])
            .map_err(|_| AppError::Crypto("iv is not valid hex".to_string()))?;
        let tag_bytes = hex::decode(parts[2])
            .map_err(|_| AppError::Crypto("auth tag is not valid hex".to_string()))?;

        let iv: [u8; NONCE_LENGTH] = iv_bytes
            .try_into()
            .map_err(|_| AppError::Crypto("iv has wrong length".to_string()))?;
        let tag: [u8; TAG_LENGTH] = tag_bytes
            .try_into()
            .map_err(|_| AppError::Crypto("auth tag has wrong length".to_string()))?;

        Ok(SealedSecret {
            ciphertext,
            iv,
            tag,
        })
    }
}

/// Symmetric authenticated encryption bound to one derived key.
#[derive(Clone)]
pub struct CryptoVault {
    key: [u8; 32],
}

impl CryptoVault {
    /// Stretches the configured passphrase into the AES-256 key.
    pub fn new(passphrase: &str) -> Result<Self, AppError> {
        let mut key = [0u8; 32];
        argon2::Argon2::default()
            .hash_password_into(passphrase.as_bytes(), KEY_SALT, &mut key)
            .map_err(|e| AppError::Crypto(format!("key derivation failed: {}", e)))?;
        Ok(Self { key })
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<SealedSecret, AppError> {
        let mut iv = [0u8; NONCE_LENGTH];
        OsRng.fill_bytes(&mut iv);

        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|_| AppError::Crypto("invalid encryption key".to_string()))?;
        let mut sealed = cipher
            .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
            .map_err(|_| AppError::Crypto("encryption failed".to_string()))?;

        // aes-gcm appends the tag to the ciphertext; store it separately.
        if sealed.len() < TAG_LENGTH {
            return Err(AppError::Crypto("ciphertext too short".to_string()));
        }
        let tag_bytes = sealed.split_off(sealed.len() - TAG_LENGTH);
        let tag: [u8; TAG_LENGTH] = tag_bytes
            .try_into()
            .map_err(|_| AppError::Crypto("auth tag has wrong length".to_string()))?;

        Ok(SealedSecret {
            ciphertext: sealed,
            iv,
            tag,
        })
    }

    /// Fails closed: any tag mismatch or truncation is an error, never
    /// silently returned garbage.
    pub fn decrypt(&self, sealed: &SealedSecret) -> Result<String, AppError> {
        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|_| AppError::Crypto("invalid decryption key".to_string()))?;

        let mut combined = sealed.ciphertext.clone();
        combined.extend_from_slice(&sealed.tag);

        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(&sealed.iv),
                Payload {
                    msg: &combined,
                    aad: &[],
                },
            )
            .map_err(|_| AppError::Crypto("authentication tag mismatch".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|_| AppError::Crypto("decrypted data is not UTF-8".to_string()))
    }

    /// Deterministic one-way digest for non-secret comparisons such as
    /// de-duplication. Never used for password storage.
    pub fn fingerprint(&self, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hex::encode(hasher.finalize())
    }
}
