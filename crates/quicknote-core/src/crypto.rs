//! Client-side note encryption.
//!
//! Two ways of obtaining the 256-bit ChaCha20-Poly1305 key:
//!
//! - **Password mode**: the key is derived from a user-chosen password with
//!   PBKDF2-HMAC-SHA256 and a fresh random salt. The salt is stored next to
//!   the ciphertext.
//! - **Link-key mode**: the key is 32 bytes of CSPRNG output that only ever
//!   appears in the share link's fragment. No derivation is needed, so no salt
//!   is produced.
//!
//! Decryption picks the mode from the presence of the salt.

use std::fmt;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{Error, Result};

/// Default PBKDF2-HMAC-SHA256 iteration count (OWASP 2023 recommendation).
pub const PBKDF2_ITERATIONS: u32 = 600_000;
pub const KEY_BITS: usize = 256;
pub const SALT_LEN: usize = 16;
pub const NONCE_LEN: usize = 12;
pub const LINK_KEY_LEN: usize = 32;

// ── Secrets ───────────────────────────────────────────────────────────────────

/// High-entropy key carried in the share link fragment.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct LinkKey([u8; LINK_KEY_LEN]);

impl LinkKey {
    pub fn generate() -> Self {
        let mut bytes = [0u8; LINK_KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Parse the URL-safe base64 form found in a link fragment.
    pub fn parse(encoded: &str) -> Option<Self> {
        let decoded = Zeroizing::new(URL_SAFE_NO_PAD.decode(encoded.trim()).ok()?);
        let bytes: [u8; LINK_KEY_LEN] = decoded.as_slice().try_into().ok()?;
        Some(Self(bytes))
    }

    /// URL-safe, unpadded base64 (43 characters).
    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; LINK_KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LinkKey(..)")
    }
}

pub enum Secret {
    Password(Zeroizing<String>),
    LinkKey(LinkKey),
}

impl Secret {
    pub fn password(password: impl Into<String>) -> Self {
        Secret::Password(Zeroizing::new(password.into()))
    }

    pub fn has_password(&self) -> bool {
        matches!(self, Secret::Password(_))
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Secret::Password(_) => f.write_str("Secret::Password(..)"),
            Secret::LinkKey(_) => f.write_str("Secret::LinkKey(..)"),
        }
    }
}

// ── Payload ───────────────────────────────────────────────────────────────────

/// Everything the server stores for a note. None of it is secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedNote {
    /// Standard base64 of ciphertext plus Poly1305 tag.
    pub ciphertext: String,
    /// Hex-encoded 12-byte nonce.
    pub iv: String,
    /// Hex-encoded 16-byte PBKDF2 salt; only present in password mode.
    pub salt: Option<String>,
}

// ── Key derivation ────────────────────────────────────────────────────────────

/// PBKDF2-HMAC-SHA256. Same inputs always yield the same key.
pub fn derive_key(
    secret: &[u8],
    salt: &[u8],
    iterations: u32,
    key_bits: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    if iterations == 0 {
        return Err(Error::Kdf("iteration count must be non-zero".into()));
    }
    if key_bits == 0 || key_bits % 8 != 0 {
        return Err(Error::Kdf(format!(
            "key size must be a positive multiple of 8 bits (got {key_bits})"
        )));
    }

    let mut out = Zeroizing::new(vec![0u8; key_bits / 8]);
    pbkdf2_hmac::<Sha256>(secret, salt, iterations, out.as_mut_slice());
    Ok(out)
}

// ── Cipher ────────────────────────────────────────────────────────────────────

/// Encrypts and decrypts notes with a fixed PBKDF2 work factor.
///
/// Both sides of a note must agree on the iteration count; production code
/// should stick to [`NoteCipher::default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteCipher {
    iterations: u32,
}

impl Default for NoteCipher {
    fn default() -> Self {
        Self {
            iterations: PBKDF2_ITERATIONS,
        }
    }
}

impl NoteCipher {
    pub fn with_iterations(iterations: u32) -> Self {
        Self { iterations }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Encrypt `plaintext` under a fresh nonce (and a fresh salt in password
    /// mode). Empty notes are rejected so that an empty decryption result can
    /// never be mistaken for a legitimate note.
    pub fn encrypt(&self, plaintext: &str, secret: &Secret) -> Result<EncryptedNote> {
        if plaintext.is_empty() {
            return Err(Error::Validation("note must not be empty".into()));
        }

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let (key, salt) = match secret {
            Secret::Password(password) => {
                let mut salt = [0u8; SALT_LEN];
                OsRng.fill_bytes(&mut salt);
                let key = derive_key(password.as_bytes(), &salt, self.iterations, KEY_BITS)?;
                (key, Some(hex::encode(salt)))
            }
            Secret::LinkKey(link_key) => (Zeroizing::new(link_key.as_bytes().to_vec()), None),
        };

        let cipher =
            ChaCha20Poly1305::new_from_slice(key.as_slice()).map_err(|_| Error::Encryption)?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| Error::Encryption)?;

        Ok(EncryptedNote {
            ciphertext: STANDARD.encode(ciphertext),
            iv: hex::encode(nonce),
            salt,
        })
    }

    /// Decrypt with a password (when the note carries a salt) or with the
    /// base64 link key (when it does not).
    pub fn decrypt(&self, note: &EncryptedNote, secret: &str) -> Result<String> {
        let nonce: [u8; NONCE_LEN] = hex::decode(&note.iv)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or(Error::Decryption)?;
        let ciphertext = STANDARD
            .decode(&note.ciphertext)
            .map_err(|_| Error::Decryption)?;

        let key = match &note.salt {
            Some(salt) => {
                let salt = hex::decode(salt).map_err(|_| Error::Decryption)?;
                derive_key(secret.as_bytes(), &salt, self.iterations, KEY_BITS)?
            }
            None => {
                let link_key = LinkKey::parse(secret).ok_or(Error::Decryption)?;
                Zeroizing::new(link_key.as_bytes().to_vec())
            }
        };

        let cipher =
            ChaCha20Poly1305::new_from_slice(key.as_slice()).map_err(|_| Error::Decryption)?;
        let plaintext = Zeroizing::new(
            cipher
                .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
                .map_err(|_| Error::Decryption)?,
        );

        let text = String::from_utf8(plaintext.to_vec()).map_err(|_| Error::Decryption)?;
        if text.is_empty() {
            return Err(Error::Decryption);
        }
        Ok(text)
    }
}

/// Encrypt with the default work factor.
pub fn encrypt(plaintext: &str, secret: &Secret) -> Result<EncryptedNote> {
    NoteCipher::default().encrypt(plaintext, secret)
}

/// Decrypt with the default work factor.
pub fn decrypt(note: &EncryptedNote, secret: &str) -> Result<String> {
    NoteCipher::default().decrypt(note, secret)
}
