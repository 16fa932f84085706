use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed input rejected before any cryptography or I/O happens.
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrong secret, corrupted payload, or an empty result.
    ///
    /// Deliberately carries no detail: callers must not be able to tell a
    /// wrong password from a tampered ciphertext.
    #[error("decryption failed")]
    Decryption,

    #[error("encryption failed")]
    Encryption,

    #[error("invalid key derivation parameters: {0}")]
    Kdf(String),
}
