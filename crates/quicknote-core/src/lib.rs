//! Pieces of Quicknote that run on both sides of the wire.
//!
//! Encryption and decryption happen on the client only; the server stores the
//! [`crypto::EncryptedNote`] fields verbatim. Expiry computation and the view
//! policy are shared so both sides agree on what a submission means.

pub mod crypto;
pub mod error;
pub mod expiry;
pub mod policy;
pub mod wire;

pub use crypto::{decrypt, encrypt, EncryptedNote, LinkKey, NoteCipher, Secret};
pub use error::{Error, Result};
pub use expiry::{expires_at, ExpiryDuration, ExpiryUnit};
pub use policy::ViewPolicy;
