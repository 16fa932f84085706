use quicknote_core::ViewPolicy;
use serde::{Deserialize, Serialize};

/// Stored in redb as bincode-encoded bytes, keyed by note id.
/// The server only ever holds ciphertext; every other field is plaintext so
/// the sweep can evict without any key material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub ciphertext: String,
    pub iv: String,
    pub salt: Option<String>,
    pub has_password: bool,
    /// Epoch millis after which the note is dead.
    pub expires_at: Option<i64>,
    pub max_views: Option<u32>,
    pub burn_after_reading: bool,
    /// Counted views so far. Only ever incremented.
    pub view_count: u32,
    pub created_at: i64,
}

impl NoteRecord {
    pub fn view_policy(&self) -> ViewPolicy {
        // Rows are validated on insert; fall back to the strictest reading if
        // one somehow carries a zero limit.
        ViewPolicy::from_parts(self.max_views, self.burn_after_reading)
            .unwrap_or(ViewPolicy::BurnAfterReading)
    }

    /// True once `expires_at` lies strictly in the past.
    pub fn is_expired(&self, now: i64) -> bool {
        matches!(self.expires_at, Some(exp) if exp < now)
    }

    pub fn is_exhausted(&self) -> bool {
        self.view_policy().is_exhausted(self.view_count)
    }

    /// Garbage-collection predicate.
    pub fn is_dead(&self, now: i64) -> bool {
        self.is_expired(now) || self.is_exhausted()
    }
}
