//! JSON bodies exchanged between the client and the HTTP API.

use serde::{Deserialize, Serialize};

use crate::crypto::EncryptedNote;
use crate::policy::ViewPolicy;

/// `POST /api/notes`. Carries ciphertext only; the key never leaves the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNoteRequest {
    pub ciphertext: String,
    pub iv: String,
    #[serde(default)]
    pub salt: Option<String>,
    #[serde(default)]
    pub has_password: bool,
    /// Epoch millis.
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub max_views: Option<u32>,
    #[serde(default)]
    pub burn_after_reading: bool,
}

impl CreateNoteRequest {
    pub fn new(note: EncryptedNote, has_password: bool) -> Self {
        Self {
            ciphertext: note.ciphertext,
            iv: note.iv,
            salt: note.salt,
            has_password,
            expires_at: None,
            max_views: None,
            burn_after_reading: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNoteResponse {
    pub id: String,
}

/// `GET /api/notes/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteResponse {
    pub id: String,
    pub ciphertext: String,
    pub iv: String,
    pub salt: Option<String>,
    pub has_password: bool,
    pub expires_at: Option<i64>,
    pub created_at: i64,
    pub view_policy: ViewPolicy,
    pub view_count: u32,
    pub views_remaining: Option<u32>,
}

impl NoteResponse {
    pub fn encrypted(&self) -> EncryptedNote {
        EncryptedNote {
            ciphertext: self.ciphertext.clone(),
            iv: self.iv.clone(),
            salt: self.salt.clone(),
        }
    }
}

/// `POST /api/notes/{id}/views`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ViewResponse {
    pub counted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
