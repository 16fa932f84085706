//! The operations the outside world may perform on notes.
//!
//! Encryption happens before [`Notes::submit`] and decryption after
//! [`Notes::retrieve`]; nothing here ever sees plaintext or key material.

use quicknote_core::wire::{CreateNoteRequest, NoteResponse};
use quicknote_core::ViewPolicy;
use tracing::{info, warn};

use crate::error::{NoteError, Result};
use crate::lifecycle::Lifecycle;
use crate::store::{NoteRecord, NoteStore};

/// Length of generated note ids (nanoid alphabet, ~72 bits).
pub const ID_LEN: usize = 12;
/// Upper bound on the encoded ciphertext.
pub const MAX_CIPHERTEXT_LEN: usize = 1_048_576;
const MAX_PARAM_LEN: usize = 128;
const MAX_ID_LEN: usize = 64;
const INSERT_ATTEMPTS: usize = 3;

/// A submission, already encrypted by the caller.
#[derive(Debug, Clone)]
pub struct NewNote {
    pub ciphertext: String,
    pub iv: String,
    pub salt: Option<String>,
    pub has_password: bool,
    /// Epoch millis.
    pub expires_at: Option<i64>,
    pub view_policy: ViewPolicy,
}

impl TryFrom<CreateNoteRequest> for NewNote {
    type Error = NoteError;

    fn try_from(req: CreateNoteRequest) -> Result<Self> {
        Ok(Self {
            view_policy: ViewPolicy::from_parts(req.max_views, req.burn_after_reading)?,
            ciphertext: req.ciphertext,
            iv: req.iv,
            salt: req.salt,
            has_password: req.has_password,
            expires_at: req.expires_at,
        })
    }
}

/// A live note as handed to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub id: String,
    pub ciphertext: String,
    pub iv: String,
    pub salt: Option<String>,
    pub has_password: bool,
    pub expires_at: Option<i64>,
    pub view_policy: ViewPolicy,
    pub view_count: u32,
    pub created_at: i64,
}

impl Note {
    fn from_record(id: &str, record: NoteRecord) -> Self {
        Self {
            id: id.to_owned(),
            view_policy: record.view_policy(),
            ciphertext: record.ciphertext,
            iv: record.iv,
            salt: record.salt,
            has_password: record.has_password,
            expires_at: record.expires_at,
            view_count: record.view_count,
            created_at: record.created_at,
        }
    }

    /// `None` when the note has no view limit.
    pub fn views_remaining(&self) -> Option<u32> {
        self.view_policy.remaining(self.view_count)
    }
}

impl From<Note> for NoteResponse {
    fn from(note: Note) -> Self {
        let views_remaining = note.views_remaining();
        Self {
            id: note.id,
            ciphertext: note.ciphertext,
            iv: note.iv,
            salt: note.salt,
            has_password: note.has_password,
            expires_at: note.expires_at,
            created_at: note.created_at,
            view_policy: note.view_policy,
            view_count: note.view_count,
            views_remaining,
        }
    }
}

#[derive(Clone)]
pub struct Notes<S> {
    lifecycle: Lifecycle<S>,
}

impl<S: NoteStore> Notes<S> {
    pub fn new(lifecycle: Lifecycle<S>) -> Self {
        Self { lifecycle }
    }

    pub fn lifecycle(&self) -> &Lifecycle<S> {
        &self.lifecycle
    }

    /// Validate and persist a note, returning its fresh id.
    pub fn submit(&self, note: NewNote) -> Result<String> {
        let now = self.lifecycle.now_ms();
        validate(&note, now)?;

        let record = NoteRecord {
            ciphertext: note.ciphertext,
            iv: note.iv,
            salt: note.salt,
            has_password: note.has_password,
            expires_at: note.expires_at,
            max_views: note.view_policy.max_views(),
            burn_after_reading: note.view_policy.burn_after_reading(),
            view_count: 0,
            created_at: now,
        };

        for _ in 0..INSERT_ATTEMPTS {
            let id = generate_id();
            if self.lifecycle.store().insert(&id, &record)? {
                info!(
                    id = %id,
                    has_password = record.has_password,
                    expires_at = ?record.expires_at,
                    view_policy = ?note.view_policy,
                    "audit: note.create"
                );
                return Ok(id);
            }
            warn!(id = %id, "note id collision; retrying");
        }

        Err(NoteError::Persistence(
            "could not allocate a unique note id".into(),
        ))
    }

    /// Fetch a live note. Missing, expired and exhausted notes all come back
    /// as [`NoteError::NotFound`].
    pub fn retrieve(&self, id: &str) -> Result<Note> {
        if !is_plausible_id(id) {
            return Err(NoteError::NotFound);
        }
        match self.lifecycle.fetch(id)? {
            Some(record) => Ok(Note::from_record(id, record)),
            None => Err(NoteError::NotFound),
        }
    }

    /// Count a delivery once the caller has shown the decrypted content.
    /// Returns `false` (and changes nothing) if the note is no longer valid.
    pub fn record_view(&self, id: &str) -> Result<bool> {
        if !is_plausible_id(id) {
            return Ok(false);
        }
        let counted = self.lifecycle.record_view(id)?;
        if counted {
            info!(id, "audit: note.view");
        }
        Ok(counted)
    }
}

pub fn generate_id() -> String {
    nanoid::nanoid!(ID_LEN)
}

fn is_plausible_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn validate(note: &NewNote, now: i64) -> Result<()> {
    if note.ciphertext.is_empty() {
        return Err(NoteError::Validation("ciphertext must not be empty".into()));
    }
    if note.ciphertext.len() > MAX_CIPHERTEXT_LEN {
        return Err(NoteError::Validation(
            "ciphertext exceeds 1 MiB limit".into(),
        ));
    }
    if note.iv.is_empty() || note.iv.len() > MAX_PARAM_LEN {
        return Err(NoteError::Validation(format!(
            "iv must be 1–{MAX_PARAM_LEN} characters"
        )));
    }

    match (&note.salt, note.has_password) {
        (None, true) => {
            return Err(NoteError::Validation(
                "salt is required for password-protected notes".into(),
            ))
        }
        (Some(_), false) => {
            return Err(NoteError::Validation(
                "salt must be omitted when the note has no password".into(),
            ))
        }
        (Some(salt), true) if salt.is_empty() || salt.len() > MAX_PARAM_LEN => {
            return Err(NoteError::Validation(format!(
                "salt must be 1–{MAX_PARAM_LEN} characters"
            )))
        }
        _ => {}
    }

    if let Some(exp) = note.expires_at {
        if exp <= now {
            return Err(NoteError::Validation("expiry must be in the future".into()));
        }
    }

    Ok(())
}
