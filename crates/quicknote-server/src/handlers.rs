use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use quicknote_core::wire::{
    CreateNoteRequest, CreateNoteResponse, ErrorResponse, NoteResponse, ViewResponse,
};
use serde_json::json;

use crate::{access::NewNote, error::NoteError, AppState};

const CREATE_FAILED: &str = "could not create note";
const UNAVAILABLE: &str = "note unavailable";

// ── Health ────────────────────────────────────────────────────────────────────

pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

// ── Create ────────────────────────────────────────────────────────────────────

pub async fn create_note(
    State(state): State<AppState>,
    Json(body): Json<CreateNoteRequest>,
) -> Response {
    let note = match NewNote::try_from(body) {
        Ok(note) => note,
        Err(e) => return error_response(e, CREATE_FAILED),
    };

    match state.notes.submit(note) {
        Ok(id) => (StatusCode::CREATED, Json(CreateNoteResponse { id })).into_response(),
        Err(e) => error_response(e, CREATE_FAILED),
    }
}

// ── Get ───────────────────────────────────────────────────────────────────────

pub async fn get_note(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.notes.retrieve(&id) {
        Ok(note) => (
            [(header::CACHE_CONTROL, "no-store")],
            Json(NoteResponse::from(note)),
        )
            .into_response(),
        Err(e) => error_response(e, UNAVAILABLE),
    }
}

// ── Confirm view ──────────────────────────────────────────────────────────────

/// Always answers 200 for unknown or dead notes; `counted` says whether the
/// view was granted.
pub async fn confirm_view(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.notes.record_view(&id) {
        Ok(counted) => Json(ViewResponse { counted }).into_response(),
        Err(e) => error_response(e, UNAVAILABLE),
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Storage details are logged, never returned.
fn error_response(err: NoteError, generic: &str) -> Response {
    let (status, message) = match err {
        NoteError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
        NoteError::NotFound => (StatusCode::NOT_FOUND, UNAVAILABLE.to_owned()),
        NoteError::Persistence(detail) => {
            tracing::error!(error = %detail, "persistence failure");
            (StatusCode::INTERNAL_SERVER_ERROR, generic.to_owned())
        }
    };
    (status, Json(ErrorResponse { error: message })).into_response()
}
