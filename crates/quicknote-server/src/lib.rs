pub mod access;
pub mod dirs;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod server;
pub mod store;

/// Shared application state threaded through axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub notes: access::Notes<store::Store>,
}

pub use access::{NewNote, Note, Notes};
pub use error::NoteError;
pub use lifecycle::{Lifecycle, NoteState};
pub use server::{open_notes, resolve_data_dir, router, run, ServerConfig};
