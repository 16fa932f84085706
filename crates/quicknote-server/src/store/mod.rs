//! Persistence for notes.
//!
//! [`NoteStore`] is the whole contract the lifecycle engine relies on. Every
//! method must be atomic for the row(s) it touches; [`Store`] provides that
//! with redb write transactions.

pub mod db;
pub mod model;

use anyhow::Result;

pub use db::Store;
pub use model::NoteRecord;

/// Outcome of [`NoteStore::mutate_view_counter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewMutation {
    /// The guard passed and the counter was incremented; holds the new row.
    Counted(NoteRecord),
    /// The row exists but the guard refused the increment.
    Rejected,
    Missing,
}

pub trait NoteStore: Send + Sync {
    /// Insert a new note. Returns `false` without writing if `id` is taken.
    fn insert(&self, id: &str, record: &NoteRecord) -> Result<bool>;

    fn get(&self, id: &str) -> Result<Option<NoteRecord>>;

    /// Delete every note matching `predicate` in one transaction.
    /// Returns how many were removed.
    fn delete_where(&self, predicate: &dyn Fn(&NoteRecord) -> bool) -> Result<usize>;

    /// Conditionally increment the view counter of `id`.
    ///
    /// The read, the `guard` check and the write happen in one transaction,
    /// so two concurrent callers can never both pass a guard that the first
    /// increment invalidates.
    fn mutate_view_counter(
        &self,
        id: &str,
        guard: &dyn Fn(&NoteRecord) -> bool,
    ) -> Result<ViewMutation>;

    /// Returns true if the note existed.
    fn delete(&self, id: &str) -> Result<bool>;

    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
