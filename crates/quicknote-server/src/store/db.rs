use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use tracing::{debug, warn};

use super::{NoteRecord, NoteStore, ViewMutation};

pub(crate) const NOTES: TableDefinition<&str, &[u8]> = TableDefinition::new("notes");

/// redb-backed note store. Cloning is cheap and shares the database.
///
/// redb admits one write transaction at a time, which is what makes the
/// read-check-write in [`NoteStore::mutate_view_counter`] atomic.
#[derive(Clone)]
pub struct Store {
    pub(crate) db: Arc<Database>,
}

impl Store {
    /// Open (or create) the database file and make sure the table exists.
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path)
            .with_context(|| format!("open redb database at {}", path.display()))?;

        let write_txn = db.begin_write()?;
        {
            write_txn.open_table(NOTES)?;
        }
        write_txn.commit()?;

        debug!(path = %path.display(), "note store opened");
        Ok(Self { db: Arc::new(db) })
    }
}

fn encode(record: &NoteRecord) -> Result<Vec<u8>> {
    bincode::serde::encode_to_vec(record, bincode::config::standard())
        .context("bincode encode note")
}

fn decode(bytes: &[u8]) -> Result<NoteRecord> {
    let (record, _): (NoteRecord, _) =
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .context("bincode decode note")?;
    Ok(record)
}

impl NoteStore for Store {
    fn insert(&self, id: &str, record: &NoteRecord) -> Result<bool> {
        let bytes = encode(record)?;

        let write_txn = self.db.begin_write()?;
        let inserted = {
            let mut table = write_txn.open_table(NOTES)?;
            if table.get(id)?.is_some() {
                false
            } else {
                table.insert(id, bytes.as_slice())?;
                true
            }
        };

        if inserted {
            write_txn.commit()?;
        } else {
            write_txn.abort()?;
        }
        Ok(inserted)
    }

    fn get(&self, id: &str) -> Result<Option<NoteRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(NOTES)?;

        let record = match table.get(id)? {
            Some(value) => Some(decode(value.value())?),
            None => None,
        };
        Ok(record)
    }

    fn delete_where(&self, predicate: &dyn Fn(&NoteRecord) -> bool) -> Result<usize> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(NOTES)?;

            let mut doomed = Vec::new();
            for item in table.iter()? {
                let (key, value) = item?;
                match decode(value.value()) {
                    Ok(record) if predicate(&record) => doomed.push(key.value().to_owned()),
                    Ok(_) => {}
                    Err(e) => warn!(id = key.value(), error = %e, "skipping undecodable note"),
                }
            }

            for id in &doomed {
                table.remove(id.as_str())?;
            }
            doomed.len()
        };

        if removed > 0 {
            write_txn.commit()?;
        } else {
            write_txn.abort()?;
        }
        Ok(removed)
    }

    fn mutate_view_counter(
        &self,
        id: &str,
        guard: &dyn Fn(&NoteRecord) -> bool,
    ) -> Result<ViewMutation> {
        let write_txn = self.db.begin_write()?;
        let outcome = {
            let mut table = write_txn.open_table(NOTES)?;
            let current = match table.get(id)? {
                Some(value) => Some(decode(value.value())?),
                None => None,
            };

            match current {
                None => ViewMutation::Missing,
                Some(record) if !guard(&record) => ViewMutation::Rejected,
                Some(mut record) => {
                    record.view_count = record.view_count.saturating_add(1);
                    let bytes = encode(&record)?;
                    table.insert(id, bytes.as_slice())?;
                    ViewMutation::Counted(record)
                }
            }
        };

        if matches!(outcome, ViewMutation::Counted(_)) {
            write_txn.commit()?;
        } else {
            write_txn.abort()?;
        }
        Ok(outcome)
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(NOTES)?;
            let existed = table.remove(id)?.is_some();
            existed
        };
        write_txn.commit()?;
        Ok(existed)
    }

    fn len(&self) -> Result<usize> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(NOTES)?;
        Ok(table.len()? as usize)
    }
}
