//! Form-backed editing of one collection
//!
//! A [`CollectionEditor`] is what each list-and-form screen holds: it loads the
//! collection once, keeps its own copy, and writes the whole copy back after
//! every create, update or delete. Two editors over the same collection do not
//! see each other's changes; whichever saves last wins.

use crate::collection::{remove_at, upsert_at, CollectionStore, LoadStatus};
use crate::error::FincaError;
use crate::models::Record;

/// Lifecycle of an editor's in-memory copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    /// Nothing read from the store yet
    Unloaded,
    /// Matches what was read
    Loaded,
    /// Changed in memory, and the last save did not go through
    Dirty,
    /// Changed in memory and written back
    Persisted,
}

/// Holds one collection in memory and applies form submissions to it
pub struct CollectionEditor<R> {
    store: CollectionStore,
    records: Vec<R>,
    editing_index: Option<usize>,
    state: EditorState,
}

impl<R: Record> CollectionEditor<R> {
    pub fn new(store: CollectionStore) -> Self {
        Self {
            store,
            records: Vec::new(),
            editing_index: None,
            state: EditorState::Unloaded,
        }
    }

    /// Creates an editor and loads its collection, best effort
    pub async fn open(store: CollectionStore) -> (Self, LoadStatus) {
        let mut editor = Self::new(store);
        let status = editor.load().await;
        (editor, status)
    }

    /// (Re)reads the collection. Unreadable or corrupt data yields an empty
    /// collection and a [`LoadStatus::Recovered`] status.
    pub async fn load(&mut self) -> LoadStatus {
        let outcome = self.store.load_or_empty::<R>().await;
        self.records = outcome.records;
        self.editing_index = None;
        self.state = EditorState::Loaded;
        outcome.status
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&R> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn editing_index(&self) -> Option<usize> {
        self.editing_index
    }

    /// Marks `index` as the record being edited and returns it to pre-fill a form
    pub fn begin_edit(&mut self, index: usize) -> Result<&R, FincaError> {
        let len = self.records.len();
        let record = self
            .records
            .get(index)
            .ok_or(FincaError::IndexOutOfRange { index, len })?;
        self.editing_index = Some(index);
        Ok(record)
    }

    pub fn cancel_edit(&mut self) {
        self.editing_index = None;
    }

    /// Validates `record`, replaces the record under edit (or appends when
    /// nothing is being edited), then saves the whole collection.
    ///
    /// Returns the index the record ended up at. On a validation or index
    /// error nothing changes. On a save error the change stays in memory,
    /// the editor is left `Dirty`, and the error is returned.
    pub async fn submit(&mut self, record: R) -> Result<usize, FincaError> {
        record.validate()?;

        let updated = upsert_at(&self.records, self.editing_index, record)?;
        let index = self.editing_index.unwrap_or(updated.len() - 1);

        self.records = updated;
        self.editing_index = None;
        self.persist().await?;
        Ok(index)
    }

    /// Removes the record at `index` and saves immediately.
    ///
    /// An edit in progress on that record is cancelled; an edit on a later
    /// record follows it down one slot.
    pub async fn delete(&mut self, index: usize) -> Result<R, FincaError> {
        let updated = remove_at(&self.records, index)?;
        let removed = self.records[index].clone();

        self.editing_index = match self.editing_index {
            Some(i) if i == index => None,
            Some(i) if i > index => Some(i - 1),
            other => other,
        };
        self.records = updated;
        self.persist().await?;
        Ok(removed)
    }

    /// Writes the in-memory collection back to the store
    pub async fn persist(&mut self) -> Result<(), FincaError> {
        match self.store.save(&self.records).await {
            Ok(()) => {
                self.state = EditorState::Persisted;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(
                    collection = %R::COLLECTION,
                    error = %err,
                    "save failed, keeping in-memory changes"
                );
                self.state = EditorState::Dirty;
                Err(err)
            }
        }
    }
}
