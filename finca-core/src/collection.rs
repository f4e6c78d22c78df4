//! Whole-collection persistence over a key-value store
//!
//! Every collection is one JSON array under one key. Loading reads the whole
//! array, saving overwrites the whole array. There is no per-record write and
//! no merge: when two holders of the same collection save, the later save wins
//! in full.

use std::sync::Arc;

use crate::error::FincaError;
use crate::kv::KeyValueStore;
use crate::models::Record;

/// How a best-effort load went
#[derive(Debug)]
pub enum LoadStatus {
    /// A stored array was read and parsed
    Loaded,
    /// Nothing was stored under the key yet
    Empty,
    /// The stored value could not be read or parsed; the collection was
    /// treated as empty. Carries the original failure.
    Recovered(FincaError),
}

impl LoadStatus {
    pub fn is_recovered(&self) -> bool {
        matches!(self, LoadStatus::Recovered(_))
    }

    /// True when the backend could not be read at all (lock timeout, IO).
    /// The stored value may still be intact, so saving over it would lose data.
    /// A value that was read but did not parse is not unreadable.
    pub fn is_unreadable(&self) -> bool {
        matches!(self, LoadStatus::Recovered(FincaError::Storage { .. }))
    }
}

/// Records returned by [`CollectionStore::load_or_empty`] plus how they were obtained
#[derive(Debug)]
pub struct LoadOutcome<R> {
    pub records: Vec<R>,
    pub status: LoadStatus,
}

/// Loads and saves named collections.
///
/// The collection is chosen by the record type: `store.load::<Farm>()`
/// reads the `fincas` key.
#[derive(Clone)]
pub struct CollectionStore {
    backend: Arc<dyn KeyValueStore>,
}

impl CollectionStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// The underlying key-value backend
    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        &self.backend
    }

    /// Reads the whole collection. An absent key is an empty collection;
    /// a value that is not an array of `R` is a `Deserialization` error.
    pub async fn load<R: Record>(&self) -> Result<Vec<R>, FincaError> {
        let key = R::COLLECTION.storage_key();
        match self.read(key).await? {
            Some(raw) => parse(key, &raw),
            None => {
                tracing::debug!(key, "collection not stored yet");
                Ok(Vec::new())
            }
        }
    }

    /// Reads the collection, falling back to empty on any read or parse failure.
    /// The failure is logged and kept in [`LoadStatus::Recovered`].
    pub async fn load_or_empty<R: Record>(&self) -> LoadOutcome<R> {
        let key = R::COLLECTION.storage_key();

        let parsed = match self.read(key).await {
            Ok(None) => {
                return LoadOutcome {
                    records: Vec::new(),
                    status: LoadStatus::Empty,
                }
            }
            Ok(Some(raw)) => parse::<R>(key, &raw),
            Err(err) => Err(err),
        };

        match parsed {
            Ok(records) => LoadOutcome {
                records,
                status: LoadStatus::Loaded,
            },
            Err(err) => {
                tracing::warn!(key, error = %err, "collection unusable, starting empty");
                LoadOutcome {
                    records: Vec::new(),
                    status: LoadStatus::Recovered(err),
                }
            }
        }
    }

    async fn read(&self, key: &str) -> Result<Option<String>, FincaError> {
        self.backend
            .get(key)
            .await
            .map_err(|e| FincaError::storage(key, e))
    }

    /// Serializes the full collection and overwrites the stored value
    pub async fn save<R: Record>(&self, records: &[R]) -> Result<(), FincaError> {
        let key = R::COLLECTION.storage_key();
        let json = serde_json::to_string(records).map_err(|source| FincaError::Serialization {
            key: key.to_string(),
            source,
        })?;

        self.backend
            .set(key, &json)
            .await
            .map_err(|e| FincaError::storage(key, e))?;

        tracing::debug!(key, count = records.len(), "saved collection");
        Ok(())
    }
}

fn parse<R: Record>(key: &str, raw: &str) -> Result<Vec<R>, FincaError> {
    let records: Vec<R> =
        serde_json::from_str(raw).map_err(|source| FincaError::Deserialization {
            key: key.to_string(),
            source,
        })?;
    tracing::debug!(key, count = records.len(), "loaded collection");
    Ok(records)
}

/// Appends `record` when `index` is `None`, otherwise replaces the element at `index`.
/// Returns a new collection; `records` is left untouched.
pub fn upsert_at<R: Clone>(
    records: &[R],
    index: Option<usize>,
    record: R,
) -> Result<Vec<R>, FincaError> {
    let mut updated = records.to_vec();
    match index {
        None => updated.push(record),
        Some(i) => {
            let slot = updated.get_mut(i).ok_or(FincaError::IndexOutOfRange {
                index: i,
                len: records.len(),
            })?;
            *slot = record;
        }
    }
    Ok(updated)
}

/// Returns a new collection without the element at `index`
pub fn remove_at<R: Clone>(records: &[R], index: usize) -> Result<Vec<R>, FincaError> {
    if index >= records.len() {
        return Err(FincaError::IndexOutOfRange {
            index,
            len: records.len(),
        });
    }

    Ok(records
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, r)| r.clone())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{FileBackend, MemoryBackend};
    use crate::models::{Farm, Role, Variety};

    fn varieties() -> Vec<Variety> {
        vec![
            Variety::new("IR64", "Grano largo"),
            Variety::new("Fedearroz 67", "Ciclo corto"),
            Variety::new("Oryzica 1", "Tolerante"),
        ]
    }

    fn memory_store() -> CollectionStore {
        CollectionStore::new(Arc::new(MemoryBackend::new()))
    }

    #[test]
    fn test_upsert_without_index_appends() {
        let original = varieties();
        let added = Variety::new("Nueva", "Prueba");

        let updated = upsert_at(&original, None, added.clone()).unwrap();

        assert_eq!(updated.len(), original.len() + 1);
        assert_eq!(updated.last(), Some(&added));
        assert_eq!(&updated[..3], &original[..]);
    }

    #[test]
    fn test_upsert_with_index_replaces_in_place() {
        let original = varieties();
        let replacement = Variety::new("IR64", "Grano extra largo");

        let updated = upsert_at(&original, Some(0), replacement.clone()).unwrap();

        assert_eq!(updated.len(), original.len());
        assert_eq!(updated[0], replacement);
        assert_eq!(&updated[1..], &original[1..]);
    }

    #[test]
    fn test_upsert_out_of_range_fails_and_leaves_input() {
        let original = varieties();
        let snapshot = original.clone();

        let err = upsert_at(&original, Some(3), Variety::new("x", "y")).unwrap_err();

        assert!(matches!(err, FincaError::IndexOutOfRange { index: 3, len: 3 }));
        assert_eq!(original, snapshot);
    }

    #[test]
    fn test_remove_at_preserves_order() {
        let original = varieties();

        let updated = remove_at(&original, 1).unwrap();

        assert_eq!(updated.len(), 2);
        assert_eq!(updated[0].name, "IR64");
        assert_eq!(updated[1].name, "Oryzica 1");
    }

    #[test]
    fn test_remove_at_out_of_range() {
        let empty: Vec<Variety> = Vec::new();
        assert!(matches!(
            remove_at(&empty, 0),
            Err(FincaError::IndexOutOfRange { index: 0, len: 0 })
        ));
    }

    #[tokio::test]
    async fn test_load_absent_is_empty() {
        let store = memory_store();
        let farms: Vec<Farm> = store.load().await.unwrap();
        assert!(farms.is_empty());

        let outcome = store.load_or_empty::<Farm>().await;
        assert!(matches!(outcome.status, LoadStatus::Empty));
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips() {
        let store = memory_store();
        let records = varieties();

        store.save(&records).await.unwrap();
        let loaded: Vec<Variety> = store.load().await.unwrap();

        assert_eq!(loaded, records);
        let raw = store.backend().get("variedades").await.unwrap().unwrap();
        assert!(raw.starts_with(r#"[{"variedadName":"IR64""#));
    }

    #[tokio::test]
    async fn test_corrupt_value_is_a_deserialization_error() {
        let store = memory_store();
        store.backend().set("roles", "{not json").await.unwrap();

        let err = store.load::<Role>().await.unwrap_err();
        assert!(matches!(err, FincaError::Deserialization { ref key, .. } if key == "roles"));
    }

    #[tokio::test]
    async fn test_load_or_empty_distinguishes_corrupt_from_empty() {
        let store = memory_store();
        store
            .backend()
            .set("roles", r#"{"roleName":"no es lista"}"#)
            .await
            .unwrap();

        let outcome = store.load_or_empty::<Role>().await;
        assert!(outcome.records.is_empty());
        assert!(outcome.status.is_recovered());
        assert!(matches!(
            outcome.status,
            LoadStatus::Recovered(FincaError::Deserialization { .. })
        ));
        assert!(!outcome.status.is_unreadable());
    }

    #[tokio::test]
    async fn test_unreadable_backend_is_told_apart_from_corrupt_value() {
        // A plain file where the store directory should be makes every read fail
        let not_a_dir = tempfile::NamedTempFile::new().unwrap();
        let store = CollectionStore::new(Arc::new(FileBackend::new(not_a_dir.path())));

        let outcome = store.load_or_empty::<Farm>().await;

        assert!(outcome.records.is_empty());
        assert!(outcome.status.is_recovered());
        assert!(outcome.status.is_unreadable());
        assert!(!LoadStatus::Empty.is_unreadable());
    }
}
