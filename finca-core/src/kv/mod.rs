//! Key-value persistence layer
//!
//! Collections, the auth token and the remembered email all live in a flat
//! key-value store. This module provides a trait-based abstraction so the
//! same code runs over a directory of files, a SQLite file, or memory.

mod file_backend;
mod memory_backend;
mod sqlite_backend;
mod traits;

pub use file_backend::FileBackend;
pub use memory_backend::MemoryBackend;
pub use sqlite_backend::SqliteBackend;
pub use traits::{BackendType, KeyValueStore};

use std::path::Path;
use std::sync::Arc;

use crate::error::KvError;

/// Infers the backend from the path: SQLite for `.db`/`.sqlite`/`.sqlite3`,
/// a file directory for anything else
pub fn infer_backend_type(path: &Path) -> BackendType {
    match path.extension().and_then(|e| e.to_str()) {
        Some("db") | Some("sqlite") | Some("sqlite3") => BackendType::Sqlite,
        _ => BackendType::File,
    }
}

/// Creates a key-value backend based on the path or an explicit type
pub fn create_backend(
    path: &Path,
    backend_type: Option<BackendType>,
) -> Result<Arc<dyn KeyValueStore>, KvError> {
    let bt = backend_type.unwrap_or_else(|| infer_backend_type(path));

    tracing::debug!(backend = %bt, path = ?path, "opening key-value store");

    match bt {
        BackendType::File => Ok(Arc::new(FileBackend::new(path))),
        BackendType::Sqlite => Ok(Arc::new(SqliteBackend::new(path)?)),
        BackendType::Memory => Ok(Arc::new(MemoryBackend::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_infer_backend_type() {
        assert_eq!(
            infer_backend_type(&PathBuf::from("data/finca.db")),
            BackendType::Sqlite
        );
        assert_eq!(
            infer_backend_type(&PathBuf::from("x.sqlite3")),
            BackendType::Sqlite
        );
        assert_eq!(
            infer_backend_type(&PathBuf::from("data/store")),
            BackendType::File
        );
    }

    #[tokio::test]
    async fn test_create_backend_honours_explicit_type() {
        let temp_dir = TempDir::new().unwrap();

        let file = create_backend(temp_dir.path(), None).unwrap();
        assert_eq!(file.backend_type(), BackendType::File);

        let sqlite = create_backend(&temp_dir.path().join("finca.db"), None).unwrap();
        assert_eq!(sqlite.backend_type(), BackendType::Sqlite);

        let memory = create_backend(temp_dir.path(), Some(BackendType::Memory)).unwrap();
        assert_eq!(memory.backend_type(), BackendType::Memory);
        memory.set("token", "t").await.unwrap();
        assert_eq!(memory.get("token").await.unwrap().as_deref(), Some("t"));
    }
}
