//! Directory-backed key-value store
//!
//! Each key is stored as `<key>.json` inside the store directory. A shared
//! `.lock` file serializes writers (exclusive lock) against readers (shared
//! lock), and every write goes through a temp file plus `rename`, so a reader
//! sees either the previous value or the new one.

use async_trait::async_trait;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::traits::{check_key, BackendType, KeyValueStore};
use crate::error::KvError;

const LOCK_FILE_NAME: &str = ".lock";
const ENTRY_EXTENSION: &str = "json";
const LOCK_TIMEOUT: Duration = Duration::from_secs(5);
const LOCK_RETRY: Duration = Duration::from_millis(100);

/// Handles reading and writing store entries on disk with file locking
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
    lock_file_path: PathBuf,
}

impl FileBackend {
    /// Creates a backend rooted at `root`; the directory is created on first write
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        let lock_file_path = root.join(LOCK_FILE_NAME);
        Self {
            root,
            lock_file_path,
        }
    }

    /// Returns the store directory
    pub fn path(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &str) -> Result<PathBuf, KvError> {
        check_key(key)?;
        Ok(self.root.join(format!("{}.{}", key, ENTRY_EXTENSION)))
    }

    /// Acquire an exclusive lock on the store for writing.
    /// The returned handle must be held for the duration of the write.
    fn acquire_write_lock(root: &Path, lock_file_path: &Path) -> Result<File, KvError> {
        fs::create_dir_all(root).map_err(|e| KvError::io(root, e))?;

        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(lock_file_path)
            .map_err(|e| KvError::io(lock_file_path, e))?;

        Self::wait_for_lock(lock_file_path, || FileExt::try_lock_exclusive(&lock_file))?;
        Ok(lock_file)
    }

    /// Acquire a shared lock on the store for reading
    fn acquire_read_lock(lock_file_path: &Path) -> Result<Option<File>, KvError> {
        if !lock_file_path.exists() {
            return Ok(None);
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .open(lock_file_path)
            .map_err(|e| KvError::io(lock_file_path, e))?;

        Self::wait_for_lock(lock_file_path, || FileExt::try_lock_shared(&lock_file))?;
        Ok(Some(lock_file))
    }

    fn wait_for_lock<F>(lock_file_path: &Path, mut try_lock: F) -> Result<(), KvError>
    where
        F: FnMut() -> std::io::Result<()>,
    {
        let start = Instant::now();
        loop {
            match try_lock() {
                Ok(()) => return Ok(()),
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    if start.elapsed() > LOCK_TIMEOUT {
                        return Err(KvError::LockTimeout(lock_file_path.to_path_buf()));
                    }
                    std::thread::sleep(LOCK_RETRY);
                }
                Err(e) => return Err(KvError::io(lock_file_path, e)),
            }
        }
    }

    fn read_entry(entry: &Path, lock_file_path: &Path) -> Result<Option<String>, KvError> {
        let _lock = Self::acquire_read_lock(lock_file_path)?;

        match fs::read_to_string(entry) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(KvError::io(entry, e)),
        }
    }

    fn write_entry(
        root: &Path,
        lock_file_path: &Path,
        entry: &Path,
        value: &str,
    ) -> Result<(), KvError> {
        let mut lock_file = Self::acquire_write_lock(root, lock_file_path)?;

        // Lock holder info, for debugging only
        let _ = lock_file.set_len(0);
        let _ = writeln!(
            lock_file,
            "Locked by PID {} at {}",
            std::process::id(),
            chrono::Utc::now().to_rfc3339()
        );

        let tmp = entry.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(|e| KvError::io(&tmp, e))?;
        fs::rename(&tmp, entry).map_err(|e| KvError::io(entry, e))?;

        // Lock is released when lock_file is dropped
        Ok(())
    }

    fn remove_entry(root: &Path, lock_file_path: &Path, entry: &Path) -> Result<(), KvError> {
        let _lock = Self::acquire_write_lock(root, lock_file_path)?;

        match fs::remove_file(entry) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(KvError::io(entry, e)),
        }
    }

    fn list_keys(root: &Path) -> Result<Vec<String>, KvError> {
        let dir = match fs::read_dir(root) {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(KvError::io(root, e)),
        };

        let mut keys = Vec::new();
        for entry in dir {
            let path = entry.map_err(|e| KvError::io(root, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Runs blocking filesystem work off the async executor
async fn blocking<T, F>(f: F) -> Result<T, KvError>
where
    F: FnOnce() -> Result<T, KvError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| KvError::Task(e.to_string()))?
}

#[async_trait]
impl KeyValueStore for FileBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::File
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let entry = self.entry_path(key)?;
        let lock_file_path = self.lock_file_path.clone();
        blocking(move || Self::read_entry(&entry, &lock_file_path)).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        let entry = self.entry_path(key)?;
        let root = self.root.clone();
        let lock_file_path = self.lock_file_path.clone();
        let value = value.to_string();
        blocking(move || Self::write_entry(&root, &lock_file_path, &entry, &value)).await
    }

    async fn remove(&self, key: &str) -> Result<(), KvError> {
        let entry = self.entry_path(key)?;
        let root = self.root.clone();
        let lock_file_path = self.lock_file_path.clone();
        blocking(move || Self::remove_entry(&root, &lock_file_path, &entry)).await
    }

    async fn keys(&self) -> Result<Vec<String>, KvError> {
        let root = self.root.clone();
        blocking(move || Self::list_keys(&root)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_key_reads_as_none() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path().join("store"));

        assert_eq!(backend.get("fincas").await.unwrap(), None);
        assert!(backend.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_get_and_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path());

        backend.set("fincas", "[1]").await.unwrap();
        assert_eq!(backend.get("fincas").await.unwrap().as_deref(), Some("[1]"));

        backend.set("fincas", "[1,2]").await.unwrap();
        assert_eq!(
            backend.get("fincas").await.unwrap().as_deref(),
            Some("[1,2]")
        );
        assert!(temp_dir.path().join("fincas.json").exists());
        assert!(!temp_dir.path().join("fincas.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_remove_and_keys() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path());

        backend.set("token", "abc").await.unwrap();
        backend.set("lotes", "[]").await.unwrap();
        assert_eq!(backend.keys().await.unwrap(), vec!["lotes", "token"]);

        backend.remove("token").await.unwrap();
        backend.remove("token").await.unwrap();
        assert_eq!(backend.keys().await.unwrap(), vec!["lotes"]);
        assert!(!backend.contains("token").await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_path_like_keys() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path());

        let err = backend.set("../escape", "x").await.unwrap_err();
        assert!(matches!(err, KvError::InvalidKey(_)));
    }

    #[test]
    fn test_write_lock_times_out_while_held() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_path_buf();
        let lock_path = root.join(LOCK_FILE_NAME);

        let _held = FileBackend::acquire_write_lock(&root, &lock_path).unwrap();
        let start = Instant::now();
        let err = FileBackend::acquire_write_lock(&root, &lock_path).unwrap_err();

        assert!(matches!(err, KvError::LockTimeout(_)));
        assert!(start.elapsed() >= LOCK_TIMEOUT);
    }
}
