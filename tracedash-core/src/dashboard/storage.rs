use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Error type for snapshot cache operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// File is locked by another process
    #[error("Snapshot cache is locked by another process")]
    FileLocked,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Persistent home of the last-known snapshot (a single key holding text)
pub trait SnapshotStore {
    /// Returns the cached text, or `None` if nothing has been stored yet
    fn load(&self) -> Result<Option<String>, StorageError>;

    /// Replaces the cached text (last write wins)
    fn save(&self, data: &str) -> Result<(), StorageError>;
}

/// Keeps the snapshot in memory only
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    data: Mutex<Option<String>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: impl Into<String>) -> Self {
        Self {
            data: Mutex::new(Some(data.into())),
        }
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Result<Option<String>, StorageError> {
        Ok(self.data.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, data: &str) -> Result<(), StorageError> {
        *self.data.lock().unwrap_or_else(|e| e.into_inner()) = Some(data.to_string());
        Ok(())
    }
}

/// Stores the snapshot in a file, guarded by an advisory lock so two
/// dashboards sharing a cache never read a half-written file
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    file_path: PathBuf,
    lock_file_path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new<P: AsRef<Path>>(file_path: P) -> Self {
        let file_path = file_path.as_ref().to_path_buf();
        let lock_file_path = file_path.with_extension("lock");
        Self {
            file_path,
            lock_file_path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn open_lock_file(&self) -> Result<File, StorageError> {
        if let Some(parent) = self.lock_file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_file_path)?)
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Result<Option<String>, StorageError> {
        if !self.file_path.exists() {
            return Ok(None);
        }

        let lock_file = self.open_lock_file()?;
        FileExt::try_lock_shared(&lock_file).map_err(map_lock_error)?;

        let mut content = String::new();
        File::open(&self.file_path)?.read_to_string(&mut content)?;

        // Lock is released when lock_file is dropped
        Ok(Some(content))
    }

    fn save(&self, data: &str) -> Result<(), StorageError> {
        let lock_file = self.open_lock_file()?;
        FileExt::try_lock_exclusive(&lock_file).map_err(map_lock_error)?;

        let mut file = File::create(&self.file_path)?;
        file.write_all(data.as_bytes())?;
        file.sync_data()?;
        Ok(())
    }
}

fn map_lock_error(e: std::io::Error) -> StorageError {
    if e.kind() == fs2::lock_contended_error().kind() {
        StorageError::FileLocked
    } else {
        StorageError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_empty_then_saved() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::new(temp_dir.path().join("cache").join("dashboard.json"));

        assert_eq!(store.load().unwrap(), None);

        store.save(r#"{"eco_metrics":{}}"#).unwrap();
        store.save(r#"{"system_status":{}}"#).unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some(r#"{"system_status":{}}"#));
    }

    #[test]
    fn test_file_store_reports_held_lock() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::new(temp_dir.path().join("dashboard.json"));
        store.save("{}").unwrap();

        let holder = store.open_lock_file().unwrap();
        FileExt::lock_exclusive(&holder).unwrap();

        assert!(matches!(store.save("{}"), Err(StorageError::FileLocked)));
        FileExt::unlock(&holder).unwrap();
        assert!(store.save("{}").is_ok());
    }

    #[test]
    fn test_memory_store() {
        let store = MemorySnapshotStore::new();
        assert_eq!(store.load().unwrap(), None);
        store.save("a").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("a"));
        assert_eq!(MemorySnapshotStore::with_data("b").load().unwrap().as_deref(), Some("b"));
    }
}
