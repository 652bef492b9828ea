use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tempfile::NamedTempFile;

use crate::model::config::EngineConfig;

/// File name of the persisted record inside the namespace directory
pub const RECORD_FILE: &str = "preferences.json";

/// Error type for storage backends
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("could not read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("could not write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Backing store for the single persisted preferences record.
pub trait Storage: Send {
    /// Read the record. `None` when nothing was persisted yet.
    fn load(&self) -> Result<Option<String>, StorageError>;

    /// Replace the record.
    fn save(&mut self, contents: &str) -> Result<(), StorageError>;

    /// Set aside an unreadable record before it gets overwritten.
    fn backup(&mut self, _contents: &str) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Default record location: `$XDG_CONFIG_HOME/<namespace>/preferences.json`,
/// falling back to `~/.config`.
pub fn default_record_path(namespace: &str) -> PathBuf {
    let config_dir = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"));
    config_dir.join(namespace).join(RECORD_FILE)
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/"))
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// JSON record on the local file system
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStorage { path: path.into() }
    }

    /// Storage at the configured path, or under the configured namespace
    pub fn for_config(config: &EngineConfig) -> Self {
        match &config.storage_path {
            Some(path) => FileStorage::new(path),
            None => FileStorage::new(default_record_path(&config.namespace)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> PathBuf {
        self.path.with_extension("json.bak")
    }
}

impl Storage for FileStorage {
    fn load(&self) -> Result<Option<String>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&self.path)
            .map(Some)
            .map_err(|source| StorageError::Read {
                path: self.path.clone(),
                source,
            })
    }

    fn save(&mut self, contents: &str) -> Result<(), StorageError> {
        atomic_write(&self.path, contents.as_bytes()).map_err(|source| StorageError::Write {
            path: self.path.clone(),
            source,
        })
    }

    fn backup(&mut self, contents: &str) -> Result<(), StorageError> {
        let bak = self.backup_path();
        atomic_write(&bak, contents.as_bytes())
            .map_err(|source| StorageError::Write { path: bak, source })
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    contents: Option<String>,
    writes: Vec<String>,
    backups: Vec<String>,
    fail_writes: bool,
}

/// In-process record. Clones share the same buffer, so a handle kept by the
/// caller observes every write made through the store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that already holds a record
    pub fn with_contents(contents: impl Into<String>) -> Self {
        let storage = Self::default();
        storage.inner().contents = Some(contents.into());
        storage
    }

    fn inner(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn contents(&self) -> Option<String> {
        self.inner().contents.clone()
    }

    /// Every successful write, oldest first
    pub fn writes(&self) -> Vec<String> {
        self.inner().writes.clone()
    }

    pub fn write_count(&self) -> usize {
        self.inner().writes.len()
    }

    pub fn backups(&self) -> Vec<String> {
        self.inner().backups.clone()
    }

    /// Make subsequent writes fail, as a full or read-only store would
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner().fail_writes = fail;
    }
}

impl Storage for MemoryStorage {
    fn load(&self) -> Result<Option<String>, StorageError> {
        Ok(self.contents())
    }

    fn save(&mut self, contents: &str) -> Result<(), StorageError> {
        let mut inner = self.inner();
        if inner.fail_writes {
            return Err(StorageError::Unavailable("quota exceeded".into()));
        }
        inner.contents = Some(contents.to_string());
        inner.writes.push(contents.to_string());
        Ok(())
    }

    fn backup(&mut self, contents: &str) -> Result<(), StorageError> {
        self.inner().backups.push(contents.to_string());
        Ok(())
    }
}
