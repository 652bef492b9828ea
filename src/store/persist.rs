use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::io::storage::{Storage, StorageError};

/// The single write path to storage, shared by the store and its debouncer.
pub type SharedPersister = Arc<Mutex<Persister>>;

/// Serializes writes and drops any that are older than what is already
/// stored. Every write carries the store revision it was taken at.
pub struct Persister {
    storage: Box<dyn Storage>,
    written_revision: u64,
    last_error: Option<StorageError>,
}

impl Persister {
    pub fn new(storage: Box<dyn Storage>) -> Self {
        Persister {
            storage,
            written_revision: 0,
            last_error: None,
        }
    }

    pub fn shared(storage: Box<dyn Storage>) -> SharedPersister {
        Arc::new(Mutex::new(Persister::new(storage)))
    }

    pub fn load(&self) -> Result<Option<String>, StorageError> {
        self.storage.load()
    }

    pub fn backup(&mut self, contents: &str) -> Result<(), StorageError> {
        self.storage.backup(contents)
    }

    /// Write `contents` taken at `revision`. Returns `Ok(false)` without
    /// touching storage when a newer revision was already written.
    pub fn write(&mut self, revision: u64, contents: &str) -> Result<bool, StorageError> {
        if revision <= self.written_revision {
            tracing::debug!(revision, written = self.written_revision, "skipping stale write");
            return Ok(false);
        }
        self.storage.save(contents)?;
        self.written_revision = revision;
        Ok(true)
    }

    /// Remember a failure from a write nobody is waiting on
    pub fn record_error(&mut self, err: StorageError) {
        self.last_error = Some(err);
    }

    pub fn take_error(&mut self) -> Option<StorageError> {
        self.last_error.take()
    }
}

pub fn lock(persister: &SharedPersister) -> MutexGuard<'_, Persister> {
    persister.lock().unwrap_or_else(PoisonError::into_inner)
}
