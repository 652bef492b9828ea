use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::io::storage::StorageError;
use crate::store::persist::{self, SharedPersister};

/// A serialized record waiting to be written
#[derive(Debug, Clone)]
pub struct PendingWrite {
    pub revision: u64,
    pub contents: String,
}

enum Message {
    Schedule(PendingWrite),
    Flush(mpsc::Sender<Result<(), StorageError>>),
    Shutdown,
}

/// Coalesces bursts of reorder writes into one, written after `window` of
/// quiet. A newer schedule replaces the pending write and restarts the
/// window. Dropping the debouncer writes whatever is still pending.
pub struct ReorderDebouncer {
    tx: mpsc::Sender<Message>,
    worker: Option<JoinHandle<()>>,
}

impl ReorderDebouncer {
    pub fn spawn(window: Duration, persister: SharedPersister) -> Self {
        let (tx, rx) = mpsc::channel();
        let worker = thread::spawn(move || run(rx, window, persister));
        ReorderDebouncer {
            tx,
            worker: Some(worker),
        }
    }

    /// Replace any pending write with `write` and restart the quiet window.
    pub fn schedule(&self, write: PendingWrite) {
        if self.tx.send(Message::Schedule(write)).is_err() {
            tracing::warn!("debounce worker stopped, reorder not persisted");
        }
    }

    /// Write the pending record now, if any, and wait for the outcome.
    pub fn flush(&self) -> Result<(), StorageError> {
        let (ack_tx, ack_rx) = mpsc::channel();
        self.tx
            .send(Message::Flush(ack_tx))
            .map_err(|_| StorageError::Unavailable("debounce worker stopped".into()))?;
        ack_rx
            .recv()
            .map_err(|_| StorageError::Unavailable("debounce worker stopped".into()))?
    }
}

impl Drop for ReorderDebouncer {
    fn drop(&mut self) {
        let _ = self.tx.send(Message::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run(rx: mpsc::Receiver<Message>, window: Duration, persister: SharedPersister) {
    let mut pending: Option<PendingWrite> = None;
    loop {
        let message = if pending.is_some() {
            match rx.recv_timeout(window) {
                Ok(message) => message,
                Err(RecvTimeoutError::Timeout) => {
                    if let Some(write) = pending.take() {
                        write_detached(&persister, write);
                    }
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => Message::Shutdown,
            }
        } else {
            match rx.recv() {
                Ok(message) => message,
                Err(_) => break,
            }
        };

        match message {
            Message::Schedule(write) => {
                if let Some(old) = pending.replace(write) {
                    tracing::trace!(revision = old.revision, "superseded pending reorder write");
                }
            }
            Message::Flush(ack) => {
                let result = match pending.take() {
                    Some(write) => write_now(&persister, write),
                    None => Ok(()),
                };
                let _ = ack.send(result);
            }
            Message::Shutdown => {
                if let Some(write) = pending.take() {
                    write_detached(&persister, write);
                }
                break;
            }
        }
    }
}

fn write_now(persister: &SharedPersister, write: PendingWrite) -> Result<(), StorageError> {
    let written = persist::lock(persister).write(write.revision, &write.contents)?;
    if written {
        tracing::debug!(revision = write.revision, "reorder persisted");
    }
    Ok(())
}

/// Timer and teardown writes have no caller to report to, so failures are
/// logged and kept on the persister.
fn write_detached(persister: &SharedPersister, write: PendingWrite) {
    let revision = write.revision;
    if let Err(err) = write_now(persister, write) {
        tracing::warn!(revision, error = %err, "could not persist reorder");
        persist::lock(persister).record_error(err);
    }
}
