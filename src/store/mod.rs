pub mod debounce;
pub mod history;
pub mod persist;

use std::time::Duration;

use chrono::Utc;

use crate::io::storage::{MemoryStorage, Storage, StorageError};
use crate::model::config::EngineConfig;
use crate::model::preferences::{Preferences, PreferencesPatch, TileSpec};
use crate::model::tile::TilePatch;
use crate::ops::tile_ops::{self, TileError};
use crate::parse::{ImportError, parse_record, serialize_export, serialize_stored};

pub use debounce::{PendingWrite, ReorderDebouncer};
pub use history::{History, HistoryError, HistoryState};
pub use persist::{Persister, SharedPersister};

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("nothing to undo or redo")]
    EmptyHistory,
    #[error("invalid import: {0}")]
    InvalidImport(#[from] ImportError),
    #[error("unknown tile: {0}")]
    UnknownTile(String),
    /// The change was applied in memory but could not be saved.
    #[error("preferences not saved: {0}")]
    Persistence(#[from] StorageError),
    #[error("could not serialize preferences: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<HistoryError> for StoreError {
    fn from(err: HistoryError) -> Self {
        match err {
            HistoryError::Empty => StoreError::EmptyHistory,
        }
    }
}

impl From<TileError> for StoreError {
    fn from(err: TileError) -> Self {
        match err {
            TileError::UnknownTile(id) => StoreError::UnknownTile(id),
        }
    }
}

/// Callback invoked with the new state after every applied change
pub type Listener = Box<dyn FnMut(&Preferences)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Immediate,
    Debounced,
}

/// Single source of truth for the dashboard customization state.
///
/// Every mutation runs on a copy of the current state and is swapped in only
/// once it succeeds. The swap commits the previous state to the undo
/// history, notifies listeners and persists the new record. Reorders are
/// persisted through the [`ReorderDebouncer`] so a drag gesture ends up as a
/// single write.
pub struct PreferencesStore {
    prefs: Preferences,
    catalog: Vec<TileSpec>,
    history: History,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
    revision: u64,
    persister: SharedPersister,
    debouncer: ReorderDebouncer,
}

impl PreferencesStore {
    /// Open the store on `storage`, starting from the persisted record.
    /// A missing record yields the catalog defaults. An unreadable one is
    /// backed up and replaced by the defaults.
    pub fn open(
        config: &EngineConfig,
        catalog: Vec<TileSpec>,
        storage: Box<dyn Storage>,
    ) -> Self {
        let persister = Persister::shared(storage);
        let prefs = load_initial(&persister, &catalog);
        let debouncer = ReorderDebouncer::spawn(
            Duration::from_millis(config.reorder_debounce_ms),
            persister.clone(),
        );
        PreferencesStore {
            prefs,
            catalog,
            history: History::new(config.history_limit),
            listeners: Vec::new(),
            next_subscription: 0,
            revision: 0,
            persister,
            debouncer,
        }
    }

    /// A store backed by a fresh in-memory record
    pub fn in_memory(catalog: Vec<TileSpec>) -> Self {
        Self::open(
            &EngineConfig::default(),
            catalog,
            Box::new(MemoryStorage::new()),
        )
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    pub fn catalog(&self) -> &[TileSpec] {
        &self.catalog
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history_state(&self) -> HistoryState {
        self.history.state()
    }

    // -----------------------------------------------------------------------
    // Change notification
    // -----------------------------------------------------------------------

    pub fn subscribe(&mut self, listener: impl FnMut(&Preferences) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if `id` was not subscribed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    fn notify(&mut self) {
        for (_, listener) in &mut self.listeners {
            listener(&self.prefs);
        }
    }

    // -----------------------------------------------------------------------
    // Committed actions
    // -----------------------------------------------------------------------

    /// Merge global display settings.
    pub fn set_preferences(&mut self, patch: PreferencesPatch) -> Result<(), StoreError> {
        self.apply("set_preferences", WriteMode::Immediate, |prefs| {
            prefs.apply_patch(&patch);
            Ok(())
        })
    }

    /// Flip one tile on or off.
    pub fn toggle_tile(&mut self, tile_id: &str) -> Result<(), StoreError> {
        self.apply("toggle_tile", WriteMode::Immediate, |prefs| {
            tile_ops::toggle_tile(prefs, tile_id)
        })
    }

    /// Enable the whole module, or disable it if it is already fully enabled.
    /// A module with no tiles is ignored and leaves no undo step.
    pub fn toggle_module(&mut self, module_id: &str) -> Result<(), StoreError> {
        if !self.prefs.tiles.iter().any(|t| t.module_id == module_id) {
            tracing::debug!(module_id, "module has no tiles");
            return Ok(());
        }
        self.apply("toggle_module", WriteMode::Immediate, |prefs| {
            tile_ops::toggle_module(prefs, module_id);
            Ok(())
        })
    }

    /// Apply a new tile order. The write is debounced.
    pub fn reorder<S: AsRef<str>>(&mut self, ordered_ids: &[S]) -> Result<(), StoreError> {
        self.apply("reorder", WriteMode::Debounced, |prefs| {
            tile_ops::reorder(prefs, ordered_ids)
        })
    }

    /// Change a tile's presentation settings.
    pub fn update_tile(&mut self, tile_id: &str, patch: TilePatch) -> Result<(), StoreError> {
        self.apply("update_tile", WriteMode::Immediate, |prefs| {
            tile_ops::update_tile(prefs, tile_id, &patch)
        })
    }

    /// Restore the catalog defaults as a single undo step.
    pub fn reset_to_default(&mut self) -> Result<(), StoreError> {
        let defaults = Preferences::from_catalog(&self.catalog);
        self.apply("reset_to_default", WriteMode::Immediate, move |prefs| {
            *prefs = defaults;
            Ok(())
        })
    }

    /// Replace the state with an exported document. Invalid input leaves the
    /// state untouched. A successful import can be undone.
    pub fn import_data(&mut self, text: &str) -> Result<(), StoreError> {
        let imported = parse_record(text).map_err(|err| {
            tracing::warn!(error = %err, "import rejected");
            StoreError::from(err)
        })?;
        self.apply("import_data", WriteMode::Immediate, move |prefs| {
            *prefs = imported;
            Ok(())
        })
    }

    /// Serialize the full state for backup or sharing.
    pub fn export_data(&self) -> Result<String, StoreError> {
        Ok(serialize_export(&self.prefs, Utc::now())?)
    }

    fn apply<F>(
        &mut self,
        action: &'static str,
        mode: WriteMode,
        mutate: F,
    ) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Preferences) -> Result<(), TileError>,
    {
        let mut next = self.prefs.clone();
        if let Err(err) = mutate(&mut next) {
            tracing::warn!(action, error = %err, "ignoring action");
            return Err(err.into());
        }
        debug_assert!(tile_ops::positions_are_normalized(&next.tiles));

        let changed = next != self.prefs;
        let before = std::mem::replace(&mut self.prefs, next);
        self.history.commit(before);
        if !changed {
            tracing::debug!(action, "committed without change");
            return Ok(());
        }
        tracing::debug!(action, "committed");
        self.notify();
        self.persist(mode)
    }

    // -----------------------------------------------------------------------
    // Undo / redo
    // -----------------------------------------------------------------------

    pub fn undo(&mut self) -> Result<(), StoreError> {
        let snapshot = self.history.undo(self.prefs.clone())?;
        self.restore(snapshot, "undo")
    }

    pub fn redo(&mut self) -> Result<(), StoreError> {
        let snapshot = self.history.redo(self.prefs.clone())?;
        self.restore(snapshot, "redo")
    }

    fn restore(&mut self, snapshot: Preferences, action: &'static str) -> Result<(), StoreError> {
        self.prefs = snapshot;
        tracing::debug!(action, state = ?self.history.state(), "history step");
        self.notify();
        self.persist(WriteMode::Immediate)
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    fn persist(&mut self, mode: WriteMode) -> Result<(), StoreError> {
        self.revision += 1;
        let contents = serialize_stored(&self.prefs)?;
        match mode {
            WriteMode::Debounced => {
                self.debouncer.schedule(PendingWrite {
                    revision: self.revision,
                    contents,
                });
                Ok(())
            }
            WriteMode::Immediate => {
                persist::lock(&self.persister)
                    .write(self.revision, &contents)
                    .map(|_| ())
                    .map_err(|err| {
                        tracing::warn!(error = %err, "could not persist preferences");
                        StoreError::Persistence(err)
                    })
            }
        }
    }

    /// Write any pending debounced reorder now and report the outcome.
    pub fn flush(&self) -> Result<(), StoreError> {
        Ok(self.debouncer.flush()?)
    }

    /// The last failure of a debounced write that nobody waited on, if any.
    /// Taking it clears it.
    pub fn take_persist_error(&self) -> Option<StorageError> {
        persist::lock(&self.persister).take_error()
    }
}

fn load_initial(persister: &SharedPersister, catalog: &[TileSpec]) -> Preferences {
    let mut guard = persist::lock(persister);
    let text = match guard.load() {
        Ok(Some(text)) => text,
        Ok(None) => return Preferences::from_catalog(catalog),
        Err(err) => {
            tracing::warn!(error = %err, "could not read preferences, using defaults");
            return Preferences::from_catalog(catalog);
        }
    };
    match parse_record(&text) {
        Ok(prefs) => prefs,
        Err(err) => {
            tracing::warn!(
                error = %err,
                "stored preferences unreadable, backing up and using defaults"
            );
            if let Err(backup_err) = guard.backup(&text) {
                tracing::warn!(error = %backup_err, "could not back up stored preferences");
            }
            Preferences::from_catalog(catalog)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::preferences::{Theme, default_catalog};
    use crate::model::tile::TileSize;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn store() -> PreferencesStore {
        PreferencesStore::in_memory(default_catalog())
    }

    fn store_on(memory: &MemoryStorage) -> PreferencesStore {
        PreferencesStore::open(
            &EngineConfig::default(),
            default_catalog(),
            Box::new(memory.clone()),
        )
    }

    #[test]
    fn opens_with_catalog_defaults() {
        let store = store();
        assert_eq!(
            store.preferences(),
            &Preferences::from_catalog(&default_catalog())
        );
        assert!(!store.can_undo());
        assert!(!store.can_redo());
    }

    #[test]
    fn each_action_is_one_undo_step() {
        let mut store = store();
        store.toggle_tile("humidity").unwrap();
        store.toggle_module("watering").unwrap();
        store
            .set_preferences(PreferencesPatch {
                theme: Some(Theme::Dark),
                ..Default::default()
            })
            .unwrap();
        store
            .update_tile(
                "vpd",
                TilePatch {
                    size: Some(TileSize::Large),
                    ..Default::default()
                },
            )
            .unwrap();
        store.reset_to_default().unwrap();

        let mut steps = 0;
        while store.undo().is_ok() {
            steps += 1;
        }
        assert_eq!(steps, 5);
        assert_eq!(
            store.preferences(),
            &Preferences::from_catalog(&default_catalog())
        );
    }

    #[test]
    fn undo_redo_inverse() {
        let mut store = store();
        let before = store.preferences().clone();
        store.toggle_tile("temperature").unwrap();
        let after = store.preferences().clone();

        store.undo().unwrap();
        assert_eq!(store.preferences(), &before);
        assert_eq!(store.history_state(), HistoryState::AfterUndo);
        store.redo().unwrap();
        assert_eq!(store.preferences(), &after);
        assert_eq!(store.history_state(), HistoryState::Clean);
    }

    #[test]
    fn undo_and_redo_on_empty_history() {
        let mut store = store();
        assert!(matches!(store.undo(), Err(StoreError::EmptyHistory)));
        assert!(matches!(store.redo(), Err(StoreError::EmptyHistory)));
    }

    #[test]
    fn unknown_tile_is_noop() {
        let mut store = store();
        let before = store.preferences().clone();
        assert!(matches!(
            store.toggle_tile("ghost"),
            Err(StoreError::UnknownTile(ref id)) if id == "ghost"
        ));
        assert!(matches!(
            store.reorder(&["temperature", "ghost"]),
            Err(StoreError::UnknownTile(_))
        ));
        assert_eq!(store.preferences(), &before);
        assert!(!store.can_undo());
    }

    #[test]
    fn unchanged_state_still_commits_one_step() {
        let memory = MemoryStorage::new();
        let mut store = store_on(&memory);
        let notified: Rc<RefCell<usize>> = Rc::default();
        let sink = notified.clone();
        store.subscribe(move |_| *sink.borrow_mut() += 1);

        store.set_preferences(PreferencesPatch::default()).unwrap();
        let current: Vec<String> = store
            .preferences()
            .tiles
            .iter()
            .map(|t| t.id.clone())
            .collect();
        store.reorder(&current).unwrap();
        store.flush().unwrap();
        assert_eq!(memory.write_count(), 0);
        assert_eq!(*notified.borrow(), 0);

        let mut steps = 0;
        while store.undo().is_ok() {
            steps += 1;
        }
        assert_eq!(steps, 2);
    }

    #[test]
    fn empty_module_toggle_leaves_no_step() {
        let mut store = store();
        store.toggle_module("no-such-module").unwrap();
        assert!(!store.can_undo());
    }

    #[test]
    fn undo_after_same_value_patch_keeps_previous_action() {
        let mut store = store();
        store.toggle_tile("co2").unwrap();
        let after_toggle = store.preferences().clone();
        store
            .set_preferences(PreferencesPatch {
                theme: Some(Theme::Auto),
                ..Default::default()
            })
            .unwrap();

        store.undo().unwrap();
        assert_eq!(store.preferences(), &after_toggle);
        assert!(!store.preferences().tile("co2").unwrap().enabled);
    }

    #[test]
    fn reset_on_defaults_is_an_undo_step() {
        let mut store = store();
        store.reset_to_default().unwrap();
        assert!(store.can_undo());
        store.undo().unwrap();
        assert_eq!(
            store.preferences(),
            &Preferences::from_catalog(&default_catalog())
        );
    }

    #[test]
    fn new_action_after_undo_clears_redo() {
        let mut store = store();
        store.toggle_tile("co2").unwrap();
        store.undo().unwrap();
        assert!(store.can_redo());
        store.toggle_tile("vpd").unwrap();
        assert!(!store.can_redo());
    }

    #[test]
    fn reset_is_idempotent() {
        let mut store = store();
        store.toggle_module("monitoring").unwrap();
        store.reset_to_default().unwrap();
        let once = store.preferences().clone();
        store.reset_to_default().unwrap();
        assert_eq!(store.preferences(), &once);
    }

    #[test]
    fn history_limit_comes_from_config() {
        let config = EngineConfig {
            history_limit: 2,
            ..Default::default()
        };
        let mut store =
            PreferencesStore::open(&config, default_catalog(), Box::new(MemoryStorage::new()));
        store.toggle_tile("co2").unwrap();
        store.toggle_tile("vpd").unwrap();
        store.toggle_tile("humidity").unwrap();
        assert!(store.undo().is_ok());
        assert!(store.undo().is_ok());
        assert!(matches!(store.undo(), Err(StoreError::EmptyHistory)));
    }

    #[test]
    fn listeners_see_every_applied_change() {
        let mut store = store();
        let seen: Rc<RefCell<Vec<bool>>> = Rc::default();
        let sink = seen.clone();
        let id = store.subscribe(move |prefs| {
            sink.borrow_mut().push(prefs.compact_mode);
        });

        store
            .set_preferences(PreferencesPatch {
                compact_mode: Some(true),
                ..Default::default()
            })
            .unwrap();
        store.undo().unwrap();
        store.redo().unwrap();
        // Failed and no-op calls do not notify
        let _ = store.toggle_tile("ghost");
        store.set_preferences(PreferencesPatch::default()).unwrap();
        assert_eq!(*seen.borrow(), vec![true, false, true]);

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.toggle_tile("co2").unwrap();
        assert_eq!(seen.borrow().len(), 3);
    }

    #[test]
    fn immediate_actions_persist_right_away() {
        let memory = MemoryStorage::new();
        let mut store = store_on(&memory);
        store.toggle_tile("co2").unwrap();
        assert_eq!(memory.write_count(), 1);
        let persisted = parse_record(&memory.contents().unwrap()).unwrap();
        assert_eq!(&persisted, store.preferences());
    }

    #[test]
    fn reopen_restores_persisted_state() {
        let memory = MemoryStorage::new();
        let expected = {
            let mut store = store_on(&memory);
            store.toggle_tile("co2").unwrap();
            store.reorder(&["vpd", "temperature"]).unwrap();
            store.preferences().clone()
        };
        let store = store_on(&memory);
        assert_eq!(store.preferences(), &expected);
        assert!(!store.can_undo());
    }

    #[test]
    fn corrupt_record_is_backed_up_and_replaced_by_defaults() {
        let memory = MemoryStorage::with_contents("{ definitely not json");
        let store = store_on(&memory);
        assert_eq!(
            store.preferences(),
            &Preferences::from_catalog(&default_catalog())
        );
        assert_eq!(memory.backups(), vec!["{ definitely not json"]);
    }

    #[test]
    fn persistence_failure_keeps_change_in_memory() {
        let memory = MemoryStorage::new();
        let mut store = store_on(&memory);
        memory.set_fail_writes(true);
        let result = store.toggle_tile("co2");
        assert!(matches!(result, Err(StoreError::Persistence(_))));
        assert!(!store.preferences().tile("co2").unwrap().enabled);
        assert!(store.can_undo());

        memory.set_fail_writes(false);
        store.undo().unwrap();
        assert!(store.preferences().tile("co2").unwrap().enabled);
        assert_eq!(memory.write_count(), 1);
    }

    #[test]
    fn debounced_failure_is_reported_by_flush() {
        let memory = MemoryStorage::new();
        let mut store = store_on(&memory);
        memory.set_fail_writes(true);
        store.reorder(&["vpd"]).unwrap();
        assert!(matches!(store.flush(), Err(StoreError::Persistence(_))));
        assert!(store.take_persist_error().is_none());
    }
}
