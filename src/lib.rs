pub mod io;
pub mod model;
pub mod ops;
pub mod parse;
pub mod store;

pub use io::storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use model::{
    EngineConfig, Preferences, PreferencesPatch, Theme, Tile, TilePatch, TileSize, TileSpec,
};
pub use parse::ImportError;
pub use store::{HistoryState, PreferencesStore, StoreError, SubscriptionId};
