use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Engine configuration, read from an optional `tileboard.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Application namespace the persisted record is keyed under
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Explicit path of the persisted record. Overrides the namespace lookup.
    #[serde(default)]
    pub storage_path: Option<PathBuf>,
    /// Maximum number of undo steps kept. Oldest entries are dropped first.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Quiet period before a burst of reorders is written out
    #[serde(default = "default_reorder_debounce_ms")]
    pub reorder_debounce_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            namespace: default_namespace(),
            storage_path: None,
            history_limit: default_history_limit(),
            reorder_debounce_ms: default_reorder_debounce_ms(),
        }
    }
}

fn default_namespace() -> String {
    "growroom".to_string()
}

fn default_history_limit() -> usize {
    50
}

fn default_reorder_debounce_ms() -> u64 {
    400
}
