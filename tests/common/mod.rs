use tileboard::model::preferences::Preferences;
use tracing_subscriber::EnvFilter;

/// Route engine logs to the test harness. `RUST_LOG` picks the level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Ids in render order
#[allow(dead_code)]
pub fn order(prefs: &Preferences) -> Vec<String> {
    prefs.tiles.iter().map(|t| t.id.clone()).collect()
}

/// Enabled positions are `1..=N` and every position is unique
#[allow(dead_code)]
pub fn assert_positions_invariant(prefs: &Preferences) {
    let enabled: Vec<u32> = prefs.enabled_tiles().map(|t| t.position).collect();
    let expected: Vec<u32> = (1..=enabled.len() as u32).collect();
    assert_eq!(enabled, expected, "enabled positions not contiguous");
    let mut all: Vec<u32> = prefs.tiles.iter().map(|t| t.position).collect();
    all.sort_unstable();
    all.dedup();
    assert_eq!(all.len(), prefs.tiles.len(), "positions not unique");
}
