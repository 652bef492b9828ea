use serde::{Deserialize, Serialize};

/// Default refresh interval in seconds, for tiles and for the global preference
pub const DEFAULT_REFRESH_INTERVAL: u32 = 60;

/// Rendered footprint of a tile on the dashboard grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TileSize {
    Small,
    #[default]
    Medium,
    Large,
    FullWidth,
}

impl TileSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            TileSize::Small => "small",
            TileSize::Medium => "medium",
            TileSize::Large => "large",
            TileSize::FullWidth => "full-width",
        }
    }
}

/// Configuration record for one dashboard widget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    /// Stable unique id, never reused
    pub id: String,
    pub label: String,
    /// Category the tile belongs to (e.g. "monitoring", "watering")
    pub module_id: String,
    pub enabled: bool,
    /// 1-based render order; enabled tiles come first
    pub position: u32,
    pub size: TileSize,
    /// Seconds between refreshes, 0 = manual only
    pub refresh_interval: u32,
    pub show_value: bool,
    pub show_chart: bool,
}

impl Tile {
    /// A tile with the built-in defaults. Position is assigned by the caller.
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        module_id: impl Into<String>,
    ) -> Self {
        Tile {
            id: id.into(),
            label: label.into(),
            module_id: module_id.into(),
            enabled: true,
            position: 0,
            size: TileSize::default(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            show_value: true,
            show_chart: false,
        }
    }
}

/// Partial update of a tile's presentation settings. `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TilePatch {
    pub label: Option<String>,
    pub size: Option<TileSize>,
    pub refresh_interval: Option<u32>,
    pub show_value: Option<bool>,
    pub show_chart: Option<bool>,
}

impl TilePatch {
    pub fn is_empty(&self) -> bool {
        self.label.is_none()
            && self.size.is_none()
            && self.refresh_interval.is_none()
            && self.show_value.is_none()
            && self.show_chart.is_none()
    }

    /// Merge the set fields into `tile`
    pub fn apply(&self, tile: &mut Tile) {
        if let Some(label) = &self.label {
            tile.label = label.clone();
        }
        if let Some(size) = self.size {
            tile.size = size;
        }
        if let Some(interval) = self.refresh_interval {
            tile.refresh_interval = interval;
        }
        if let Some(show) = self.show_value {
            tile.show_value = show;
        }
        if let Some(show) = self.show_chart {
            tile.show_chart = show;
        }
    }
}
