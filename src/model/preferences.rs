use serde::{Deserialize, Serialize};

use super::tile::{DEFAULT_REFRESH_INTERVAL, Tile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    Auto,
}

/// Global display settings plus the ordered tile collection.
///
/// `tiles` is kept sorted by `position`: enabled tiles hold `1..=N`,
/// disabled tiles follow with `N+1..`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preferences {
    pub theme: Theme,
    pub compact_mode: bool,
    pub auto_refresh: bool,
    /// Default refresh interval (seconds) for tiles without an override
    pub refresh_interval: u32,
    pub tiles: Vec<Tile>,
}

/// The global settings of [`Preferences`] without the tiles. This is the
/// `preferences` object of the persisted and exported records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySettings {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub compact_mode: bool,
    #[serde(default = "default_true")]
    pub auto_refresh: bool,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u32,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        DisplaySettings {
            theme: Theme::default(),
            compact_mode: false,
            auto_refresh: true,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_refresh_interval() -> u32 {
    DEFAULT_REFRESH_INTERVAL
}

/// Partial update of the global settings. `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferencesPatch {
    pub theme: Option<Theme>,
    pub compact_mode: Option<bool>,
    pub auto_refresh: Option<bool>,
    pub refresh_interval: Option<u32>,
}

impl PreferencesPatch {
    pub fn is_empty(&self) -> bool {
        self.theme.is_none()
            && self.compact_mode.is_none()
            && self.auto_refresh.is_none()
            && self.refresh_interval.is_none()
    }
}

/// A built-in tile: identity only, settings come from the defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileSpec {
    pub id: &'static str,
    pub label: &'static str,
    pub module_id: &'static str,
}

const fn spec(id: &'static str, label: &'static str, module_id: &'static str) -> TileSpec {
    TileSpec {
        id,
        label,
        module_id,
    }
}

/// The grow-room dashboard's built-in tiles, in default render order
pub fn default_catalog() -> Vec<TileSpec> {
    vec![
        spec("temperature", "Temperature", "monitoring"),
        spec("humidity", "Humidity", "monitoring"),
        spec("vpd", "VPD", "monitoring"),
        spec("co2", "CO2", "monitoring"),
        spec("next-watering", "Next watering", "watering"),
        spec("water-volume", "Water volume", "watering"),
        spec("soil-moisture", "Soil moisture", "watering"),
        spec("ec-ph", "EC / pH", "nutrients"),
        spec("mycorrhiza-dose", "Mycorrhiza dose", "nutrients"),
        spec("upcoming-tasks", "Upcoming tasks", "calendar"),
        spec("grow-phase", "Grow phase", "grow"),
        spec("plant-count", "Plants", "grow"),
    ]
}

impl Preferences {
    /// Default state for a catalog: default settings, every tile enabled,
    /// positions in catalog order.
    pub fn from_catalog(catalog: &[TileSpec]) -> Self {
        let tiles = catalog
            .iter()
            .zip(1u32..)
            .map(|(spec, position)| {
                let mut tile = Tile::new(spec.id, spec.label, spec.module_id);
                tile.position = position;
                tile
            })
            .collect();
        Preferences::from_parts(DisplaySettings::default(), tiles)
    }

    pub fn from_parts(settings: DisplaySettings, tiles: Vec<Tile>) -> Self {
        Preferences {
            theme: settings.theme,
            compact_mode: settings.compact_mode,
            auto_refresh: settings.auto_refresh,
            refresh_interval: settings.refresh_interval,
            tiles,
        }
    }

    pub fn display_settings(&self) -> DisplaySettings {
        DisplaySettings {
            theme: self.theme,
            compact_mode: self.compact_mode,
            auto_refresh: self.auto_refresh,
            refresh_interval: self.refresh_interval,
        }
    }

    /// Merge the set fields of `patch`
    pub fn apply_patch(&mut self, patch: &PreferencesPatch) {
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
        if let Some(compact) = patch.compact_mode {
            self.compact_mode = compact;
        }
        if let Some(auto) = patch.auto_refresh {
            self.auto_refresh = auto;
        }
        if let Some(interval) = patch.refresh_interval {
            self.refresh_interval = interval;
        }
    }

    pub fn tile(&self, tile_id: &str) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.id == tile_id)
    }

    /// Enabled tiles in render order
    pub fn enabled_tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter().filter(|t| t.enabled)
    }
}
