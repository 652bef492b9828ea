use std::collections::HashSet;

use serde::Deserialize;

use crate::model::preferences::{DisplaySettings, Preferences};
use crate::model::tile::{DEFAULT_REFRESH_INTERVAL, Tile, TileSize};
use crate::parse::export_serializer::SCHEMA_VERSION;

/// Schema versions this parser accepts
pub const SUPPORTED_SCHEMA_VERSIONS: &[u64] = &[SCHEMA_VERSION as u64];

/// Why an import (or a persisted record) was rejected
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("could not parse data: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("missing or non-integer schemaVersion")]
    MissingVersion,
    #[error("unsupported schema version {0}")]
    UnsupportedVersion(u64),
    #[error("invalid tile data: {0}")]
    Structural(String),
}

#[derive(Deserialize)]
struct RawRecord {
    preferences: DisplaySettings,
    tiles: Vec<RawTile>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTile {
    id: Option<String>,
    module_id: Option<String>,
    label: Option<String>,
    #[serde(default = "default_true")]
    enabled: bool,
    position: Option<serde_json::Value>,
    #[serde(default)]
    size: TileSize,
    #[serde(default = "default_refresh_interval")]
    refresh_interval: u32,
    #[serde(default = "default_true")]
    show_value: bool,
    #[serde(default)]
    show_chart: bool,
}

fn default_true() -> bool {
    true
}

fn default_refresh_interval() -> u32 {
    DEFAULT_REFRESH_INTERVAL
}

/// Parse and validate an exported or persisted record.
///
/// The schema version is checked before the rest of the structure, so data
/// from a newer schema is reported as unsupported rather than malformed.
/// Positions are renumbered into render order instead of being rejected.
pub fn parse_record(text: &str) -> Result<Preferences, ImportError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let version = value
        .get("schemaVersion")
        .and_then(serde_json::Value::as_u64)
        .ok_or(ImportError::MissingVersion)?;
    if !SUPPORTED_SCHEMA_VERSIONS.contains(&version) {
        return Err(ImportError::UnsupportedVersion(version));
    }

    let raw: RawRecord = serde_json::from_value(value)?;
    let tiles = validate_tiles(raw.tiles)?;
    Ok(Preferences::from_parts(raw.preferences, tiles))
}

/// Anything other than a finite number counts as unpositioned and sorts
/// after the positioned tiles.
fn sort_rank(position: Option<&serde_json::Value>) -> f64 {
    position
        .and_then(serde_json::Value::as_f64)
        .filter(|p| p.is_finite())
        .unwrap_or(f64::INFINITY)
}

fn validate_tiles(raw_tiles: Vec<RawTile>) -> Result<Vec<Tile>, ImportError> {
    let mut seen = HashSet::new();
    let mut ranked = Vec::with_capacity(raw_tiles.len());

    for (index, raw) in raw_tiles.into_iter().enumerate() {
        let id = match raw.id {
            Some(id) if !id.trim().is_empty() => id,
            _ => {
                return Err(ImportError::Structural(format!(
                    "tile #{} has no id",
                    index + 1
                )));
            }
        };
        let module_id = match raw.module_id {
            Some(module_id) if !module_id.trim().is_empty() => module_id,
            _ => {
                return Err(ImportError::Structural(format!(
                    "tile '{}' has no moduleId",
                    id
                )));
            }
        };
        if !seen.insert(id.clone()) {
            return Err(ImportError::Structural(format!("duplicate tile id '{}'", id)));
        }

        let tile = Tile {
            label: raw.label.unwrap_or_else(|| id.clone()),
            id,
            module_id,
            enabled: raw.enabled,
            position: 0,
            size: raw.size,
            refresh_interval: raw.refresh_interval,
            show_value: raw.show_value,
            show_chart: raw.show_chart,
        };
        ranked.push((sort_rank(raw.position.as_ref()), tile));
    }

    ranked.sort_by(|(a, tile_a), (b, tile_b)| {
        (!tile_a.enabled)
            .cmp(&!tile_b.enabled)
            .then_with(|| a.total_cmp(b))
    });
    Ok(ranked
        .into_iter()
        .zip(1u32..)
        .map(|((_, mut tile), position)| {
            tile.position = position;
            tile
        })
        .collect())
}
