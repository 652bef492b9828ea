use std::collections::HashSet;

use crate::model::preferences::Preferences;
use crate::model::tile::{Tile, TilePatch};

/// Error type for tile operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TileError {
    #[error("unknown tile: {0}")]
    UnknownTile(String),
}

/// Sort tiles into render order and renumber them: enabled tiles get
/// `1..=N`, disabled tiles continue from `N+1`. Ties keep their current
/// relative order.
pub fn normalize_positions(tiles: &mut [Tile]) {
    tiles.sort_by_key(|t| (!t.enabled, t.position));
    for (tile, position) in tiles.iter_mut().zip(1u32..) {
        tile.position = position;
    }
}

/// True when the tiles are sorted by position, enabled tiles hold `1..=N`
/// and disabled tiles hold `N+1..=len`.
pub fn positions_are_normalized(tiles: &[Tile]) -> bool {
    let enabled = tiles.iter().take_while(|t| t.enabled).count();
    tiles[enabled..].iter().all(|t| !t.enabled)
        && tiles.iter().zip(1u32..).all(|(t, p)| t.position == p)
}

fn find_tile_mut<'a>(
    prefs: &'a mut Preferences,
    tile_id: &str,
) -> Result<&'a mut Tile, TileError> {
    prefs
        .tiles
        .iter_mut()
        .find(|t| t.id == tile_id)
        .ok_or_else(|| TileError::UnknownTile(tile_id.to_string()))
}

/// Flip `enabled` on one tile and renumber.
pub fn toggle_tile(prefs: &mut Preferences, tile_id: &str) -> Result<(), TileError> {
    let tile = find_tile_mut(prefs, tile_id)?;
    tile.enabled = !tile.enabled;
    normalize_positions(&mut prefs.tiles);
    Ok(())
}

/// Disable every tile of the module if all of them are enabled, otherwise
/// enable all of them. A module with no tiles counts as fully enabled and is
/// left alone.
pub fn toggle_module(prefs: &mut Preferences, module_id: &str) {
    let mut members = prefs.tiles.iter().filter(|t| t.module_id == module_id).peekable();
    if members.peek().is_none() {
        return;
    }
    let all_enabled = members.all(|t| t.enabled);
    for tile in prefs.tiles.iter_mut().filter(|t| t.module_id == module_id) {
        tile.enabled = !all_enabled;
    }
    normalize_positions(&mut prefs.tiles);
}

/// Put the listed tiles first, in the given order, followed by the unlisted
/// ones in their current order, then renumber. Enabled tiles end up at
/// `1..=N` and disabled ones after them. Repeated ids count once, at their
/// first occurrence.
///
/// Any unknown id rejects the whole call without touching `prefs`.
pub fn reorder<S: AsRef<str>>(
    prefs: &mut Preferences,
    ordered_ids: &[S],
) -> Result<(), TileError> {
    if let Some(unknown) = ordered_ids
        .iter()
        .map(AsRef::as_ref)
        .find(|id| prefs.tile(id).is_none())
    {
        return Err(TileError::UnknownTile(unknown.to_string()));
    }

    let mut seen = HashSet::new();
    let listed: Vec<&str> = ordered_ids
        .iter()
        .map(AsRef::as_ref)
        .filter(|id| seen.insert(*id))
        .collect();

    let mut remaining = std::mem::take(&mut prefs.tiles);
    let mut ordered = Vec::with_capacity(remaining.len());
    for id in listed {
        if let Some(idx) = remaining.iter().position(|t| t.id == id) {
            ordered.push(remaining.remove(idx));
        }
    }
    ordered.append(&mut remaining);

    for (tile, position) in ordered.iter_mut().zip(1u32..) {
        tile.position = position;
    }
    normalize_positions(&mut ordered);
    prefs.tiles = ordered;
    Ok(())
}

/// Merge per-tile presentation settings.
pub fn update_tile(
    prefs: &mut Preferences,
    tile_id: &str,
    patch: &TilePatch,
) -> Result<(), TileError> {
    let tile = find_tile_mut(prefs, tile_id)?;
    patch.apply(tile);
    Ok(())
}
