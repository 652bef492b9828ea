use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::model::preferences::{DisplaySettings, Preferences};
use crate::model::tile::Tile;

/// Schema version written into every record
pub const SCHEMA_VERSION: u32 = 1;

/// Export document: the full state plus a timestamp, for backup and sharing.
/// Field order is fixed so exports diff cleanly.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportRecord<'a> {
    preferences: DisplaySettings,
    tiles: &'a [Tile],
    exported_at: String,
    schema_version: u32,
}

/// Persisted record: same shape as the export, without the timestamp.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord<'a> {
    preferences: DisplaySettings,
    tiles: &'a [Tile],
    schema_version: u32,
}

/// Serialize the state for export, stamped with `exported_at`.
pub fn serialize_export(
    prefs: &Preferences,
    exported_at: DateTime<Utc>,
) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&ExportRecord {
        preferences: prefs.display_settings(),
        tiles: &prefs.tiles,
        exported_at: exported_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        schema_version: SCHEMA_VERSION,
    })
}

/// Serialize the state into the persisted record.
pub fn serialize_stored(prefs: &Preferences) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&StoredRecord {
        preferences: prefs.display_settings(),
        tiles: &prefs.tiles,
        schema_version: SCHEMA_VERSION,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::preferences::{Theme, TileSpec};
    use chrono::TimeZone;
    use insta::assert_snapshot;

    fn single_tile() -> Preferences {
        Preferences::from_catalog(&[TileSpec {
            id: "temperature",
            label: "Temperature",
            module_id: "monitoring",
        }])
    }

    #[test]
    fn export_format() {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap();
        let text = serialize_export(&single_tile(), at).unwrap();
        assert_snapshot!(text, @r#"
        {
          "preferences": {
            "theme": "auto",
            "compactMode": false,
            "autoRefresh": true,
            "refreshInterval": 60
          },
          "tiles": [
            {
              "id": "temperature",
              "label": "Temperature",
              "moduleId": "monitoring",
              "enabled": true,
              "position": 1,
              "size": "medium",
              "refreshInterval": 60,
              "showValue": true,
              "showChart": false
            }
          ],
          "exportedAt": "2026-10-19T08:30:00Z",
          "schemaVersion": 1
        }
        "#);
    }

    #[test]
    fn export_is_deterministic() {
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let mut prefs = single_tile();
        prefs.theme = Theme::Dark;
        assert_eq!(
            serialize_export(&prefs, at).unwrap(),
            serialize_export(&prefs.clone(), at).unwrap()
        );
    }

    #[test]
    fn stored_record_has_no_timestamp() {
        let text = serialize_stored(&single_tile()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(value.get("exportedAt").is_none());
        assert_eq!(value["schemaVersion"], 1);
        assert_eq!(value["tiles"][0]["id"], "temperature");
        assert_eq!(value["preferences"]["theme"], "auto");
    }
}
