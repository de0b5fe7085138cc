use std::fmt;

use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One station-key to dialog-id binding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StationEntry {
    pub station: String,
    pub dialog: String,
}

/// Ordered station-key to dialog-id mapping, fixed at configuration time.
///
/// Keys are unique (compared case-insensitively, since scene node matching
/// is case-insensitive). Dialog ids may repeat.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct StationMapping {
    entries: Vec<StationEntry>,
}

impl StationMapping {
    pub fn new(entries: Vec<StationEntry>) -> Result<Self, ConfigError> {
        let mut seen: Vec<String> = Vec::with_capacity(entries.len());
        for entry in &entries {
            let key = entry.station.trim().to_lowercase();
            if key.is_empty() {
                return Err(ConfigError::EmptyStationKey {
                    dialog_id: entry.dialog.clone(),
                });
            }
            if seen.contains(&key) {
                return Err(ConfigError::DuplicateStation(entry.station.clone()));
            }
            seen.push(key);
        }
        Ok(Self { entries })
    }

    pub fn from_pairs<K, D>(pairs: impl IntoIterator<Item = (K, D)>) -> Result<Self, ConfigError>
    where
        K: Into<String>,
        D: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(station, dialog)| StationEntry {
                    station: station.into(),
                    dialog: dialog.into(),
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &StationEntry> + '_ {
        self.entries.iter()
    }

    pub fn dialog_for(&self, station: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.station.eq_ignore_ascii_case(station))
            .map(|e| e.dialog.as_str())
    }
}

/// Accepts either a list of `{"station", "dialog"}` entries or an object
/// of `station: dialog` pairs. Both keep document order.
impl<'de> Deserialize<'de> for StationMapping {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct MappingVisitor;

        impl<'de> Visitor<'de> for MappingVisitor {
            type Value = Vec<StationEntry>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a list of station entries or a station-to-dialog object")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(entry) = seq.next_element::<StationEntry>()? {
                    entries.push(entry);
                }
                Ok(entries)
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((station, dialog)) = map.next_entry::<String, String>()? {
                    entries.push(StationEntry { station, dialog });
                }
                Ok(entries)
            }
        }

        let entries = deserializer.deserialize_any(MappingVisitor)?;
        StationMapping::new(entries).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::StationMapping;
    use crate::error::ConfigError;
    use pretty_assertions::assert_eq;

    #[test]
    fn preserves_declaration_order() {
        let m = StationMapping::from_pairs([("pump", "dlg-pump"), ("filter", "dlg-filter")])
            .expect("mapping");
        let keys: Vec<_> = m.iter().map(|e| e.station.as_str()).collect();
        assert_eq!(keys, vec!["pump", "filter"]);
        assert_eq!(m.dialog_for("FILTER"), Some("dlg-filter"));
    }

    #[test]
    fn rejects_duplicate_keys_case_insensitively() {
        let err = StationMapping::from_pairs([("Pump", "a"), ("pump", "b")]).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateStation(k) if k == "pump"));
    }

    #[test]
    fn rejects_blank_keys() {
        let err = StationMapping::from_pairs([("  ", "a")]).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyStationKey { .. }));
    }

    #[test]
    fn deserializes_from_entry_list() {
        let m: StationMapping =
            serde_json::from_str(r#"[{"station":"tank","dialog":"d1"},{"station":"valve","dialog":"d1"}]"#)
                .expect("json");
        assert_eq!(m.len(), 2);
        assert!(serde_json::from_str::<StationMapping>(r#"[{"station":"a","dialog":"x"},{"station":"A","dialog":"y"}]"#).is_err());
    }

    #[test]
    fn deserializes_from_object_in_document_order() {
        let m: StationMapping =
            serde_json::from_str(r#"{"valve": "d2", "tank": "d1"}"#).expect("json");
        let keys: Vec<_> = m.iter().map(|e| e.station.as_str()).collect();
        assert_eq!(keys, vec!["valve", "tank"]);
        assert_eq!(m.dialog_for("tank"), Some("d1"));
    }
}
