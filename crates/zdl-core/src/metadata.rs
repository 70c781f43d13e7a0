use std::collections::BTreeSet;
use std::path::Path;

use log::warn;
use serde::Serialize;
use zdl_types::{ToolchainError, VersionId};

use crate::atomic::write_atomic;

/// Persisted per-root state. Currently only the pin set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub pins: BTreeSet<VersionId>,
}

#[derive(Serialize)]
struct RawMetadata<'a> {
    pins: Vec<&'a VersionId>,
}

impl Metadata {
    /// Decode a metadata record, dropping anything that is not a valid pin.
    #[must_use]
    pub fn from_json(bytes: &[u8]) -> Self {
        let Ok(value) = serde_json::from_slice::<serde_json::Value>(bytes) else {
            warn!("metadata record is not valid JSON, ignoring it");
            return Self::default();
        };

        let pins = value
            .get("pins")
            .and_then(serde_json::Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(serde_json::Value::as_str)
                    .filter_map(|pin| pin.parse().ok())
                    .collect()
            })
            .unwrap_or_default();

        Self { pins }
    }

    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        let raw = RawMetadata {
            pins: self.pins.iter().collect(),
        };
        let mut data = serde_json::to_vec_pretty(&raw)?;
        data.push(b'\n');
        Ok(data)
    }

    /// Load the record at `path`. Missing or unreadable records load as
    /// empty.
    #[must_use]
    pub fn load_from_path(path: &Path) -> Self {
        match std::fs::read(path) {
            Ok(data) => Self::from_json(&data),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(error) => {
                warn!("failed to read {}: {error}", path.display());
                Self::default()
            }
        }
    }

    /// # Errors
    /// Returns an error if the record cannot be written.
    pub fn save_to_path(&self, path: &Path) -> Result<(), ToolchainError> {
        let data = self.to_json().map_err(|error| {
            ToolchainError::io("failed to encode metadata", path, std::io::Error::other(error))
        })?;
        write_atomic(path, &data)
            .map_err(|error| ToolchainError::io("failed to write metadata", path, error))
    }
}

#[cfg(test)]
mod tests {
    use super::Metadata;
    use zdl_types::VersionId;

    fn v(s: &str) -> VersionId {
        s.parse().expect("valid version in test")
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let loaded = Metadata::load_from_path(&temp.path().join("metadata.json"));
        assert!(loaded.pins.is_empty());
    }

    #[test]
    fn round_trip_is_independent_of_insertion_order() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let path = temp.path().join("metadata.json");

        let mut first = Metadata::default();
        first.pins.insert(v("0.11.0"));
        first.pins.insert(v("0.9.1"));
        first.pins.insert(v("0.12.0-dev.7+abc"));

        let mut second = Metadata::default();
        second.pins.insert(v("0.12.0-dev.7+abc"));
        second.pins.insert(v("0.11.0"));
        second.pins.insert(v("0.9.1"));

        first.save_to_path(&path).expect("save first");
        let first_bytes = std::fs::read(&path).expect("read first");
        second.save_to_path(&path).expect("save second");
        let second_bytes = std::fs::read(&path).expect("read second");

        assert_eq!(first_bytes, second_bytes);
        assert_eq!(Metadata::load_from_path(&path), first);
    }

    #[test]
    fn saved_pins_are_sorted_by_version() {
        let mut metadata = Metadata::default();
        metadata.pins.insert(v("0.10.0"));
        metadata.pins.insert(v("0.9.0"));

        let json = String::from_utf8(metadata.to_json().expect("encodes")).expect("utf8");
        let nine = json.find("0.9.0").expect("0.9.0 present");
        let ten = json.find("0.10.0").expect("0.10.0 present");
        assert!(nine < ten);
    }

    #[test]
    fn malformed_record_degrades_to_empty() {
        for raw in ["{not json", "[]", "{\"pins\": \"0.11.0\"}", "{\"other\": 1}"] {
            let loaded = Metadata::from_json(raw.as_bytes());
            assert!(loaded.pins.is_empty(), "{raw:?} should load as empty");
        }
    }

    #[test]
    fn invalid_pin_entries_are_dropped() {
        let loaded = Metadata::from_json(br#"{"pins": ["0.11.0", 7, null, "latest", "0.9.1"]}"#);
        let pins: Vec<String> = loaded.pins.iter().map(ToString::to_string).collect();
        assert_eq!(pins, ["0.9.1", "0.11.0"]);
    }
}
