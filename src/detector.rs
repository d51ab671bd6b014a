//! Detector mapping file.
//!
//! A JSON object mapping bank names to detector identities, e.g.
//! `{"CR00": "cosmic-ray-0"}`. The detector processor uses it to key
//! histogram samples and to label serialized records. A missing or
//! malformed file is startup-fatal.

use crate::error::{AppResult, RelayError};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Bank name to detector identity mapping.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectorMap {
    #[serde(flatten)]
    banks: HashMap<String, String>,
}

impl DetectorMap {
    /// Load the mapping from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| RelayError::DetectorMap(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&text)
            .map_err(|e| RelayError::DetectorMap(format!("{}: {}", path.display(), e)))
    }

    /// Detector identity for a bank name, if mapped.
    pub fn detector_for(&self, bank: &str) -> Option<&str> {
        self.banks.get(bank).map(String::as_str)
    }

    /// Number of mapped banks.
    pub fn len(&self) -> usize {
        self.banks.len()
    }

    /// True when no bank is mapped.
    pub fn is_empty(&self) -> bool {
        self.banks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_and_lookup() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"CR00": "cosmic-ray-0", "CR01": "cosmic-ray-1"}"#)
            .unwrap();
        let map = DetectorMap::load(file.path()).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.detector_for("CR00"), Some("cosmic-ray-0"));
        assert_eq!(map.detector_for("XX99"), None);
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = DetectorMap::load("/nonexistent/detectors.json").unwrap_err();
        assert!(matches!(err, RelayError::DetectorMap(_)));
    }

    #[test]
    fn test_malformed_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not json").unwrap();
        assert!(DetectorMap::load(file.path()).is_err());
    }
}
