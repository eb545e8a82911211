//! In-memory segment catalog.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::ProviderError;
use crate::model::SegmentMeta;
use crate::traits::SegmentCatalog;

#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    segments: HashMap<String, SegmentMeta>,
}

impl InMemoryCatalog {
    pub fn new(segments: impl IntoIterator<Item = SegmentMeta>) -> Self {
        Self {
            segments: segments
                .into_iter()
                .map(|meta| (meta.id.clone(), meta))
                .collect(),
        }
    }

    /// Loads a JSON array of segment metadata.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|err| {
            ProviderError::InvalidResponse(format!("reading {}: {err}", path.display()))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ProviderError> {
        let segments: Vec<SegmentMeta> = serde_json::from_str(raw)
            .map_err(|err| ProviderError::InvalidResponse(format!("segment catalog: {err}")))?;
        Ok(Self::new(segments))
    }

    pub fn insert(&mut self, meta: SegmentMeta) {
        self.segments.insert(meta.id.clone(), meta);
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl SegmentCatalog for InMemoryCatalog {
    fn segment_meta(&self, segment_id: &str) -> Result<SegmentMeta, ProviderError> {
        self.segments
            .get(segment_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("segment {segment_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json() {
        let raw = r#"[{
            "id": "629046",
            "name": "Alpe d'Huez",
            "lengthMeters": 12900,
            "elevationGainMeters": 1071,
            "entryCoordinate": {"lon": 6.0336, "lat": 45.0542},
            "exitCoordinate": {"lon": 6.0706, "lat": 45.0916}
        }]"#;
        let catalog = InMemoryCatalog::from_json_str(raw).unwrap();
        assert_eq!(catalog.len(), 1);

        let meta = catalog.segment_meta("629046").unwrap();
        assert_eq!(meta.name, "Alpe d'Huez");
        assert_eq!(meta.entry_coordinate.elevation, None);
        assert!(matches!(catalog.segment_meta("1"), Err(ProviderError::NotFound(_))));
    }

    #[test]
    fn test_bad_json() {
        assert!(InMemoryCatalog::from_json_str("{").is_err());
    }
}
