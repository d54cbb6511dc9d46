use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::storage::KeyValueStore;
use crate::error::{PlacementError, StorageError};
use crate::math::{Point2, Point3, Vector3};
use crate::view::SurfaceHit;

/// Fixed semantic anchor categories. At most one hotspot exists per category.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum HotspotCategory {
    Handle,
    Body,
    Clasp,
    Strap,
}

impl HotspotCategory {
    pub const ALL: [Self; 4] = [Self::Handle, Self::Body, Self::Clasp, Self::Strap];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Handle => "handle",
            Self::Body => "body",
            Self::Clasp => "clasp",
            Self::Strap => "strap",
        }
    }
}

impl fmt::Display for HotspotCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hotspot anchored to a surface point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotPlacement {
    pub world_position: Point3,
    pub world_normal: Vector3,
    pub uv_coords: Point2,
    pub mesh_name: String,
}

impl From<&SurfaceHit> for HotspotPlacement {
    fn from(hit: &SurfaceHit) -> Self {
        Self {
            world_position: hit.world_position,
            world_normal: hit.world_normal,
            uv_coords: hit.uv,
            mesh_name: hit.mesh_name.clone(),
        }
    }
}

/// Hotspot placements keyed by category. Serializes as a JSON object keyed
/// by the lowercase category name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HotspotMap(BTreeMap<HotspotCategory, HotspotPlacement>);

impl HotspotMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, category: HotspotCategory) -> Option<&HotspotPlacement> {
        self.0.get(&category)
    }

    /// Writes the placement for `category`, returning the one it replaced.
    pub fn set(
        &mut self,
        category: HotspotCategory,
        placement: HotspotPlacement,
    ) -> Option<HotspotPlacement> {
        self.0.insert(category, placement)
    }

    pub fn iter(&self) -> impl Iterator<Item = (HotspotCategory, &HotspotPlacement)> + '_ {
        self.0.iter().map(|(c, p)| (*c, p))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Serializes the map to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (non-finite coordinates).
    pub fn to_json(&self) -> Result<String, PlacementError> {
        serde_json::to_string_pretty(self).map_err(|e| PlacementError::Serialize(e.to_string()))
    }

    /// Parses a hotspot document.
    ///
    /// # Errors
    ///
    /// Returns [`PlacementError::MalformedImport`] if `text` is not a valid
    /// hotspot document.
    pub fn from_json(text: &str) -> Result<Self, PlacementError> {
        serde_json::from_str(text).map_err(|e| PlacementError::MalformedImport(e.to_string()))
    }

    /// Loads the persisted map. Any failure (missing key, unreadable store,
    /// malformed document) yields an empty map.
    #[must_use]
    pub fn load_or_default(store: &dyn KeyValueStore, key: &str) -> Self {
        match store.get(key) {
            Ok(Some(text)) => Self::from_json(&text).unwrap_or_else(|e| {
                warn!(key, error = %e, "ignoring corrupt persisted hotspots");
                Self::default()
            }),
            Ok(None) => Self::default(),
            Err(e) => {
                warn!(key, error = %e, "hotspot store unreadable");
                Self::default()
            }
        }
    }

    /// Writes the whole map to `store` under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the store write fails.
    pub fn persist(&self, store: &mut dyn KeyValueStore, key: &str) -> Result<(), StorageError> {
        let text = serde_json::to_string(self).map_err(|e| StorageError::Serde(e.to_string()))?;
        store.set(key, &text)?;
        debug!(key, count = self.len(), "persisted hotspots");
        Ok(())
    }
}

/// Clipboard access was refused.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("clipboard unavailable: {0}")]
pub struct ClipboardDenied(pub String);

/// System clipboard used by hotspot export.
pub trait Clipboard {
    /// Places `text` on the clipboard.
    ///
    /// # Errors
    ///
    /// Returns [`ClipboardDenied`] if the platform refuses access.
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardDenied>;
}

/// Result of a hotspot export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// The document was placed on the clipboard.
    Copied(String),
    /// Clipboard access failed; the document must be shown for manual copy.
    ManualCopy(String),
}

impl ExportOutcome {
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Copied(t) | Self::ManualCopy(t) => t,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use crate::placement::storage::MemoryStore;

    pub(crate) fn sample(mesh: &str, x: f64) -> HotspotPlacement {
        HotspotPlacement {
            world_position: Point3::new(x, 0.1 + x, -0.3),
            world_normal: Vector3::new(0.0, 0.6, 0.8),
            uv_coords: Point2::new(0.123_456_789, 0.987_654_321),
            mesh_name: mesh.into(),
        }
    }

    #[test]
    fn set_overwrites_per_category() {
        let mut map = HotspotMap::new();
        assert!(map.set(HotspotCategory::Handle, sample("a", 1.0)).is_none());
        let old = map.set(HotspotCategory::Handle, sample("b", 2.0)).unwrap();
        assert_eq!(old.mesh_name, "a");
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(HotspotCategory::Handle).unwrap().mesh_name, "b");
    }

    #[test]
    fn json_is_keyed_by_category() {
        let mut map = HotspotMap::new();
        map.set(HotspotCategory::Clasp, sample("Clasp_3", 0.5));
        let json: serde_json::Value = serde_json::from_str(&map.to_json().unwrap()).unwrap();
        let clasp = &json["clasp"];
        assert_eq!(clasp["meshName"], "Clasp_3");
        assert!(clasp["worldPosition"].is_array());
    }

    #[test]
    fn export_import_roundtrip() {
        let mut map = HotspotMap::new();
        map.set(HotspotCategory::Handle, sample("Handle_0", 0.1 + 0.2));
        map.set(HotspotCategory::Body, sample("Body__mesh_1", -1.0 / 3.0));
        map.set(HotspotCategory::Strap, sample("Strap_2", 1e-7));
        let back = HotspotMap::from_json(&map.to_json().unwrap()).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn malformed_import_is_error() {
        assert!(matches!(
            HotspotMap::from_json("{ not json"),
            Err(PlacementError::MalformedImport(_))
        ));
        assert!(matches!(
            HotspotMap::from_json(r#"{ "lid": {} }"#),
            Err(PlacementError::MalformedImport(_))
        ));
    }

    #[test]
    fn load_ignores_missing_and_corrupt() {
        let mut store = MemoryStore::new();
        assert!(HotspotMap::load_or_default(&store, "k").is_empty());
        store.set("k", "[1, 2").unwrap();
        assert!(HotspotMap::load_or_default(&store, "k").is_empty());
    }

    #[test]
    fn persist_then_load() {
        let mut store = MemoryStore::new();
        let mut map = HotspotMap::new();
        map.set(HotspotCategory::Body, sample("Body_0", 0.25));
        map.persist(&mut store, "k").unwrap();
        assert_eq!(HotspotMap::load_or_default(&store, "k"), map);
    }
}
