//! Hotspot and decal placement.
//!
//! [`PlacementProjector`] is the single mutation entry point for placements.
//! It turns surface hits into persisted hotspots or appended decals, keeps
//! the two placement modes mutually exclusive, and owns the durable store
//! the hotspot map is written to.

pub mod decal;
pub mod hotspot;
pub mod storage;

pub use decal::{resolve_target, DecalList, DecalPatch, DecalPlacement, DecalTargetMode, NewDecal};
pub use hotspot::{
    Clipboard, ClipboardDenied, ExportOutcome, HotspotCategory, HotspotMap, HotspotPlacement,
};
pub use storage::{FileStore, KeyValueStore, MemoryStore};

use tracing::{info, warn};

use crate::error::PlacementError;
use crate::view::SurfaceHit;

/// Which placement tool, if any, consumes pointer events. Enabling one mode
/// switches the other off at the moment of the toggle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlacementMode {
    hotspot: bool,
    decal: bool,
}

impl PlacementMode {
    #[must_use]
    pub fn hotspot_enabled(self) -> bool {
        self.hotspot
    }

    #[must_use]
    pub fn decal_enabled(self) -> bool {
        self.decal
    }

    /// Returns `true` if either tool is active.
    #[must_use]
    pub fn any(self) -> bool {
        self.hotspot || self.decal
    }

    pub fn set_hotspot(&mut self, enabled: bool) {
        self.hotspot = enabled;
        if enabled {
            self.decal = false;
        }
    }

    pub fn set_decal(&mut self, enabled: bool) {
        self.decal = enabled;
        if enabled {
            self.hotspot = false;
        }
    }
}

/// Owns hotspot and decal state and their persistence.
pub struct PlacementProjector {
    mode: PlacementMode,
    hotspot_target: HotspotCategory,
    hotspots: HotspotMap,
    decals: DecalList,
    decal_image: Option<String>,
    decal_target_mode: DecalTargetMode,
    decal_scale: f64,
    decal_rotation: f64,
    store: Box<dyn KeyValueStore>,
    storage_key: String,
}

impl std::fmt::Debug for PlacementProjector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlacementProjector")
            .field("mode", &self.mode)
            .field("hotspot_target", &self.hotspot_target)
            .field("hotspots", &self.hotspots.len())
            .field("decals", &self.decals.len())
            .field("storage_key", &self.storage_key)
            .finish_non_exhaustive()
    }
}

impl PlacementProjector {
    /// Creates the projector and loads persisted hotspots from `store`.
    /// Missing or corrupt data leaves the hotspot map empty.
    #[must_use]
    pub fn new(store: Box<dyn KeyValueStore>, storage_key: impl Into<String>) -> Self {
        let storage_key = storage_key.into();
        let hotspots = HotspotMap::load_or_default(store.as_ref(), &storage_key);
        info!(count = hotspots.len(), key = %storage_key, "loaded persisted hotspots");
        Self {
            mode: PlacementMode::default(),
            hotspot_target: HotspotCategory::Handle,
            hotspots,
            decals: DecalList::new(),
            decal_image: None,
            decal_target_mode: DecalTargetMode::default(),
            decal_scale: 1.0,
            decal_rotation: 0.0,
            store,
            storage_key,
        }
    }

    #[must_use]
    pub fn mode(&self) -> PlacementMode {
        self.mode
    }

    pub fn set_hotspot_mode(&mut self, enabled: bool) {
        self.mode.set_hotspot(enabled);
    }

    pub fn set_decal_mode(&mut self, enabled: bool) {
        self.mode.set_decal(enabled);
    }

    #[must_use]
    pub fn hotspot_target(&self) -> HotspotCategory {
        self.hotspot_target
    }

    pub fn set_hotspot_target(&mut self, category: HotspotCategory) {
        self.hotspot_target = category;
    }

    #[must_use]
    pub fn hotspots(&self) -> &HotspotMap {
        &self.hotspots
    }

    #[must_use]
    pub fn decals(&self) -> &DecalList {
        &self.decals
    }

    #[must_use]
    pub fn decal_image(&self) -> Option<&str> {
        self.decal_image.as_deref()
    }

    pub fn set_decal_image(&mut self, image: Option<String>) {
        self.decal_image = image;
    }

    pub fn set_decal_target_mode(&mut self, mode: DecalTargetMode) {
        self.decal_target_mode = mode;
    }

    #[must_use]
    pub fn decal_target_mode(&self) -> DecalTargetMode {
        self.decal_target_mode
    }

    /// Scale and rotation (radians) given to newly placed decals.
    pub fn set_decal_defaults(&mut self, scale: f64, rotation: f64) {
        self.decal_scale = scale;
        self.decal_rotation = rotation;
    }

    /// Writes the hotspot of the targeted category from `hit`, replacing any
    /// previous one, and persists the map. No-op unless hotspot mode is on.
    pub fn place_hotspot(
        &mut self,
        hit: &SurfaceHit,
    ) -> Option<(HotspotCategory, HotspotPlacement)> {
        if !self.mode.hotspot_enabled() {
            return None;
        }
        let category = self.hotspot_target;
        let placement = HotspotPlacement::from(hit);
        self.hotspots.set(category, placement.clone());
        info!(%category, mesh = %placement.mesh_name, "hotspot placed");
        self.persist_hotspots();
        Some((category, placement))
    }

    fn persist_hotspots(&mut self) {
        if let Err(e) = self.hotspots.persist(self.store.as_mut(), &self.storage_key) {
            warn!(error = %e, "failed to persist hotspots");
        }
    }

    /// Serializes the hotspot map and tries to copy it to the clipboard.
    /// When the clipboard refuses, the text is returned for manual copy.
    ///
    /// # Errors
    ///
    /// Returns an error if the map cannot be serialized.
    pub fn export_hotspots(
        &self,
        clipboard: &mut dyn Clipboard,
    ) -> Result<ExportOutcome, PlacementError> {
        let text = self.hotspots.to_json()?;
        match clipboard.write_text(&text) {
            Ok(()) => Ok(ExportOutcome::Copied(text)),
            Err(e) => {
                warn!(error = %e, "clipboard denied, falling back to manual copy");
                Ok(ExportOutcome::ManualCopy(text))
            }
        }
    }

    /// Replaces the hotspot map with the parsed document and persists it.
    /// On a parse failure the current map is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`PlacementError::MalformedImport`] if `text` is not a valid
    /// hotspot document.
    pub fn import_hotspots(&mut self, text: &str) -> Result<usize, PlacementError> {
        let map = HotspotMap::from_json(text)?;
        let count = map.len();
        self.hotspots = map;
        info!(count, "hotspots imported");
        self.persist_hotspots();
        Ok(count)
    }

    /// Appends a decal at `hit`. Silently does nothing unless decal mode is on
    /// and an image is loaded.
    ///
    /// The decal takes the layer of the hit segment. `selected` is the current
    /// selection, used when the target mode is [`DecalTargetMode::Selected`];
    /// ids for which `excluded` returns `true` never become a target.
    pub fn place_decal(
        &mut self,
        hit: &SurfaceHit,
        selected: Option<&str>,
        excluded: impl Fn(&str) -> bool,
    ) -> Option<DecalPlacement> {
        if !self.mode.decal_enabled() {
            return None;
        }
        let image_ref = self.decal_image.clone()?;
        let target_stable_id = resolve_target(self.decal_target_mode, selected, excluded);
        let decal = self.decals.push(NewDecal {
            image_ref,
            layer: hit.layer,
            target_stable_id,
            uv_coords: hit.uv,
            scale: self.decal_scale,
            rotation: self.decal_rotation,
            world_position: hit.world_position,
            world_normal: hit.world_normal,
        });
        Some(decal.clone())
    }

    /// Patches the decal with `id`.
    ///
    /// # Errors
    ///
    /// Returns [`PlacementError::UnknownDecal`] if no decal has that id.
    pub fn update_decal(
        &mut self,
        id: &str,
        patch: &DecalPatch,
    ) -> Result<DecalPlacement, PlacementError> {
        self.decals.update(id, patch).cloned()
    }

    pub fn clear_decals(&mut self) {
        info!(count = self.decals.len(), "decals cleared");
        self.decals.clear();
    }

    /// Decals bound to a segment id for which `is_loaded` returns `false`.
    /// They are reported, never pruned.
    pub fn orphaned_decals<'a>(
        &'a self,
        is_loaded: impl Fn(&str) -> bool + 'a,
    ) -> impl Iterator<Item = &'a DecalPlacement> + 'a {
        self.decals.iter().filter(move |d| {
            d.target_stable_id
                .as_deref()
                .is_some_and(|id| !is_loaded(id))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::{Point2, Point3, Vector3};
    use crate::segment::Layer;

    fn hit(id: &str) -> SurfaceHit {
        SurfaceHit {
            stable_id: id.into(),
            mesh_name: id.into(),
            layer: Layer::Outer,
            island_id: None,
            world_position: Point3::new(0.1, 0.2, 0.3),
            world_normal: Vector3::z(),
            uv: Point2::new(0.4, 0.6),
        }
    }

    fn projector() -> PlacementProjector {
        PlacementProjector::new(Box::new(MemoryStore::new()), "hotspots")
    }

    struct DenyingClipboard;

    impl Clipboard for DenyingClipboard {
        fn write_text(&mut self, _: &str) -> Result<(), ClipboardDenied> {
            Err(ClipboardDenied("not allowed".into()))
        }
    }

    #[derive(Default)]
    struct RecordingClipboard(Option<String>);

    impl Clipboard for RecordingClipboard {
        fn write_text(&mut self, text: &str) -> Result<(), ClipboardDenied> {
            self.0 = Some(text.to_string());
            Ok(())
        }
    }

    #[test]
    fn modes_are_mutually_exclusive() {
        let mut mode = PlacementMode::default();
        mode.set_hotspot(true);
        mode.set_decal(true);
        assert!(mode.decal_enabled());
        assert!(!mode.hotspot_enabled());
        mode.set_hotspot(true);
        assert!(mode.hotspot_enabled());
        assert!(!mode.decal_enabled());
        mode.set_hotspot(false);
        assert!(!mode.any());
    }

    #[test]
    fn hotspot_requires_mode() {
        let mut p = projector();
        assert!(p.place_hotspot(&hit("Body_0")).is_none());
        p.set_hotspot_mode(true);
        p.set_hotspot_target(HotspotCategory::Body);
        let (cat, placed) = p.place_hotspot(&hit("Body_0")).unwrap();
        assert_eq!(cat, HotspotCategory::Body);
        assert_eq!(placed.mesh_name, "Body_0");
        assert_eq!(p.hotspots().len(), 1);
    }

    #[test]
    fn hotspots_persist_across_instances() {
        let dir = tempfile::TempDir::new().unwrap();
        {
            let mut p = PlacementProjector::new(Box::new(FileStore::new(dir.path())), "k");
            p.set_hotspot_mode(true);
            p.place_hotspot(&hit("Handle_1"));
        }
        let p = PlacementProjector::new(Box::new(FileStore::new(dir.path())), "k");
        assert_eq!(
            p.hotspots().get(HotspotCategory::Handle).unwrap().mesh_name,
            "Handle_1"
        );
    }

    #[test]
    fn corrupt_persisted_data_starts_empty() {
        let mut store = MemoryStore::new();
        store.set("k", "{\"handle\": 42}").unwrap();
        let p = PlacementProjector::new(Box::new(store), "k");
        assert!(p.hotspots().is_empty());
    }

    #[test]
    fn export_falls_back_to_manual_copy() {
        let mut p = projector();
        p.set_hotspot_mode(true);
        p.place_hotspot(&hit("Body_0"));
        let outcome = p.export_hotspots(&mut DenyingClipboard).unwrap();
        assert!(matches!(outcome, ExportOutcome::ManualCopy(_)));

        let mut clip = RecordingClipboard::default();
        let outcome = p.export_hotspots(&mut clip).unwrap();
        assert_eq!(clip.0.as_deref(), Some(outcome.text()));
    }

    #[test]
    fn failed_import_keeps_existing_map() {
        let mut p = projector();
        p.set_hotspot_mode(true);
        p.place_hotspot(&hit("Body_0"));
        let before = p.hotspots().clone();
        assert!(p.import_hotspots("{ broken").is_err());
        assert_eq!(p.hotspots(), &before);
    }

    #[test]
    fn import_replaces_map() {
        let mut source = projector();
        source.set_hotspot_mode(true);
        source.set_hotspot_target(HotspotCategory::Clasp);
        source.place_hotspot(&hit("Clasp_2"));
        let text = source.hotspots().to_json().unwrap();

        let mut p = projector();
        p.set_hotspot_mode(true);
        p.place_hotspot(&hit("Handle_0"));
        assert_eq!(p.import_hotspots(&text).unwrap(), 1);
        assert_eq!(p.hotspots(), source.hotspots());
    }

    #[test]
    fn decal_without_image_is_noop() {
        let mut p = projector();
        p.set_decal_mode(true);
        assert!(p.place_decal(&hit("Strap_1"), None, |_| false).is_none());
        assert!(p.decals().is_empty());
    }

    #[test]
    fn decal_target_resolution_uses_selection() {
        let mut p = projector();
        p.set_decal_mode(true);
        p.set_decal_image(Some("logo.png".into()));
        p.set_decal_target_mode(DecalTargetMode::Selected);
        let generic = |id: &str| id == "body";

        let inner = SurfaceHit {
            layer: Layer::Inner,
            ..hit("Strap_1")
        };
        let bound = p.place_decal(&inner, Some("Strap_1"), generic).unwrap();
        assert_eq!(bound.target_stable_id.as_deref(), Some("Strap_1"));
        assert_eq!(bound.layer, Layer::Inner);

        let unbound = p
            .place_decal(&hit("Body_0"), Some("body"), generic)
            .unwrap();
        assert_eq!(unbound.target_stable_id, None);
        assert_eq!(p.decals().len(), 2);
    }

    #[test]
    fn orphans_are_reported_not_pruned() {
        let mut p = projector();
        p.set_decal_mode(true);
        p.set_decal_image(Some("logo.png".into()));
        p.set_decal_target_mode(DecalTargetMode::Selected);
        p.place_decal(&hit("Old_0"), Some("Old_0"), |_| false);
        p.place_decal(&hit("New_0"), Some("New_0"), |_| false);
        let orphans: Vec<_> = p.orphaned_decals(|id| id == "New_0").collect();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].target_stable_id.as_deref(), Some("Old_0"));
        assert_eq!(p.decals().len(), 2);
    }
}
