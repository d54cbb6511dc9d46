//! The engine facade.
//!
//! [`ConfiguratorEngine`] owns everything derived from the loaded asset plus
//! the selection and placement state. Collaborators feed it load results and
//! pointer events, and read back what happened through [`EngineEvent`]s.
//! Nothing derived from an asset becomes visible until the whole asset has
//! been resolved, classified and split into islands.

use std::collections::HashMap;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::asset::fallback::fallback_anchors;
use crate::asset::{decode_obj, AssetLoader, AssetSource, LoadStatus, LoadTicket, SceneGraph};
use crate::config::EngineConfig;
use crate::error::{AssetError, Result};
use crate::identity::resolve_segments;
use crate::island::{extract_islands, IslandNumbering, UvIsland};
use crate::layer::LayerClassifier;
use crate::math::{Point2, Vector2};
use crate::placement::{
    Clipboard, DecalPatch, DecalPlacement, DecalTargetMode, ExportOutcome, HotspotCategory,
    HotspotPlacement, KeyValueStore, PlacementProjector,
};
use crate::segment::{Layer, MeshSegment, SegmentKey, SegmentStore};
use crate::selection::SelectionSynchronizer;
use crate::view::{
    CaptureKind, FitScheduler, HotspotMarker, LayeredSurface, PatternElement, PatternView,
    PointerCapture, StageView, SurfaceHit,
};

/// Pick radius of hotspot markers, in pixels.
const MARKER_PICK_RADIUS: f64 = 12.0;

/// Notification for collaborators, drained with
/// [`ConfiguratorEngine::drain_events`].
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    SelectPart(Option<String>),
    HotspotActivate {
        category: HotspotCategory,
        screen: Point2,
    },
    PlaceHotspot {
        category: HotspotCategory,
        placement: HotspotPlacement,
    },
    PlaceDecal(DecalPlacement),
    UpdateDecal {
        id: String,
        patch: DecalPatch,
    },
    LoadStatus(LoadStatus),
}

/// Everything derived from one asset, built before anything is swapped in.
#[derive(Debug, Default)]
struct PreparedAsset {
    segments: Vec<MeshSegment>,
    discovery: Vec<Vec<UvIsland>>,
    by_size: Vec<Vec<UvIsland>>,
    uv_triangles: usize,
}

impl PreparedAsset {
    fn build(scene: &SceneGraph, config: &EngineConfig) -> Self {
        let mut segments = resolve_segments(scene);
        let classifier = LayerClassifier::Containment {
            epsilon: config.containment_epsilon,
        };
        let layers = classifier.classify(&segments);
        for (segment, layer) in segments.iter_mut().zip(layers) {
            segment.layer = layer;
        }

        let mut prepared = Self::default();
        for segment in &segments {
            let triangles = segment.uv_triangles();
            prepared.uv_triangles += triangles.len();
            let decimals = config.uv_merge_decimals;
            prepared
                .discovery
                .push(extract_islands(&triangles, IslandNumbering::Discovery, decimals));
            prepared
                .by_size
                .push(extract_islands(&triangles, IslandNumbering::BySize, decimals));
        }
        prepared.segments = segments;
        prepared
    }
}

/// Owns the loaded asset, both views, the selection and the placements.
pub struct ConfiguratorEngine {
    config: EngineConfig,
    loader: AssetLoader,
    showing_fallback: bool,
    store: SegmentStore,
    /// Size-ranked islands per segment, for material correlation.
    ranked_islands: HashMap<SegmentKey, Vec<UvIsland>>,
    selection: SelectionSynchronizer,
    stage: StageView,
    pattern: PatternView,
    placement: PlacementProjector,
    fit: FitScheduler,
    capture: PointerCapture,
    events: Vec<EngineEvent>,
}

impl std::fmt::Debug for ConfiguratorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfiguratorEngine")
            .field("status", &self.loader.status())
            .field("segments", &self.store.len())
            .field("selected", &self.selection.selected_id())
            .field("active_layer", &self.pattern.active_layer())
            .field("placement", &self.placement)
            .finish_non_exhaustive()
    }
}

impl ConfiguratorEngine {
    /// Creates an engine with no asset. Persisted hotspots are read from
    /// `store` under the configured key.
    #[must_use]
    pub fn new(config: EngineConfig, store: Box<dyn KeyValueStore>) -> Self {
        let placement = PlacementProjector::new(store, config.hotspot_storage_key.clone());
        Self {
            loader: AssetLoader::new(),
            showing_fallback: false,
            store: SegmentStore::new(),
            ranked_islands: HashMap::new(),
            selection: SelectionSynchronizer::new(),
            stage: StageView::new(config.highlight.clone()),
            pattern: PatternView::new(config.highlight.clone()),
            placement,
            fit: FitScheduler::new(config.fit_debounce),
            capture: PointerCapture::default(),
            events: Vec::new(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn status(&self) -> LoadStatus {
        self.loader.status()
    }

    #[must_use]
    pub fn segments(&self) -> &SegmentStore {
        &self.store
    }

    #[must_use]
    pub fn stage(&self) -> &StageView {
        &self.stage
    }

    #[must_use]
    pub fn pattern(&self) -> &PatternView {
        &self.pattern
    }

    #[must_use]
    pub fn placement(&self) -> &PlacementProjector {
        &self.placement
    }

    #[must_use]
    pub fn selected_id(&self) -> Option<&str> {
        self.selection.selected_id()
    }

    #[must_use]
    pub fn is_showing_fallback(&self) -> bool {
        self.showing_fallback
    }

    /// Takes all events emitted since the last call.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    fn set_status_event(&mut self, status: LoadStatus) {
        self.events.push(EngineEvent::LoadStatus(status));
    }

    // --- Loading ---

    /// Starts loading the asset at `url`, superseding any load in flight.
    ///
    /// Without a URL the fallback scene is installed at once and `None` is
    /// returned; otherwise the returned ticket must be passed to
    /// [`finish_load`](Self::finish_load) with the fetched and decoded scene.
    pub fn begin_load(&mut self, url: Option<&str>) -> Option<LoadTicket> {
        let source = AssetSource::from_url(url);
        let ticket = self.loader.begin(source.clone());
        self.set_status_event(LoadStatus::Loading);
        if source != AssetSource::Fallback {
            return Some(ticket);
        }
        self.install(PreparedAsset::default(), true);
        if self.loader.finish(&ticket, LoadStatus::Success) {
            self.set_status_event(LoadStatus::Success);
        }
        None
    }

    /// Commits the result of the load identified by `ticket`.
    ///
    /// A superseded ticket is discarded. On failure the previously installed
    /// asset stays in place.
    pub fn finish_load(
        &mut self,
        ticket: &LoadTicket,
        result: std::result::Result<SceneGraph, AssetError>,
    ) -> LoadStatus {
        if !self.loader.is_current(ticket) {
            warn!(generation = ticket.generation(), "ignoring superseded load");
            return self.loader.status();
        }
        let status = match result {
            Ok(scene) => {
                let prepared = PreparedAsset::build(&scene, &self.config);
                let status = if prepared.uv_triangles == 0 {
                    LoadStatus::Empty
                } else {
                    LoadStatus::Success
                };
                self.install(prepared, false);
                status
            }
            Err(e) => {
                warn!(error = %e, source = ?ticket.source(), "asset load failed");
                LoadStatus::Error
            }
        };
        self.loader.finish(ticket, status);
        self.set_status_event(status);
        status
    }

    /// Decodes `text` as OBJ and commits it for `ticket`. A source whose
    /// extension names another format fails with
    /// [`AssetError::Unsupported`].
    pub fn finish_load_obj(&mut self, ticket: &LoadTicket, text: &str) -> LoadStatus {
        let result = match ticket.source().extension() {
            Some(ext) if ext != "obj" => Err(AssetError::Unsupported(format!(
                "cannot decode .{ext} as OBJ"
            ))),
            _ => decode_obj(text),
        };
        self.finish_load(ticket, result)
    }

    fn install(&mut self, prepared: PreparedAsset, fallback: bool) {
        let PreparedAsset {
            segments,
            discovery,
            by_size,
            uv_triangles,
        } = prepared;
        let previous_layer = self
            .selection
            .selected_id()
            .and_then(|id| self.pattern.layer_of(id));
        let keys = self.store.replace(segments);

        let edge_decimals = self.config.edge_merge_decimals;
        let mut elements = Vec::new();
        for (&key, islands) in keys.iter().zip(discovery) {
            if islands.is_empty() {
                continue;
            }
            if let Some(segment) = self.store.get(key) {
                elements.push(PatternElement::new(key, segment, islands, edge_decimals));
            }
        }
        self.ranked_islands = keys.iter().copied().zip(by_size).collect();

        self.stage.rebuild(&self.store);
        self.pattern.rebuild(elements);
        self.pattern.fit();
        self.showing_fallback = fallback;
        self.refresh_markers();
        info!(
            segments = self.store.len(),
            uv_triangles,
            fallback,
            "asset installed"
        );

        let stale = self
            .selection
            .selected_id()
            .is_some_and(|id| !self.store.contains_id(id));
        if stale {
            debug!("selected segment is gone after asset swap");
            self.select(None);
        } else if self
            .selection
            .resync(previous_layer, &mut self.stage, &mut self.pattern)
            .is_some()
        {
            self.pattern.fit();
        }
    }

    fn refresh_markers(&mut self) {
        let markers: Vec<HotspotMarker> = if self.showing_fallback {
            fallback_anchors()
                .into_iter()
                .map(|(category, p)| HotspotMarker {
                    category,
                    world_position: p.world_position,
                })
                .collect()
        } else {
            self.placement
                .hotspots()
                .iter()
                .map(|(category, p)| HotspotMarker {
                    category,
                    world_position: p.world_position,
                })
                .collect()
        };
        self.stage.set_markers(markers);
    }

    /// Size-ranked islands of every segment using the material `name`, in
    /// segment traversal order.
    #[must_use]
    pub fn material_islands(&self, name: &str) -> Vec<(&str, &UvIsland)> {
        self.store
            .iter()
            .filter(|(_, s)| s.material.name == name)
            .flat_map(|(key, s)| {
                self.ranked_islands
                    .get(&key)
                    .into_iter()
                    .flatten()
                    .map(move |i| (s.stable_id.as_str(), i))
            })
            .collect()
    }

    // --- Selection ---

    /// Sets the selection. Emits [`EngineEvent::SelectPart`] when it changes.
    pub fn select(&mut self, id: Option<&str>) {
        if let Some(change) = self
            .selection
            .select(id, &mut self.stage, &mut self.pattern)
        {
            if change.layer_switched_to.is_some() {
                self.pattern.fit();
            }
            self.events.push(EngineEvent::SelectPart(change.selected));
        }
    }

    /// Shows `layer` in the pattern view. Never changes the selection.
    pub fn set_active_layer(&mut self, layer: Layer) {
        self.pattern.set_active_layer(layer);
        self.pattern.fit();
    }

    /// Points the stage camera at the selected segment. Returns `false`
    /// when nothing is selected.
    pub fn focus_selection(&mut self) -> bool {
        match StageView::focus_point(&self.store, self.selection.selected_id()) {
            Some(point) => {
                self.stage.camera_mut().focus(&point);
                true
            }
            None => false,
        }
    }

    /// Tints stage elements from a color map keyed by stable id.
    pub fn apply_color_map(&mut self, colors: &HashMap<String, [f32; 3]>) {
        self.stage.apply_tints(colors);
    }

    // --- Pointer input ---

    fn accepts_geometry_input(&self) -> bool {
        if !self.capture.geometry_interactive() {
            return false;
        }
        !(self.loader.is_loading() && self.store.is_empty())
    }

    /// Pointer-down on the stage at pixel `screen`.
    pub fn pointer_down_stage(&mut self, screen: Point2) {
        if !self.accepts_geometry_input() {
            return;
        }
        let hit = self.stage.hit_test(&self.store, &screen);
        if self.placement.mode().any() {
            if let Some(hit) = hit {
                self.place(&hit);
            }
            return;
        }
        if let Some((category, at)) = self.stage.marker_at(&screen, MARKER_PICK_RADIUS) {
            debug!(%category, "hotspot marker activated");
            self.events.push(EngineEvent::HotspotActivate {
                category,
                screen: at,
            });
            return;
        }
        self.select(hit.as_ref().map(|h| h.stable_id.as_str()));
    }

    /// Pointer-down on the pattern view at pixel `screen`.
    pub fn pointer_down_pattern(&mut self, screen: Point2) {
        if !self.accepts_geometry_input() || self.capture.active().is_some() {
            return;
        }
        let hit = self.pattern.hit_test(&self.store, &screen);
        if self.placement.mode().any() {
            if let Some(hit) = hit {
                self.place(&hit);
            }
            return;
        }
        self.select(hit.as_ref().map(|h| h.stable_id.as_str()));
    }

    fn place(&mut self, hit: &SurfaceHit) {
        if let Some((category, placement)) = self.placement.place_hotspot(hit) {
            self.refresh_markers();
            self.events
                .push(EngineEvent::PlaceHotspot { category, placement });
            return;
        }
        let config = &self.config;
        let selected = self.selection.selected_id();
        if let Some(decal) =
            self.placement
                .place_decal(hit, selected, |id| config.is_excluded_target(id))
        {
            self.events.push(EngineEvent::PlaceDecal(decal));
        }
    }

    // --- Pattern viewport ---

    /// Starts a pan drag in the pattern view.
    pub fn begin_pan(&mut self) -> bool {
        self.capture.begin(CaptureKind::PanZoom)
    }

    pub fn pan_by(&mut self, delta: Vector2) {
        if self.capture.active() == Some(CaptureKind::PanZoom) {
            self.pattern.viewport_mut().pan_by(&delta);
        }
    }

    pub fn end_pan(&mut self) {
        self.capture.end(CaptureKind::PanZoom);
    }

    /// Wheel zoom around `anchor`.
    pub fn zoom_at(&mut self, anchor: Point2, factor: f64) {
        if self.capture.geometry_interactive() {
            self.pattern.viewport_mut().zoom_at(&anchor, factor);
        }
    }

    /// Starts a panel-resize drag; geometry interaction is off until it ends.
    pub fn begin_panel_resize(&mut self) -> bool {
        self.capture.begin(CaptureKind::PanelResize)
    }

    pub fn end_panel_resize(&mut self) {
        self.capture.end(CaptureKind::PanelResize);
    }

    /// New pixel size of the pattern view. The re-fit is debounced.
    pub fn resize_pattern(&mut self, width: f64, height: f64, now: Instant) {
        self.pattern.viewport_mut().resize(width, height);
        self.fit.request(now);
    }

    /// New pixel size of the stage.
    pub fn resize_stage(&mut self, width: f64, height: f64) {
        self.stage.camera_mut().resize(width, height);
    }

    /// Sets the external transitioning flag. Ending a transition fits at once.
    pub fn set_transitioning(&mut self, transitioning: bool) {
        if self.fit.set_transitioning(transitioning) {
            self.pattern.fit();
        }
    }

    /// Runs a debounced fit if one is due at `now`.
    pub fn tick(&mut self, now: Instant) {
        if self.fit.poll(now) {
            self.pattern.fit();
        }
    }

    // --- Placement ---

    pub fn set_hotspot_mode(&mut self, enabled: bool) {
        self.placement.set_hotspot_mode(enabled);
    }

    pub fn set_decal_mode(&mut self, enabled: bool) {
        self.placement.set_decal_mode(enabled);
    }

    pub fn set_hotspot_target(&mut self, category: HotspotCategory) {
        self.placement.set_hotspot_target(category);
    }

    pub fn set_decal_image(&mut self, image: Option<String>) {
        self.placement.set_decal_image(image);
    }

    pub fn set_decal_target_mode(&mut self, mode: DecalTargetMode) {
        self.placement.set_decal_target_mode(mode);
    }

    pub fn set_decal_defaults(&mut self, scale: f64, rotation: f64) {
        self.placement.set_decal_defaults(scale, rotation);
    }

    /// Patches a decal and emits [`EngineEvent::UpdateDecal`].
    ///
    /// # Errors
    ///
    /// Returns an error if no decal has `id`.
    pub fn update_decal(&mut self, id: &str, patch: DecalPatch) -> Result<DecalPlacement> {
        let updated = self.placement.update_decal(id, &patch)?;
        self.events.push(EngineEvent::UpdateDecal {
            id: id.to_string(),
            patch,
        });
        Ok(updated)
    }

    pub fn clear_decals(&mut self) {
        self.placement.clear_decals();
    }

    /// Decals bound to a segment that is not part of the current asset.
    #[must_use]
    pub fn orphaned_decals(&self) -> Vec<&DecalPlacement> {
        self.placement
            .orphaned_decals(|id| self.store.contains_id(id))
            .collect()
    }

    /// Exports the hotspot map through `clipboard`.
    ///
    /// # Errors
    ///
    /// Returns an error if the map cannot be serialized.
    pub fn export_hotspots(&self, clipboard: &mut dyn Clipboard) -> Result<ExportOutcome> {
        Ok(self.placement.export_hotspots(clipboard)?)
    }

    /// Replaces the hotspot map with an imported document.
    ///
    /// # Errors
    ///
    /// Returns an error if `text` is not a valid hotspot document; the
    /// current map is then left unchanged.
    pub fn import_hotspots(&mut self, text: &str) -> Result<usize> {
        let count = self.placement.import_hotspots(text)?;
        self.refresh_markers();
        Ok(count)
    }
}
