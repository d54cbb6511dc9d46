use tracing::{debug, trace};

use super::{HighlightSurface, LayeredSurface, SurfaceHit, Viewport2d};
use crate::config::HighlightConfig;
use crate::island::{IslandPaths, UvIsland};
use crate::math::{Point2, UvBounds};
use crate::segment::{Layer, MeshSegment, SegmentKey, SegmentStore};

/// Fraction of the viewport left empty on each side after a fit.
const FIT_PADDING: f64 = 0.05;

/// Outline and fill of a pattern element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternStyle {
    /// Outline color; `None` draws the neutral contour.
    pub outline: Option<[f32; 3]>,
    pub fill_opacity: f32,
}

impl PatternStyle {
    pub const NEUTRAL: Self = Self {
        outline: None,
        fill_opacity: 0.0,
    };

    #[must_use]
    pub fn is_highlighted(&self) -> bool {
        self.outline.is_some()
    }
}

/// Flattened UV rendering of one segment: all of its islands, each with
/// fill and contour paths.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternElement {
    pub key: SegmentKey,
    pub stable_id: String,
    pub layer: Layer,
    /// Islands in discovery order; `island_id` is the hit-test id.
    pub islands: Vec<UvIsland>,
    /// Paths of `islands`, index for index.
    pub paths: Vec<IslandPaths>,
    pub bounds: UvBounds,
    pub style: PatternStyle,
}

impl PatternElement {
    #[must_use]
    pub fn new(
        key: SegmentKey,
        segment: &MeshSegment,
        islands: Vec<UvIsland>,
        edge_decimals: u32,
    ) -> Self {
        let paths = islands.iter().map(|i| i.paths(edge_decimals)).collect();
        let bounds = islands
            .iter()
            .fold(UvBounds::default(), |acc, i| acc.union(&i.uv_bounds));
        Self {
            key,
            stable_id: segment.stable_id.clone(),
            layer: segment.layer,
            islands,
            paths,
            bounds,
            style: PatternStyle::NEUTRAL,
        }
    }
}

/// The 2D view. Shows the elements of one layer at a time.
#[derive(Debug, Clone, Default)]
pub struct PatternView {
    elements: Vec<PatternElement>,
    active_layer: Layer,
    viewport: Viewport2d,
    style: HighlightConfig,
}

impl PatternView {
    #[must_use]
    pub fn new(style: HighlightConfig) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }

    /// Replaces all elements. The active layer is kept.
    pub fn rebuild(&mut self, elements: Vec<PatternElement>) {
        debug!(elements = elements.len(), "pattern view rebuilt");
        self.elements = elements;
    }

    #[must_use]
    pub fn elements(&self) -> &[PatternElement] {
        &self.elements
    }

    #[must_use]
    pub fn element(&self, stable_id: &str) -> Option<&PatternElement> {
        self.elements.iter().find(|e| e.stable_id == stable_id)
    }

    /// Elements of the active layer, in draw order.
    pub fn visible(&self) -> impl Iterator<Item = &PatternElement> + '_ {
        self.elements
            .iter()
            .filter(move |e| e.layer == self.active_layer)
    }

    #[must_use]
    pub fn viewport(&self) -> &Viewport2d {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport2d {
        &mut self.viewport
    }

    /// UV bounds of the visible elements.
    #[must_use]
    pub fn content_bounds(&self) -> UvBounds {
        self.visible()
            .fold(UvBounds::default(), |acc, e| acc.union(&e.bounds))
    }

    /// Fits the viewport to the visible elements.
    pub fn fit(&mut self) {
        let bounds = self.content_bounds();
        self.viewport.fit(&bounds, FIT_PADDING);
    }

    /// Surface hit under the pixel `screen`. Only the active layer is
    /// hit-testable; elements drawn later win.
    #[must_use]
    pub fn hit_test(&self, store: &SegmentStore, screen: &Point2) -> Option<SurfaceHit> {
        let uv = self.viewport.to_uv(screen);
        let visible: Vec<_> = self.visible().collect();
        visible.into_iter().rev().find_map(|element| {
            if !element.bounds.contains(&uv) {
                return None;
            }
            let segment = store.get(element.key)?;
            element.islands.iter().find_map(|island| {
                let (tri, w) = island.locate(&uv)?;
                trace!(id = %element.stable_id, island = island.island_id, tri, "pattern hit");
                SurfaceHit::from_barycentric(segment, tri, &w, Some(island.island_id))
            })
        })
    }
}

impl HighlightSurface for PatternView {
    fn apply_highlight(&mut self, selected: Option<&str>) {
        let selected_style = PatternStyle {
            outline: Some(self.style.outline_color),
            fill_opacity: self.style.fill_opacity,
        };
        for element in &mut self.elements {
            element.style = if Some(element.stable_id.as_str()) == selected {
                selected_style
            } else {
                PatternStyle::NEUTRAL
            };
        }
    }

    fn highlighted_ids(&self) -> Vec<&str> {
        self.elements
            .iter()
            .filter(|e| e.style.is_highlighted())
            .map(|e| e.stable_id.as_str())
            .collect()
    }
}

impl LayeredSurface for PatternView {
    fn active_layer(&self) -> Layer {
        self.active_layer
    }

    fn set_active_layer(&mut self, layer: Layer) {
        if self.active_layer != layer {
            debug!(%layer, "pattern layer switched");
            self.active_layer = layer;
        }
    }

    fn layer_of(&self, id: &str) -> Option<Layer> {
        self.element(id).map(|e| e.layer)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use crate::island::{extract_islands, IslandNumbering};
    use crate::segment::tests::quad_segment;

    /// Pattern view over `store` with one element per segment.
    pub(crate) fn pattern_for(store: &SegmentStore) -> PatternView {
        let elements = store
            .iter()
            .map(|(key, seg)| {
                let islands = extract_islands(&seg.uv_triangles(), IslandNumbering::Discovery, 4);
                PatternElement::new(key, seg, islands, 1)
            })
            .collect();
        let mut view = PatternView::new(HighlightConfig::default());
        view.rebuild(elements);
        view
    }

    fn layered_store() -> SegmentStore {
        let mut store = SegmentStore::new();
        store.insert(quad_segment("Shell_0", [0.0, 0.0], [2.0, 2.0], 0.0, 0.0));
        let mut lining = quad_segment("Lining_1", [0.5, 0.5], [1.5, 1.5], 0.0, 0.5);
        lining.layer = Layer::Inner;
        store.insert(lining);
        store
    }

    #[test]
    fn only_active_layer_is_visible() {
        let store = layered_store();
        let mut view = pattern_for(&store);
        let ids: Vec<_> = view.visible().map(|e| e.stable_id.as_str()).collect();
        assert_eq!(ids, ["Shell_0"]);
        view.set_active_layer(Layer::Inner);
        let ids: Vec<_> = view.visible().map(|e| e.stable_id.as_str()).collect();
        assert_eq!(ids, ["Lining_1"]);
        assert_eq!(view.layer_of("Lining_1"), Some(Layer::Inner));
        assert_eq!(view.layer_of("missing"), None);
    }

    #[test]
    fn hit_reports_island_and_world_position() {
        let store = layered_store();
        let mut view = pattern_for(&store);
        view.fit();
        let screen = view.viewport().to_screen(&Point2::new(0.02, 0.08));
        let hit = view.hit_test(&store, &screen).unwrap();
        assert_eq!(hit.stable_id, "Shell_0");
        assert_eq!(hit.island_id, Some(0));
        assert!((hit.uv.x - 0.02).abs() < 1e-9);
        // UV 0.1 spans 2 world units on this quad.
        assert!((hit.world_position.x - 0.4).abs() < 1e-9);
        assert!((hit.world_position.y - 1.6).abs() < 1e-9);
    }

    #[test]
    fn hidden_layer_is_not_hit() {
        let store = layered_store();
        let mut view = pattern_for(&store);
        view.fit();
        let screen = view.viewport().to_screen(&Point2::new(0.57, 0.03));
        assert!(view.hit_test(&store, &screen).is_none());
        view.set_active_layer(Layer::Inner);
        view.fit();
        let screen = view.viewport().to_screen(&Point2::new(0.57, 0.03));
        assert_eq!(view.hit_test(&store, &screen).unwrap().stable_id, "Lining_1");
    }

    #[test]
    fn exactly_one_element_outlined() {
        let store = layered_store();
        let mut view = pattern_for(&store);
        view.apply_highlight(Some("Lining_1"));
        assert_eq!(view.highlighted_ids(), ["Lining_1"]);
        let lining = view.element("Lining_1").unwrap();
        assert!((lining.style.fill_opacity - 0.15).abs() < f32::EPSILON);
        view.apply_highlight(Some("Shell_0"));
        assert_eq!(view.highlighted_ids(), ["Shell_0"]);
        view.apply_highlight(None);
        assert!(view.highlighted_ids().is_empty());
    }

    #[test]
    fn element_paths_close_the_quad() {
        let store = layered_store();
        let view = pattern_for(&store);
        let shell = view.element("Shell_0").unwrap();
        assert_eq!(shell.paths.len(), 1);
        assert_eq!(shell.paths[0].fill.len(), 2);
        assert_eq!(shell.paths[0].contour.len(), 4);
    }
}
