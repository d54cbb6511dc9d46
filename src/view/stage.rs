use std::collections::HashMap;
use std::time::Duration;

use tracing::trace;

use super::{HighlightSurface, StageCamera, SurfaceHit};
use crate::config::HighlightConfig;
use crate::math::{triangle, Aabb, Point2, Point3};
use crate::placement::HotspotCategory;
use crate::segment::{Layer, SegmentKey, SegmentStore};

/// Pulsing emissive glow of the selected segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmissiveHighlight {
    pub color: [f32; 3],
    pub peak: f32,
    pub period: Duration,
}

impl EmissiveHighlight {
    /// Emissive intensity `elapsed` after the highlight started. Oscillates
    /// between zero and `peak`, starting at `peak`.
    #[must_use]
    pub fn intensity_at(&self, elapsed: Duration) -> f32 {
        let period = self.period.as_secs_f32();
        if period <= f32::EPSILON {
            return self.peak;
        }
        let phase = elapsed.as_secs_f32() / period * std::f32::consts::TAU;
        self.peak * 0.5 * (1.0 + phase.cos())
    }
}

/// Render state of one segment on the stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageElement {
    pub key: SegmentKey,
    pub stable_id: String,
    pub layer: Layer,
    /// Base color from the external color map.
    pub tint: Option<[f32; 3]>,
    pub highlight: Option<EmissiveHighlight>,
}

/// A hotspot anchor drawn on the stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HotspotMarker {
    pub category: HotspotCategory,
    pub world_position: Point3,
}

/// The 3D view: one element per segment, a camera and hotspot markers.
#[derive(Debug, Clone, Default)]
pub struct StageView {
    camera: StageCamera,
    elements: Vec<StageElement>,
    style: HighlightConfig,
    markers: Vec<HotspotMarker>,
}

impl StageView {
    #[must_use]
    pub fn new(style: HighlightConfig) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn camera(&self) -> &StageCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut StageCamera {
        &mut self.camera
    }

    /// Replaces the elements with one neutral element per segment of
    /// `store` and frames the camera on the whole asset.
    pub fn rebuild(&mut self, store: &SegmentStore) {
        self.elements = store
            .iter()
            .map(|(key, seg)| StageElement {
                key,
                stable_id: seg.stable_id.clone(),
                layer: seg.layer,
                tint: None,
                highlight: None,
            })
            .collect();
        let bounds = store
            .iter()
            .fold(Aabb::empty(), |acc, (_, s)| acc.union(&s.world_bbox));
        self.camera.frame(&bounds);
    }

    #[must_use]
    pub fn elements(&self) -> &[StageElement] {
        &self.elements
    }

    #[must_use]
    pub fn element(&self, stable_id: &str) -> Option<&StageElement> {
        self.elements.iter().find(|e| e.stable_id == stable_id)
    }

    /// Sets each element's tint from `colors`, keyed by stable id. The map
    /// is only read; elements missing from it lose their tint.
    pub fn apply_tints(&mut self, colors: &HashMap<String, [f32; 3]>) {
        for element in &mut self.elements {
            element.tint = colors.get(&element.stable_id).copied();
        }
    }

    /// Nearest surface hit under the pixel `screen`, across all segments.
    #[must_use]
    pub fn hit_test(&self, store: &SegmentStore, screen: &Point2) -> Option<SurfaceHit> {
        let ray = self.camera.ray_through(screen);
        let mut best: Option<(f64, SegmentKey, usize, triangle::Barycentric)> = None;
        for element in &self.elements {
            let Some(segment) = store.get(element.key) else {
                continue;
            };
            for i in 0..segment.triangle_count() {
                let Some(tri) = segment.triangle(i) else {
                    continue;
                };
                let [a, b, c] = &tri.positions;
                if let Some((t, w)) = triangle::intersect_ray_triangle(&ray, a, b, c) {
                    if best.is_none_or(|(bt, ..)| t < bt) {
                        best = Some((t, element.key, i, w));
                    }
                }
            }
        }
        let (t, key, tri, w) = best?;
        trace!(t, tri, "stage hit");
        let segment = store.get(key)?;
        SurfaceHit::from_barycentric(segment, tri, &w, None)
    }

    /// Focus point for the camera derived from the selection: the center of
    /// the selected segment's bounds.
    #[must_use]
    pub fn focus_point(store: &SegmentStore, selected: Option<&str>) -> Option<Point3> {
        selected
            .and_then(|id| store.by_stable_id(id))
            .map(|s| s.world_bbox.center())
    }

    pub fn set_markers(&mut self, markers: impl IntoIterator<Item = HotspotMarker>) {
        self.markers = markers.into_iter().collect();
    }

    #[must_use]
    pub fn markers(&self) -> &[HotspotMarker] {
        &self.markers
    }

    /// The marker drawn within `radius` pixels of `screen`, with its pixel
    /// position. The closest one wins.
    #[must_use]
    pub fn marker_at(&self, screen: &Point2, radius: f64) -> Option<(HotspotCategory, Point2)> {
        self.markers
            .iter()
            .filter_map(|m| {
                let p = self.camera.project(&m.world_position)?;
                let d = (p - screen).norm();
                (d <= radius).then_some((d, m.category, p))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, category, p)| (category, p))
    }
}

impl HighlightSurface for StageView {
    fn apply_highlight(&mut self, selected: Option<&str>) {
        let glow = EmissiveHighlight {
            color: self.style.emissive_color,
            peak: self.style.emissive_intensity,
            period: self.style.pulse_period,
        };
        for element in &mut self.elements {
            element.highlight = (Some(element.stable_id.as_str()) == selected).then_some(glow);
        }
    }

    fn highlighted_ids(&self) -> Vec<&str> {
        self.elements
            .iter()
            .filter(|e| e.highlight.is_some())
            .map(|e| e.stable_id.as_str())
            .collect()
    }
}
