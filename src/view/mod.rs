//! The two rendering surfaces and their shared vocabulary.
//!
//! Both views render the same segment set: the stage in perspective 3D, the
//! pattern view flattened into UV space. Each element is tagged with its
//! segment's stable id and layer, which is all the two views share.

pub mod camera;
pub mod pattern;
pub mod stage;
pub mod viewport;

pub use camera::StageCamera;
pub use pattern::{PatternElement, PatternStyle, PatternView};
pub use stage::{EmissiveHighlight, HotspotMarker, StageElement, StageView};
pub use viewport::{CaptureKind, FitScheduler, PointerCapture, Viewport2d};

use crate::math::{triangle::Barycentric, Point2, Point3, Vector3};
use crate::segment::{Layer, MeshSegment};

/// A pointer ray or UV lookup that landed on a segment's surface.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceHit {
    pub stable_id: String,
    /// Source node name of the hit segment.
    pub mesh_name: String,
    pub layer: Layer,
    /// Discovery-ordered island id, when the hit came from the pattern view.
    pub island_id: Option<usize>,
    pub world_position: Point3,
    pub world_normal: Vector3,
    /// UV at the hit; the origin when the segment has no UVs.
    pub uv: Point2,
}

impl SurfaceHit {
    /// Builds a hit from a triangle of `segment` and barycentric weights.
    pub(crate) fn from_barycentric(
        segment: &MeshSegment,
        triangle_index: usize,
        w: &Barycentric,
        island_id: Option<usize>,
    ) -> Option<Self> {
        use crate::math::triangle::{interpolate_2d, interpolate_3d};

        let tri = segment.triangle(triangle_index)?;
        let [a, b, c] = &tri.positions;
        let world_position = Point3::from(interpolate_3d(w, &a.coords, &b.coords, &c.coords));
        let world_normal = tri
            .normals
            .map(|[na, nb, nc]| interpolate_3d(w, &na, &nb, &nc))
            .and_then(|n| n.try_normalize(f64::EPSILON))
            .or_else(|| tri.face_normal())
            .unwrap_or_else(Vector3::z);
        let uv = tri
            .uvs
            .map_or_else(Point2::origin, |[ua, ub, uc]| interpolate_2d(w, &ua, &ub, &uc));
        Some(Self {
            stable_id: segment.stable_id.clone(),
            mesh_name: segment.source_name.clone(),
            layer: segment.layer,
            island_id,
            world_position,
            world_normal,
            uv,
        })
    }
}

/// A rendering surface whose elements can show the selection highlight.
pub trait HighlightSurface {
    /// Visits every element once: the element whose id equals `selected`
    /// gets the highlight style, every other element is reset to neutral.
    fn apply_highlight(&mut self, selected: Option<&str>);

    /// Ids of the elements currently highlighted.
    fn highlighted_ids(&self) -> Vec<&str>;
}

/// A highlight surface that shows one layer at a time.
pub trait LayeredSurface: HighlightSurface {
    fn active_layer(&self) -> Layer;

    fn set_active_layer(&mut self, layer: Layer);

    /// Layer of the element with `id`, if the surface has one.
    fn layer_of(&self, id: &str) -> Option<Layer>;
}
