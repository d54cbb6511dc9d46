//! Outer/inner shell classification.
//!
//! Two heuristics exist. [`classify_by_containment`] is the one the engine
//! runs on every load. [`classify_by_normals`] is kept as an alternate
//! utility; it is not wired into the load flow and whether it should replace
//! the containment test is undecided.

use tracing::debug;

use crate::math::{Aabb, Point3};
use crate::segment::{Layer, MeshSegment};

/// Selects the heuristic used to classify a segment set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayerClassifier {
    /// Box containment against the largest segment; see [`classify_by_containment`].
    Containment { epsilon: f64 },
    /// Net normal direction relative to the asset center; see [`classify_by_normals`].
    Radial { sample_limit: usize },
}

impl LayerClassifier {
    /// Classifies every segment, returning layers parallel to `segments`.
    #[must_use]
    pub fn classify(&self, segments: &[MeshSegment]) -> Vec<Layer> {
        match *self {
            Self::Containment { epsilon } => {
                let boxes: Vec<Aabb> = segments.iter().map(|s| s.world_bbox).collect();
                classify_by_containment(&boxes, epsilon)
            }
            Self::Radial { sample_limit } => {
                let center = asset_bounds(segments).center();
                segments
                    .iter()
                    .map(|s| classify_by_normals(s, &center, sample_limit))
                    .collect()
            }
        }
    }
}

/// World bounds of a whole segment set.
#[must_use]
pub fn asset_bounds(segments: &[MeshSegment]) -> Aabb {
    segments
        .iter()
        .filter(|s| !s.world_bbox.is_empty())
        .fold(Aabb::empty(), |acc, s| acc.union(&s.world_bbox))
}

/// Containment heuristic.
///
/// The box with the largest volume is the shell (the first one wins a tie).
/// Every other box that fits entirely inside the shell box grown by `epsilon`
/// is [`Layer::Inner`]; the shell and everything else is [`Layer::Outer`].
#[must_use]
pub fn classify_by_containment(boxes: &[Aabb], epsilon: f64) -> Vec<Layer> {
    let mut layers = vec![Layer::Outer; boxes.len()];
    let Some(shell) = largest_box(boxes) else {
        return layers;
    };
    let shell_box = boxes[shell].expanded(epsilon);

    for (i, (bbox, layer)) in boxes.iter().zip(layers.iter_mut()).enumerate() {
        if i != shell && !bbox.is_empty() && shell_box.contains(bbox) {
            *layer = Layer::Inner;
        }
    }
    debug!(
        shell,
        inner = layers.iter().filter(|l| **l == Layer::Inner).count(),
        total = boxes.len(),
        "containment classification"
    );
    layers
}

fn largest_box(boxes: &[Aabb]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, b) in boxes.iter().enumerate() {
        let v = b.volume();
        if best.is_none_or(|(_, bv)| v > bv) {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i)
}

/// Normal/radial heuristic.
///
/// Samples at most `sample_limit` triangles (evenly strided when the segment
/// has more), and sums the dot product of each face normal with the vector
/// from `center` to the face centroid. A negative sum means the surface
/// mostly faces the center and classifies as [`Layer::Inner`].
#[must_use]
pub fn classify_by_normals(segment: &MeshSegment, center: &Point3, sample_limit: usize) -> Layer {
    let count = segment.triangle_count();
    if count == 0 || sample_limit == 0 {
        return Layer::Outer;
    }

    let mut net = 0.0;
    for i in sampled_triangles(count, sample_limit) {
        let Some(tri) = segment.triangle(i) else {
            continue;
        };
        let Some(normal) = tri.face_normal() else {
            continue;
        };
        net += normal.dot(&(tri.centroid() - center));
    }

    if net < 0.0 {
        Layer::Inner
    } else {
        Layer::Outer
    }
}

/// Evenly strided triangle indices, at most `sample_limit` of them.
fn sampled_triangles(
    count: usize,
    sample_limit: usize,
) -> std::iter::StepBy<std::ops::Range<usize>> {
    let stride = if count > sample_limit {
        count.div_ceil(sample_limit.max(1))
    } else {
        1
    };
    (0..count).step_by(stride)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::tests::quad_segment;

    fn cube(min: f64, max: f64) -> Aabb {
        Aabb::new(Point3::new(min, min, min), Point3::new(max, max, max))
    }

    #[test]
    fn contained_box_is_inner() {
        let boxes = [cube(0.0, 10.0), cube(2.0, 3.0)];
        assert_eq!(
            classify_by_containment(&boxes, 1e-3),
            [Layer::Outer, Layer::Inner]
        );
    }

    #[test]
    fn partial_overlap_is_outer() {
        let boxes = [
            cube(0.0, 10.0),
            Aabb::new(Point3::new(8.0, 1.0, 1.0), Point3::new(12.0, 2.0, 2.0)),
        ];
        assert_eq!(
            classify_by_containment(&boxes, 1e-3),
            [Layer::Outer, Layer::Outer]
        );
    }

    #[test]
    fn epsilon_admits_boundary_touching_box() {
        let boxes = [
            cube(0.0, 1.0),
            Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0005, 0.5, 0.5)),
        ];
        assert_eq!(classify_by_containment(&boxes, 1e-3)[1], Layer::Inner);
        assert_eq!(classify_by_containment(&boxes, 0.0)[1], Layer::Outer);
    }

    #[test]
    fn shell_order_does_not_matter() {
        let boxes = [cube(2.0, 3.0), cube(0.0, 10.0), cube(20.0, 21.0)];
        assert_eq!(
            classify_by_containment(&boxes, 1e-3),
            [Layer::Inner, Layer::Outer, Layer::Outer]
        );
    }

    #[test]
    fn empty_input_and_single_segment() {
        assert!(classify_by_containment(&[], 1e-3).is_empty());
        assert_eq!(classify_by_containment(&[cube(0.0, 1.0)], 1e-3), [Layer::Outer]);
    }

    #[test]
    fn radial_normals_pointing_at_center_are_inner() {
        // Quad at z = 1 wound counter-clockwise: normal +z, away from origin.
        let outward = quad_segment("out", [-1.0, -1.0], [1.0, 1.0], 1.0, 0.0);
        let center = Point3::origin();
        assert_eq!(classify_by_normals(&outward, &center, 600), Layer::Outer);

        // Same quad at z = -1 still faces +z, i.e. back toward the origin.
        let inward = quad_segment("in", [-1.0, -1.0], [1.0, 1.0], -1.0, 0.0);
        assert_eq!(classify_by_normals(&inward, &center, 600), Layer::Inner);
    }

    #[test]
    fn radial_sampling_respects_limit() {
        let seg = quad_segment("s", [-1.0, -1.0], [1.0, 1.0], -1.0, 0.0);
        assert_eq!(classify_by_normals(&seg, &Point3::origin(), 1), Layer::Inner);
        assert_eq!(classify_by_normals(&seg, &Point3::origin(), 0), Layer::Outer);
    }

    #[test]
    fn sample_count_never_exceeds_limit() {
        for count in [1, 599, 600, 601, 1000, 1199, 1201, 5000] {
            let samples = sampled_triangles(count, 600).count();
            assert!(samples <= 600, "{count} triangles gave {samples} samples");
        }
        assert_eq!(sampled_triangles(600, 600).count(), 600);
        assert_eq!(sampled_triangles(1000, 600).count(), 500);
    }

    /// Strip of `count` unit triangles facing +z. Three in every ten lie at
    /// z = 1 (facing away from the origin), the rest at z = -1.
    fn mostly_inward_strip(count: usize) -> MeshSegment {
        let mut seg = quad_segment("strip", [0.0, 0.0], [1.0, 1.0], 0.0, 0.0);
        seg.positions.clear();
        seg.uvs.clear();
        seg.indices.clear();
        for i in 0..count {
            #[allow(clippy::cast_precision_loss)]
            let x = i as f64;
            let z = if i % 10 < 3 { 1.0 } else { -1.0 };
            #[allow(clippy::cast_possible_truncation)]
            let base = seg.positions.len() as u32;
            seg.positions.extend([
                Point3::new(x, 0.0, z),
                Point3::new(x + 1.0, 0.0, z),
                Point3::new(x, 1.0, z),
            ]);
            seg.indices.push([base, base + 1, base + 2]);
        }
        seg.world_bbox = Aabb::from_points(&seg.positions);
        seg
    }

    #[test]
    fn large_inward_segment_is_inner_under_default_limit() {
        let seg = mostly_inward_strip(1000);
        assert_eq!(seg.triangle_count(), 1000);
        let limit = crate::EngineConfig::default().radial_sample_limit;
        assert_eq!(limit, 600);
        assert!(sampled_triangles(seg.triangle_count(), limit).count() <= limit);
        assert_eq!(classify_by_normals(&seg, &Point3::origin(), limit), Layer::Inner);
    }

    #[test]
    fn classifier_dispatch() {
        let shell = quad_segment("shell", [-2.0, -2.0], [2.0, 2.0], 0.0, 0.0);
        let mut shell = shell;
        shell.world_bbox = cube(-2.0, 2.0);
        let lining = quad_segment("lining", [-1.0, -1.0], [1.0, 1.0], 0.5, 0.5);
        let segs = [shell, lining];
        let layers = LayerClassifier::Containment { epsilon: 1e-3 }.classify(&segs);
        assert_eq!(layers, [Layer::Outer, Layer::Inner]);
        let radial = LayerClassifier::Radial { sample_limit: 600 }.classify(&segs);
        assert_eq!(radial.len(), 2);
    }
}
