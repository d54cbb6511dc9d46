use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::asset::MaterialRef;
use crate::math::{triangle, Aabb, Point2, Point3, Vector3};

slotmap::new_key_type! {
    /// Unique identifier for a segment in a [`SegmentStore`].
    pub struct SegmentKey;
}

/// Shell layer of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    #[default]
    Outer,
    Inner,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Outer => "outer",
            Self::Inner => "inner",
        })
    }
}

/// One world-space triangle of a segment.
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub positions: [Point3; 3],
    /// Per-vertex normals when the source provides them.
    pub normals: Option<[Vector3; 3]>,
    pub uvs: Option<[Point2; 3]>,
}

impl Triangle {
    /// Geometric face normal, or `None` for a degenerate triangle.
    #[must_use]
    pub fn face_normal(&self) -> Option<Vector3> {
        let [a, b, c] = &self.positions;
        triangle::face_normal(a, b, c)
    }

    #[must_use]
    pub fn centroid(&self) -> Point3 {
        let [a, b, c] = &self.positions;
        triangle::centroid(a, b, c)
    }
}

/// UV-space view of a triangle, as consumed by island extraction.
#[derive(Debug, Clone, Copy)]
pub struct UvTriangle<'a> {
    pub uv: [Point2; 3],
    pub material: &'a MaterialRef,
}

/// One renderable sub-mesh of the loaded asset, with geometry baked into
/// world space.
#[derive(Debug, Clone)]
pub struct MeshSegment {
    pub stable_id: String,
    pub source_name: String,
    pub traversal_index: usize,
    pub material: MaterialRef,
    pub world_bbox: Aabb,
    pub layer: Layer,
    pub(crate) positions: Vec<Point3>,
    pub(crate) normals: Vec<Vector3>,
    pub(crate) uvs: Vec<Point2>,
    pub(crate) indices: Vec<[u32; 3]>,
}

impl MeshSegment {
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    /// Returns `true` if every vertex carries a UV coordinate.
    #[must_use]
    pub fn has_uvs(&self) -> bool {
        !self.uvs.is_empty() && self.uvs.len() == self.positions.len()
    }

    /// The `i`-th triangle, or `None` if out of range.
    #[must_use]
    pub fn triangle(&self, i: usize) -> Option<Triangle> {
        let [a, b, c] = self.indices.get(i)?.map(|v| v as usize);
        let positions = [
            *self.positions.get(a)?,
            *self.positions.get(b)?,
            *self.positions.get(c)?,
        ];
        let normals = (self.normals.len() == self.positions.len())
            .then(|| [self.normals[a], self.normals[b], self.normals[c]]);
        let uvs = self
            .has_uvs()
            .then(|| [self.uvs[a], self.uvs[b], self.uvs[c]]);
        Some(Triangle {
            positions,
            normals,
            uvs,
        })
    }

    /// Iterates all triangles in index order.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        (0..self.indices.len()).filter_map(|i| self.triangle(i))
    }

    /// UV triangles in index order; empty when the segment has no UVs.
    #[must_use]
    pub fn uv_triangles(&self) -> Vec<UvTriangle<'_>> {
        if !self.has_uvs() {
            return Vec::new();
        }
        self.triangles()
            .filter_map(|t| {
                t.uvs.map(|uv| UvTriangle {
                    uv,
                    material: &self.material,
                })
            })
            .collect()
    }
}

/// Arena owning the segments of the current parse pass.
///
/// Keys are generational: after [`SegmentStore::replace`] a key obtained for
/// the previous asset no longer resolves.
#[derive(Debug, Default)]
pub struct SegmentStore {
    segments: SlotMap<SegmentKey, MeshSegment>,
    order: Vec<SegmentKey>,
    by_stable_id: HashMap<String, SegmentKey>,
}

impl SegmentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a segment and returns its key. The first segment inserted
    /// under a stable id wins id lookups.
    pub fn insert(&mut self, segment: MeshSegment) -> SegmentKey {
        let id = segment.stable_id.clone();
        let key = self.segments.insert(segment);
        self.order.push(key);
        self.by_stable_id.entry(id).or_insert(key);
        key
    }

    /// Drops every segment and inserts `segments` in order.
    ///
    /// Removing bumps each slot's version, so keys handed out before the
    /// replacement stop resolving.
    pub fn replace(&mut self, segments: Vec<MeshSegment>) -> Vec<SegmentKey> {
        self.segments.clear();
        self.order.clear();
        self.by_stable_id.clear();
        segments.into_iter().map(|s| self.insert(s)).collect()
    }

    #[must_use]
    pub fn get(&self, key: SegmentKey) -> Option<&MeshSegment> {
        self.segments.get(key)
    }

    #[must_use]
    pub fn key_of(&self, stable_id: &str) -> Option<SegmentKey> {
        self.by_stable_id.get(stable_id).copied()
    }

    #[must_use]
    pub fn by_stable_id(&self, stable_id: &str) -> Option<&MeshSegment> {
        self.key_of(stable_id).and_then(|k| self.segments.get(k))
    }

    #[must_use]
    pub fn contains_id(&self, stable_id: &str) -> bool {
        self.by_stable_id.contains_key(stable_id)
    }

    /// Iterates segments in traversal order.
    pub fn iter(&self) -> impl Iterator<Item = (SegmentKey, &MeshSegment)> + '_ {
        self.order
            .iter()
            .filter_map(|&k| self.segments.get(k).map(|s| (k, s)))
    }

    pub fn keys(&self) -> impl Iterator<Item = SegmentKey> + '_ {
        self.order.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
