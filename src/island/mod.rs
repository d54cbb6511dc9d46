//! UV island extraction.
//!
//! An island is a maximal set of triangles connected through shared UV
//! vertices, where "shared" means equal after quantization. Triangles are
//! merged with a union-find over triangle indices: every quantized UV vertex
//! remembers the first triangle that produced it, and any later triangle
//! reusing that vertex is joined to it. The whole pass is O(T) in the
//! triangle count.
//!
//! Two numbering schemes exist and are not interchangeable:
//!
//! - [`IslandNumbering::Discovery`] numbers islands in the order their root
//!   is first met while scanning triangles. The pattern view hit-tests with
//!   these ids.
//! - [`IslandNumbering::BySize`] sorts islands by descending triangle count
//!   and renumbers them `0..N`. Material-highlight correlation uses these ids.

mod outline;
mod union_find;

pub use outline::{island_paths, IslandPaths};
pub use union_find::UnionFind;

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::debug;

use crate::asset::MaterialRef;
use crate::math::{quantize_uv, triangle, Point2, UvBounds};
use crate::segment::UvTriangle;

/// Island numbering scheme; see the module docs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IslandNumbering {
    Discovery,
    BySize,
}

/// A maximal UV-connected set of triangles of one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct UvIsland {
    /// Island number under the scheme it was extracted with.
    pub island_id: usize,
    /// Material of the first triangle assigned to the island. Islands are
    /// assumed to be single-material; other triangles are not checked.
    pub material: MaterialRef,
    /// UV-space triangles.
    pub triangles: Vec<[Point2; 3]>,
    /// Index of each triangle in the segment's triangle list.
    pub triangle_indices: Vec<usize>,
    pub uv_bounds: UvBounds,
}

impl UvIsland {
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Returns the segment triangle index and barycentric weights of the
    /// triangle containing `uv`, if any.
    #[must_use]
    pub fn locate(&self, uv: &Point2) -> Option<(usize, triangle::Barycentric)> {
        if !self.uv_bounds.contains(uv) {
            return None;
        }
        self.triangles
            .iter()
            .zip(&self.triangle_indices)
            .find_map(|([a, b, c], &idx)| {
                triangle::point_in_triangle_2d(uv, a, b, c).map(|w| (idx, w))
            })
    }

    /// Fill and contour paths for rendering.
    #[must_use]
    pub fn paths(&self, edge_decimals: u32) -> IslandPaths {
        island_paths(&self.triangles, edge_decimals)
    }
}

/// Partitions `triangles` into UV islands.
///
/// `merge_decimals` is the quantization precision used to decide that two
/// UV vertices are the same.
#[must_use]
pub fn extract_islands(
    triangles: &[UvTriangle<'_>],
    numbering: IslandNumbering,
    merge_decimals: u32,
) -> Vec<UvIsland> {
    let mut uf = UnionFind::new(triangles.len());
    let mut first_owner = HashMap::with_capacity(triangles.len() * 3);

    for (i, tri) in triangles.iter().enumerate() {
        for uv in &tri.uv {
            match first_owner.entry(quantize_uv(uv, merge_decimals)) {
                Entry::Occupied(owner) => {
                    uf.union(i, *owner.get());
                }
                Entry::Vacant(slot) => {
                    slot.insert(i);
                }
            }
        }
    }

    let mut root_to_island: HashMap<usize, usize> = HashMap::new();
    let mut islands: Vec<UvIsland> = Vec::new();
    for (i, tri) in triangles.iter().enumerate() {
        let root = uf.find(i);
        let slot = *root_to_island.entry(root).or_insert_with(|| {
            islands.push(UvIsland {
                island_id: islands.len(),
                material: tri.material.clone(),
                triangles: Vec::new(),
                triangle_indices: Vec::new(),
                uv_bounds: UvBounds::default(),
            });
            islands.len() - 1
        });
        let island = &mut islands[slot];
        island.triangles.push(tri.uv);
        island.triangle_indices.push(i);
        for uv in &tri.uv {
            island.uv_bounds.include(uv);
        }
    }

    if numbering == IslandNumbering::BySize {
        islands.sort_by(|a, b| b.triangle_count().cmp(&a.triangle_count()));
        for (n, island) in islands.iter_mut().enumerate() {
            island.island_id = n;
        }
    }

    debug!(
        triangles = triangles.len(),
        islands = islands.len(),
        ?numbering,
        "extracted UV islands"
    );
    islands
}
