use std::collections::HashMap;

use crate::math::{quantize_uv, Point2, QuantizedUv};

/// Renderable 2D geometry of one island.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IslandPaths {
    /// One closed sub-path per triangle; filling them all paints the island.
    pub fill: Vec<[Point2; 3]>,
    /// Boundary edges only, each as an open two-point segment.
    pub contour: Vec<[Point2; 2]>,
}

type EdgeKey = (QuantizedUv, QuantizedUv);

fn edge_key(a: &Point2, b: &Point2, decimals: u32) -> EdgeKey {
    let ka = quantize_uv(a, decimals);
    let kb = quantize_uv(b, decimals);
    if ka <= kb {
        (ka, kb)
    } else {
        (kb, ka)
    }
}

/// Builds the fill and contour paths of an island.
///
/// An edge is a boundary edge when exactly one triangle owns it. Ownership is
/// keyed by the unordered pair of endpoints quantized to `edge_decimals`,
/// which is deliberately coarser than the vertex merge precision so that
/// near-duplicate seam vertices close into a single contour line. A boundary
/// edge is drawn with the coordinates of the triangle that first claimed it.
#[must_use]
pub fn island_paths(triangles: &[[Point2; 3]], edge_decimals: u32) -> IslandPaths {
    let mut slots: HashMap<EdgeKey, usize> = HashMap::with_capacity(triangles.len() * 3);
    let mut edges: Vec<([Point2; 2], u32)> = Vec::with_capacity(triangles.len() * 3);

    for tri in triangles {
        for i in 0..3 {
            let a = tri[i];
            let b = tri[(i + 1) % 3];
            let key = edge_key(&a, &b, edge_decimals);
            match slots.get(&key) {
                Some(&slot) => edges[slot].1 += 1,
                None => {
                    slots.insert(key, edges.len());
                    edges.push(([a, b], 1));
                }
            }
        }
    }

    IslandPaths {
        fill: triangles.to_vec(),
        contour: edges
            .into_iter()
            .filter(|(_, owners)| *owners == 1)
            .map(|(seg, _)| seg)
            .collect(),
    }
}
