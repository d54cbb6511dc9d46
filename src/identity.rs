//! Stable per-segment identity.
//!
//! Both rendering surfaces parse the same asset independently. They agree on
//! "the same part" only because each walks the scene in the order fixed by
//! [`SceneGraph::visit_meshes`] and derives ids with [`stable_id`]; no runtime
//! object is shared between them.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::asset::{Association, SceneGraph};
use crate::math::{Aabb, Matrix4, Point3};
use crate::segment::{Layer, MeshSegment};

/// Derives the stable id of a mesh node.
///
/// With a structured association the id is `"{name}__{kind}_{index}"`,
/// otherwise `"{name}_{traversal_index}"`. Duplicate names are told apart
/// only by these indices; [`stable_ids`] settles any remaining collision.
#[must_use]
pub fn stable_id(name: &str, association: Option<&Association>, traversal_index: usize) -> String {
    match association {
        Some(a) => format!("{name}__{}_{}", a.kind, a.index),
        None => format!("{name}_{traversal_index}"),
    }
}

/// Stable ids of every mesh node, in traversal order.
///
/// Ids are unique within the parse: a node whose derived id is already taken
/// gets its traversal index appended, see [`claim_unique`].
#[must_use]
pub fn stable_ids(scene: &SceneGraph) -> Vec<String> {
    let mut ids = Vec::new();
    let mut seen = HashSet::new();
    scene.visit_meshes(|node, _, _| {
        let id = stable_id(&node.name, node.association.as_ref(), ids.len());
        ids.push(claim_unique(id, ids.len(), &mut seen));
    });
    ids
}

/// Returns `id`, or `"{id}_{traversal_index}"` if an earlier node of the
/// same parse already claimed it. The first node keeps the plain id.
fn claim_unique(id: String, traversal_index: usize, seen: &mut HashSet<String>) -> String {
    if seen.insert(id.clone()) {
        return id;
    }
    let mut candidate = format!("{id}_{traversal_index}");
    while !seen.insert(candidate.clone()) {
        candidate = format!("{candidate}_{traversal_index}");
    }
    warn!(stable_id = %id, renamed = %candidate, "duplicate stable id within one parse");
    candidate
}

/// Builds one [`MeshSegment`] per mesh node, baking geometry into world
/// space. Every segment starts in [`Layer::Outer`]; classification runs later.
#[must_use]
pub fn resolve_segments(scene: &SceneGraph) -> Vec<MeshSegment> {
    let mut segments: Vec<MeshSegment> = Vec::new();
    let mut seen = HashSet::new();

    scene.visit_meshes(|node, mesh, world| {
        let traversal_index = segments.len();
        let id = stable_id(&node.name, node.association.as_ref(), traversal_index);
        let id = claim_unique(id, traversal_index, &mut seen);

        let positions: Vec<Point3> = mesh
            .positions
            .iter()
            .map(|p| world.transform_point(p))
            .collect();
        let normals = if mesh.has_normals() {
            let normal_matrix = normal_matrix(world);
            mesh.normals
                .iter()
                .map(|n| {
                    let t = normal_matrix * n;
                    t.try_normalize(f64::EPSILON).unwrap_or(t)
                })
                .collect()
        } else {
            Vec::new()
        };
        let uvs = if mesh.has_uvs() {
            mesh.uvs.clone()
        } else {
            Vec::new()
        };

        segments.push(MeshSegment {
            stable_id: id,
            source_name: node.name.clone(),
            traversal_index,
            material: mesh.material.clone(),
            world_bbox: Aabb::from_points(&positions),
            layer: Layer::Outer,
            positions,
            normals,
            uvs,
            indices: mesh.indices.clone(),
        });
    });

    debug!(count = segments.len(), "resolved mesh segments");
    segments
}

/// Inverse-transpose of the upper 3x3 block, for transforming normals.
fn normal_matrix(world: &Matrix4) -> nalgebra::Matrix3<f64> {
    let linear = world.fixed_view::<3, 3>(0, 0).into_owned();
    linear
        .try_inverse()
        .map_or(linear, |inv| inv.transpose())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::asset::{decode_obj, MeshData, SceneNode};
    use crate::math::{Point2, Vector3};
    use approx::assert_relative_eq;

    fn tri() -> MeshData {
        MeshData {
            positions: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            normals: vec![Vector3::z(); 3],
            uvs: vec![
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(0.0, 1.0),
            ],
            indices: vec![[0, 1, 2]],
            ..MeshData::default()
        }
    }

    #[test]
    fn association_format() {
        let a = Association::new("mesh", 3);
        assert_eq!(stable_id("Strap", Some(&a), 7), "Strap__mesh_3");
        assert_eq!(stable_id("Strap", None, 7), "Strap_7");
    }

    #[test]
    fn duplicate_names_disambiguated_by_index() {
        let scene = SceneGraph::new(vec![
            SceneNode::mesh("Panel", tri()),
            SceneNode::group("g").with_child(SceneNode::mesh("Panel", tri())),
            SceneNode::mesh("Panel", tri()),
        ]);
        assert_eq!(stable_ids(&scene), ["Panel_0", "Panel_1", "Panel_2"]);
    }

    #[test]
    fn shared_association_gets_unique_ids() {
        let body = || {
            SceneNode::mesh("Body", tri()).with_association(Association::new("mesh", 0))
        };
        let scene = SceneGraph::new(vec![body(), body(), body()]);
        let expected = ["Body__mesh_0", "Body__mesh_0_1", "Body__mesh_0_2"];
        assert_eq!(stable_ids(&scene), expected);
        let resolved: Vec<_> = resolve_segments(&scene)
            .into_iter()
            .map(|s| s.stable_id)
            .collect();
        assert_eq!(resolved, expected);
    }

    #[test]
    fn renamed_duplicate_avoids_claimed_ids() {
        let mut seen = HashSet::new();
        assert_eq!(claim_unique("A".into(), 0, &mut seen), "A");
        assert_eq!(claim_unique("A_3".into(), 1, &mut seen), "A_3");
        assert_eq!(claim_unique("A".into(), 3, &mut seen), "A_3_3");
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn traversal_counter_counts_mesh_nodes_only() {
        let scene = SceneGraph::new(vec![SceneNode::group("root")
            .with_child(SceneNode::group("empty"))
            .with_child(SceneNode::mesh("A", tri()))
            .with_child(SceneNode::mesh("B", tri()))]);
        assert_eq!(stable_ids(&scene), ["A_0", "B_1"]);
    }

    #[test]
    fn independent_parses_agree() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 0 1\n\
                    o Lid\nf 1/1 2/2 3/3\no Lid\nf 1/1 3/3 2/2\no Base\nf 2/2 3/3 1/1\n";
        let first = stable_ids(&decode_obj(text).unwrap());
        let second = stable_ids(&decode_obj(text).unwrap());
        assert_eq!(first, second);
        assert_eq!(first, ["Lid__mesh_0", "Lid__mesh_1", "Base__mesh_2"]);
        let segs: Vec<_> = resolve_segments(&decode_obj(text).unwrap())
            .into_iter()
            .map(|s| s.stable_id)
            .collect();
        assert_eq!(segs, first);
    }

    #[test]
    fn geometry_is_baked_to_world_space() {
        let shift = Matrix4::new_translation(&Vector3::new(0.0, 0.0, 2.0));
        let scale = Matrix4::new_nonuniform_scaling(&Vector3::new(2.0, 1.0, 1.0));
        let scene = SceneGraph::new(vec![SceneNode::group("root")
            .with_transform(shift)
            .with_child(SceneNode::mesh("A", tri()).with_transform(scale))]);
        let seg = &resolve_segments(&scene)[0];
        assert_relative_eq!(seg.world_bbox.max.x, 2.0);
        assert_relative_eq!(seg.world_bbox.min.z, 2.0);
        let t = seg.triangle(0).unwrap();
        let n = t.normals.unwrap()[0];
        assert_relative_eq!(n.z, 1.0);
        assert_eq!(seg.traversal_index, 0);
        assert_eq!(seg.layer, Layer::Outer);
    }
}
