//! Parsed asset representation.
//!
//! A [`SceneGraph`] is the decoder-independent form of a loaded 3D asset: a
//! tree of named nodes, some of which carry triangle geometry. Everything
//! downstream (identity, islands, classification) reads only this form.

pub mod fallback;
pub mod loader;
pub mod obj;

pub use loader::{AssetLoader, AssetSource, LoadStatus, LoadTicket};
pub use obj::decode_obj;

use serde::{Deserialize, Serialize};

use crate::math::{Matrix4, Point2, Point3, Vector3};

/// Material reference of a mesh: its name plus the position of that material
/// in the asset's material table, when the decoder knows it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MaterialRef {
    pub name: String,
    pub index: Option<u32>,
}

impl MaterialRef {
    #[must_use]
    pub fn new(name: impl Into<String>, index: Option<u32>) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }
}

/// Structured association a decoder attaches to a mesh node, e.g. which
/// `meshes[index]` entry of the source document produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Association {
    pub kind: String,
    pub index: u32,
}

impl Association {
    #[must_use]
    pub fn new(kind: impl Into<String>, index: u32) -> Self {
        Self {
            kind: kind.into(),
            index,
        }
    }
}

/// Indexed triangle geometry in node-local space.
///
/// `normals` and `uvs` are either empty or parallel to `positions`.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub positions: Vec<Point3>,
    pub normals: Vec<Vector3>,
    pub uvs: Vec<Point2>,
    pub indices: Vec<[u32; 3]>,
    pub material: MaterialRef,
}

impl MeshData {
    /// Number of triangles.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    /// Returns `true` if every vertex carries a UV coordinate.
    #[must_use]
    pub fn has_uvs(&self) -> bool {
        !self.uvs.is_empty() && self.uvs.len() == self.positions.len()
    }

    /// Returns `true` if every vertex carries a normal.
    #[must_use]
    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty() && self.normals.len() == self.positions.len()
    }
}

/// One node of the scene tree.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    /// Transform relative to the parent node.
    pub transform: Matrix4,
    pub mesh: Option<MeshData>,
    pub association: Option<Association>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    /// Creates an empty group node with an identity transform.
    #[must_use]
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Matrix4::identity(),
            mesh: None,
            association: None,
            children: Vec::new(),
        }
    }

    /// Creates a mesh node with an identity transform.
    #[must_use]
    pub fn mesh(name: impl Into<String>, mesh: MeshData) -> Self {
        Self {
            mesh: Some(mesh),
            ..Self::group(name)
        }
    }

    #[must_use]
    pub fn with_transform(mut self, transform: Matrix4) -> Self {
        self.transform = transform;
        self
    }

    #[must_use]
    pub fn with_association(mut self, association: Association) -> Self {
        self.association = Some(association);
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }
}

/// A decoded asset.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    pub roots: Vec<SceneNode>,
}

impl SceneGraph {
    #[must_use]
    pub fn new(roots: Vec<SceneNode>) -> Self {
        Self { roots }
    }

    /// Visits every mesh-bearing node depth-first in document order (a node
    /// before its children, siblings in declaration order), passing the
    /// accumulated world transform.
    ///
    /// This order is the contract that keeps stable ids identical across
    /// independent parses.
    pub fn visit_meshes<'a, F>(&'a self, mut f: F)
    where
        F: FnMut(&'a SceneNode, &'a MeshData, &Matrix4),
    {
        fn walk<'a, F>(node: &'a SceneNode, parent: &Matrix4, f: &mut F)
        where
            F: FnMut(&'a SceneNode, &'a MeshData, &Matrix4),
        {
            let world = parent * node.transform;
            if let Some(mesh) = &node.mesh {
                f(node, mesh, &world);
            }
            for child in &node.children {
                walk(child, &world, f);
            }
        }

        let identity = Matrix4::identity();
        for root in &self.roots {
            walk(root, &identity, &mut f);
        }
    }

    /// Number of mesh-bearing nodes.
    #[must_use]
    pub fn mesh_count(&self) -> usize {
        let mut n = 0;
        self.visit_meshes(|_, _, _| n += 1);
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri_mesh() -> MeshData {
        MeshData {
            positions: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            indices: vec![[0, 1, 2]],
            ..MeshData::default()
        }
    }

    #[test]
    fn visit_order_is_depth_first_document_order() {
        let scene = SceneGraph::new(vec![
            SceneNode::group("root")
                .with_child(
                    SceneNode::mesh("a", tri_mesh()).with_child(SceneNode::mesh("a1", tri_mesh())),
                )
                .with_child(SceneNode::mesh("b", tri_mesh())),
            SceneNode::mesh("c", tri_mesh()),
        ]);
        let mut names = Vec::new();
        scene.visit_meshes(|node, _, _| names.push(node.name.clone()));
        assert_eq!(names, ["a", "a1", "b", "c"]);
        assert_eq!(scene.mesh_count(), 4);
    }

    #[test]
    fn world_transform_accumulates() {
        let shift = Matrix4::new_translation(&Vector3::new(1.0, 0.0, 0.0));
        let scene = SceneGraph::new(vec![SceneNode::group("root")
            .with_transform(shift)
            .with_child(SceneNode::mesh("leaf", tri_mesh()).with_transform(shift))]);
        let mut tx = 0.0;
        scene.visit_meshes(|_, _, world| tx = world[(0, 3)]);
        assert!((tx - 2.0).abs() < 1e-12);
    }

    #[test]
    fn uv_presence_requires_parallel_arrays() {
        let mut mesh = tri_mesh();
        assert!(!mesh.has_uvs());
        mesh.uvs = vec![Point2::new(0.0, 0.0); 2];
        assert!(!mesh.has_uvs());
        mesh.uvs.push(Point2::new(1.0, 1.0));
        assert!(mesh.has_uvs());
    }
}
