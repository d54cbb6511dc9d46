//! Wavefront OBJ decoding into a [`SceneGraph`].
//!
//! Supports `v`, `vt`, `vn`, `f` (polygons are fan-triangulated, negative
//! indices are resolved relative to the current end of each list), `o`/`g`
//! to start a new named node, and `usemtl`. A material switch inside an
//! object that already has faces splits it into a second node with the same
//! name, the way a multi-primitive mesh decodes. Each node carries the
//! association `mesh[n]` where `n` is its decode order.

use std::collections::HashMap;

use tracing::debug;

use super::{Association, MaterialRef, MeshData, SceneGraph, SceneNode};
use crate::error::AssetError;
use crate::math::{Point2, Point3, Vector3};

const DEFAULT_NODE_NAME: &str = "default";
const ASSOCIATION_KIND: &str = "mesh";

/// Decodes OBJ text.
///
/// # Errors
///
/// Returns [`AssetError::Parse`] for malformed statements or out-of-range
/// indices.
pub fn decode_obj(text: &str) -> Result<SceneGraph, AssetError> {
    let mut state = ObjState::default();

    for (line_idx, raw) in text.lines().enumerate() {
        let line_num = line_idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let Some(keyword) = parts.next() else {
            continue;
        };
        let args: Vec<&str> = parts.collect();

        match keyword {
            "v" => {
                let [x, y, z] = parse_floats::<3>(&args, line_num, "vertex position")?;
                state.positions.push(Point3::new(x, y, z));
            }
            "vt" => {
                let [u, v] = parse_floats::<2>(&args, line_num, "texture coordinate")?;
                state.tex_coords.push(Point2::new(u, v));
            }
            "vn" => {
                let [x, y, z] = parse_floats::<3>(&args, line_num, "normal")?;
                state.normals.push(Vector3::new(x, y, z));
            }
            "o" | "g" => {
                let name = if args.is_empty() {
                    DEFAULT_NODE_NAME.to_string()
                } else {
                    args.join(" ")
                };
                state.start_node(name);
            }
            "usemtl" => {
                let name = args.join(" ");
                state.use_material(&name);
            }
            "f" => {
                if args.len() < 3 {
                    return Err(parse_error(line_num, "face must have at least 3 vertices"));
                }
                let mut corners = Vec::with_capacity(args.len());
                for corner in &args {
                    corners.push(state.resolve_corner(corner, line_num)?);
                }
                let builder = state.current_builder();
                for i in 1..corners.len() - 1 {
                    builder.indices.push([corners[0], corners[i], corners[i + 1]]);
                }
            }
            _ => {}
        }
    }

    state.flush();
    debug!(nodes = state.finished.len(), "decoded OBJ asset");
    Ok(SceneGraph::new(state.finished))
}

fn parse_error(line: usize, message: impl Into<String>) -> AssetError {
    AssetError::Parse {
        line,
        message: message.into(),
    }
}

fn parse_floats<const N: usize>(
    args: &[&str],
    line: usize,
    what: &str,
) -> Result<[f64; N], AssetError> {
    if args.len() < N {
        return Err(parse_error(line, format!("invalid {what} (expected {N} values)")));
    }
    let mut out = [0.0; N];
    for (slot, s) in out.iter_mut().zip(args) {
        *slot = s
            .parse()
            .map_err(|_| parse_error(line, format!("invalid number '{s}'")))?;
    }
    Ok(out)
}

/// Resolves a 1-based (or negative, relative) OBJ index against a list length.
fn resolve_index(s: &str, len: usize, line: usize) -> Result<usize, AssetError> {
    let raw: i64 = s
        .parse()
        .map_err(|_| parse_error(line, format!("invalid index '{s}'")))?;
    let len_i = i64::try_from(len).map_err(|_| parse_error(line, "list too long"))?;
    let resolved = match raw {
        0 => return Err(parse_error(line, "index 0 is not valid in OBJ")),
        r if r > 0 => r - 1,
        r => len_i + r,
    };
    if resolved < 0 || resolved >= len_i {
        return Err(parse_error(line, format!("index {raw} out of range (len {len})")));
    }
    usize::try_from(resolved).map_err(|_| parse_error(line, "index out of range"))
}

#[derive(Default)]
struct NodeBuilder {
    name: String,
    material: MaterialRef,
    positions: Vec<Point3>,
    uvs: Vec<Option<Point2>>,
    normals: Vec<Option<Vector3>>,
    indices: Vec<[u32; 3]>,
    corner_cache: HashMap<(usize, Option<usize>, Option<usize>), u32>,
}

impl NodeBuilder {
    fn into_mesh(self) -> MeshData {
        let uvs = self.uvs.iter().copied().collect::<Option<Vec<_>>>().unwrap_or_default();
        let normals = self
            .normals
            .iter()
            .copied()
            .collect::<Option<Vec<_>>>()
            .unwrap_or_default();
        MeshData {
            positions: self.positions,
            normals,
            uvs,
            indices: self.indices,
            material: self.material,
        }
    }
}

#[derive(Default)]
struct ObjState {
    positions: Vec<Point3>,
    tex_coords: Vec<Point2>,
    normals: Vec<Vector3>,
    materials: Vec<String>,
    current: Option<NodeBuilder>,
    finished: Vec<SceneNode>,
}

impl ObjState {
    fn current_builder(&mut self) -> &mut NodeBuilder {
        self.current.get_or_insert_with(|| NodeBuilder {
            name: DEFAULT_NODE_NAME.to_string(),
            ..NodeBuilder::default()
        })
    }

    fn start_node(&mut self, name: String) {
        let material = self
            .current
            .as_ref()
            .map(|b| b.material.clone())
            .unwrap_or_default();
        self.flush();
        self.current = Some(NodeBuilder {
            name,
            material,
            ..NodeBuilder::default()
        });
    }

    fn use_material(&mut self, name: &str) {
        let index = match self.materials.iter().position(|m| m == name) {
            Some(i) => i,
            None => {
                self.materials.push(name.to_string());
                self.materials.len() - 1
            }
        };
        let material = MaterialRef::new(name, u32::try_from(index).ok());
        let builder = self.current_builder();
        if builder.indices.is_empty() {
            builder.material = material;
        } else {
            let node_name = builder.name.clone();
            self.flush();
            self.current = Some(NodeBuilder {
                name: node_name,
                material,
                ..NodeBuilder::default()
            });
        }
    }

    fn resolve_corner(&mut self, corner: &str, line: usize) -> Result<u32, AssetError> {
        let mut fields = corner.split('/');
        let pos = match fields.next() {
            Some(s) if !s.is_empty() => resolve_index(s, self.positions.len(), line)?,
            _ => return Err(parse_error(line, "missing position index in face")),
        };
        let tc = match fields.next() {
            Some(s) if !s.is_empty() => Some(resolve_index(s, self.tex_coords.len(), line)?),
            _ => None,
        };
        let norm = match fields.next() {
            Some(s) if !s.is_empty() => Some(resolve_index(s, self.normals.len(), line)?),
            _ => None,
        };

        let position = self.positions[pos];
        let uv = tc.map(|i| self.tex_coords[i]);
        let normal = norm.map(|i| self.normals[i]);
        let builder = self.current_builder();
        if let Some(&idx) = builder.corner_cache.get(&(pos, tc, norm)) {
            return Ok(idx);
        }
        let idx = u32::try_from(builder.positions.len())
            .map_err(|_| parse_error(line, "too many vertices in one object"))?;
        builder.positions.push(position);
        builder.uvs.push(uv);
        builder.normals.push(normal);
        builder.corner_cache.insert((pos, tc, norm), idx);
        Ok(idx)
    }

    fn flush(&mut self) {
        let Some(builder) = self.current.take() else {
            return;
        };
        if builder.indices.is_empty() {
            return;
        }
        let ordinal = u32::try_from(self.finished.len()).unwrap_or(u32::MAX);
        let name = builder.name.clone();
        self.finished.push(
            SceneNode::mesh(name, builder.into_mesh())
                .with_association(Association::new(ASSOCIATION_KIND, ordinal)),
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const TWO_OBJECTS: &str = "\
# two quads
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 0.5 0
vt 0.5 0.5
vt 0 0.5
vn 0 0 1
o Body
usemtl leather
f 1/1/1 2/2/1 3/3/1 4/4/1
o Strap
usemtl metal
f -4/1 -3/2 -2/3
";

    #[test]
    fn decodes_objects_and_triangulates() {
        let scene = decode_obj(TWO_OBJECTS).unwrap();
        assert_eq!(scene.roots.len(), 2);
        let body = &scene.roots[0];
        assert_eq!(body.name, "Body");
        let mesh = body.mesh.as_ref().unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.positions.len(), 4);
        assert!(mesh.has_uvs());
        assert!(mesh.has_normals());
        assert_eq!(mesh.material, MaterialRef::new("leather", Some(0)));
        assert_eq!(body.association, Some(Association::new("mesh", 0)));
    }

    #[test]
    fn missing_normals_are_dropped_per_node() {
        let scene = decode_obj(TWO_OBJECTS).unwrap();
        let strap = scene.roots[1].mesh.as_ref().unwrap();
        assert!(strap.has_uvs());
        assert!(!strap.has_normals());
        assert_eq!(strap.material.index, Some(1));
    }

    #[test]
    fn material_switch_splits_node() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\no Part\nusemtl a\nf 1 2 3\nusemtl b\nf 1 3 2\n";
        let scene = decode_obj(text).unwrap();
        assert_eq!(scene.roots.len(), 2);
        assert_eq!(scene.roots[0].name, "Part");
        assert_eq!(scene.roots[1].name, "Part");
        assert_eq!(scene.roots[1].association, Some(Association::new("mesh", 1)));
    }

    #[test]
    fn out_of_range_index_is_parse_error() {
        let err = decode_obj("v 0 0 0\nf 1 2 3\n").unwrap_err();
        assert!(matches!(err, AssetError::Parse { line: 2, .. }));
    }

    #[test]
    fn malformed_number_is_parse_error() {
        let err = decode_obj("v 0 zero 0\n").unwrap_err();
        assert!(matches!(err, AssetError::Parse { line: 1, .. }));
    }

    #[test]
    fn faces_without_object_go_to_default_node() {
        let scene = decode_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        assert_eq!(scene.roots[0].name, "default");
        assert!(!scene.roots[0].mesh.as_ref().unwrap().has_uvs());
    }
}
