//! Anchors shown when no asset is provided.
//!
//! The fallback scene has no segments; only these two hotspot anchors are
//! exposed, at fixed positions on the placeholder geometry.

use crate::math::{Point2, Point3, Vector3};
use crate::placement::{HotspotCategory, HotspotPlacement};

/// Mesh name carried by fallback anchors.
pub const FALLBACK_MESH: &str = "fallback";

/// The fixed `handle` and `body` anchors of the fallback scene.
#[must_use]
pub fn fallback_anchors() -> Vec<(HotspotCategory, HotspotPlacement)> {
    vec![
        (
            HotspotCategory::Handle,
            HotspotPlacement {
                world_position: Point3::new(0.0, 1.2, 0.0),
                world_normal: Vector3::y(),
                uv_coords: Point2::new(0.5, 0.9),
                mesh_name: FALLBACK_MESH.into(),
            },
        ),
        (
            HotspotCategory::Body,
            HotspotPlacement {
                world_position: Point3::new(0.0, 0.5, 0.6),
                world_normal: Vector3::z(),
                uv_coords: Point2::new(0.5, 0.5),
                mesh_name: FALLBACK_MESH.into(),
            },
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchors_cover_handle_and_body() {
        let anchors = fallback_anchors();
        let cats: Vec<_> = anchors.iter().map(|(c, _)| *c).collect();
        assert_eq!(cats, [HotspotCategory::Handle, HotspotCategory::Body]);
        assert!(anchors.iter().all(|(_, p)| p.mesh_name == FALLBACK_MESH));
    }
}
