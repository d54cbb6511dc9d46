use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PlacementError;
use crate::math::{Point2, Point3, Vector3};
use crate::segment::Layer;

/// How a new decal picks the segment it is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecalTargetMode {
    /// Never bound; any segment may receive the decal.
    #[default]
    Auto,
    /// Bound to the current selection, unless it names a generic category.
    Selected,
}

/// Resolves the target of a new decal.
///
/// In [`DecalTargetMode::Selected`] the current selection becomes the target
/// unless it is one of the `excluded` generic category ids.
#[must_use]
pub fn resolve_target(
    mode: DecalTargetMode,
    selected: Option<&str>,
    excluded: impl Fn(&str) -> bool,
) -> Option<String> {
    match mode {
        DecalTargetMode::Auto => None,
        DecalTargetMode::Selected => selected
            .filter(|id| !excluded(id))
            .map(ToString::to_string),
    }
}

/// A decal stamped onto the surface. World position and normal are captured
/// once at placement time and never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecalPlacement {
    pub id: String,
    pub image_ref: String,
    pub layer: Layer,
    /// `None` means any segment may receive the decal.
    pub target_stable_id: Option<String>,
    pub uv_coords: Point2,
    pub scale: f64,
    /// Rotation in radians.
    pub rotation: f64,
    pub world_position: Point3,
    pub world_normal: Vector3,
}

/// Partial update of a decal; only the supplied fields change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DecalPatch {
    pub image_ref: Option<String>,
    pub layer: Option<Layer>,
    #[serde(with = "double_option", skip_serializing_if = "Option::is_none")]
    pub target_stable_id: Option<Option<String>>,
    pub uv_coords: Option<Point2>,
    pub scale: Option<f64>,
    pub rotation: Option<f64>,
}

impl DecalPatch {
    fn apply(&self, decal: &mut DecalPlacement) {
        if let Some(image) = &self.image_ref {
            decal.image_ref.clone_from(image);
        }
        if let Some(layer) = self.layer {
            decal.layer = layer;
        }
        if let Some(target) = &self.target_stable_id {
            decal.target_stable_id.clone_from(target);
        }
        if let Some(uv) = self.uv_coords {
            decal.uv_coords = uv;
        }
        if let Some(scale) = self.scale {
            decal.scale = scale;
        }
        if let Some(rotation) = self.rotation {
            decal.rotation = rotation;
        }
    }
}

/// Distinguishes an absent field from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S, T>(value: &Option<Option<T>>, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        match value {
            Some(inner) => inner.serialize(s),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D, T>(d: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(d).map(Some)
    }
}

/// Append-only, ordered decal list. Entries can be patched by id; removal is
/// only possible by clearing the whole list.
#[derive(Debug, Clone, Default)]
pub struct DecalList {
    entries: Vec<DecalPlacement>,
    next_seq: u64,
}

/// Fields of a new decal that the list does not generate itself.
#[derive(Debug, Clone)]
pub struct NewDecal {
    pub image_ref: String,
    pub layer: Layer,
    pub target_stable_id: Option<String>,
    pub uv_coords: Point2,
    pub scale: f64,
    pub rotation: f64,
    pub world_position: Point3,
    pub world_normal: Vector3,
}

impl DecalList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a decal under a freshly generated id and returns it.
    pub fn push(&mut self, new: NewDecal) -> &DecalPlacement {
        let id = self.next_id();
        debug!(%id, image = %new.image_ref, target = ?new.target_stable_id, "decal placed");
        let index = self.entries.len();
        self.entries.push(DecalPlacement {
            id,
            image_ref: new.image_ref,
            layer: new.layer,
            target_stable_id: new.target_stable_id,
            uv_coords: new.uv_coords,
            scale: new.scale,
            rotation: new.rotation,
            world_position: new.world_position,
            world_normal: new.world_normal,
        });
        &self.entries[index]
    }

    fn next_id(&mut self) -> String {
        loop {
            self.next_seq += 1;
            let id = format!("decal-{}", self.next_seq);
            if !self.entries.iter().any(|d| d.id == id) {
                return id;
            }
        }
    }

    /// Applies `patch` to the decal with `id`.
    ///
    /// # Errors
    ///
    /// Returns [`PlacementError::UnknownDecal`] if no decal has that id.
    pub fn update(
        &mut self,
        id: &str,
        patch: &DecalPatch,
    ) -> Result<&DecalPlacement, PlacementError> {
        let decal = self
            .entries
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| PlacementError::UnknownDecal(id.to_string()))?;
        patch.apply(decal);
        Ok(decal)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&DecalPlacement> {
        self.entries.iter().find(|d| d.id == id)
    }

    /// Removes every decal. Ids are not reused afterwards.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &DecalPlacement> + '_ {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
