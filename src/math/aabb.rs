use serde::{Deserialize, Serialize};

use super::{Point2, Point3, Vector3};

/// An axis-aligned bounding box in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Point3,
    /// Maximum corner of the bounding box.
    pub max: Point3,
}

impl Aabb {
    /// Creates a box from two corners.
    #[must_use]
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// An inverted box that contains nothing; `include` grows it.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Builds the tightest box around `points`.
    #[must_use]
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Self {
        let mut aabb = Self::empty();
        for p in points {
            aabb.include(p);
        }
        aabb
    }

    /// Grows the box to contain `p`.
    pub fn include(&mut self, p: &Point3) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Returns `true` if no point has been included yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Edge lengths along each axis.
    #[must_use]
    pub fn size(&self) -> Vector3 {
        if self.is_empty() {
            return Vector3::zeros();
        }
        self.max - self.min
    }

    /// Volume of the box; zero for an empty box.
    #[must_use]
    pub fn volume(&self) -> f64 {
        let s = self.size();
        s.x * s.y * s.z
    }

    /// Center of the box.
    #[must_use]
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    /// Returns a copy grown by `eps` on every side.
    #[must_use]
    pub fn expanded(&self, eps: f64) -> Self {
        let e = Vector3::new(eps, eps, eps);
        Self {
            min: self.min - e,
            max: self.max + e,
        }
    }

    /// Returns `true` if `other` lies entirely within this box (bounds inclusive).
    #[must_use]
    pub fn contains(&self, other: &Aabb) -> bool {
        other.min.x >= self.min.x
            && other.min.y >= self.min.y
            && other.min.z >= self.min.z
            && other.max.x <= self.max.x
            && other.max.y <= self.max.y
            && other.max.z <= self.max.z
    }

    /// Smallest box containing both boxes.
    #[must_use]
    pub fn union(&self, other: &Aabb) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }
}

/// Bounds of a set of UV coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UvBounds {
    pub min_u: f64,
    pub max_u: f64,
    pub min_v: f64,
    pub max_v: f64,
}

impl Default for UvBounds {
    fn default() -> Self {
        Self {
            min_u: f64::INFINITY,
            max_u: f64::NEG_INFINITY,
            min_v: f64::INFINITY,
            max_v: f64::NEG_INFINITY,
        }
    }
}

impl UvBounds {
    /// Grows the bounds to contain `uv`.
    pub fn include(&mut self, uv: &Point2) {
        self.min_u = self.min_u.min(uv.x);
        self.max_u = self.max_u.max(uv.x);
        self.min_v = self.min_v.min(uv.y);
        self.max_v = self.max_v.max(uv.y);
    }

    /// Returns `true` if no coordinate has been included yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min_u > self.max_u || self.min_v > self.max_v
    }

    /// Returns `true` if `uv` lies inside the bounds (inclusive).
    #[must_use]
    pub fn contains(&self, uv: &Point2) -> bool {
        uv.x >= self.min_u && uv.x <= self.max_u && uv.y >= self.min_v && uv.y <= self.max_v
    }

    /// Smallest bounds containing both.
    #[must_use]
    pub fn union(&self, other: &UvBounds) -> Self {
        Self {
            min_u: self.min_u.min(other.min_u),
            max_u: self.max_u.max(other.max_u),
            min_v: self.min_v.min(other.min_v),
            max_v: self.max_v.max(other.max_v),
        }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        (self.max_u - self.min_u).max(0.0)
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        (self.max_v - self.min_v).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box() -> Aabb {
        Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn from_points_and_volume() {
        let pts = [
            Point3::new(-1.0, 0.0, 2.0),
            Point3::new(1.0, 2.0, 0.0),
            Point3::new(0.0, 1.0, 1.0),
        ];
        let aabb = Aabb::from_points(&pts);
        assert_relative_eq!(aabb.volume(), 8.0);
        assert_relative_eq!(aabb.center().y, 1.0);
    }

    #[test]
    fn empty_box_has_zero_volume() {
        let aabb = Aabb::empty();
        assert!(aabb.is_empty());
        assert_relative_eq!(aabb.volume(), 0.0);
    }

    #[test]
    fn containment_is_inclusive() {
        let outer = unit_box();
        assert!(outer.contains(&unit_box()));
        let inner = Aabb::new(Point3::new(0.2, 0.2, 0.2), Point3::new(0.8, 0.8, 0.8));
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
    }

    #[test]
    fn partial_overlap_is_not_contained() {
        let outer = unit_box();
        let straddling = Aabb::new(Point3::new(0.5, 0.5, 0.5), Point3::new(1.5, 0.9, 0.9));
        assert!(!outer.contains(&straddling));
    }

    #[test]
    fn expansion_absorbs_touching_boxes() {
        let outer = unit_box();
        let touching = Aabb::new(Point3::new(0.0, 0.0, -0.0005), Point3::new(1.0, 1.0, 1.0));
        assert!(!outer.contains(&touching));
        assert!(outer.expanded(1e-3).contains(&touching));
    }

    #[test]
    fn uv_bounds_include_and_contains() {
        let mut b = UvBounds::default();
        assert!(b.is_empty());
        b.include(&Point2::new(0.1, 0.2));
        b.include(&Point2::new(0.4, 0.9));
        assert!(b.contains(&Point2::new(0.3, 0.5)));
        assert!(!b.contains(&Point2::new(0.5, 0.5)));
        assert_relative_eq!(b.width(), 0.3);
    }
}
