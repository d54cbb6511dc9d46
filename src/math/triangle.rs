use super::{Point2, Point3, Vector3, TOLERANCE};

/// Barycentric weights `(w0, w1, w2)` of a point relative to a triangle.
pub type Barycentric = [f64; 3];

/// A ray with a unit-length direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Point3,
    pub direction: Vector3,
}

impl Ray {
    /// Creates a ray, normalizing the direction.
    #[must_use]
    pub fn new(origin: Point3, direction: Vector3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Point at distance `t` along the ray.
    #[must_use]
    pub fn at(&self, t: f64) -> Point3 {
        self.origin + self.direction * t
    }
}

/// Unnormalized face normal (right-handed, counter-clockwise winding).
#[must_use]
pub fn face_normal_raw(a: &Point3, b: &Point3, c: &Point3) -> Vector3 {
    (b - a).cross(&(c - a))
}

/// Unit face normal, or `None` for a degenerate triangle.
#[must_use]
pub fn face_normal(a: &Point3, b: &Point3, c: &Point3) -> Option<Vector3> {
    let n = face_normal_raw(a, b, c);
    let len = n.norm();
    (len > TOLERANCE).then(|| n / len)
}

/// Centroid of a triangle.
#[must_use]
pub fn centroid(a: &Point3, b: &Point3, c: &Point3) -> Point3 {
    Point3::from((a.coords + b.coords + c.coords) / 3.0)
}

/// Möller–Trumbore ray/triangle intersection.
///
/// Returns the ray parameter `t` and the barycentric weights of the hit, or
/// `None` when the ray misses or runs parallel to the triangle. Both faces are
/// hit-testable.
#[must_use]
pub fn intersect_ray_triangle(
    ray: &Ray,
    a: &Point3,
    b: &Point3,
    c: &Point3,
) -> Option<(f64, Barycentric)> {
    let e1 = b - a;
    let e2 = c - a;
    let p = ray.direction.cross(&e2);
    let det = e1.dot(&p);
    if det.abs() < TOLERANCE {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = ray.origin - a;
    let u = s.dot(&p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(&e1);
    let v = ray.direction.dot(&q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(&q) * inv_det;
    if t <= TOLERANCE {
        return None;
    }
    Some((t, [1.0 - u - v, u, v]))
}

/// Barycentric weights of `p` in the 2D triangle `(a, b, c)`, if `p` lies
/// inside or on its boundary.
#[must_use]
pub fn point_in_triangle_2d(p: &Point2, a: &Point2, b: &Point2, c: &Point2) -> Option<Barycentric> {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let den = v0.x * v1.y - v1.x * v0.y;
    if den.abs() < TOLERANCE {
        return None;
    }
    let w1 = (v2.x * v1.y - v1.x * v2.y) / den;
    let w2 = (v0.x * v2.y - v2.x * v0.y) / den;
    let w0 = 1.0 - w1 - w2;
    let eps = -1e-9;
    (w0 >= eps && w1 >= eps && w2 >= eps).then_some([w0, w1, w2])
}

/// Interpolates a 2D attribute with barycentric weights.
#[must_use]
pub fn interpolate_2d(w: &Barycentric, a: &Point2, b: &Point2, c: &Point2) -> Point2 {
    Point2::from(a.coords * w[0] + b.coords * w[1] + c.coords * w[2])
}

/// Interpolates a 3D attribute with barycentric weights.
#[must_use]
pub fn interpolate_3d(w: &Barycentric, a: &Vector3, b: &Vector3, c: &Vector3) -> Vector3 {
    a * w[0] + b * w[1] + c * w[2]
}
