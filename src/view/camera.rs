use nalgebra::{Isometry3, Perspective3};

use crate::math::{triangle::Ray, Aabb, Point2, Point3, Vector3};

/// Perspective camera of the 3D stage.
///
/// Screen coordinates are pixels with the origin at the top-left corner and
/// `y` growing downwards.
#[derive(Debug, Clone, PartialEq)]
pub struct StageCamera {
    pub eye: Point3,
    pub target: Point3,
    pub up: Vector3,
    /// Vertical field of view in radians.
    pub fovy: f64,
    pub znear: f64,
    pub zfar: f64,
    width: f64,
    height: f64,
}

impl Default for StageCamera {
    fn default() -> Self {
        Self {
            eye: Point3::new(0.0, 0.0, 5.0),
            target: Point3::origin(),
            up: Vector3::y(),
            fovy: std::f64::consts::FRAC_PI_4,
            znear: 0.01,
            zfar: 1000.0,
            width: 800.0,
            height: 600.0,
        }
    }
}

impl StageCamera {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        let mut camera = Self::default();
        camera.resize(width, height);
        camera
    }

    /// Viewport size in pixels.
    #[must_use]
    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width.max(1.0);
        self.height = height.max(1.0);
    }

    fn view(&self) -> Isometry3<f64> {
        Isometry3::look_at_rh(&self.eye, &self.target, &self.up)
    }

    fn projection(&self) -> Perspective3<f64> {
        Perspective3::new(self.width / self.height, self.fovy, self.znear, self.zfar)
    }

    fn to_ndc(&self, screen: &Point2) -> (f64, f64) {
        (
            2.0 * screen.x / self.width - 1.0,
            1.0 - 2.0 * screen.y / self.height,
        )
    }

    /// World-space ray through the pixel at `screen`.
    #[must_use]
    pub fn ray_through(&self, screen: &Point2) -> Ray {
        let (x, y) = self.to_ndc(screen);
        let proj = self.projection();
        let view = self.view();
        let near = view.inverse_transform_point(&proj.unproject_point(&Point3::new(x, y, -1.0)));
        let far = view.inverse_transform_point(&proj.unproject_point(&Point3::new(x, y, 1.0)));
        let direction = (far - near).try_normalize(f64::EPSILON).unwrap_or_else(|| -Vector3::z());
        Ray::new(near, direction)
    }

    /// Pixel position of a world point, or `None` if it is behind the camera.
    #[must_use]
    pub fn project(&self, world: &Point3) -> Option<Point2> {
        let eye_space = self.view().transform_point(world);
        if eye_space.z >= -self.znear {
            return None;
        }
        let ndc = self.projection().project_point(&eye_space);
        Some(Point2::new(
            (ndc.x + 1.0) * 0.5 * self.width,
            (1.0 - ndc.y) * 0.5 * self.height,
        ))
    }

    /// Places the camera so that `bounds` fills the view, looking down `-z`.
    pub fn frame(&mut self, bounds: &Aabb) {
        if bounds.is_empty() {
            return;
        }
        let center = bounds.center();
        let radius = (bounds.size().norm() * 0.5).max(1e-3);
        let distance = radius / (self.fovy * 0.5).sin();
        self.target = center;
        self.eye = center + Vector3::z() * distance;
        self.up = Vector3::y();
    }

    /// Moves the camera so that it looks at `point`, keeping its offset.
    pub fn focus(&mut self, point: &Point3) {
        let offset = self.eye - self.target;
        self.target = *point;
        self.eye = point + offset;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn center_ray_points_at_target() {
        let cam = StageCamera::new(800.0, 600.0);
        let ray = cam.ray_through(&Point2::new(400.0, 300.0));
        assert_relative_eq!(ray.direction.z, -1.0, epsilon = 1e-9);
        assert_relative_eq!(ray.origin.x, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn degenerate_size_is_clamped() {
        let cam = StageCamera::new(0.0, 0.0);
        assert_eq!(cam.size(), (1.0, 1.0));
        let ray = cam.ray_through(&Point2::new(0.5, 0.5));
        assert_relative_eq!(ray.direction.z, -1.0, epsilon = 1e-9);
        assert!(cam.project(&Point3::origin()).is_some());
    }

    #[test]
    fn project_inverts_ray() {
        let cam = StageCamera::new(640.0, 480.0);
        let screen = Point2::new(100.0, 350.0);
        let ray = cam.ray_through(&screen);
        let back = cam.project(&ray.at(3.0)).unwrap();
        assert_relative_eq!(back.x, screen.x, epsilon = 1e-6);
        assert_relative_eq!(back.y, screen.y, epsilon = 1e-6);
    }

    #[test]
    fn points_behind_are_not_projected() {
        let cam = StageCamera::default();
        assert!(cam.project(&Point3::new(0.0, 0.0, 10.0)).is_none());
    }

    #[test]
    fn frame_centers_bounds() {
        let mut cam = StageCamera::default();
        cam.frame(&Aabb::new(Point3::new(1.0, 1.0, 1.0), Point3::new(3.0, 3.0, 3.0)));
        assert_relative_eq!(cam.target, Point3::new(2.0, 2.0, 2.0));
        assert!(cam.eye.z > 3.0);
        let p = cam.project(&cam.target).unwrap();
        assert_relative_eq!(p.x, 400.0, epsilon = 1e-6);
    }

    #[test]
    fn focus_keeps_offset() {
        let mut cam = StageCamera::default();
        cam.focus(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(cam.eye, Point3::new(1.0, 0.0, 5.0));
    }
}
