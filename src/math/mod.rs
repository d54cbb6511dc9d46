pub mod aabb;
pub mod triangle;

pub use aabb::{Aabb, UvBounds};

/// 2D point type (UV space and screen space).
pub type Point2 = nalgebra::Point2<f64>;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 2D vector type.
pub type Vector2 = nalgebra::Vector2<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// 4x4 transformation matrix.
pub type Matrix4 = nalgebra::Matrix4<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;

/// A UV coordinate rounded to a fixed decimal precision, usable as a map key.
pub type QuantizedUv = (i64, i64);

/// Rounds `value` to `decimals` decimal places and returns the scaled integer.
///
/// Two values that print identically at that precision map to the same key.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn quantize(value: f64, decimals: u32) -> i64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() as i64
}

/// Quantizes both components of a UV coordinate.
#[must_use]
pub fn quantize_uv(uv: &Point2, decimals: u32) -> QuantizedUv {
    (quantize(uv.x, decimals), quantize(uv.y, decimals))
}
