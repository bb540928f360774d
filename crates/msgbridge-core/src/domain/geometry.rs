//! Geometry value types: float vectors, integer vectors, and quaternions.
//!
//! On the wire these are fixed sequences of scalar words (3, 3, and 4
//! components respectively), in the field order declared below.

use std::fmt;

/// A point or direction in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector {
    /// Creates a vector from its three components.
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// The zero vector.
    pub const ZERO: Vector = Vector::new(0.0, 0.0, 0.0);

    /// Euclidean length.
    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// An integer grid position (for example a terrain tile or a sector index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IntVector {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl IntVector {
    /// Creates an integer vector from its three components.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for IntVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// A rotation, stored as `(x, y, z, w)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quaternion {
    /// Creates a quaternion from its four components.
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// The identity rotation.
    pub const IDENTITY: Quaternion = Quaternion::new(0.0, 0.0, 0.0, 1.0);
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl fmt::Display for Quaternion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x, self.y, self.z, self.w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quaternion_default_is_identity() {
        assert_eq!(Quaternion::default(), Quaternion::IDENTITY);
    }

    #[test]
    fn test_vector_length_of_unit_axes() {
        assert_eq!(Vector::new(1.0, 0.0, 0.0).length(), 1.0);
        assert_eq!(Vector::new(0.0, 3.0, 4.0).length(), 5.0);
        assert_eq!(Vector::ZERO.length(), 0.0);
    }

    #[test]
    fn test_display_formats_components_in_wire_order() {
        assert_eq!(IntVector::new(1, -2, 3).to_string(), "(1, -2, 3)");
        assert_eq!(
            Quaternion::new(0.5, 0.0, 0.0, 1.0).to_string(),
            "(0.5, 0, 0, 1)"
        );
    }
}
