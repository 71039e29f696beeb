use sophus::nalgebra::{UnitQuaternion, Vector3};

use crate::{PointCoordinates, Real};

/// Local-to-world mapping: scale, then rotate, then translate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vector3<Real>,
    pub rotation: UnitQuaternion<Real>,
    pub scale: Vector3<Real>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn from_translation(translation: Vector3<Real>) -> Self {
        Self {
            translation,
            ..Self::identity()
        }
    }

    /// XYZ Euler rotation in radians (X applied first).
    pub fn with_euler_xyz(mut self, x: Real, y: Real, z: Real) -> Self {
        self.rotation = UnitQuaternion::from_euler_angles(x, y, z);
        self
    }

    pub fn with_uniform_scale(mut self, scale: Real) -> Self {
        self.scale = Vector3::new(scale, scale, scale);
        self
    }

    pub fn apply(&self, point: &PointCoordinates) -> PointCoordinates {
        self.translation + self.rotation * point.component_mul(&self.scale)
    }
}
