mod dataset;
pub use dataset::*;
mod camera;
pub use camera::*;
pub mod candidate;
pub mod mesh;
pub mod transform;

use sophus::nalgebra::Vector3;

pub type Real = f64;
pub type PointCoordinates = Vector3<Real>;
pub type DirectionVector = Vector3<Real>;
