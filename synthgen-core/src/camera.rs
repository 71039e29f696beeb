use crate::{DirectionVector, PointCoordinates, Real};

/// A world point expressed in normalized camera-view coordinates.
///
/// `x` and `y` are fractions of the image plane (0 = left/bottom edge, 1 = right/top edge),
/// `depth` is positive when the point lies in front of the camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectedPoint {
    pub x: Real,
    pub y: Real,
    pub depth: Real,
}

impl ProjectedPoint {
    /// Returned for points that cannot be projected (on the camera plane / at the eye).
    pub const DEGENERATE: ProjectedPoint = ProjectedPoint {
        x: 0.5,
        y: 0.5,
        depth: 0.0,
    };

    pub fn is_in_front(&self) -> bool {
        self.depth > 0.0
    }

    pub fn is_in_frustum(&self) -> bool {
        (0.0..=1.0).contains(&self.x) && (0.0..=1.0).contains(&self.y)
    }
}

pub trait Camera {
    fn rows(&self) -> usize;
    fn cols(&self) -> usize;

    /// Eye position in world space.
    fn position(&self) -> PointCoordinates;

    fn project(&self, point: &PointCoordinates) -> ProjectedPoint;

    /// World-space ray (origin, unit direction) through the normalized image position `(x, y)`.
    fn view_ray(&self, x: Real, y: Real) -> (PointCoordinates, DirectionVector);
}
