use serde::{Deserialize, Serialize};
use sophus::{
    image::ImageSize,
    nalgebra::{UnitQuaternion, Vector3},
};
use synthgen_core::{DirectionVector, PointCoordinates, ProjectedPoint, Real};

const DEPTH_EPS: Real = 1e-9;

/// Projection descriptor. Both variants measure across the larger image dimension.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Projection {
    /// Full field of view in radians.
    Perspective { fov: Real },
    /// Visible extent in world units.
    Orthographic { scale: Real },
}

impl Default for Projection {
    fn default() -> Self {
        // 50mm lens on a 36mm sensor
        Projection::Perspective { fov: 0.691_150_4 }
    }
}

/// Camera position, orientation and projection for one rendered frame.
///
/// The camera looks down its local -Z axis with local +Y up.
#[derive(Clone, Debug)]
pub struct CameraPose {
    pub position: PointCoordinates,
    pub orientation: UnitQuaternion<Real>,
    pub projection: Projection,
    pub image_size: ImageSize,
}

impl synthgen_core::Camera for CameraPose {
    fn rows(&self) -> usize {
        self.image_size.height
    }

    fn cols(&self) -> usize {
        self.image_size.width
    }

    fn position(&self) -> PointCoordinates {
        self.position
    }

    fn project(&self, point: &PointCoordinates) -> ProjectedPoint {
        let local = self.orientation.inverse_transform_vector(&(point - self.position));
        let depth = -local.z;
        let (half_w, half_h) = self.half_extents();

        let (x, y) = match self.projection {
            Projection::Perspective { .. } => {
                if depth.abs() < DEPTH_EPS {
                    return ProjectedPoint::DEGENERATE;
                }
                (local.x / depth, local.y / depth)
            }
            Projection::Orthographic { .. } => (local.x, local.y),
        };

        ProjectedPoint {
            x: (x / half_w + 1.0) * 0.5,
            y: (y / half_h + 1.0) * 0.5,
            depth,
        }
    }

    fn view_ray(&self, x: Real, y: Real) -> (PointCoordinates, DirectionVector) {
        let (half_w, half_h) = self.half_extents();
        let plane_x = (2.0 * x - 1.0) * half_w;
        let plane_y = (2.0 * y - 1.0) * half_h;

        match self.projection {
            Projection::Perspective { .. } => {
                let direction = self.orientation * Vector3::new(plane_x, plane_y, -1.0);
                (self.position, direction.normalize())
            }
            Projection::Orthographic { .. } => {
                let origin = self.position + self.orientation * Vector3::new(plane_x, plane_y, 0.0);
                (origin, self.forward())
            }
        }
    }
}

impl CameraPose {
    pub fn new(projection: Projection, image_size: ImageSize) -> Self {
        Self {
            position: PointCoordinates::zeros(),
            orientation: UnitQuaternion::identity(),
            projection,
            image_size,
        }
    }

    pub fn at(mut self, position: PointCoordinates) -> Self {
        self.position = position;
        self
    }

    pub fn forward(&self) -> DirectionVector {
        self.orientation * Vector3::new(0.0, 0.0, -1.0)
    }

    /// Width over height, 1 for an unset image size.
    pub fn aspect_ratio(&self) -> Real {
        if self.image_size.width == 0 || self.image_size.height == 0 {
            return 1.0;
        }
        self.image_size.width as Real / self.image_size.height as Real
    }

    /// Half width and half height of the image plane: at unit depth for perspective,
    /// in world units for orthographic.
    pub fn half_extents(&self) -> (Real, Real) {
        let half_major = match self.projection {
            Projection::Perspective { fov } => (fov * 0.5).tan(),
            Projection::Orthographic { scale } => scale * 0.5,
        };
        let aspect = self.aspect_ratio();
        if aspect >= 1.0 {
            (half_major, half_major / aspect)
        } else {
            (half_major * aspect, half_major)
        }
    }

    /// Turns the camera so its -Z axis points at `target`, keeping world +Z up.
    ///
    /// A target at the camera position leaves the orientation untouched.
    pub fn look_at(&mut self, target: &PointCoordinates) {
        let direction = target - self.position;
        if direction.norm() < DEPTH_EPS {
            log::debug!("look_at target coincides with camera position, orientation kept");
            return;
        }

        let mut up = Vector3::z();
        if direction.cross(&up).norm() < DEPTH_EPS * direction.norm() {
            up = Vector3::y();
        }
        self.orientation = UnitQuaternion::face_towards(&-direction, &up);
    }

    /// Moves the camera along its current line of sight so that the bounding sphere of
    /// `points` fits the frustum, then backs off so the points fill roughly `fill_ratio` of it.
    ///
    /// Orthographic cameras stay at a fixed stand-off and change their scale instead.
    /// Returns the fitted eye-to-centre distance, before the fill-ratio adjustment.
    pub fn fit_points(&mut self, points: &[PointCoordinates], fill_ratio: Real) -> Real {
        let Some(first) = points.first() else {
            return 0.0;
        };
        let (min, max) = points
            .iter()
            .fold((*first, *first), |(min, max), p| (min.inf(p), max.sup(p)));
        let center = (min + max) * 0.5;
        let radius = points
            .iter()
            .map(|p| (p - center).norm())
            .fold(0.0, Real::max);
        let fill_ratio = if fill_ratio > 0.0 { fill_ratio } else { 1.0 };

        let (half_w, half_h) = self.half_extents();
        let forward = self.forward();

        match self.projection {
            Projection::Perspective { .. } => {
                let half_angle = half_w.min(half_h).atan();
                let distance = radius / half_angle.sin().max(DEPTH_EPS);
                self.position = center - forward * distance;
                self.position += forward - forward / fill_ratio;
                distance
            }
            Projection::Orthographic { ref mut scale } => {
                let minor_over_major = half_w.min(half_h) / half_w.max(half_h);
                *scale = 2.0 * radius / minor_over_major / fill_ratio;
                let distance = 2.0 * radius + 1.0;
                self.position = center - forward * distance;
                distance
            }
        }
    }
}
