use serde::{Deserialize, Serialize};
use synthgen_core::{candidate::InstanceId, PointCoordinates, ProjectedPoint, Real};

use crate::{
    bbox::BoundingBox2D,
    instance_mask::{InstanceMask, PassIndexTable},
    ray_scene::{Ray, RayCaster, TriangleScene},
};

/// Which occlusion test a frame uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcclusionStrategy {
    /// Frustum test only.
    None,
    /// One instance mask per frame, O(1) lookups per sample.
    #[default]
    InstanceMask,
    /// One ray per sample. Slow: scales with samples times scene triangles.
    RayCast,
}

/// Decides whether a world-space sample of an object can be seen from the eye.
pub trait OcclusionTester {
    fn is_visible(
        &self,
        instance: InstanceId,
        point: &PointCoordinates,
        eye: &PointCoordinates,
        projected: &ProjectedPoint,
    ) -> bool;

    /// Extent of the pixels showing `instance`, for testers that keep a per-pixel image.
    fn visible_pixel_bounds(&self, _instance: InstanceId) -> Option<BoundingBox2D> {
        None
    }
}

pub struct NoOcclusion;

impl OcclusionTester for NoOcclusion {
    fn is_visible(&self, _: InstanceId, _: &PointCoordinates, _: &PointCoordinates, _: &ProjectedPoint) -> bool {
        true
    }
}

/// Casts a segment from the sample towards the eye; any hit before the eye occludes.
pub struct RayCastOcclusion<R: RayCaster = TriangleScene> {
    caster: R,
    epsilon: Real,
}

impl<R: RayCaster> RayCastOcclusion<R> {
    /// `epsilon` pushes the ray origin off the sampled surface.
    pub fn new(caster: R, epsilon: Real) -> Self {
        Self { caster, epsilon }
    }

    pub fn is_segment_clear(&self, from: &PointCoordinates, to: &PointCoordinates) -> bool {
        let offset = to - from;
        let distance = offset.norm();
        let Some(ray) = Ray::new(*from, offset) else {
            return false;
        };
        if distance <= self.epsilon {
            return true;
        }
        let ray = Ray {
            origin: ray.point_at(self.epsilon),
            ..ray
        };
        self.caster.cast(&ray, distance - self.epsilon).is_none()
    }
}

impl<R: RayCaster> OcclusionTester for RayCastOcclusion<R> {
    fn is_visible(&self, _: InstanceId, point: &PointCoordinates, eye: &PointCoordinates, _: &ProjectedPoint) -> bool {
        self.is_segment_clear(point, eye)
    }
}

/// A sample is visible when the mask shows the object's own pass index at its pixel.
pub struct MaskOcclusion {
    mask: InstanceMask,
    passes: PassIndexTable,
    sample_radius: usize,
}

impl MaskOcclusion {
    pub fn new(mask: InstanceMask, passes: PassIndexTable, sample_radius: usize) -> Self {
        Self {
            mask,
            passes,
            sample_radius,
        }
    }

    pub fn mask(&self) -> &InstanceMask {
        &self.mask
    }

    pub fn passes(&self) -> &PassIndexTable {
        &self.passes
    }

    /// Hands back the mask and resets every pass index.
    pub fn into_mask(mut self) -> InstanceMask {
        self.passes.reset();
        self.mask
    }
}

impl OcclusionTester for MaskOcclusion {
    fn is_visible(&self, instance: InstanceId, _: &PointCoordinates, _: &PointCoordinates, projected: &ProjectedPoint) -> bool {
        let pass = self.passes.pass_index(instance);
        self.mask
            .contains_near(pass, projected.x, projected.y, self.sample_radius)
    }

    fn visible_pixel_bounds(&self, instance: InstanceId) -> Option<BoundingBox2D> {
        self.mask.pixel_bounds(self.passes.pass_index(instance))
    }
}

/// Occlusion state prepared for one frame.
pub enum FrameOcclusion {
    Unoccluded(NoOcclusion),
    RayCast(RayCastOcclusion<TriangleScene>),
    InstanceMask(MaskOcclusion),
}

impl FrameOcclusion {
    pub fn strategy(&self) -> OcclusionStrategy {
        match self {
            FrameOcclusion::Unoccluded(_) => OcclusionStrategy::None,
            FrameOcclusion::RayCast(_) => OcclusionStrategy::RayCast,
            FrameOcclusion::InstanceMask(_) => OcclusionStrategy::InstanceMask,
        }
    }

    pub fn mask(&self) -> Option<&InstanceMask> {
        match self {
            FrameOcclusion::InstanceMask(m) => Some(m.mask()),
            _ => None,
        }
    }

    /// Ends the frame: pass indices go back to 0 and the mask, if any, is handed back.
    pub fn finish(self) -> Option<InstanceMask> {
        match self {
            FrameOcclusion::InstanceMask(m) => Some(m.into_mask()),
            _ => None,
        }
    }
}

impl OcclusionTester for FrameOcclusion {
    fn is_visible(
        &self,
        instance: InstanceId,
        point: &PointCoordinates,
        eye: &PointCoordinates,
        projected: &ProjectedPoint,
    ) -> bool {
        match self {
            FrameOcclusion::Unoccluded(t) => t.is_visible(instance, point, eye, projected),
            FrameOcclusion::RayCast(t) => t.is_visible(instance, point, eye, projected),
            FrameOcclusion::InstanceMask(t) => t.is_visible(instance, point, eye, projected),
        }
    }

    fn visible_pixel_bounds(&self, instance: InstanceId) -> Option<BoundingBox2D> {
        match self {
            FrameOcclusion::InstanceMask(t) => t.visible_pixel_bounds(instance),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use synthgen_core::{candidate::Candidate, mesh::Mesh, transform::Transform};

    fn cube(id: InstanceId, center: PointCoordinates, size: Real) -> Candidate {
        Candidate::distractor(id, "cube", Arc::new(Mesh::cube(size)), Transform::from_translation(center))
    }

    #[test]
    fn blocker_on_segment_occludes() {
        let eye = PointCoordinates::new(0.0, 0.0, 10.0);
        let vertex = PointCoordinates::new(1.0, 1.0, 1.0);
        let target = cube(1, PointCoordinates::zeros(), 2.0);

        let open = RayCastOcclusion::new(TriangleScene::from_candidates(&[target.clone()]), 0.01);
        assert!(open.is_segment_clear(&vertex, &eye));

        let midpoint = (vertex + eye) * 0.5;
        let blocked = RayCastOcclusion::new(
            TriangleScene::from_candidates(&[target, cube(2, midpoint, 0.5)]),
            0.01,
        );
        assert!(!blocked.is_segment_clear(&vertex, &eye));
    }

    #[test]
    fn far_side_vertex_is_self_occluded() {
        let eye = PointCoordinates::new(0.0, 0.0, 10.0);
        let tester = RayCastOcclusion::new(
            TriangleScene::from_candidates(&[cube(1, PointCoordinates::zeros(), 2.0)]),
            0.01,
        );
        assert!(!tester.is_segment_clear(&PointCoordinates::new(1.0, 1.0, -1.0), &eye));
    }

    #[test]
    fn coincident_points_are_not_visible() {
        let tester = RayCastOcclusion::new(TriangleScene::default(), 0.01);
        let p = PointCoordinates::new(1.0, 2.0, 3.0);
        assert!(!tester.is_segment_clear(&p, &p));
    }

    #[test]
    fn mask_lookup_uses_pass_index() {
        let mesh = Arc::new(Mesh::cube(1.0));
        let candidates = [
            Candidate::target(11, "can", mesh.clone(), Transform::identity()),
            Candidate::target(12, "car", mesh, Transform::identity()),
        ];
        let passes = PassIndexTable::assign(&candidates);
        let mut mask = InstanceMask::new(2, 2);
        mask.set(0, 0, passes.pass_index(12));

        let tester = MaskOcclusion::new(mask, passes, 0);
        let top_left = ProjectedPoint { x: 0.25, y: 0.75, depth: 1.0 };
        let eye = PointCoordinates::zeros();
        assert!(tester.is_visible(12, &eye, &eye, &top_left));
        assert!(!tester.is_visible(11, &eye, &eye, &top_left));
        assert!(!tester.is_visible(99, &eye, &eye, &top_left));
        assert_eq!(tester.visible_pixel_bounds(12), Some(BoundingBox2D::new(0.0, 0.5, 0.5, 1.0)));
        assert_eq!(tester.visible_pixel_bounds(11), None);
    }

    #[test]
    fn finishing_a_frame_hands_back_the_mask() {
        let mesh = Arc::new(Mesh::cube(1.0));
        let candidates = [Candidate::target(5, "can", mesh, Transform::identity())];
        let passes = PassIndexTable::assign(&candidates);
        let mut mask = InstanceMask::new(1, 1);
        mask.set(0, 0, passes.pass_index(5));
        let tester = MaskOcclusion::new(mask.clone(), passes, 0);
        assert_eq!(tester.passes().pass_index(5), 1);

        let frame = FrameOcclusion::InstanceMask(tester);
        assert_eq!(frame.finish(), Some(mask));
        assert_eq!(FrameOcclusion::Unoccluded(NoOcclusion).finish(), None);
    }
}
