use std::sync::Arc;

use crate::{
    mesh::{Mesh, PointSource},
    transform::Transform,
    PointCoordinates,
};

/// Per-frame identity of a renderable object; doubles as its pass index in instance masks.
pub type InstanceId = u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CandidateRole {
    /// Labelled detection target.
    Target,
    /// Clutter: occludes and is occluded, never labelled.
    Distractor,
}

/// One object considered for visibility in the current frame.
#[derive(Clone, Debug)]
pub struct Candidate {
    pub id: InstanceId,
    pub label: String,
    pub role: CandidateRole,
    pub mesh: Arc<Mesh>,
    pub transform: Transform,
}

impl Candidate {
    pub fn target(id: InstanceId, label: impl Into<String>, mesh: Arc<Mesh>, transform: Transform) -> Self {
        Self {
            id,
            label: label.into(),
            role: CandidateRole::Target,
            mesh,
            transform,
        }
    }

    pub fn distractor(id: InstanceId, label: impl Into<String>, mesh: Arc<Mesh>, transform: Transform) -> Self {
        Self {
            id,
            label: label.into(),
            role: CandidateRole::Distractor,
            mesh,
            transform,
        }
    }

    pub fn is_target(&self) -> bool {
        self.role == CandidateRole::Target
    }

    pub fn world_points(&self, source: PointSource) -> Vec<PointCoordinates> {
        self.mesh
            .points(source)
            .iter()
            .map(|p| self.transform.apply(p))
            .collect()
    }

    /// World-space bounds of the transformed local bounding box corners.
    pub fn world_bounds(&self) -> Option<(PointCoordinates, PointCoordinates)> {
        let corners = self.world_points(PointSource::BoundingBoxCorners);
        let first = *corners.first()?;
        Some(
            corners
                .iter()
                .fold((first, first), |(min, max), c| (min.inf(c), max.sup(c))),
        )
    }

    pub fn world_center(&self) -> Option<PointCoordinates> {
        self.world_bounds().map(|(min, max)| (min + max) * 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn world_bounds_follow_transform() {
        let c = Candidate::target(
            1,
            "can",
            Arc::new(Mesh::cube(2.0)),
            Transform::from_translation(PointCoordinates::new(10.0, 0.0, 0.0)).with_uniform_scale(0.5),
        );
        let (min, max) = c.world_bounds().unwrap();
        assert_relative_eq!(min, PointCoordinates::new(9.5, -0.5, -0.5));
        assert_relative_eq!(max, PointCoordinates::new(10.5, 0.5, 0.5));
        assert_relative_eq!(c.world_center().unwrap(), PointCoordinates::new(10.0, 0.0, 0.0));
        assert!(c.is_target());
    }

    #[test]
    fn empty_mesh_has_no_bounds() {
        let c = Candidate::distractor(2, "box", Arc::new(Mesh::default()), Transform::identity());
        assert!(c.world_bounds().is_none());
        assert!(!c.is_target());
    }
}
