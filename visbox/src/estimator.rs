use serde::{Deserialize, Serialize};
use synthgen_core::{candidate::Candidate, mesh::PointSource, Camera, Real};

use crate::{
    bbox::{BoundingBox2D, BoxAccumulator},
    occlusion::OcclusionTester,
};

/// Which projected extent the visible box is measured against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceBoxPolicy {
    /// Every vertex in front of the camera, including those off screen.
    #[default]
    InFront,
    /// The in-front box clamped to the image.
    FrustumClamped,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Estimate {
    Valid {
        bbox: BoundingBox2D,
        visible_fraction: Real,
    },
    Invalid,
}

impl Estimate {
    pub fn fraction(&self) -> Real {
        match self {
            Estimate::Valid {
                visible_fraction, ..
            } => *visible_fraction,
            Estimate::Invalid => 0.0,
        }
    }

    pub fn bbox(&self) -> Option<BoundingBox2D> {
        match self {
            Estimate::Valid { bbox, .. } => Some(*bbox),
            Estimate::Invalid => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Estimate::Valid { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EstimatorOptions {
    pub point_source: PointSource,
    pub reference_box: ReferenceBoxPolicy,
    /// Fewer visible samples than this share of all samples makes the estimate invalid.
    pub min_visible_vertex_ratio: Real,
}

impl Default for EstimatorOptions {
    fn default() -> Self {
        Self {
            point_source: PointSource::FullMesh,
            reference_box: ReferenceBoxPolicy::InFront,
            min_visible_vertex_ratio: 0.1,
        }
    }
}

/// Sample counts gathered while estimating one candidate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SampleCounts {
    pub total: usize,
    pub in_front: usize,
    pub in_frustum: usize,
    pub visible: usize,
}

/// Visible 2D box of `candidate` and the share of its projected extent that box covers.
pub fn estimate<C: Camera>(
    candidate: &Candidate,
    camera: &C,
    occlusion: &dyn OcclusionTester,
    options: &EstimatorOptions,
) -> Estimate {
    estimate_with_counts(candidate, camera, occlusion, options).0
}

pub fn estimate_with_counts<C: Camera>(
    candidate: &Candidate,
    camera: &C,
    occlusion: &dyn OcclusionTester,
    options: &EstimatorOptions,
) -> (Estimate, SampleCounts) {
    let points = candidate.world_points(options.point_source);
    let mut counts = SampleCounts {
        total: points.len(),
        ..Default::default()
    };
    if points.is_empty() {
        return (Estimate::Invalid, counts);
    }

    let eye = camera.position();
    let mut reference = BoxAccumulator::default();
    let mut visible = BoxAccumulator::default();

    for point in &points {
        let projected = camera.project(point);
        if !projected.is_in_front() {
            continue;
        }
        counts.in_front += 1;
        reference.add(projected.x, projected.y);

        if !projected.is_in_frustum() {
            continue;
        }
        counts.in_frustum += 1;
        if occlusion.is_visible(candidate.id, point, &eye, &projected) {
            visible.add(projected.x, projected.y);
        }
    }
    counts.visible = visible.count();

    if (counts.visible as Real) < options.min_visible_vertex_ratio * counts.total as Real {
        return (Estimate::Invalid, counts);
    }
    let (Some(reference), Some(visible)) = (reference.finish(), visible.finish()) else {
        return (Estimate::Invalid, counts);
    };
    let reference = match options.reference_box {
        ReferenceBoxPolicy::InFront => reference,
        ReferenceBoxPolicy::FrustumClamped => reference.clamped(),
    };
    let reference_area = reference.area();
    if reference_area <= 0.0 {
        return (Estimate::Invalid, counts);
    }

    let bbox = visible.clamped();
    debug_assert!(reference.contains(&bbox), "{bbox:?} outside {reference:?}");
    let visible_fraction = (bbox.area() / reference_area).clamp(0.0, 1.0);
    (
        Estimate::Valid {
            bbox,
            visible_fraction,
        },
        counts,
    )
}
