use std::collections::BTreeSet;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use synthgen_core::{
    candidate::{Candidate, InstanceId},
    mesh::PointSource,
    Camera, Real,
};

use crate::{
    bbox::{BoundingBox2D, BoxAccumulator},
    estimator::{estimate_with_counts, EstimatorOptions, ReferenceBoxPolicy},
    instance_mask::{InstanceMask, PassIndexTable},
    occlusion::{
        FrameOcclusion, MaskOcclusion, NoOcclusion, OcclusionStrategy, OcclusionTester,
        RayCastOcclusion,
    },
    ray_scene::TriangleScene,
};

/// Where a label box comes from once an object passed the visibility threshold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxSource {
    /// Extent of the visible projected samples.
    #[default]
    Vertices,
    /// Extent of the object's pixels in the instance mask.
    MaskPixels,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct VisibilityResolverCfg {
    pub visible_threshold: Real,
    pub min_visible_vertex_ratio: Real,
    pub point_source: PointSource,
    pub reference_box: ReferenceBoxPolicy,
    pub occlusion: OcclusionStrategy,
    pub box_source: BoxSource,
    pub ray_epsilon: Real,
    pub mask_sample_radius: usize,
}

impl Default for VisibilityResolverCfg {
    fn default() -> Self {
        Self {
            visible_threshold: 0.3,
            min_visible_vertex_ratio: 0.1,
            point_source: PointSource::FullMesh,
            reference_box: ReferenceBoxPolicy::InFront,
            occlusion: OcclusionStrategy::InstanceMask,
            box_source: BoxSource::Vertices,
            ray_epsilon: 0.01,
            mask_sample_radius: 1,
        }
    }
}

impl VisibilityResolverCfg {
    pub fn finalize(self) -> Result<VisibilityResolver> {
        if !(0.0..1.0).contains(&self.visible_threshold) {
            bail!(
                "visible_threshold must be in [0, 1), got {}",
                self.visible_threshold
            );
        }
        if !(0.0..=1.0).contains(&self.min_visible_vertex_ratio) {
            bail!(
                "min_visible_vertex_ratio must be in [0, 1], got {}",
                self.min_visible_vertex_ratio
            );
        }
        if !(self.ray_epsilon >= 0.0 && self.ray_epsilon.is_finite()) {
            bail!("ray_epsilon must be a finite non-negative distance, got {}", self.ray_epsilon);
        }
        if self.box_source == BoxSource::MaskPixels && self.occlusion != OcclusionStrategy::InstanceMask {
            bail!("box_source mask_pixels needs instance_mask occlusion, got {:?}", self.occlusion);
        }
        if self.occlusion == OcclusionStrategy::RayCast {
            log::info!("ray cast occlusion selected, expect one ray per sampled vertex");
        }
        log::info!(
            "visibility: threshold {}, {:?} samples, {:?} reference box, {:?} occlusion, {:?} boxes",
            self.visible_threshold,
            self.point_source,
            self.reference_box,
            self.occlusion,
            self.box_source
        );

        Ok(VisibilityResolver {
            visible_threshold: self.visible_threshold,
            strategy: self.occlusion,
            box_source: self.box_source,
            ray_epsilon: self.ray_epsilon,
            mask_sample_radius: self.mask_sample_radius,
            options: EstimatorOptions {
                point_source: self.point_source,
                reference_box: self.reference_box,
                min_visible_vertex_ratio: self.min_visible_vertex_ratio,
            },
        })
    }
}

/// One labelled object that passed the visibility threshold.
#[derive(Clone, Debug, PartialEq)]
pub struct VisibilityRecord {
    pub instance: InstanceId,
    pub label: String,
    pub bbox: BoundingBox2D,
    pub visible_fraction: Real,
}

pub struct VisibilityResolver {
    visible_threshold: Real,
    strategy: OcclusionStrategy,
    box_source: BoxSource,
    ray_epsilon: Real,
    mask_sample_radius: usize,
    options: EstimatorOptions,
}

impl VisibilityResolver {
    pub fn visible_threshold(&self) -> Real {
        self.visible_threshold
    }

    pub fn strategy(&self) -> OcclusionStrategy {
        self.strategy
    }

    pub fn box_source(&self) -> BoxSource {
        self.box_source
    }

    pub fn options(&self) -> &EstimatorOptions {
        &self.options
    }

    /// Builds the occlusion state for the configured strategy. Every candidate, distractors
    /// included, takes part as an occluder.
    pub fn prepare_occlusion<C: Camera>(&self, candidates: &[Candidate], camera: &C) -> FrameOcclusion {
        match self.strategy {
            OcclusionStrategy::None => FrameOcclusion::Unoccluded(NoOcclusion),
            OcclusionStrategy::RayCast => FrameOcclusion::RayCast(RayCastOcclusion::new(
                TriangleScene::from_candidates(candidates),
                self.ray_epsilon,
            )),
            OcclusionStrategy::InstanceMask => {
                let passes = PassIndexTable::assign(candidates);
                let scene = TriangleScene::from_candidates(candidates);
                let mask = InstanceMask::from_ray_casts(camera, &scene, &passes);
                FrameOcclusion::InstanceMask(MaskOcclusion::new(
                    mask,
                    passes,
                    self.mask_sample_radius,
                ))
            }
        }
    }

    /// Records for the targets whose visible fraction exceeds the threshold, in candidate order.
    pub fn resolve<C: Camera>(
        &self,
        candidates: &[Candidate],
        camera: &C,
        occlusion: &dyn OcclusionTester,
    ) -> Vec<VisibilityRecord> {
        let mut seen = BTreeSet::new();
        let mut records = vec![];
        for candidate in candidates {
            if !candidate.is_target() || !seen.insert(candidate.id) {
                continue;
            }
            if corners_miss_frame(candidate, camera) {
                log::trace!("{} ({}) outside the image", candidate.label, candidate.id);
                continue;
            }
            let (estimate, counts) = estimate_with_counts(candidate, camera, occlusion, &self.options);
            let visible_fraction = estimate.fraction();
            let Some(bbox) = estimate.bbox() else {
                log::trace!("{} ({}) invalid, {:?}", candidate.label, candidate.id, counts);
                continue;
            };
            if visible_fraction <= self.visible_threshold {
                log::trace!(
                    "{} ({}) below threshold, fraction {:.3}",
                    candidate.label,
                    candidate.id,
                    visible_fraction
                );
                continue;
            }
            let bbox = match self.box_source {
                BoxSource::Vertices => bbox,
                BoxSource::MaskPixels => match occlusion.visible_pixel_bounds(candidate.id) {
                    Some(pixels) => pixels,
                    None => {
                        log::trace!("{} ({}) has no pixels", candidate.label, candidate.id);
                        continue;
                    }
                },
            };
            records.push(VisibilityRecord {
                instance: candidate.id,
                label: candidate.label.clone(),
                bbox,
                visible_fraction,
            });
        }
        records
    }

    /// Prepares occlusion for the frame, resolves, then finishes the per-frame state.
    pub fn resolve_frame<C: Camera>(&self, candidates: &[Candidate], camera: &C) -> Vec<VisibilityRecord> {
        let occlusion = self.prepare_occlusion(candidates, camera);
        let records = self.resolve(candidates, camera, &occlusion);
        occlusion.finish();
        records
    }
}

/// True when every bounding box corner is in front of the camera and their projected box
/// misses the image, so no sample of the object can land in the frustum.
fn corners_miss_frame<C: Camera>(candidate: &Candidate, camera: &C) -> bool {
    let mut corners = BoxAccumulator::default();
    for corner in candidate.world_points(PointSource::BoundingBoxCorners) {
        let projected = camera.project(&corner);
        if !projected.is_in_front() {
            return false;
        }
        corners.add(projected.x, projected.y);
    }
    corners.finish().is_some_and(|b| !b.overlaps_frame())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sophus::image::ImageSize;
    use std::{cell::Cell, sync::Arc};
    use synthgen_core::{mesh::Mesh, transform::Transform, PointCoordinates, ProjectedPoint};
    use synthgen_sensor::{CameraPose, Projection};

    struct CountingTester(Cell<usize>);

    impl OcclusionTester for CountingTester {
        fn is_visible(&self, _: InstanceId, _: &PointCoordinates, _: &PointCoordinates, _: &ProjectedPoint) -> bool {
            self.0.set(self.0.get() + 1);
            true
        }
    }

    fn cube_at(x: Real, z: Real) -> Candidate {
        Candidate::target(
            1,
            "cube",
            Arc::new(Mesh::cube(2.0)),
            Transform::from_translation(PointCoordinates::new(x, 0.0, z)),
        )
    }

    #[test]
    fn defaults_finalize() {
        let resolver = VisibilityResolverCfg::default().finalize().unwrap();
        approx::assert_relative_eq!(resolver.visible_threshold(), 0.3);
        assert_eq!(resolver.strategy(), OcclusionStrategy::InstanceMask);
        assert_eq!(resolver.options().point_source, PointSource::FullMesh);
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        for threshold in [1.0, -0.1, Real::NAN] {
            let cfg = VisibilityResolverCfg {
                visible_threshold: threshold,
                ..Default::default()
            };
            assert!(cfg.finalize().is_err(), "{threshold}");
        }
        let cfg = VisibilityResolverCfg {
            min_visible_vertex_ratio: 1.5,
            ..Default::default()
        };
        assert!(cfg.finalize().is_err());
    }

    #[test]
    fn off_frame_targets_skip_occlusion_tests() {
        let mut camera = CameraPose::new(Projection::Orthographic { scale: 10.0 }, ImageSize::new(100, 100))
            .at(PointCoordinates::new(0.0, 0.0, 10.0));
        camera.look_at(&PointCoordinates::zeros());
        assert!(corners_miss_frame(&cube_at(8.0, 0.0), &camera));
        assert!(!corners_miss_frame(&cube_at(5.5, 0.0), &camera));

        let resolver = VisibilityResolverCfg {
            occlusion: OcclusionStrategy::None,
            ..Default::default()
        }
        .finalize()
        .unwrap();
        let tester = CountingTester(Cell::new(0));
        assert!(resolver.resolve(&[cube_at(8.0, 0.0)], &camera, &tester).is_empty());
        assert_eq!(tester.0.get(), 0);
        assert_eq!(resolver.resolve(&[cube_at(0.0, 0.0)], &camera, &tester).len(), 1);
        assert_eq!(tester.0.get(), 8);
    }

    #[test]
    fn corners_behind_the_eye_never_reject() {
        let mut camera = CameraPose::new(Projection::default(), ImageSize::new(100, 100))
            .at(PointCoordinates::new(0.0, 0.0, 10.0));
        camera.look_at(&PointCoordinates::zeros());
        assert!(!corners_miss_frame(&cube_at(30.0, 10.0), &camera));
    }

    #[test]
    fn mask_pixel_boxes_need_an_instance_mask() {
        let cfg = VisibilityResolverCfg {
            box_source: BoxSource::MaskPixels,
            occlusion: OcclusionStrategy::RayCast,
            ..Default::default()
        };
        assert!(cfg.finalize().is_err());
        let cfg = VisibilityResolverCfg {
            box_source: BoxSource::MaskPixels,
            ..Default::default()
        };
        assert_eq!(cfg.finalize().unwrap().box_source(), BoxSource::MaskPixels);
    }

    #[test]
    fn box_source_reads_from_yaml() {
        let cfg: VisibilityResolverCfg =
            serde_yaml::from_str("box_source: mask_pixels\nvisible_threshold: 0.5\n").unwrap();
        assert_eq!(cfg.box_source, BoxSource::MaskPixels);
        assert_eq!(cfg.occlusion, OcclusionStrategy::InstanceMask);
    }
}
