//! Random object placement, viewpoints and lighting for one arrangement.

use std::f64::consts::PI;

use rand::{seq::SliceRandom, Rng};
use sophus::nalgebra::Vector3;
use synthgen_core::{
    candidate::{Candidate, InstanceId},
    mesh::PointSource,
    transform::Transform,
    PointCoordinates, Real,
};
use synthgen_dataset_writer::asset_library::{Asset, AssetLibrary};
use synthgen_sensor::CameraPose;

use crate::config::GenerationCfg;

pub struct Arrangement {
    pub candidates: Vec<Candidate>,
    pub light_position: PointCoordinates,
}

impl Arrangement {
    pub fn target_count(&self) -> usize {
        self.candidates.iter().filter(|c| c.is_target()).count()
    }

    /// Eight corners of the box enclosing every object.
    pub fn union_corners(&self) -> Vec<PointCoordinates> {
        let mut bounds: Option<(PointCoordinates, PointCoordinates)> = None;
        for (min, max) in self.candidates.iter().filter_map(Candidate::world_bounds) {
            bounds = Some(match bounds {
                None => (min, max),
                Some((lo, hi)) => (lo.inf(&min), hi.sup(&max)),
            });
        }
        let Some((min, max)) = bounds else {
            return vec![];
        };
        (0..8)
            .map(|i| {
                PointCoordinates::new(
                    if i & 1 == 0 { min.x } else { max.x },
                    if i & 2 == 0 { min.y } else { max.y },
                    if i & 4 == 0 { min.z } else { max.z },
                )
            })
            .collect()
    }
}

pub struct SceneArranger<'a> {
    cfg: &'a GenerationCfg,
    targets: Vec<&'a Asset>,
    distractors: Vec<&'a Asset>,
}

impl<'a> SceneArranger<'a> {
    pub fn new(cfg: &'a GenerationCfg, library: &'a AssetLibrary) -> Self {
        let targets = library.assets_of(&cfg.target_classes);
        let distractors = library.assets_except(&cfg.target_classes);
        log::info!(
            "{} target objects, {} distractor objects available",
            targets.len(),
            distractors.len()
        );
        Self {
            cfg,
            targets,
            distractors,
        }
    }

    /// Picks, rescales, places and rotates a fresh set of objects and moves the light.
    pub fn arrange<R: Rng>(&self, rng: &mut R) -> Arrangement {
        let cfg = self.cfg;
        let wanted_targets = rng.gen_range(cfg.min_target_objects..=cfg.max_target_objects);
        let wanted_total = rng.gen_range(cfg.min_total_objects..=cfg.max_total_objects);
        let n_targets = wanted_targets.min(self.targets.len());
        let n_distractors = wanted_total.saturating_sub(n_targets).min(self.distractors.len());
        if n_targets < wanted_targets || n_targets + n_distractors < wanted_total {
            log::warn!(
                "asked for {wanted_targets} targets and {wanted_total} objects, only {} and {} available",
                n_targets,
                n_targets + n_distractors
            );
        }

        let mut candidates = vec![];
        let mut next_id: InstanceId = 1;
        let picked_targets: Vec<_> = self.targets.choose_multiple(rng, n_targets).copied().collect();
        let picked_distractors: Vec<_> = self
            .distractors
            .choose_multiple(rng, n_distractors)
            .copied()
            .collect();
        for (asset, is_target) in picked_targets
            .into_iter()
            .map(|a| (a, true))
            .chain(picked_distractors.into_iter().map(|a| (a, false)))
        {
            let transform = self.place(asset, rng);
            let candidate = if is_target {
                Candidate::target(next_id, asset.class.as_str(), asset.mesh.clone(), transform)
            } else {
                Candidate::distractor(next_id, asset.class.as_str(), asset.mesh.clone(), transform)
            };
            log::debug!("{} {} ({}) at {:?}", candidate.label, asset.name, next_id, candidate.transform.translation);
            candidates.push(candidate);
            next_id += 1;
        }

        Arrangement {
            candidates,
            light_position: point_on_cube_surface(rng, &PointCoordinates::zeros(), cfg.light_range),
        }
    }

    fn place<R: Rng>(&self, asset: &Asset, rng: &mut R) -> Transform {
        let cfg = self.cfg;
        let size = asset.mesh.max_dimension();
        let wanted = cfg.rescale_size + rng.gen_range(-cfg.rescale_jitter..=cfg.rescale_jitter);
        let scale = if size > 0.0 { wanted / size } else { 1.0 };

        let center = Vector3::from(cfg.placement_center);
        let range = Vector3::from(cfg.placement_range);
        let translation = Vector3::new(
            uniform(rng, center.x - range.x, center.x + range.x),
            uniform(rng, center.y - range.y, center.y + range.y),
            uniform(rng, center.z - range.z, center.z + range.z),
        );
        Transform::from_translation(translation)
            .with_uniform_scale(scale)
            .with_euler_xyz(
                rng.gen_range(0.0..2.0 * PI),
                rng.gen_range(0.0..2.0 * PI),
                rng.gen_range(0.0..2.0 * PI),
            )
    }

    /// Camera looking at a random object from a random direction, fitted to the whole arrangement.
    ///
    /// Viewpoints closer than `too_close_factor` times the fitted distance to any object centre
    /// are resampled, up to `max_viewpoint_retries` times.
    pub fn viewpoint<R: Rng>(&self, arrangement: &Arrangement, camera: &mut CameraPose, rng: &mut R) {
        let cfg = self.cfg;
        let Some(focus) = arrangement.candidates.choose(rng) else {
            return;
        };
        let corners = focus.world_points(PointSource::BoundingBoxCorners);
        let center = corners.iter().sum::<PointCoordinates>() / corners.len().max(1) as Real;
        let max_dist = corners.iter().map(|c| (c - center).norm()).fold(0.0, Real::max);
        let all_corners = arrangement.union_corners();
        let object_centers: Vec<_> = arrangement
            .candidates
            .iter()
            .filter_map(Candidate::world_center)
            .collect();

        for attempt in 0..=cfg.max_viewpoint_retries {
            camera.position = center + unit_sphere_point(rng) * max_dist;
            camera.look_at(&center);
            let fill_ratio = rng.gen_range(cfg.min_fill_ratio..=cfg.max_fill_ratio);
            let fitted = camera.fit_points(&all_corners, fill_ratio);

            let min_distance = fitted * cfg.too_close_factor;
            let too_close = object_centers
                .iter()
                .any(|c| (camera.position - c).norm() < min_distance);
            if !too_close {
                return;
            }
            if attempt == cfg.max_viewpoint_retries {
                log::warn!("camera stays close to an object after {attempt} retries");
            }
        }
    }

    /// Background exposure: below 1 half of the time, above 1 otherwise.
    pub fn exposure<R: Rng>(&self, rng: &mut R) -> Real {
        if rng.gen_bool(0.5) {
            uniform(rng, self.cfg.min_exposure, 1.0)
        } else {
            uniform(rng, 1.0, self.cfg.max_exposure)
        }
    }
}

fn uniform<R: Rng>(rng: &mut R, low: Real, high: Real) -> Real {
    if high > low {
        rng.gen_range(low..high)
    } else {
        low
    }
}

/// Uniformly distributed direction.
pub fn unit_sphere_point<R: Rng>(rng: &mut R) -> Vector3<Real> {
    let z: Real = rng.gen_range(-1.0..=1.0);
    let theta = rng.gen_range(0.0..2.0 * PI);
    let r_xy = (1.0 - z * z).max(0.0).sqrt();
    Vector3::new(r_xy * theta.cos(), r_xy * theta.sin(), z)
}

/// Random point on one of the six faces of the cube `center ± range`.
pub fn point_on_cube_surface<R: Rng>(rng: &mut R, center: &PointCoordinates, range: Real) -> PointCoordinates {
    let axis = rng.gen_range(0..3);
    let side = if rng.gen_bool(0.5) { -range } else { range };
    let mut offset = Vector3::zeros();
    for i in 0..3 {
        offset[i] = if i == axis { side } else { uniform(rng, -range, range) };
    }
    center + offset
}
