use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use synthgen_core::Real;
use visbox::VisibilityResolverCfg;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct GenerationCfg {
    pub hdri_path: PathBuf,
    pub obj_path: PathBuf,
    pub output_path: PathBuf,

    pub seed: u64,
    pub iterations: usize,
    pub arrangements: usize,
    pub pictures: usize,

    pub target_classes: Vec<String>,
    pub min_target_objects: usize,
    pub max_target_objects: usize,
    pub min_total_objects: usize,
    pub max_total_objects: usize,

    pub max_light_energy: u32,
    pub light_range: Real,
    pub min_exposure: Real,
    pub max_exposure: Real,

    pub resolution_x: usize,
    pub resolution_y: usize,
    pub render_percentage: usize,
    pub fov: Real,

    pub placement_center: [Real; 3],
    pub placement_range: [Real; 3],
    pub rescale_size: Real,
    pub rescale_jitter: Real,
    pub min_fill_ratio: Real,
    pub max_fill_ratio: Real,
    /// Share of the fitted distance under which the camera counts as too close to an object.
    pub too_close_factor: Real,
    pub max_viewpoint_retries: usize,

    pub save_files: bool,
    pub visibility: VisibilityResolverCfg,
}

impl Default for GenerationCfg {
    fn default() -> Self {
        Self {
            hdri_path: PathBuf::from("data/backgrounds/HDRI"),
            obj_path: PathBuf::from("data/3d_models"),
            output_path: PathBuf::from("output"),

            seed: 0,
            iterations: 10,
            arrangements: 10,
            pictures: 10,

            target_classes: vec!["can".to_string(), "toy_car".to_string()],
            min_target_objects: 0,
            max_target_objects: 2,
            min_total_objects: 3,
            max_total_objects: 6,

            max_light_energy: 50,
            light_range: 6.0,
            min_exposure: 0.5,
            max_exposure: 10.0,

            resolution_x: 1920 / 2,
            resolution_y: 1080 / 2,
            render_percentage: 100,
            fov: 0.691_150_4,

            placement_center: [0.0; 3],
            placement_range: [0.4, 0.4, 0.2],
            rescale_size: 0.2,
            rescale_jitter: 0.05,
            min_fill_ratio: 0.3,
            max_fill_ratio: 1.3,
            too_close_factor: 0.4,
            max_viewpoint_retries: 100,

            save_files: true,
            visibility: VisibilityResolverCfg::default(),
        }
    }
}

impl GenerationCfg {
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Pixel size of rendered frames after the render percentage is applied.
    pub fn image_size(&self) -> (usize, usize) {
        let scale = |v: usize| (v * self.render_percentage / 100).max(1);
        (scale(self.resolution_x), scale(self.resolution_y))
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_target_objects > self.max_target_objects {
            bail!(
                "min_target_objects {} exceeds max_target_objects {}",
                self.min_target_objects,
                self.max_target_objects
            );
        }
        if self.min_total_objects > self.max_total_objects {
            bail!(
                "min_total_objects {} exceeds max_total_objects {}",
                self.min_total_objects,
                self.max_total_objects
            );
        }
        if !(self.min_exposure > 0.0 && self.min_exposure <= 1.0 && self.max_exposure >= 1.0) {
            bail!(
                "exposure range [{}, {}] must contain 1 and stay positive",
                self.min_exposure,
                self.max_exposure
            );
        }
        if !(1..=100).contains(&self.render_percentage) {
            bail!("render_percentage must be in 1..=100, got {}", self.render_percentage);
        }
        if self.resolution_x == 0 || self.resolution_y == 0 {
            bail!("resolution must be non-zero");
        }
        if !(self.fov > 0.0 && self.fov < std::f64::consts::PI) {
            bail!("fov must be in (0, pi) radians, got {}", self.fov);
        }
        if !(self.rescale_size > self.rescale_jitter && self.rescale_jitter >= 0.0) {
            bail!(
                "rescale_size {} must exceed rescale_jitter {}",
                self.rescale_size,
                self.rescale_jitter
            );
        }
        if !(self.min_fill_ratio > 0.0 && self.min_fill_ratio <= self.max_fill_ratio) {
            bail!(
                "fill ratio range [{}, {}] is empty or not positive",
                self.min_fill_ratio,
                self.max_fill_ratio
            );
        }
        if self.placement_range.iter().any(|r| *r < 0.0) || self.light_range < 0.0 {
            bail!("placement and light ranges must be non-negative");
        }
        Ok(())
    }
}
