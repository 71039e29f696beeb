use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use synthgen_dataset_writer::{
    asset_library::AssetLibrary,
    combine::{combine_attempts, default_combined_root},
};

mod arrangement;
mod config;
mod generator;
mod renderer;

use config::GenerationCfg;
use renderer::MaskPreviewRenderer;
use visbox::OcclusionStrategy;

/// Renders randomly arranged objects and writes YOLO labels for the visible ones.
#[derive(Parser, Debug)]
#[command(name = "synthetic_dataset")]
struct Args {
    /// YAML run configuration; missing keys keep their defaults
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Directory of background images
    #[arg(long = "hdri_path")]
    hdri_path: Option<PathBuf>,

    /// Directory laid out as <class>/<object>/*.obj
    #[arg(long = "obj_path")]
    obj_path: Option<PathBuf>,

    /// Where attempt_<N> folders are created
    #[arg(long = "output_path")]
    output_path: Option<PathBuf>,

    #[arg(long = "seed")]
    seed: Option<u64>,

    /// Number of backgrounds to use
    #[arg(long = "iteration")]
    iteration: Option<usize>,

    /// Object arrangements per background
    #[arg(long = "arrangement")]
    arrangement: Option<usize>,

    /// Pictures per arrangement
    #[arg(long = "num_pics")]
    num_pics: Option<usize>,

    /// Smallest visible share of an object's projected box that still gets a label
    #[arg(long = "visible_percentage")]
    visible_percentage: Option<f64>,

    /// Fraction of the configured resolution to render at, 1 is full size
    #[arg(long = "render_percentage")]
    render_percentage: Option<f64>,

    /// Per-sample ray cast occlusion instead of the instance mask (very slow)
    #[arg(long = "use_ray_cast")]
    use_ray_cast: bool,

    /// Compute labels without writing images, labels or the run configuration
    #[arg(long = "dry-run")]
    dry_run: bool,

    /// Copy every attempt's images and labels into combined_<output> afterwards
    #[arg(long = "combine")]
    combine: bool,
}

impl Args {
    fn into_cfg(self) -> Result<GenerationCfg> {
        let mut cfg = match &self.config {
            Some(path) => GenerationCfg::from_yaml_file(path)?,
            None => GenerationCfg::default(),
        };
        if let Some(v) = self.hdri_path {
            cfg.hdri_path = v;
        }
        if let Some(v) = self.obj_path {
            cfg.obj_path = v;
        }
        if let Some(v) = self.output_path {
            cfg.output_path = v;
        }
        if let Some(v) = self.seed {
            cfg.seed = v;
        }
        if let Some(v) = self.iteration {
            cfg.iterations = v;
        }
        if let Some(v) = self.arrangement {
            cfg.arrangements = v;
        }
        if let Some(v) = self.num_pics {
            cfg.pictures = v;
        }
        if let Some(v) = self.visible_percentage {
            cfg.visibility.visible_threshold = v;
        }
        if let Some(v) = self.render_percentage {
            cfg.render_percentage = (v * 100.0).round() as usize;
        }
        if self.use_ray_cast {
            cfg.visibility.occlusion = OcclusionStrategy::RayCast;
        }
        if self.dry_run {
            cfg.save_files = false;
        }
        Ok(cfg)
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let combine = args.combine;
    let cfg = args.into_cfg()?;
    let output_path = cfg.output_path.clone();

    let library = AssetLibrary::scan(&cfg.obj_path)?;
    let generator = cfg.finalize()?;
    let summary = generator.run(&library, &mut MaskPreviewRenderer)?;
    log::info!("output folder: {}", summary.folder.display());

    if combine && generator.cfg().save_files {
        let combined = default_combined_root(&output_path);
        let counts = combine_attempts(&output_path, &combined)?;
        log::info!("number of images: {}, number of labels: {}", counts.images, counts.labels);
    }
    Ok(())
}
