use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::{bail, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use sophus::image::ImageSize;
use synthgen_core::Dataset;
use synthgen_dataset_writer::{
    asset_library::AssetLibrary,
    label_file::write_label_file,
    manifest::{FrameManifest, ManifestRow},
    output_layout::{background_name, AttemptLayout},
    run_config::RunConfigSnapshot,
    schedule::FrameSchedule,
};
use synthgen_sensor::{CameraPose, Projection};
use visbox::{format_records, VisibilityResolver};

use crate::{
    arrangement::{Arrangement, SceneArranger},
    config::GenerationCfg,
    renderer::{FrameRenderer, FrameScene},
};

const NO_BACKGROUND: &str = "no_background";
const BACKGROUND_EXTENSIONS: [&str; 2] = ["exr", "hdr"];

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub attempt: u32,
    pub frames: usize,
    pub labels: usize,
    pub folder: PathBuf,
}

pub struct Generator {
    cfg: GenerationCfg,
    resolver: VisibilityResolver,
}

impl GenerationCfg {
    pub fn finalize(self) -> Result<Generator> {
        self.validate()?;
        let resolver = self.visibility.clone().finalize()?;
        let (width, height) = self.image_size();
        log::info!(
            "seed {}, {} iterations x {} arrangements x {} pictures at {width}x{height}",
            self.seed,
            self.iterations,
            self.arrangements,
            self.pictures
        );
        Ok(Generator {
            cfg: self,
            resolver,
        })
    }
}

impl Generator {
    pub fn cfg(&self) -> &GenerationCfg {
        &self.cfg
    }

    pub fn run<R: FrameRenderer>(&self, library: &AssetLibrary, renderer: &mut R) -> Result<RunSummary> {
        let started = Instant::now();
        let cfg = &self.cfg;
        if library.is_empty() {
            bail!("no objects could be loaded from {}", cfg.obj_path.display());
        }
        let mut rng = StdRng::seed_from_u64(cfg.seed);

        let layout = AttemptLayout::next(&cfg.output_path, cfg.seed, cfg.save_files)?;
        let snapshot = if cfg.save_files {
            Some(RunConfigSnapshot::write(layout.folder(), layout.attempt(), cfg)?)
        } else {
            None
        };
        let mut manifest = if cfg.save_files {
            Some(FrameManifest::create(&layout.folder().join("frames.csv"))?)
        } else {
            None
        };

        let mut backgrounds = list_backgrounds(&cfg.hdri_path);
        let iterations = if backgrounds.is_empty() {
            log::warn!("no backgrounds in {}, rendering without", cfg.hdri_path.display());
            cfg.iterations
        } else {
            cfg.iterations.min(backgrounds.len())
        };
        let schedule = FrameSchedule::new(iterations, cfg.arrangements, cfg.pictures);

        let arranger = SceneArranger::new(cfg, library);
        let (width, height) = cfg.image_size();
        let mut camera = CameraPose::new(Projection::Perspective { fov: cfg.fov }, ImageSize::new(width, height));
        let light_energy = rng.gen_range(0..=cfg.max_light_energy);
        log::info!("light energy {light_energy}");

        let mut summary = RunSummary {
            attempt: layout.attempt(),
            folder: layout.folder().to_path_buf(),
            ..Default::default()
        };
        let mut background = NO_BACKGROUND.to_string();
        let mut arrangement = Arrangement {
            candidates: vec![],
            light_position: Default::default(),
        };

        for request in schedule.iter() {
            if request.starts_iteration() {
                background = pick_background(&mut backgrounds, &mut rng);
                log::info!("iteration {} with background {background}", request.iteration + 1);
            }
            if request.starts_arrangement() {
                arrangement = arranger.arrange(&mut rng);
                log::info!(
                    "arrangement {}: {} objects, {} targets, light at {:?}",
                    request.arrangement + 1,
                    arrangement.candidates.len(),
                    arrangement.target_count(),
                    arrangement.light_position
                );
            }
            if arrangement.candidates.is_empty() {
                log::warn!("arrangement {} is empty, frame skipped", request.arrangement + 1);
                continue;
            }

            arranger.viewpoint(&arrangement, &mut camera, &mut rng);
            let exposure = arranger.exposure(&mut rng);
            log::debug!(
                "frame {}: camera at {:?}, exposure {exposure:.3}",
                layout.frame_id(&request),
                camera.position
            );

            let occlusion = self.resolver.prepare_occlusion(&arrangement.candidates, &camera);
            let records = self.resolver.resolve(&arrangement.candidates, &camera, &occlusion);
            let lines = format_records(&records);
            summary.frames += 1;
            summary.labels += lines.len();

            if let Some(manifest) = manifest.as_mut() {
                let image_path = layout.image_path(&request, &background);
                let label_path = layout.label_path(&request, &background);
                renderer.render(
                    &FrameScene {
                        camera: &camera,
                        candidates: &arrangement.candidates,
                        occlusion: &occlusion,
                        exposure,
                        background: &background,
                        light_position: arrangement.light_position,
                        light_energy,
                    },
                    &image_path,
                )?;
                write_label_file(&label_path, &lines)?;
                manifest.append(&ManifestRow {
                    frame_id: layout.frame_id(&request),
                    image_path: relative(&image_path, layout.folder()),
                    label_path: relative(&label_path, layout.folder()),
                    label_count: lines.len(),
                    camera_x: camera.position.x,
                    camera_y: camera.position.y,
                    camera_z: camera.position.z,
                    background: background.clone(),
                    exposure,
                    light_x: arrangement.light_position.x,
                    light_y: arrangement.light_position.y,
                    light_z: arrangement.light_position.z,
                    light_energy,
                })?;
            }
            if let Some(mask) = occlusion.finish() {
                log::trace!("{} instances in the mask", mask.instances().len());
            }
        }

        if let Some(manifest) = manifest {
            manifest.finish()?;
        }
        let elapsed = started.elapsed();
        if let Some(snapshot) = snapshot {
            snapshot.append_elapsed(elapsed)?;
        }
        log::info!(
            "{} frames, {} labels written to {} in {:.2} seconds",
            summary.frames,
            summary.labels,
            summary.folder.display(),
            elapsed.as_secs_f64()
        );
        Ok(summary)
    }
}

/// Background images directly inside `dir`, sorted by name.
pub fn list_backgrounds(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return vec![];
    };
    let mut files: Vec<_> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| BACKGROUND_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
        })
        .collect();
    files.sort();
    files
}

/// Removes the picked background so it is never used twice.
fn pick_background(backgrounds: &mut Vec<PathBuf>, rng: &mut StdRng) -> String {
    if backgrounds.is_empty() {
        return NO_BACKGROUND.to_string();
    }
    let index = rng.gen_range(0..backgrounds.len());
    background_name(&backgrounds.remove(index))
}

fn relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base).unwrap_or(path).display().to_string()
}
