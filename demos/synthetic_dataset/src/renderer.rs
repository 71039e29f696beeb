use std::{fs, path::Path};

use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use synthgen_core::{candidate::Candidate, PointCoordinates, Real};
use synthgen_sensor::CameraPose;
use visbox::{
    instance_mask::{InstanceMask, PassIndexTable},
    ray_scene::TriangleScene,
    FrameOcclusion,
};

/// Everything a renderer may need to draw one frame.
pub struct FrameScene<'a> {
    pub camera: &'a CameraPose,
    pub candidates: &'a [Candidate],
    pub occlusion: &'a FrameOcclusion,
    pub exposure: Real,
    pub background: &'a str,
    pub light_position: PointCoordinates,
    pub light_energy: u32,
}

/// Produces the picture for a frame. Blocks until the file is written.
pub trait FrameRenderer {
    fn render(&mut self, scene: &FrameScene<'_>, path: &Path) -> Result<()>;
}

/// Light energy at which objects are drawn at full brightness.
const FULL_LIGHT_ENERGY: Real = 50.0;

/// False-colour picture of the instance mask: one flat colour per object on a grey background
/// whose brightness follows the exposure. Object colours dim with the light energy.
#[derive(Default)]
pub struct MaskPreviewRenderer;

impl MaskPreviewRenderer {
    pub fn draw(&self, scene: &FrameScene<'_>) -> RgbImage {
        let rendered;
        let mask = match scene.occlusion.mask() {
            Some(mask) => mask,
            None => {
                let passes = PassIndexTable::assign(scene.candidates);
                rendered = InstanceMask::from_ray_casts(
                    scene.camera,
                    &TriangleScene::from_candidates(scene.candidates),
                    &passes,
                );
                &rendered
            }
        };

        let grey = (64.0 * scene.exposure).clamp(16.0, 224.0) as u8;
        let lit = 0.35 + 0.65 * (scene.light_energy as Real / FULL_LIGHT_ENERGY).min(1.0);
        RgbImage::from_fn(mask.width() as u32, mask.height() as u32, |x, y| {
            match mask.get(x as usize, y as usize) {
                0 => Rgb([grey, grey, grey]),
                pass => {
                    let Rgb(c) = pass_colour(pass);
                    Rgb(c.map(|v| (v as Real * lit).round() as u8))
                }
            }
        })
    }
}

impl FrameRenderer for MaskPreviewRenderer {
    fn render(&mut self, scene: &FrameScene<'_>, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        log::trace!(
            "preview {} on {}, light {} at {:?}",
            path.display(),
            scene.background,
            scene.light_energy,
            scene.light_position
        );
        self.draw(scene)
            .save(path)
            .with_context(|| format!("writing {}", path.display()))
    }
}

/// Evenly spread hues so neighbouring pass indices are easy to tell apart.
fn pass_colour(pass: u32) -> Rgb<u8> {
    let hue = (pass as Real * 0.618_033_988_75).fract() * 6.0;
    let sector = hue.floor() as u32;
    let f = hue.fract();
    let (r, g, b) = match sector {
        0 => (1.0, f, 0.0),
        1 => (1.0 - f, 1.0, 0.0),
        2 => (0.0, 1.0, f),
        3 => (0.0, 1.0 - f, 1.0),
        4 => (f, 0.0, 1.0),
        _ => (1.0, 0.0, 1.0 - f),
    };
    let channel = |v: Real| (55.0 + 200.0 * v) as u8;
    Rgb([channel(r), channel(g), channel(b)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use sophus::image::ImageSize;
    use std::sync::Arc;
    use synthgen_core::{mesh::Mesh, transform::Transform, PointCoordinates};
    use synthgen_sensor::Projection;
    use visbox::occlusion::NoOcclusion;

    #[test]
    fn preview_marks_object_pixels() {
        let mut camera = CameraPose::new(Projection::default(), ImageSize::new(48, 27))
            .at(PointCoordinates::new(0.0, 0.0, 10.0));
        camera.look_at(&PointCoordinates::zeros());
        let candidates = [Candidate::target(1, "cube", Arc::new(Mesh::cube(2.0)), Transform::identity())];
        let occlusion = FrameOcclusion::Unoccluded(NoOcclusion);
        let scene = FrameScene {
            camera: &camera,
            candidates: &candidates,
            occlusion: &occlusion,
            exposure: 1.0,
            background: "none",
            light_position: PointCoordinates::new(6.0, 0.0, 0.0),
            light_energy: 50,
        };

        let image = MaskPreviewRenderer.draw(&scene);
        assert_eq!(image.dimensions(), (48, 27));
        assert_eq!(*image.get_pixel(24, 13), pass_colour(1));
        assert_eq!(*image.get_pixel(0, 0), Rgb([64, 64, 64]));

        let dark = MaskPreviewRenderer.draw(&FrameScene { light_energy: 0, ..scene });
        let (Rgb(lit), Rgb(unlit)) = (pass_colour(1), *dark.get_pixel(24, 13));
        assert!(lit.iter().zip(unlit).all(|(l, u)| u < *l));
        assert_eq!(*dark.get_pixel(0, 0), Rgb([64, 64, 64]));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("images/frame.jpg");
        MaskPreviewRenderer.render(&scene, &path).unwrap();
        assert_eq!(image::image_dimensions(&path).unwrap(), (48, 27));
    }

    #[test]
    fn colours_differ_between_passes() {
        assert_ne!(pass_colour(1), pass_colour(2));
        assert_ne!(pass_colour(2), pass_colour(3));
    }
}
