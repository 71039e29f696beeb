use std::collections::{BTreeMap, BTreeSet};

use synthgen_core::{
    candidate::{Candidate, InstanceId},
    Camera, Real,
};

use crate::{
    bbox::BoundingBox2D,
    ray_scene::{Ray, RayCaster},
};

/// Pass index 0 marks "no object of interest".
pub type PassIndex = u32;

/// Unique non-zero pass indices for the candidates of one frame.
#[derive(Clone, Debug, Default)]
pub struct PassIndexTable {
    by_instance: BTreeMap<InstanceId, PassIndex>,
}

impl PassIndexTable {
    /// Numbers candidates 1, 2, ... in the given order.
    pub fn assign(candidates: &[Candidate]) -> Self {
        let mut table = Self::default();
        for candidate in candidates {
            if table.by_instance.contains_key(&candidate.id) {
                continue;
            }
            let pass = table.by_instance.len() as PassIndex + 1;
            table.by_instance.insert(candidate.id, pass);
        }
        table
    }

    pub fn pass_index(&self, instance: InstanceId) -> PassIndex {
        self.by_instance.get(&instance).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.by_instance.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_instance.is_empty()
    }

    /// Returns every object to pass index 0.
    pub fn reset(&mut self) {
        self.by_instance.clear();
    }
}

/// Per-pixel pass index image, row 0 at the top of the picture.
#[derive(Clone, Debug, PartialEq)]
pub struct InstanceMask {
    width: usize,
    height: usize,
    pixels: Vec<PassIndex>,
}

impl InstanceMask {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    /// Renders the mask by casting one ray through every pixel centre.
    pub fn from_ray_casts<C, R>(camera: &C, scene: &R, passes: &PassIndexTable) -> Self
    where
        C: Camera,
        R: RayCaster,
    {
        let mut mask = Self::new(camera.cols(), camera.rows());
        for row in 0..mask.height {
            for col in 0..mask.width {
                let (x, y) = mask.pixel_center(col, row);
                let (origin, direction) = camera.view_ray(x, y);
                let Some(ray) = Ray::new(origin, direction) else {
                    continue;
                };
                if let Some(hit) = scene.cast(&ray, Real::INFINITY) {
                    mask.set(col, row, passes.pass_index(hit.instance));
                }
            }
        }
        log::debug!(
            "instance mask {}x{} rendered, {} instances visible",
            mask.width,
            mask.height,
            mask.instances().len()
        );
        mask
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, col: usize, row: usize) -> PassIndex {
        if col >= self.width || row >= self.height {
            return 0;
        }
        self.pixels[row * self.width + col]
    }

    pub fn set(&mut self, col: usize, row: usize, pass: PassIndex) {
        if col < self.width && row < self.height {
            self.pixels[row * self.width + col] = pass;
        }
    }

    /// Normalized camera-view coordinates (y up) of a pixel centre.
    pub fn pixel_center(&self, col: usize, row: usize) -> (Real, Real) {
        (
            (col as Real + 0.5) / self.width as Real,
            1.0 - (row as Real + 0.5) / self.height as Real,
        )
    }

    /// Pixel containing a normalized camera-view position, `None` outside the image.
    pub fn pixel_of(&self, x: Real, y: Real) -> Option<(usize, usize)> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        if !(0.0..=1.0).contains(&x) || !(0.0..=1.0).contains(&y) {
            return None;
        }
        let col = ((x * self.width as Real) as usize).min(self.width - 1);
        let row = (((1.0 - y) * self.height as Real) as usize).min(self.height - 1);
        Some((col, row))
    }

    /// True when any pixel within `radius` (Chebyshev) of `(x, y)` stores `pass`.
    pub fn contains_near(&self, pass: PassIndex, x: Real, y: Real, radius: usize) -> bool {
        if pass == 0 {
            return false;
        }
        let Some((col, row)) = self.pixel_of(x, y) else {
            return false;
        };
        let rows = row.saturating_sub(radius)..=(row + radius).min(self.height - 1);
        rows.into_iter().any(|r| {
            let cols = col.saturating_sub(radius)..=(col + radius).min(self.width - 1);
            cols.into_iter().any(|c| self.get(c, r) == pass)
        })
    }

    pub fn instances(&self) -> BTreeSet<PassIndex> {
        self.pixels.iter().copied().filter(|p| *p != 0).collect()
    }

    /// Box covering every pixel of `pass`, in camera-view convention.
    pub fn pixel_bounds(&self, pass: PassIndex) -> Option<BoundingBox2D> {
        if pass == 0 {
            return None;
        }
        let mut extent: Option<(usize, usize, usize, usize)> = None;
        for (i, p) in self.pixels.iter().enumerate() {
            if *p != pass {
                continue;
            }
            let (col, row) = (i % self.width, i / self.width);
            extent = Some(match extent {
                None => (col, row, col, row),
                Some((c0, r0, c1, r1)) => (c0.min(col), r0.min(row), c1.max(col), r1.max(row)),
            });
        }
        let (c0, r0, c1, r1) = extent?;
        let (w, h) = (self.width as Real, self.height as Real);
        Some(BoundingBox2D::new(
            c0 as Real / w,
            1.0 - (r1 + 1) as Real / h,
            (c1 + 1) as Real / w,
            1.0 - r0 as Real / h,
        ))
    }
}
