use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::{PointCoordinates, Real};

/// Which local-space points stand in for an object during visibility estimation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointSource {
    #[default]
    FullMesh,
    BoundingBoxCorners,
}

/// Read-only object geometry in local space.
///
/// `triangles` index into `vertices`; they are only needed when the object acts as an occluder.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    pub vertices: Vec<PointCoordinates>,
    pub triangles: Vec<[u32; 3]>,
}

impl Mesh {
    pub fn new(vertices: Vec<PointCoordinates>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            triangles,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Local-space axis aligned bounds as (min, max).
    pub fn bounds(&self) -> Option<(PointCoordinates, PointCoordinates)> {
        let first = self.vertices.first()?;
        let bounds = self
            .vertices
            .iter()
            .fold((*first, *first), |(min, max), v| (min.inf(v), max.sup(v)));
        Some(bounds)
    }

    /// The 8 corners of the local bounding box, empty for an empty mesh.
    pub fn bound_box_corners(&self) -> Vec<PointCoordinates> {
        let Some((min, max)) = self.bounds() else {
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

    pub fn points(&self, source: PointSource) -> Vec<PointCoordinates> {
        match source {
            PointSource::FullMesh => self.vertices.clone(),
            PointSource::BoundingBoxCorners => self.bound_box_corners(),
        }
    }

    /// Moves the origin to the centre of the bounding box.
    pub fn recentered(mut self) -> Self {
        if let Some((min, max)) = self.bounds() {
            let center = (min + max) * 0.5;
            for v in self.vertices.iter_mut() {
                *v -= center;
            }
        }
        self
    }

    /// Largest extent of the bounding box along any axis.
    pub fn max_dimension(&self) -> Real {
        self.bounds()
            .map(|(min, max)| (max - min).max())
            .unwrap_or(0.0)
    }

    /// Axis aligned box centred at the origin.
    pub fn cuboid(half_extents: PointCoordinates) -> Self {
        let vertices = (0..8)
            .map(|i| {
                PointCoordinates::new(
                    if i & 1 == 0 { -half_extents.x } else { half_extents.x },
                    if i & 2 == 0 { -half_extents.y } else { half_extents.y },
                    if i & 4 == 0 { -half_extents.z } else { half_extents.z },
                )
            })
            .collect();

        // -X, +X, -Y, +Y, -Z, +Z
        let quads = [
            [0, 2, 6, 4],
            [1, 5, 7, 3],
            [0, 4, 5, 1],
            [2, 3, 7, 6],
            [0, 1, 3, 2],
            [4, 6, 7, 5],
        ];
        let triangles = quads
            .iter()
            .flat_map(|[a, b, c, d]| [[*a, *b, *c], [*a, *c, *d]])
            .collect();

        Self::new(vertices, triangles)
    }

    pub fn cube(size: Real) -> Self {
        let h = size * 0.5;
        Self::cuboid(PointCoordinates::new(h, h, h))
    }

    /// Latitude/longitude sphere centred at the origin, poles on the Z axis.
    pub fn uv_sphere(radius: Real, segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);

        let mut vertices = vec![PointCoordinates::new(0.0, 0.0, radius)];
        for r in 1..rings {
            let theta = PI * r as Real / rings as Real;
            for s in 0..segments {
                let phi = 2.0 * PI * s as Real / segments as Real;
                vertices.push(PointCoordinates::new(
                    radius * theta.sin() * phi.cos(),
                    radius * theta.sin() * phi.sin(),
                    radius * theta.cos(),
                ));
            }
        }
        let bottom = vertices.len() as u32;
        vertices.push(PointCoordinates::new(0.0, 0.0, -radius));

        let idx = |r: u32, s: u32| 1 + (r - 1) * segments + s % segments;
        let mut triangles = vec![];
        for s in 0..segments {
            triangles.push([0, idx(1, s), idx(1, s + 1)]);
        }
        for r in 1..rings - 1 {
            for s in 0..segments {
                let (a, b) = (idx(r, s), idx(r, s + 1));
                let (c, d) = (idx(r + 1, s + 1), idx(r + 1, s));
                triangles.push([a, d, c]);
                triangles.push([a, c, b]);
            }
        }
        for s in 0..segments {
            triangles.push([bottom, idx(rings - 1, s + 1), idx(rings - 1, s)]);
        }

        Self::new(vertices, triangles)
    }
}
