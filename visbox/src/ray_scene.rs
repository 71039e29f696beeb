//! Brute-force ray queries against world-space triangle geometry.
//!
//! Stands in for the host application's ray-intersection service: every candidate's mesh is
//! transformed to world space once per frame, each object keeps its own bounds so most rays are
//! rejected by a slab test before any triangle is touched.

use synthgen_core::{
    candidate::{Candidate, InstanceId},
    mesh::Mesh,
    transform::Transform,
    DirectionVector, PointCoordinates, Real,
};

const PARALLEL_EPS: Real = 1e-12;
const HIT_EPS: Real = 1e-9;

#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: PointCoordinates,
    /// Unit length.
    pub direction: DirectionVector,
}

impl Ray {
    /// `None` for a zero-length direction.
    pub fn new(origin: PointCoordinates, direction: DirectionVector) -> Option<Self> {
        let norm = direction.norm();
        if norm < PARALLEL_EPS {
            return None;
        }
        Some(Self {
            origin,
            direction: direction / norm,
        })
    }

    pub fn point_at(&self, t: Real) -> PointCoordinates {
        self.origin + self.direction * t
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub distance: Real,
    pub instance: InstanceId,
}

pub trait RayCaster {
    /// Nearest hit with `0 < distance <= max_distance`.
    fn cast(&self, ray: &Ray, max_distance: Real) -> Option<RayHit>;
}

struct SceneObject {
    instance: InstanceId,
    min: PointCoordinates,
    max: PointCoordinates,
    triangles: Vec<[PointCoordinates; 3]>,
}

#[derive(Default)]
pub struct TriangleScene {
    objects: Vec<SceneObject>,
}

impl TriangleScene {
    pub fn from_candidates(candidates: &[Candidate]) -> Self {
        let mut scene = Self::default();
        for candidate in candidates {
            scene.push(candidate.id, &candidate.mesh, &candidate.transform);
        }
        scene
    }

    /// Adds an occluder. Triangles with out-of-range indices are skipped.
    pub fn push(&mut self, instance: InstanceId, mesh: &Mesh, transform: &Transform) {
        let world: Vec<_> = mesh.vertices.iter().map(|v| transform.apply(v)).collect();
        let triangles: Vec<_> = mesh
            .triangles
            .iter()
            .filter_map(|[a, b, c]| {
                Some([
                    *world.get(*a as usize)?,
                    *world.get(*b as usize)?,
                    *world.get(*c as usize)?,
                ])
            })
            .collect();
        if triangles.len() != mesh.triangles.len() {
            log::warn!(
                "instance {instance}: skipped {} triangles with invalid indices",
                mesh.triangles.len() - triangles.len()
            );
        }
        let Some(first) = triangles.first().map(|t| t[0]) else {
            return;
        };

        let (min, max) = triangles
            .iter()
            .flatten()
            .fold((first, first), |(min, max), p| (min.inf(p), max.sup(p)));

        self.objects.push(SceneObject {
            instance,
            min,
            max,
            triangles,
        });
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.objects.iter().map(|o| o.triangles.len()).sum()
    }
}

impl RayCaster for TriangleScene {
    fn cast(&self, ray: &Ray, max_distance: Real) -> Option<RayHit> {
        let mut nearest: Option<RayHit> = None;

        for object in &self.objects {
            let limit = nearest.map_or(max_distance, |h| h.distance);
            if !ray_aabb(ray, &object.min, &object.max, limit) {
                continue;
            }
            for triangle in &object.triangles {
                if let Some(t) = ray_triangle(ray, triangle) {
                    if t <= max_distance && nearest.map_or(true, |h| t < h.distance) {
                        nearest = Some(RayHit {
                            distance: t,
                            instance: object.instance,
                        });
                    }
                }
            }
        }

        nearest
    }
}

/// Slab test; true when the ray enters the box before `max_distance`.
fn ray_aabb(ray: &Ray, min: &PointCoordinates, max: &PointCoordinates, max_distance: Real) -> bool {
    let mut t_min: Real = 0.0;
    let mut t_max = max_distance;

    for i in 0..3 {
        let d = ray.direction[i];
        let o = ray.origin[i];
        if d.abs() < PARALLEL_EPS {
            if o < min[i] || o > max[i] {
                return false;
            }
            continue;
        }
        let inv = 1.0 / d;
        let mut t0 = (min[i] - o) * inv;
        let mut t1 = (max[i] - o) * inv;
        if inv < 0.0 {
            std::mem::swap(&mut t0, &mut t1);
        }
        t_min = t_min.max(t0);
        t_max = t_max.min(t1);
        if t_min > t_max {
            return false;
        }
    }

    true
}

/// Möller–Trumbore, two sided. Returns the hit distance along the ray.
fn ray_triangle(ray: &Ray, [v0, v1, v2]: &[PointCoordinates; 3]) -> Option<Real> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let h = ray.direction.cross(&edge2);
    let a = edge1.dot(&h);
    if a.abs() < PARALLEL_EPS {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = f * s.dot(&h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(&edge1);
    let v = f * ray.direction.dot(&q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(&q);
    (t > HIT_EPS).then_some(t)
}
