//! Primitives extracted from scene entities: brushes with clipped face
//! windings, and patches tessellated into triangle soup.

use crate::aabb::Aabb;
use crate::float_types::{Real, tolerance};
use crate::plane::PlaneIndex;
use crate::winding::Winding;
use nalgebra::{Point3, Vector3};
use std::sync::Arc;

pub mod brush;
pub mod patch;

pub use brush::{ProcBrush, ProcFace, TextureProjection};

/// Index of a unified vertex produced by the T-junction pass.
pub type HashVertexId = usize;
/// Index of a vertex inside one group's optimization island.
pub type OptVertexId = usize;

/// Surfaces with different merge groups are never combined into one batch,
/// even when they are coplanar and share a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MergeGroup(pub u32);

impl MergeGroup {
    /// Freely mergeable with anything compatible.
    pub const NONE: MergeGroup = MergeGroup(0);
}

/// Hands out fresh merge group tags for one compile.
#[derive(Debug, Clone, Default)]
pub struct MergeGroups {
    last: u32,
}

impl MergeGroups {
    pub fn allocate(&mut self) -> MergeGroup {
        self.last += 1;
        MergeGroup(self.last)
    }
}

/// A render vertex: position, normal and texture coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapVertex {
    pub pos: Point3<Real>,
    pub normal: Vector3<Real>,
    pub uv: [Real; 2],
}

impl MapVertex {
    pub const fn new(pos: Point3<Real>, normal: Vector3<Real>, uv: [Real; 2]) -> Self {
        MapVertex { pos, normal, uv }
    }

    /// Linear interpolation between `self` and `other` by `t`.
    pub fn interpolate(&self, other: &MapVertex, t: Real) -> MapVertex {
        let normal = self.normal + (other.normal - self.normal) * t;
        MapVertex {
            pos: self.pos + (other.pos - self.pos) * t,
            normal: normal.try_normalize(Real::EPSILON).unwrap_or(self.normal),
            uv: [
                self.uv[0] + (other.uv[0] - self.uv[0]) * t,
                self.uv[1] + (other.uv[1] - self.uv[1]) * t,
            ],
        }
    }

    /// The vertex at barycentric position `weights` of triangle `v`.
    pub fn barycentric(v: &[MapVertex; 3], weights: [Real; 3], pos: Point3<Real>) -> MapVertex {
        let normal = v[0].normal * weights[0] + v[1].normal * weights[1] + v[2].normal * weights[2];
        MapVertex {
            pos,
            normal: normal.try_normalize(Real::EPSILON).unwrap_or(v[0].normal),
            uv: [
                v[0].uv[0] * weights[0] + v[1].uv[0] * weights[1] + v[2].uv[0] * weights[2],
                v[0].uv[1] * weights[0] + v[1].uv[1] * weights[1] + v[2].uv[1] * weights[2],
            ],
        }
    }
}

/// Chains of `ProcTri` are the general unit of processing after extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcTri {
    pub material: Arc<str>,
    pub merge_group: MergeGroup,
    pub plane_num: PlaneIndex,
    pub v: [MapVertex; 3],
    /// Set by the T-junction pass.
    pub hash_vert: [Option<HashVertexId>; 3],
    /// Set while a group is being optimized.
    pub opt_vert: [Option<OptVertexId>; 3],
}

impl ProcTri {
    pub const fn new(material: Arc<str>, merge_group: MergeGroup, plane_num: PlaneIndex, v: [MapVertex; 3]) -> Self {
        ProcTri {
            material,
            merge_group,
            plane_num,
            v,
            hash_vert: [None; 3],
            opt_vert: [None; 3],
        }
    }

    /// Cross product of the two edges leaving vertex 0.
    pub fn area_vector(&self) -> Vector3<Real> {
        (self.v[1].pos - self.v[0].pos).cross(&(self.v[2].pos - self.v[0].pos))
    }

    pub fn area(&self) -> Real {
        self.area_vector().norm() * 0.5
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(self.v.iter().map(|v| &v.pos))
    }

    pub fn winding(&self) -> Winding {
        Winding::new(self.v.iter().map(|v| v.pos).collect())
    }

    /// Barycentric weights of `p` (assumed to lie in the triangle's plane).
    pub fn barycentric_weights(&self, p: &Point3<Real>) -> [Real; 3] {
        let normal = self.area_vector();
        let denom = normal.norm_squared();
        if denom < Real::EPSILON {
            return [1.0, 0.0, 0.0];
        }
        let w0 = (self.v[2].pos - self.v[1].pos).cross(&(p - self.v[1].pos)).dot(&normal) / denom;
        let w1 = (self.v[0].pos - self.v[2].pos).cross(&(p - self.v[2].pos)).dot(&normal) / denom;
        [w0, w1, 1.0 - w0 - w1]
    }

    /// Fan triangulate `winding`, a piece of this triangle, interpolating the
    /// vertex attributes across it.
    pub fn fragment(&self, winding: &Winding) -> Vec<ProcTri> {
        let verts: Vec<MapVertex> = winding
            .points
            .iter()
            .map(|p| MapVertex::barycentric(&self.v, self.barycentric_weights(p), *p))
            .collect();
        winding
            .fan_triangles()
            .map(|[a, b, c]| ProcTri::new(self.material.clone(), self.merge_group, self.plane_num, [verts[a], verts[b], verts[c]]))
            .filter(|tri| tri.area() > tolerance())
            .collect()
    }
}

/// A primitive is either a brush or the triangles of a patch.
#[derive(Debug, Clone)]
pub enum ProcPrimitive {
    Brush(ProcBrush),
    Patch(Vec<ProcTri>),
}

impl ProcPrimitive {
    pub fn brush(&self) -> Option<&ProcBrush> {
        match self {
            ProcPrimitive::Brush(brush) => Some(brush),
            ProcPrimitive::Patch(_) => None,
        }
    }

    pub fn patch(&self) -> Option<&[ProcTri]> {
        match self {
            ProcPrimitive::Brush(_) => None,
            ProcPrimitive::Patch(tris) => Some(tris),
        }
    }
}
