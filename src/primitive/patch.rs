//! Patch tessellation: bi-quadratic Bézier control meshes to triangles.

use crate::float_types::Real;
use crate::plane::PlaneSet;
use crate::primitive::{MapVertex, MergeGroup, ProcTri};
use crate::scene::MapPatch;
use nalgebra::{Point3, Vector3};
use std::sync::Arc;

/// Triangles smaller than this are dropped from the tessellation.
const MIN_PATCH_TRI_AREA: Real = 1e-4;

#[inline]
fn bezier<T>(a: T, b: T, c: T, t: Real) -> T
where
    T: std::ops::Mul<Real, Output = T> + std::ops::Add<Output = T>,
{
    let s = 1.0 - t;
    a * (s * s) + b * (2.0 * s * t) + c * (t * t)
}

/// Evaluate the sub-patch starting at control (`row`, `col`) at (`u`, `v`).
fn evaluate(patch: &MapPatch, row: usize, col: usize, u: Real, v: Real) -> (Point3<Real>, [Real; 2]) {
    let mut rows = [(Vector3::zeros(), Vector3::zeros()); 3];
    for (r, out) in rows.iter_mut().enumerate() {
        let c: [_; 3] = std::array::from_fn(|k| patch.control(row + r, col + k));
        let pos = bezier(c[0].pos.coords, c[1].pos.coords, c[2].pos.coords, u);
        let uv = bezier(
            Vector3::new(c[0].uv[0], c[0].uv[1], 0.0),
            Vector3::new(c[1].uv[0], c[1].uv[1], 0.0),
            Vector3::new(c[2].uv[0], c[2].uv[1], 0.0),
            u,
        );
        *out = (pos, uv);
    }
    let pos = bezier(rows[0].0, rows[1].0, rows[2].0, v);
    let uv = bezier(rows[0].1, rows[1].1, rows[2].1, v);
    (Point3::from(pos), [uv.x, uv.y])
}

/// Tessellate `patch` into smoothed triangles.
///
/// Each 3×3 sub-patch is subdivided `subdivisions` times in each direction
/// (the patch's own setting wins). `origin` is subtracted from every point.
/// Returns `None` when the control mesh is malformed or nothing is left.
pub fn tessellate(
    patch: &MapPatch,
    subdivisions: [usize; 2],
    origin: &Vector3<Real>,
    planes: &mut PlaneSet,
    merge_group: MergeGroup,
) -> Option<Vec<ProcTri>> {
    let (w, h) = (patch.width, patch.height);
    if w < 3 || h < 3 || w % 2 == 0 || h % 2 == 0 || patch.control.len() != w * h {
        return None;
    }
    let [sub_u, sub_v] = patch.subdivisions.unwrap_or(subdivisions).map(|s| s.max(1));
    let patches_u = (w - 1) / 2;
    let patches_v = (h - 1) / 2;
    let cols = patches_u * sub_u + 1;
    let rows = patches_v * sub_v + 1;

    let mut grid: Vec<(Point3<Real>, [Real; 2])> = Vec::with_capacity(cols * rows);
    for j in 0..rows {
        let pv = (j / sub_v).min(patches_v - 1);
        let v = (j - pv * sub_v) as Real / sub_v as Real;
        for i in 0..cols {
            let pu = (i / sub_u).min(patches_u - 1);
            let u = (i - pu * sub_u) as Real / sub_u as Real;
            let (pos, uv) = evaluate(patch, pv * 2, pu * 2, u, v);
            grid.push((pos - origin, uv));
        }
    }

    // smooth normals: area weighted face normals around each grid point
    let mut normals = vec![Vector3::<Real>::zeros(); grid.len()];
    let mut quads = Vec::with_capacity((cols - 1) * (rows - 1) * 2);
    for j in 0..rows - 1 {
        for i in 0..cols - 1 {
            let a = j * cols + i;
            let b = a + 1;
            let c = a + cols + 1;
            let d = a + cols;
            for tri in [[a, b, c], [a, c, d]] {
                let n = (grid[tri[1]].0 - grid[tri[0]].0).cross(&(grid[tri[2]].0 - grid[tri[0]].0));
                if n.norm() * 0.5 < MIN_PATCH_TRI_AREA {
                    continue;
                }
                for &k in &tri {
                    normals[k] += n;
                }
                quads.push(tri);
            }
        }
    }

    let material: Arc<str> = Arc::from(patch.material.as_str());
    let tris: Vec<ProcTri> = quads
        .into_iter()
        .filter_map(|tri| {
            let v: [MapVertex; 3] = std::array::from_fn(|k| {
                let (pos, uv) = grid[tri[k]];
                let normal = normals[tri[k]].try_normalize(Real::EPSILON).unwrap_or_else(Vector3::z);
                MapVertex::new(pos, normal, uv)
            });
            let normal = (v[1].pos - v[0].pos).cross(&(v[2].pos - v[0].pos)).try_normalize(Real::EPSILON)?;
            let plane_num = planes.intern(normal, normal.dot(&v[0].pos.coords));
            Some(ProcTri::new(material.clone(), merge_group, plane_num, v))
        })
        .collect();

    (!tris.is_empty()).then_some(tris)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::scene::PatchControl;

    /// A flat 3×3 patch covering [0, 64]² at z = 0.
    fn flat_patch() -> MapPatch {
        let control = (0..3)
            .flat_map(|r| {
                (0..3).map(move |c| PatchControl {
                    pos: Point3::new(c as Real * 32.0, r as Real * 32.0, 0.0),
                    uv: [c as Real * 0.5, r as Real * 0.5],
                })
            })
            .collect();
        MapPatch::new(3, 3, control, "textures/patch")
    }

    #[test]
    fn flat_patch_tessellates_into_grid() {
        let mut planes = PlaneSet::new();
        let tris = tessellate(&flat_patch(), [4, 4], &Vector3::zeros(), &mut planes, MergeGroup::NONE)
            .expect("valid patch");
        assert_eq!(tris.len(), 4 * 4 * 2);
        let area: Real = tris.iter().map(ProcTri::area).sum();
        assert!((area - 64.0 * 64.0).abs() < 1e-6);
        // all triangles are coplanar, so one plane pair is interned
        assert_eq!(planes.len(), 2);
        for tri in &tris {
            for v in &tri.v {
                assert!((v.normal - Vector3::z()).norm() < 1e-9);
                assert!((v.uv[0] - v.pos.x / 64.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn even_dimensions_are_rejected() {
        let mut patch = flat_patch();
        patch.width = 2;
        let mut planes = PlaneSet::new();
        assert!(tessellate(&patch, [4, 4], &Vector3::zeros(), &mut planes, MergeGroup::NONE).is_none());
    }
}
