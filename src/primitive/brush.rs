//! Brush faces to windings, and windings to triangles.

use crate::aabb::Aabb;
use crate::float_types::{CLIP_EPSILON, MAX_WORLD_COORD, MAX_WORLD_SIZE, MIN_WORLD_COORD, Real, tolerance};
use crate::material::{MaterialInfo, MaterialLookup};
use crate::plane::{Plane, PlaneIndex, PlaneSet};
use crate::primitive::{MapVertex, MergeGroup, MergeGroups, ProcTri};
use crate::scene::MapBrush;
use crate::winding::Winding;
use nalgebra::{Point3, Vector3};
use std::sync::Arc;

/// One side of a compiled brush.
#[derive(Debug, Clone)]
pub struct ProcFace {
    pub plane_num: PlaneIndex,
    pub material: Arc<str>,
    pub info: MaterialInfo,
    pub texture_matrix: [[Real; 3]; 2],
    /// The face polygon bounded by the other sides; `None` if clipped away.
    pub winding: Option<Winding>,
    pub merge_group: MergeGroup,
}

/// A convex volume with its faces already clipped into windings.
#[derive(Debug, Clone)]
pub struct ProcBrush {
    pub entity_num: usize,
    pub brush_num: usize,
    pub sides: Vec<ProcFace>,
    pub bounds: Aabb,
    /// Any side uses an opaque material.
    pub opaque: bool,
    /// Any side uses an area portal material.
    pub area_portal: bool,
}

impl ProcBrush {
    /// Build the face windings of `brush`, interning its planes.
    ///
    /// `origin` is subtracted from every plane so the result is in entity space.
    /// Returns `None` for degenerate brushes (opposite sides sharing a plane,
    /// fewer than four sides with a surface, or unbounded volumes).
    pub fn from_map_brush(
        brush: &MapBrush,
        entity_num: usize,
        brush_num: usize,
        origin: &Vector3<Real>,
        planes: &mut PlaneSet,
        materials: &dyn MaterialLookup,
        merge_groups: &mut MergeGroups,
    ) -> Option<ProcBrush> {
        let mut sides: Vec<ProcFace> = Vec::with_capacity(brush.sides.len());
        for side in &brush.sides {
            let w = side.plane.w - side.plane.normal.dot(origin);
            let plane_num = planes.intern(side.plane.normal, w);

            if sides.iter().any(|s| s.plane_num == plane_num) {
                tracing::debug!(entity_num, brush_num, "duplicate brush side plane removed");
                continue;
            }
            if sides.iter().any(|s| s.plane_num == PlaneSet::opposite(plane_num)) {
                tracing::debug!(entity_num, brush_num, "brush has mirrored sides");
                return None;
            }

            let info = materials.material_info(&side.material);
            let merge_group = if info.discrete { merge_groups.allocate() } else { MergeGroup::NONE };
            sides.push(ProcFace {
                plane_num,
                material: Arc::from(side.material.as_str()),
                info,
                texture_matrix: side.texture_matrix,
                winding: None,
                merge_group,
            });
        }

        let mut proc_brush = ProcBrush {
            entity_num,
            brush_num,
            opaque: sides.iter().any(|s| s.info.opaque),
            area_portal: sides.iter().any(|s| s.info.area_portal),
            sides,
            bounds: Aabb::empty(),
        };
        if proc_brush.create_windings(planes) {
            Some(proc_brush)
        } else {
            None
        }
    }

    /// Clip every side's base winding by the half-spaces of all other sides.
    fn create_windings(&mut self, planes: &PlaneSet) -> bool {
        let side_planes: Vec<Plane> = self.sides.iter().map(|s| planes[s.plane_num]).collect();
        for (i, side) in self.sides.iter_mut().enumerate() {
            let mut w = Some(Winding::base_for_plane(&side_planes[i], MAX_WORLD_SIZE));
            for (j, other) in side_planes.iter().enumerate() {
                if i == j {
                    continue;
                }
                w = match w {
                    Some(w) => w.chop(&other.flipped(), CLIP_EPSILON),
                    None => break,
                };
            }
            side.winding = w;
        }
        self.bound()
    }

    fn bound(&mut self) -> bool {
        let mut bounds = Aabb::empty();
        let mut surfaces = 0;
        for w in self.sides.iter().filter_map(|s| s.winding.as_ref()) {
            surfaces += 1;
            for p in &w.points {
                bounds.add_point(p);
            }
        }
        self.bounds = bounds;
        surfaces >= 4
            && bounds.is_valid()
            && (0..3).all(|i| bounds.mins[i] > MIN_WORLD_COORD && bounds.maxs[i] < MAX_WORLD_COORD)
    }

    /// The outward planes of every side.
    pub fn planes<'a>(&'a self, planes: &'a PlaneSet) -> impl Iterator<Item = &'a Plane> + 'a {
        self.sides.iter().map(move |s| &planes[s.plane_num])
    }

    /// Intersect `winding` with this brush's volume.
    pub fn clip_winding(&self, winding: &Winding, planes: &PlaneSet) -> Option<Winding> {
        winding.clip_to_brush(self.planes(planes))
    }

    /// `true` if `point` is inside the brush by more than `margin`.
    pub fn contains_point(&self, point: &Point3<Real>, planes: &PlaneSet, margin: Real) -> bool {
        self.planes(planes).all(|p| p.distance(point) < -margin)
    }
}

/// Texture projection of a brush face: `uv = (s·p + s_offset, t·p + t_offset)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureProjection {
    pub s: Vector3<Real>,
    pub s_offset: Real,
    pub t: Vector3<Real>,
    pub t_offset: Real,
}

impl TextureProjection {
    pub fn new(normal: &Vector3<Real>, texture_matrix: &[[Real; 3]; 2]) -> Self {
        let (tex_s, tex_t) = texture_axis_base(normal);
        let m = texture_matrix;
        TextureProjection {
            s: tex_s * m[0][0] + tex_t * m[0][1],
            s_offset: m[0][2],
            t: tex_s * m[1][0] + tex_t * m[1][1],
            t_offset: m[1][2],
        }
    }

    pub fn uv(&self, p: &Point3<Real>) -> [Real; 2] {
        [
            self.s.dot(&p.coords) + self.s_offset,
            self.t.dot(&p.coords) + self.t_offset,
        ]
    }
}

/// The two texture axes of a plane with the given normal.
pub fn texture_axis_base(normal: &Vector3<Real>) -> (Vector3<Real>, Vector3<Real>) {
    let n = normal.map(|c| if c.abs() < 1e-6 { 0.0 } else { c });
    let rot_y = -n.z.atan2((n.y * n.y + n.x * n.x).sqrt());
    let rot_z = n.y.atan2(n.x);
    let tex_s = Vector3::new(-rot_z.sin(), rot_z.cos(), 0.0);
    // the T axis runs along -Z
    let tex_t = Vector3::new(-rot_y.sin() * rot_z.cos(), -rot_y.sin() * rot_z.sin(), -rot_y.cos());
    (tex_s, tex_t)
}

/// Fan-triangulate a fragment of `face` lying on `plane`.
pub fn winding_to_tris(winding: &Winding, face: &ProcFace, plane: &Plane) -> Vec<ProcTri> {
    let projection = TextureProjection::new(&plane.normal, &face.texture_matrix);
    let verts: Vec<MapVertex> = winding
        .points
        .iter()
        .map(|p| MapVertex::new(*p, plane.normal, projection.uv(p)))
        .collect();
    winding
        .fan_triangles()
        .map(|[a, b, c]| {
            ProcTri::new(
                face.material.clone(),
                face.merge_group,
                face.plane_num,
                [verts[a], verts[b], verts[c]],
            )
        })
        .filter(|tri| tri.area() > tolerance())
        .collect()
}
