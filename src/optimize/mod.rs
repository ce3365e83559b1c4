//! Grouping of area triangles into optimize groups, T-junction repair and
//! per-group re-triangulation.

use crate::aabb::Aabb;
use crate::float_types::Real;
use crate::light::{LightIndex, MAX_GROUP_LIGHTS};
use crate::plane::{PlaneIndex, PlaneSet};
use crate::primitive::{MergeGroup, ProcTri};
use arrayvec::ArrayVec;
use nalgebra::Vector3;
use std::sync::Arc;

pub mod island;
pub mod tjunction;

pub use island::{IslandOutcome, optimize_group};
pub use tjunction::{TjunctionStats, fix_tjunctions};

/// Triangles of one area that may be drawn and optimized together.
///
/// Every group holds triangles of one plane. Smoothed groups (patches) are
/// kept apart from flat ones and are never re-triangulated.
#[derive(Debug, Clone)]
pub struct OptimizeGroup {
    pub plane_num: PlaneIndex,
    pub area: usize,
    pub material: Arc<str>,
    pub smoothed: bool,
    pub merge_group: MergeGroup,
    pub bounds: Aabb,
    pub lights: ArrayVec<LightIndex, MAX_GROUP_LIGHTS>,
    /// Projection axes onto the group plane.
    pub axis: [Vector3<Real>; 2],
    pub tri_list: Vec<ProcTri>,
    pub regenerated_tris: Vec<ProcTri>,
    /// `regenerated_tris` replaces `tri_list`.
    pub optimized: bool,
}

impl OptimizeGroup {
    fn new(tri: &ProcTri, area: usize, smoothed: bool, planes: &PlaneSet) -> Self {
        let (u, v) = planes[tri.plane_num].basis();
        OptimizeGroup {
            plane_num: tri.plane_num,
            area,
            material: tri.material.clone(),
            smoothed,
            merge_group: tri.merge_group,
            bounds: Aabb::empty(),
            lights: ArrayVec::new(),
            axis: [u, v],
            tri_list: Vec::new(),
            regenerated_tris: Vec::new(),
            optimized: false,
        }
    }

    fn accepts(&self, tri: &ProcTri, smoothed: bool) -> bool {
        self.smoothed == smoothed
            && self.merge_group == tri.merge_group
            && self.material == tri.material
            && self.plane_num == tri.plane_num
    }

    /// The triangles to draw.
    pub fn output_tris(&self) -> &[ProcTri] {
        if self.optimized { &self.regenerated_tris } else { &self.tri_list }
    }

    pub fn recompute_bounds(&mut self) {
        let mut bounds = Aabb::empty();
        for tri in &self.tri_list {
            bounds.add_aabb(&tri.bounds());
        }
        self.bounds = bounds;
    }
}

/// An area of an entity: its optimize groups.
#[derive(Debug, Clone, Default)]
pub struct ProcArea {
    pub groups: Vec<OptimizeGroup>,
}

impl ProcArea {
    pub fn num_tris(&self) -> usize {
        self.groups.iter().map(|g| g.output_tris().len()).sum()
    }

    /// Drop groups left without triangles.
    pub fn remove_empty_groups(&mut self) {
        self.groups.retain(|g| !g.tri_list.is_empty());
    }
}

/// File `tris` into the matching groups of `area`, creating groups as needed.
pub fn add_tri_list_to_area(area: &mut ProcArea, area_num: usize, tris: Vec<ProcTri>, smoothed: bool, planes: &PlaneSet) {
    for tri in tris {
        let index = match area.groups.iter().position(|g| g.accepts(&tri, smoothed)) {
            Some(index) => index,
            None => {
                area.groups.push(OptimizeGroup::new(&tri, area_num, smoothed, planes));
                area.groups.len() - 1
            },
        };
        let group = &mut area.groups[index];
        group.bounds.add_aabb(&tri.bounds());
        group.tri_list.push(tri);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::primitive::MapVertex;
    use nalgebra::Point3;

    fn tri(planes: &mut PlaneSet, material: &str, z: Real) -> ProcTri {
        let plane_num = planes.intern(Vector3::z(), z);
        let n = Vector3::z();
        ProcTri::new(
            Arc::from(material),
            MergeGroup::NONE,
            plane_num,
            [
                MapVertex::new(Point3::new(0.0, 0.0, z), n, [0.0, 0.0]),
                MapVertex::new(Point3::new(1.0, 0.0, z), n, [1.0, 0.0]),
                MapVertex::new(Point3::new(0.0, 1.0, z), n, [0.0, 1.0]),
            ],
        )
    }

    #[test]
    fn groups_split_by_plane_and_material() {
        let mut planes = PlaneSet::new();
        let tris = vec![
            tri(&mut planes, "a", 0.0),
            tri(&mut planes, "a", 0.0),
            tri(&mut planes, "b", 0.0),
            tri(&mut planes, "a", 4.0),
        ];
        let mut area = ProcArea::default();
        add_tri_list_to_area(&mut area, 0, tris, false, &planes);
        assert_eq!(area.groups.len(), 3);
        assert_eq!(area.groups[0].tri_list.len(), 2);
        assert_eq!(area.num_tris(), 4);
    }

    #[test]
    fn smoothed_groups_split_by_plane() {
        let mut planes = PlaneSet::new();
        let tris = vec![
            tri(&mut planes, "curve", 0.0),
            tri(&mut planes, "curve", 4.0),
            tri(&mut planes, "curve", 0.0),
        ];
        let mut area = ProcArea::default();
        add_tri_list_to_area(&mut area, 0, tris, true, &planes);
        assert_eq!(area.groups.len(), 2);
        assert!(area.groups.iter().all(|g| g.smoothed));
        assert_eq!(area.groups[0].tri_list.len(), 2);
        assert_ne!(area.groups[0].plane_num, area.groups[1].plane_num);
    }
}
