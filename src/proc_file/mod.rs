//! The compiled map: everything the compiler produces, and its text format.

use crate::aabb::Aabb;
use crate::bsp::{BspTree, InterAreaPortal, LeakPath};
use crate::float_types::Real;
use crate::light::ProcLight;
use crate::optimize::ProcArea;
use crate::plane::PlaneSet;
use crate::primitive::ProcPrimitive;
use nalgebra::Point3;

pub mod reader;
pub mod writer;

pub use reader::ProcSummary;

/// One compiled entity.
#[derive(Debug, Clone)]
pub struct ProcEntity {
    pub entity_num: usize,
    pub name: String,
    pub classname: String,
    pub origin: Point3<Real>,
    pub primitives: Vec<ProcPrimitive>,
    pub tree: BspTree,
    pub num_areas: usize,
    pub areas: Vec<ProcArea>,
}

impl ProcEntity {
    pub fn num_tris(&self) -> usize {
        self.areas.iter().map(ProcArea::num_tris).sum()
    }

    pub fn num_groups(&self) -> usize {
        self.areas.iter().map(|a| a.groups.len()).sum()
    }

    pub fn brushes(&self) -> impl Iterator<Item = &crate::primitive::ProcBrush> {
        self.primitives.iter().filter_map(ProcPrimitive::brush)
    }
}

/// The root of a compiled map.
#[derive(Debug, Clone, Default)]
pub struct ProcFile {
    pub entities: Vec<ProcEntity>,
    pub planes: PlaneSet,
    pub lights: Vec<ProcLight>,
    pub inter_area_portals: Vec<InterAreaPortal>,
    pub bounds: Aabb,
    pub num_portals: usize,
    pub num_patches: usize,
    pub num_world_brushes: usize,
    pub num_world_tri_surfs: usize,
    pub leak: Option<LeakPath>,
}

impl ProcFile {
    /// File extension of compiled maps.
    pub const EXTENSION: &'static str = "proc";
    /// Format version written in the header.
    pub const VERSION: u32 = 3;
    /// First token of every compiled map.
    pub const HEADER: &'static str = "compiledMapFile";

    pub fn has_leak(&self) -> bool {
        self.leak.is_some()
    }

    pub fn world(&self) -> Option<&ProcEntity> {
        self.entities.first().filter(|e| e.entity_num == 0)
    }

    pub fn num_areas(&self) -> usize {
        self.world().map_or(0, |w| w.num_areas)
    }
}
