//! Test support library
//! Room builders and helpers shared by the integration tests.
#![allow(dead_code)]

use nalgebra::{Point3, Vector3};
use procmap::bsp::{AxialBalancedStrategy, BspFace, BspTree};
use procmap::float_types::Real;
use procmap::plane::PlaneSet;
use procmap::primitive::{MergeGroups, ProcBrush};
use procmap::{DefaultMaterials, MapBrush, MapEntity, MapLight, Scene};

pub const WALL: &str = "textures/base_wall/lfwall27d";

/// Half size of the room interior.
pub const INNER: Real = 32.0;
/// Half size of the room including its walls.
pub const OUTER: Real = 40.0;

/// Quick helper to compare floating-point results with an acceptable tolerance.
pub fn approx_eq(a: Real, b: Real, eps: Real) -> bool {
    (a - b).abs() < eps
}

/// The six slabs of a hollow 64³ room centred on the origin, leaving out the
/// wall on `missing` (axis, +1/-1) if given.
pub fn room_brushes(missing: Option<(usize, Real)>) -> Vec<MapBrush> {
    let mut brushes = Vec::new();
    for axis in 0..3 {
        for side in [-1.0, 1.0] {
            if missing == Some((axis, side)) {
                continue;
            }
            let mut mins = Point3::new(-OUTER, -OUTER, -OUTER);
            let mut maxs = Point3::new(OUTER, OUTER, OUTER);
            if side > 0.0 {
                mins[axis] = INNER;
            } else {
                maxs[axis] = -INNER;
            }
            brushes.push(MapBrush::from_bounds(mins, maxs, WALL));
        }
    }
    brushes
}

pub fn world(brushes: Vec<MapBrush>) -> MapEntity {
    brushes
        .into_iter()
        .fold(MapEntity::new("worldspawn"), |entity, brush| entity.with_brush(brush))
}

pub fn room_light() -> MapLight {
    MapLight::point("light_1", Point3::origin(), Vector3::repeat(300.0))
}

pub fn sealed_room() -> Scene {
    Scene::new()
        .with_entity(world(room_brushes(None)))
        .with_light(room_light())
}

pub fn leaking_room() -> Scene {
    Scene::new()
        .with_entity(world(room_brushes(Some((0, 1.0)))))
        .with_light(room_light())
}

/// Brushes turned into a portalized tree with leaf contents filled in.
pub fn build_tree(brushes: &[MapBrush]) -> (BspTree, PlaneSet, Vec<ProcBrush>) {
    let mut planes = PlaneSet::new();
    let mut groups = MergeGroups::default();
    let proc_brushes: Vec<ProcBrush> = brushes
        .iter()
        .enumerate()
        .filter_map(|(num, b)| {
            ProcBrush::from_map_brush(b, 0, num, &Vector3::zeros(), &mut planes, &DefaultMaterials, &mut groups)
        })
        .collect();
    let faces: Vec<BspFace> = proc_brushes
        .iter()
        .flat_map(|b| b.sides.iter())
        .filter_map(|s| {
            s.winding.as_ref().map(|w| BspFace {
                plane_num: s.plane_num,
                winding: w.clone(),
            })
        })
        .collect();
    let mut tree = BspTree::build(faces, &planes, &AxialBalancedStrategy::default());
    tree.make_tree_portals(&planes);
    let refs: Vec<&ProcBrush> = proc_brushes.iter().collect();
    tree.filter_brushes(&refs, &planes);
    (tree, planes, proc_brushes)
}
