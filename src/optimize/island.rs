//! Re-triangulation of a coplanar group: trace the outline of its triangles,
//! drop vertices that do not shape it, and ear clip what is left.

use crate::float_types::Real;
use crate::optimize::{OptimizeGroup, ProcArea};
use crate::primitive::{HashVertexId, MapVertex, OptVertexId, ProcTri};
use geo::{Area, Contains, Coord, LineString, Point, Polygon, TriangulateEarcut};
use hashbrown::{HashMap, HashSet};

/// A boundary vertex closer than this to the line through its neighbours is
/// colinear.
const COLINEAR_TOLERANCE: Real = 1e-3;
/// Smallest 2D area a group or loop may have.
const MIN_ISLAND_AREA: Real = 1e-4;
/// Largest texture coordinate mismatch at a shared vertex.
const UV_TOLERANCE: Real = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IslandOutcome {
    /// Smoothed or empty groups are left alone.
    Skipped,
    /// The original triangles were kept.
    Kept(&'static str),
    Optimized { before: usize, after: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum VertexKey {
    Hash(HashVertexId),
    Position([u64; 3]),
}

struct OptVertex {
    vertex: MapVertex,
    hash: Option<HashVertexId>,
    coord: [Real; 2],
}

fn cross2(o: [Real; 2], a: [Real; 2], b: [Real; 2]) -> Real {
    (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
}

fn loop_polygon(ring: &[OptVertexId], verts: &[OptVertex]) -> Polygon<Real> {
    let coords = ring.iter().map(|&id| {
        let [x, y] = verts[id].coord;
        Coord { x, y }
    });
    Polygon::new(coords.collect::<LineString<Real>>(), Vec::new())
}

/// Hash vertices used by more than one group of the entity.
pub fn shared_vertices(areas: &[ProcArea]) -> HashSet<HashVertexId> {
    let mut owner: HashMap<HashVertexId, usize> = HashMap::new();
    let mut shared = HashSet::new();
    let groups = areas.iter().flat_map(|a| a.groups.iter());
    for (group_index, group) in groups.enumerate() {
        for id in group.tri_list.iter().flat_map(|t| t.hash_vert.iter().flatten()) {
            let first = *owner.entry(*id).or_insert(group_index);
            if first != group_index {
                shared.insert(*id);
            }
        }
    }
    shared
}

/// Replace the triangles of a non-smoothed group by an ear clipped outline
/// when that needs no more triangles and covers the same area.
pub fn optimize_group(group: &mut OptimizeGroup, shared: &HashSet<HashVertexId>) -> IslandOutcome {
    group.optimized = false;
    group.regenerated_tris.clear();
    if group.smoothed || group.tri_list.is_empty() {
        return IslandOutcome::Skipped;
    }
    match retriangulate(group, shared) {
        Ok(tris) if tris.len() <= group.tri_list.len() => {
            let before = group.tri_list.len();
            let after = tris.len();
            group.regenerated_tris = tris;
            group.optimized = true;
            IslandOutcome::Optimized { before, after }
        },
        Ok(_) => IslandOutcome::Kept("more triangles than the original"),
        Err(reason) => {
            tracing::trace!(material = &*group.material, reason, "group kept as is");
            IslandOutcome::Kept(reason)
        },
    }
}

fn retriangulate(group: &mut OptimizeGroup, shared: &HashSet<HashVertexId>) -> Result<Vec<ProcTri>, &'static str> {
    let [u_axis, v_axis] = group.axis;

    // optimization vertices, one per hash vertex (or exact position)
    let mut verts: Vec<OptVertex> = Vec::new();
    let mut lookup: HashMap<VertexKey, OptVertexId> = HashMap::new();
    for tri in &mut group.tri_list {
        for i in 0..3 {
            let vertex = tri.v[i];
            let hash = tri.hash_vert[i];
            let key = match hash {
                Some(id) => VertexKey::Hash(id),
                None => VertexKey::Position(vertex.pos.coords.map(|c| c.to_bits() as u64).into()),
            };
            let id = *lookup.entry(key).or_insert_with(|| {
                verts.push(OptVertex {
                    vertex,
                    hash,
                    coord: [vertex.pos.coords.dot(&u_axis), vertex.pos.coords.dot(&v_axis)],
                });
                verts.len() - 1
            });
            let known = &verts[id].vertex;
            if (known.uv[0] - vertex.uv[0]).abs() > UV_TOLERANCE || (known.uv[1] - vertex.uv[1]).abs() > UV_TOLERANCE {
                return Err("texture seam");
            }
            tri.opt_vert[i] = Some(id);
        }
    }

    // directed edges of every triangle with area
    let mut edges: HashSet<(OptVertexId, OptVertexId)> = HashSet::new();
    let mut original_area = 0.0;
    for tri in &group.tri_list {
        let ids = tri.opt_vert.map(|id| id.unwrap_or_default());
        let area = cross2(verts[ids[0]].coord, verts[ids[1]].coord, verts[ids[2]].coord) * 0.5;
        if area < -MIN_ISLAND_AREA {
            return Err("triangle faces away from the plane");
        }
        if area <= MIN_ISLAND_AREA {
            continue;
        }
        original_area += area;
        for i in 0..3 {
            if !edges.insert((ids[i], ids[(i + 1) % 3])) {
                return Err("non-manifold edge");
            }
        }
    }
    if original_area <= MIN_ISLAND_AREA {
        return Err("no area");
    }

    // boundary edges have no twin
    let mut next: HashMap<OptVertexId, OptVertexId> = HashMap::new();
    for &(a, b) in &edges {
        if !edges.contains(&(b, a)) && next.insert(a, b).is_some() {
            return Err("pinched outline");
        }
    }

    let mut starts: Vec<OptVertexId> = next.keys().copied().collect();
    starts.sort_unstable();
    let mut visited: HashSet<OptVertexId> = HashSet::new();
    let mut loops: Vec<Vec<OptVertexId>> = Vec::new();
    for start in starts {
        if visited.contains(&start) {
            continue;
        }
        let mut ring = Vec::new();
        let mut current = start;
        loop {
            if !visited.insert(current) {
                return Err("tangled outline");
            }
            ring.push(current);
            current = *next.get(&current).ok_or("open outline")?;
            if current == start {
                break;
            }
        }
        remove_colinear(&mut ring, &verts, shared);
        if ring.len() < 3 {
            return Err("collapsed outline");
        }
        loops.push(ring);
    }

    // outer loops wind counter-clockwise, holes clockwise
    let mut outers: Vec<(Vec<OptVertexId>, Polygon<Real>, Vec<Vec<OptVertexId>>)> = Vec::new();
    let mut holes: Vec<Vec<OptVertexId>> = Vec::new();
    for ring in loops {
        let outline = loop_polygon(&ring, &verts);
        let area = outline.signed_area();
        if area.abs() <= MIN_ISLAND_AREA {
            return Err("degenerate outline");
        }
        if area > 0.0 {
            outers.push((ring, outline, Vec::new()));
        } else {
            holes.push(ring);
        }
    }
    for hole in holes {
        let [x, y] = verts[hole[0]].coord;
        let corner = Point::new(x, y);
        let owner = outers
            .iter()
            .enumerate()
            .filter(|(_, (_, outline, _))| outline.contains(&corner))
            .min_by(|(_, (_, a, _)), (_, (_, b, _))| a.unsigned_area().total_cmp(&b.unsigned_area()))
            .map(|(index, _)| index)
            .ok_or("hole outside every outline")?;
        outers[owner].2.push(hole);
    }

    let mut tris = Vec::new();
    let mut new_area = 0.0;
    for (outer, _, holes) in &outers {
        for [a, b, c] in earcut(outer, holes, &verts)? {
            let area = cross2(verts[a].coord, verts[b].coord, verts[c].coord) * 0.5;
            let (b, c) = if area < 0.0 { (c, b) } else { (b, c) };
            new_area += area.abs();
            let ids = [a, b, c];
            let mut tri = ProcTri::new(
                group.material.clone(),
                group.merge_group,
                group.plane_num,
                ids.map(|id| verts[id].vertex),
            );
            tri.hash_vert = ids.map(|id| verts[id].hash);
            tri.opt_vert = ids.map(Some);
            tris.push(tri);
        }
    }

    if (new_area - original_area).abs() > 1e-3 * original_area.max(1.0) {
        return Err("area changed");
    }
    Ok(tris)
}

/// Drop boundary vertices lying on the segment between their neighbours,
/// unless another group uses them.
fn remove_colinear(ring: &mut Vec<OptVertexId>, verts: &[OptVertex], shared: &HashSet<HashVertexId>) {
    let removable = |id: OptVertexId| verts[id].hash.is_some_and(|h| !shared.contains(&h));
    let mut i = 0;
    let mut since_removal = 0;
    while ring.len() > 3 && since_removal < ring.len() {
        let len = ring.len();
        let (prev, cur, next) = (ring[(i + len - 1) % len], ring[i % len], ring[(i + 1) % len]);
        let (p, c, n) = (verts[prev].coord, verts[cur].coord, verts[next].coord);
        let span = ((n[0] - p[0]).powi(2) + (n[1] - p[1]).powi(2)).sqrt();
        let between = (c[0] - p[0]) * (n[0] - c[0]) + (c[1] - p[1]) * (n[1] - c[1]) > 0.0;
        if removable(cur) && between && span > 0.0 && cross2(p, n, c).abs() / span <= COLINEAR_TOLERANCE {
            ring.remove(i % len);
            since_removal = 0;
        } else {
            i += 1;
            since_removal += 1;
        }
        i %= ring.len();
    }
}

fn earcut(
    outer: &[OptVertexId],
    holes: &[Vec<OptVertexId>],
    verts: &[OptVertex],
) -> Result<Vec<[OptVertexId; 3]>, &'static str> {
    let mut by_coord: HashMap<[u64; 2], OptVertexId> = HashMap::new();
    let mut ring = |ids: &[OptVertexId]| -> Result<LineString<Real>, &'static str> {
        let mut coords = Vec::with_capacity(ids.len());
        for &id in ids {
            let [x, y] = verts[id].coord;
            if let Some(other) = by_coord.insert([x.to_bits() as u64, y.to_bits() as u64], id) {
                if other != id {
                    return Err("outline touches itself");
                }
            }
            coords.push(Coord { x, y });
        }
        Ok(LineString::new(coords))
    };
    let exterior = ring(outer)?;
    let interiors = holes.iter().map(|h| ring(h)).collect::<Result<Vec<_>, _>>()?;
    let polygon = Polygon::new(exterior, interiors);

    let triangulation = polygon.earcut_triangles_raw();
    let vertices = triangulation.vertices;
    let id_of = |index: usize| -> Result<OptVertexId, &'static str> {
        let key = [vertices[2 * index].to_bits() as u64, vertices[2 * index + 1].to_bits() as u64];
        by_coord.get(&key).copied().ok_or("unknown triangulation vertex")
    };
    triangulation
        .triangle_indices
        .chunks_exact(3)
        .map(|t| Ok([id_of(t[0])?, id_of(t[1])?, id_of(t[2])?]))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::float_types::VERTEX_EPSILON;
    use crate::optimize::{add_tri_list_to_area, fix_tjunctions};
    use crate::plane::PlaneSet;
    use crate::primitive::MergeGroup;
    use nalgebra::{Point3, Vector3};
    use std::sync::Arc;

    fn grid_area(n: usize) -> Vec<ProcArea> {
        let mut planes = PlaneSet::new();
        let plane_num = planes.intern(Vector3::z(), 0.0);
        let vertex = |x: usize, y: usize| {
            let (x, y) = (x as Real * 8.0, y as Real * 8.0);
            MapVertex::new(Point3::new(x, y, 0.0), Vector3::z(), [x / 64.0, y / 64.0])
        };
        let mut tris = Vec::new();
        for x in 0..n {
            for y in 0..n {
                let quad = [vertex(x, y), vertex(x + 1, y), vertex(x + 1, y + 1), vertex(x, y + 1)];
                for v in [[quad[0], quad[1], quad[2]], [quad[0], quad[2], quad[3]]] {
                    tris.push(ProcTri::new(Arc::from("floor"), MergeGroup::NONE, plane_num, v));
                }
            }
        }
        let mut areas = vec![ProcArea::default()];
        add_tri_list_to_area(&mut areas[0], 0, tris, false, &planes);
        fix_tjunctions(&mut areas, VERTEX_EPSILON);
        areas
    }

    #[test]
    fn grid_collapses_to_two_triangles() {
        let mut areas = grid_area(3);
        let shared = shared_vertices(&areas);
        let group = &mut areas[0].groups[0];
        assert_eq!(group.tri_list.len(), 18);
        let outcome = optimize_group(group, &shared);
        assert_eq!(outcome, IslandOutcome::Optimized { before: 18, after: 2 });
        let area: Real = group.regenerated_tris.iter().map(ProcTri::area).sum();
        assert!((area - 576.0).abs() < 1e-6);
        for tri in &group.regenerated_tris {
            assert!(tri.area_vector().z > 0.0);
        }
    }

    #[test]
    fn optimizing_twice_is_stable() {
        let mut areas = grid_area(2);
        let shared = shared_vertices(&areas);
        let group = &mut areas[0].groups[0];
        optimize_group(group, &shared);
        let first = group.regenerated_tris.len();
        group.tri_list = group.regenerated_tris.clone();
        optimize_group(group, &shared);
        assert!(group.optimized);
        assert_eq!(group.regenerated_tris.len(), first);
    }

    fn group_of(faces: &[[(Real, Real, [Real; 2]); 3]]) -> OptimizeGroup {
        let mut planes = PlaneSet::new();
        let plane_num = planes.intern(Vector3::z(), 0.0);
        let tris = faces
            .iter()
            .map(|face| {
                let v = face.map(|(x, y, uv)| MapVertex::new(Point3::new(x, y, 0.0), Vector3::z(), uv));
                ProcTri::new(Arc::from("floor"), MergeGroup::NONE, plane_num, v)
            })
            .collect();
        let mut area = ProcArea::default();
        add_tri_list_to_area(&mut area, 0, tris, false, &planes);
        area.groups.remove(0)
    }

    #[test]
    fn texture_seam_keeps_original_triangles() {
        let mut group = group_of(&[
            [(0.0, 0.0, [0.0, 0.0]), (8.0, 0.0, [1.0, 0.0]), (8.0, 8.0, [1.0, 1.0])],
            [(0.0, 0.0, [0.5, 0.0]), (8.0, 8.0, [1.0, 1.0]), (0.0, 8.0, [0.0, 1.0])],
        ]);
        let original = group.tri_list.clone();
        let outcome = optimize_group(&mut group, &HashSet::new());
        assert_eq!(outcome, IslandOutcome::Kept("texture seam"));
        assert!(!group.optimized);
        assert!(group.regenerated_tris.is_empty());
        assert_eq!(group.output_tris().len(), original.len());
    }

    #[test]
    fn repeated_triangle_is_non_manifold() {
        let face = [(0.0, 0.0, [0.0, 0.0]), (8.0, 0.0, [1.0, 0.0]), (8.0, 8.0, [1.0, 1.0])];
        let mut group = group_of(&[face, face]);
        let outcome = optimize_group(&mut group, &HashSet::new());
        assert_eq!(outcome, IslandOutcome::Kept("non-manifold edge"));
        assert!(!group.optimized);
        assert_eq!(group.output_tris(), group.tri_list.as_slice());
    }

    #[test]
    fn flat_triangles_have_no_area() {
        let mut group = group_of(&[[(0.0, 0.0, [0.0, 0.0]), (4.0, 0.0, [0.5, 0.0]), (8.0, 0.0, [1.0, 0.0])]]);
        assert_eq!(optimize_group(&mut group, &HashSet::new()), IslandOutcome::Kept("no area"));
        assert!(!group.optimized);
    }

    #[test]
    fn square_with_hole_keeps_its_area() {
        let vertex = |x: Real, y: Real| (x, y, [x / 64.0, y / 64.0]);
        let outer = [vertex(0.0, 0.0), vertex(24.0, 0.0), vertex(24.0, 24.0), vertex(0.0, 24.0)];
        let inner = [vertex(8.0, 8.0), vertex(16.0, 8.0), vertex(16.0, 16.0), vertex(8.0, 16.0)];
        let mut faces = Vec::new();
        for i in 0..4 {
            let j = (i + 1) % 4;
            faces.push([outer[i], outer[j], inner[j]]);
            faces.push([outer[i], inner[j], inner[i]]);
        }
        let mut group = group_of(&faces);
        let outcome = optimize_group(&mut group, &HashSet::new());
        assert!(matches!(outcome, IslandOutcome::Optimized { before: 8, .. }));
        let area: Real = group.regenerated_tris.iter().map(ProcTri::area).sum();
        assert!((area - 512.0).abs() < 1e-6);
    }

    #[test]
    fn smoothed_groups_are_skipped() {
        let mut areas = grid_area(1);
        areas[0].groups[0].smoothed = true;
        let outcome = optimize_group(&mut areas[0].groups[0], &HashSet::new());
        assert_eq!(outcome, IslandOutcome::Skipped);
        assert!(!areas[0].groups[0].optimized);
    }
}
