//! T-junction repair: unify nearby vertices of an entity and split every
//! triangle edge that passes through another vertex.

use crate::float_types::{COLINEAR_EPSILON, Real, VERTEX_SNAP};
use crate::optimize::ProcArea;
use crate::primitive::{HashVertexId, ProcTri};
use hashbrown::HashMap;
use nalgebra::Point3;

/// Edge length of the coarse bins vertices are hashed into.
const HASH_BIN_SIZE: Real = 64.0;

/// Guard against runaway recursion on pathological input.
const MAX_SPLIT_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TjunctionStats {
    pub hash_verts: usize,
    pub splits: usize,
    pub degenerate: usize,
}

/// Unified vertex positions, binned for neighbourhood queries.
struct VertexHash {
    epsilon: Real,
    positions: Vec<Point3<Real>>,
    bins: HashMap<[i64; 3], Vec<HashVertexId>>,
}

fn bin_of(value: Real) -> i64 {
    (value / HASH_BIN_SIZE).floor() as i64
}

fn snap(p: &Point3<Real>) -> Point3<Real> {
    p.map(|c| (c / VERTEX_SNAP).round() * VERTEX_SNAP)
}

impl VertexHash {
    fn new(epsilon: Real) -> Self {
        VertexHash {
            epsilon,
            positions: Vec::new(),
            bins: HashMap::new(),
        }
    }

    /// Ids in every bin overlapping the box `mins..=maxs`.
    fn candidates(&self, mins: &Point3<Real>, maxs: &Point3<Real>) -> Vec<HashVertexId> {
        let mut out = Vec::new();
        for x in bin_of(mins.x)..=bin_of(maxs.x) {
            for y in bin_of(mins.y)..=bin_of(maxs.y) {
                for z in bin_of(mins.z)..=bin_of(maxs.z) {
                    if let Some(ids) = self.bins.get(&[x, y, z]) {
                        out.extend_from_slice(ids);
                    }
                }
            }
        }
        out
    }

    fn get_or_insert(&mut self, p: &Point3<Real>) -> HashVertexId {
        let p = snap(p);
        let e = nalgebra::Vector3::repeat(self.epsilon);
        let found = self
            .candidates(&(p - e), &(p + e))
            .into_iter()
            .filter(|&id| (self.positions[id] - p).iter().all(|d| d.abs() <= self.epsilon))
            .min();
        if let Some(id) = found {
            return id;
        }
        let id = self.positions.len();
        self.positions.push(p);
        self.bins.entry([bin_of(p.x), bin_of(p.y), bin_of(p.z)]).or_default().push(id);
        id
    }

    /// Renumber ids in sorted position order. Returns the old→new map.
    fn canonicalize(&mut self) -> Vec<HashVertexId> {
        let mut order: Vec<HashVertexId> = (0..self.positions.len()).collect();
        order.sort_by(|&a, &b| {
            let (pa, pb) = (&self.positions[a], &self.positions[b]);
            pa.x.total_cmp(&pb.x).then(pa.y.total_cmp(&pb.y)).then(pa.z.total_cmp(&pb.z))
        });
        let mut remap = vec![0; order.len()];
        for (new, &old) in order.iter().enumerate() {
            remap[old] = new;
        }
        self.positions = order.iter().map(|&old| self.positions[old]).collect();
        for ids in self.bins.values_mut() {
            for id in ids.iter_mut() {
                *id = remap[*id];
            }
        }
        remap
    }

    /// The vertex lying strictly inside edge `a`→`b` nearest to `a`, if any.
    fn vertex_on_edge(&self, a: HashVertexId, b: HashVertexId) -> Option<(HashVertexId, Real)> {
        let (pa, pb) = (self.positions[a], self.positions[b]);
        let edge = pb - pa;
        let len = edge.norm();
        if len <= self.epsilon {
            return None;
        }
        let dir = edge / len;
        let margin = nalgebra::Vector3::repeat(COLINEAR_EPSILON);
        let mins = pa.inf(&pb) - margin;
        let maxs = pa.sup(&pb) + margin;

        self.candidates(&mins, &maxs)
            .into_iter()
            .filter(|&id| id != a && id != b)
            .filter_map(|id| {
                let offset = self.positions[id] - pa;
                let along = offset.dot(&dir);
                if along <= self.epsilon || along >= len - self.epsilon {
                    return None;
                }
                let off_line = (offset - dir * along).norm();
                (off_line <= COLINEAR_EPSILON).then_some((id, along))
            })
            .min_by(|x, y| x.1.total_cmp(&y.1).then(x.0.cmp(&y.0)))
            .map(|(id, along)| (id, along / len))
    }
}

/// Split `tri` at vertices lying inside its edges, recursively.
fn split_tri(tri: ProcTri, hash: &VertexHash, depth: usize, out: &mut Vec<ProcTri>, stats: &mut TjunctionStats) {
    let ids = tri.hash_vert.map(|id| id.unwrap_or(usize::MAX));
    if depth < MAX_SPLIT_DEPTH && !ids.contains(&usize::MAX) {
        for i in 0..3 {
            let j = (i + 1) % 3;
            let k = (i + 2) % 3;
            let Some((id, t)) = hash.vertex_on_edge(ids[i], ids[j]) else {
                continue;
            };
            let mut mid = tri.v[i].interpolate(&tri.v[j], t);
            mid.pos = hash.positions[id];

            let mut first = tri.clone();
            first.v = [tri.v[i], mid, tri.v[k]];
            first.hash_vert = [Some(ids[i]), Some(id), Some(ids[k])];
            let mut second = tri.clone();
            second.v = [mid, tri.v[j], tri.v[k]];
            second.hash_vert = [Some(id), Some(ids[j]), Some(ids[k])];

            stats.splits += 1;
            split_tri(first, hash, depth + 1, out, stats);
            split_tri(second, hash, depth + 1, out, stats);
            return;
        }
    }
    out.push(tri);
}

/// Unify the vertices of every group in `areas` and split edges at the
/// vertices they pass through. Running it twice changes nothing the second
/// time.
pub fn fix_tjunctions(areas: &mut [ProcArea], vertex_epsilon: Real) -> TjunctionStats {
    let mut hash = VertexHash::new(vertex_epsilon);
    let mut stats = TjunctionStats::default();

    for group in areas.iter_mut().flat_map(|a| a.groups.iter_mut()) {
        for tri in &mut group.tri_list {
            for i in 0..3 {
                tri.hash_vert[i] = Some(hash.get_or_insert(&tri.v[i].pos));
            }
        }
    }
    let remap = hash.canonicalize();
    stats.hash_verts = hash.positions.len();

    for group in areas.iter_mut().flat_map(|a| a.groups.iter_mut()) {
        let tris = std::mem::take(&mut group.tri_list);
        let mut fixed = Vec::with_capacity(tris.len());
        for mut tri in tris {
            for i in 0..3 {
                if let Some(old) = tri.hash_vert[i] {
                    let id = remap[old];
                    tri.hash_vert[i] = Some(id);
                    tri.v[i].pos = hash.positions[id];
                }
            }
            let [a, b, c] = tri.hash_vert;
            if a == b || b == c || a == c {
                stats.degenerate += 1;
                continue;
            }
            split_tri(tri, &hash, 0, &mut fixed, &mut stats);
        }
        group.tri_list = fixed;
        group.recompute_bounds();
    }

    tracing::debug!(hash_verts = stats.hash_verts, splits = stats.splits, "t-junctions fixed");
    stats
}
