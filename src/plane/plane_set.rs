//! Canonical, deduplicated set of planes shared by one compile.

use crate::float_types::{DIST_EPSILON, NORMAL_EPSILON, Real};
use crate::plane::Plane;
use hashbrown::HashMap;
use nalgebra::Vector3;

/// Stable index of a plane inside a [`PlaneSet`].
pub type PlaneIndex = usize;

/// Width of the distance buckets used to find candidate planes.
const PLANE_HASH_BIN: Real = 8.0;

/// Planes are interned in pairs: `i` and `i ^ 1` are the same plane facing
/// opposite directions, and the even index holds the positive orientation.
#[derive(Debug, Clone)]
pub struct PlaneSet {
    planes: Vec<Plane>,
    /// The unsnapped plane each entry was created from, in the same orientation.
    seen: Vec<Plane>,
    buckets: HashMap<i64, Vec<PlaneIndex>>,
    normal_epsilon: Real,
    dist_epsilon: Real,
}

impl Default for PlaneSet {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaneSet {
    pub fn new() -> Self {
        Self::with_epsilons(NORMAL_EPSILON, DIST_EPSILON)
    }

    pub fn with_epsilons(normal_epsilon: Real, dist_epsilon: Real) -> Self {
        Self {
            planes: Vec::new(),
            seen: Vec::new(),
            buckets: HashMap::new(),
            normal_epsilon,
            dist_epsilon,
        }
    }

    /// The index of the same plane facing the other way.
    #[inline]
    pub const fn opposite(index: PlaneIndex) -> PlaneIndex {
        index ^ 1
    }

    /// The positive-facing member of the pair `index` belongs to.
    #[inline]
    pub const fn canonical(index: PlaneIndex) -> PlaneIndex {
        index & !1
    }

    pub fn len(&self) -> usize {
        self.planes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    pub fn get(&self, index: PlaneIndex) -> Option<&Plane> {
        self.planes.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Plane> {
        self.planes.iter()
    }

    /// Returns the index of a stored plane within epsilon of (`normal`, `dist`),
    /// adding the plane (and its opposite) if there is none.
    ///
    /// A plane matches when it is within epsilon of a stored plane either as
    /// given or once snapped, or within epsilon of the plane that created the
    /// stored one. Only new pairs are snapped.
    pub fn intern(&mut self, normal: Vector3<Real>, dist: Real) -> PlaneIndex {
        let plane = Plane::from_normal(normal, dist);
        if let Some(index) = self.lookup(&plane) {
            return index;
        }
        self.insert_pair(plane)
    }

    pub fn find_or_insert(&mut self, plane: &Plane) -> PlaneIndex {
        self.intern(plane.normal, plane.w)
    }

    /// Look a plane up without adding it.
    pub fn find(&self, plane: &Plane) -> Option<PlaneIndex> {
        self.lookup(plane)
    }

    fn snap(&self, mut plane: Plane) -> Plane {
        plane.fix_degenerate_normal();
        let rounded = plane.w.round();
        if (plane.w - rounded).abs() < self.dist_epsilon {
            plane.w = rounded;
        }
        plane
    }

    #[inline]
    fn bucket(dist: Real) -> i64 {
        (dist.abs() / PLANE_HASH_BIN).floor() as i64
    }

    fn is_equal(&self, stored: &Plane, plane: &Plane) -> bool {
        (stored.w - plane.w).abs() < self.dist_epsilon
            && (0..3).all(|i| (stored.normal[i] - plane.normal[i]).abs() < self.normal_epsilon)
    }

    fn lookup(&self, plane: &Plane) -> Option<PlaneIndex> {
        let snapped = self.snap(*plane);
        let bucket = Self::bucket(plane.w);
        (bucket - 1..=bucket + 1)
            .filter_map(|b| self.buckets.get(&b))
            .flat_map(|indices| indices.iter().copied())
            .filter(|&index| {
                let stored = &self.planes[index];
                self.is_equal(stored, plane) || self.is_equal(stored, &snapped) || self.is_equal(&self.seen[index], plane)
            })
            .min()
    }

    fn insert_pair(&mut self, raw: Plane) -> PlaneIndex {
        let plane = self.snap(raw);
        let base = self.planes.len();
        let (first, second, requested) = if plane.is_positive() {
            (plane, plane.flipped(), base)
        } else {
            (plane.flipped(), plane, base + 1)
        };
        let (seen_first, seen_second) = if requested == base { (raw, raw.flipped()) } else { (raw.flipped(), raw) };
        self.planes.push(first);
        self.planes.push(second);
        self.seen.push(seen_first);
        self.seen.push(seen_second);
        self.buckets
            .entry(Self::bucket(plane.w))
            .or_default()
            .extend([base, base + 1]);
        requested
    }
}

impl std::ops::Index<PlaneIndex> for PlaneSet {
    type Output = Plane;

    fn index(&self, index: PlaneIndex) -> &Plane {
        &self.planes[index]
    }
}

#[cfg(test)]
mod test {
    use super::PlaneSet;
    use nalgebra::Vector3;

    #[test]
    fn pairs_are_adjacent() {
        let mut set = PlaneSet::new();
        let down = set.intern(-Vector3::z(), 16.0);
        let up = set.intern(Vector3::z(), -16.0);
        assert_eq!(set.len(), 2);
        assert_eq!(down, PlaneSet::opposite(up));
        assert_eq!(up % 2, 0, "positive orientation is stored first");
        assert_eq!(set[down].normal, -Vector3::z());
    }

    #[test]
    fn nearly_axial_normals_snap() {
        let mut set = PlaneSet::new();
        let index = set.intern(Vector3::new(0.0, 0.000001, 1.0), 32.00001);
        assert_eq!(set[index].normal, Vector3::z());
        assert_eq!(set[index].w, 32.0);
    }
}
