//! Axis-aligned bounds used by brushes, BSP nodes, groups and lights.

use crate::float_types::Real;
use nalgebra::{Point3, Vector3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub mins: Point3<Real>,
    pub maxs: Point3<Real>,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

impl Aabb {
    #[inline]
    pub const fn new(mins: Point3<Real>, maxs: Point3<Real>) -> Self {
        Self { mins, maxs }
    }

    /// Inverted bounds that any added point will replace.
    #[inline]
    pub fn empty() -> Self {
        Self {
            mins: Point3::new(Real::MAX, Real::MAX, Real::MAX),
            maxs: Point3::new(-Real::MAX, -Real::MAX, -Real::MAX),
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<Real>>) -> Self {
        let mut bounds = Self::empty();
        for p in points {
            bounds.add_point(p);
        }
        bounds
    }

    /// Bounds of a box centred on `center` with half extents `radius`.
    pub fn from_center(center: &Point3<Real>, radius: &Vector3<Real>) -> Self {
        Self::new(center - radius, center + radius)
    }

    #[inline]
    pub fn add_point(&mut self, p: &Point3<Real>) {
        for i in 0..3 {
            self.mins[i] = self.mins[i].min(p[i]);
            self.maxs[i] = self.maxs[i].max(p[i]);
        }
    }

    pub fn add_aabb(&mut self, other: &Aabb) {
        if other.is_valid() {
            self.add_point(&other.mins);
            self.add_point(&other.maxs);
        }
    }

    /// `false` for the empty (inverted) bounds.
    #[inline]
    pub fn is_valid(&self) -> bool {
        (0..3).all(|i| self.mins[i] <= self.maxs[i])
    }

    pub fn expanded(&self, amount: Real) -> Self {
        let delta = Vector3::repeat(amount);
        Self::new(self.mins - delta, self.maxs + delta)
    }

    pub fn translated(&self, offset: &Vector3<Real>) -> Self {
        Self::new(self.mins + offset, self.maxs + offset)
    }

    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        self.maxs.x >= other.mins.x
            && self.mins.x <= other.maxs.x
            && self.maxs.y >= other.mins.y
            && self.mins.y <= other.maxs.y
            && self.maxs.z >= other.mins.z
            && self.mins.z <= other.maxs.z
    }

    #[inline]
    pub fn contains_point(&self, p: &Point3<Real>) -> bool {
        (0..3).all(|i| p[i] >= self.mins[i] && p[i] <= self.maxs[i])
    }

    /// `true` if `p` lies strictly inside, at least `margin` away from every face.
    pub fn contains_point_strict(&self, p: &Point3<Real>, margin: Real) -> bool {
        (0..3).all(|i| p[i] > self.mins[i] + margin && p[i] < self.maxs[i] - margin)
    }

    #[inline]
    pub fn center(&self) -> Point3<Real> {
        nalgebra::center(&self.mins, &self.maxs)
    }

    pub fn size(&self) -> Vector3<Real> {
        self.maxs - self.mins
    }

    /// Squared distance from `p` to the closest point of the box (0 inside).
    pub fn distance_squared_to(&self, p: &Point3<Real>) -> Real {
        (0..3)
            .map(|i| {
                let d = if p[i] < self.mins[i] {
                    self.mins[i] - p[i]
                } else if p[i] > self.maxs[i] {
                    p[i] - self.maxs[i]
                } else {
                    0.0
                };
                d * d
            })
            .sum()
    }

    /// The eight corners, bit `i` of the index selecting maxs on axis `i`.
    pub fn corners(&self) -> [Point3<Real>; 8] {
        std::array::from_fn(|index| {
            Point3::new(
                if index & 1 != 0 { self.maxs.x } else { self.mins.x },
                if index & 2 != 0 { self.maxs.y } else { self.mins.y },
                if index & 4 != 0 { self.maxs.z } else { self.mins.z },
            )
        })
    }
}

#[cfg(test)]
mod test {
    use super::Aabb;
    use nalgebra::Point3;

    #[test]
    fn empty_bounds_grow_with_points() {
        let mut bounds = Aabb::empty();
        assert!(!bounds.is_valid());
        bounds.add_point(&Point3::new(1.0, -2.0, 3.0));
        bounds.add_point(&Point3::new(-1.0, 2.0, 0.0));
        assert!(bounds.is_valid());
        assert_eq!(bounds.mins, Point3::new(-1.0, -2.0, 0.0));
        assert_eq!(bounds.maxs, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(bounds.center(), Point3::new(0.0, 0.0, 1.5));
    }

    #[test]
    fn distance_to_outside_point() {
        let bounds = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        assert_eq!(bounds.distance_squared_to(&Point3::new(0.5, 0.5, 0.5)), 0.0);
        assert_eq!(bounds.distance_squared_to(&Point3::new(3.0, 0.5, 0.5)), 4.0);
    }
}
