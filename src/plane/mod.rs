//! Oriented planes and the per-compile [`PlaneSet`] they are interned in.
//!
//! A plane is stored as a unit normal and a distance along it, so that a point
//! `p` lies on the plane when `normal · p == w`. Positive distances are in
//! *front* of the plane.

use crate::float_types::{NORMAL_EPSILON, Real, tolerance};
use nalgebra::{Point3, Vector3};

pub mod plane_set;

pub use plane_set::{PlaneIndex, PlaneSet};

// Point / winding classification relative to a plane
pub const ON: i8 = 0;
pub const FRONT: i8 = 1;
pub const BACK: i8 = 2;
pub const SPANNING: i8 = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal vector of the plane
    pub normal: Vector3<Real>,
    /// Distance from origin along normal (plane equation: n·p = w)
    pub w: Real,
}

impl Plane {
    /// Create a new plane from a (not necessarily unit) normal and the
    /// distance along the *normalized* normal.
    pub fn from_normal(normal: Vector3<Real>, w: Real) -> Self {
        let len = normal.norm();
        if len < Real::EPSILON {
            return Plane { normal: Vector3::z(), w };
        }
        Plane { normal: normal / len, w }
    }

    /// Create a plane from three points.
    /// The normal direction follows the right-hand rule: (p2-p1) × (p3-p1)
    pub fn from_points(p1: &Point3<Real>, p2: &Point3<Real>, p3: &Point3<Real>) -> Option<Self> {
        let normal = (p2 - p1).cross(&(p3 - p1));
        let len = normal.norm();
        if len < tolerance() {
            return None;
        }
        let normal = normal / len;
        Some(Plane { normal, w: normal.dot(&p1.coords) })
    }

    pub const fn normal(&self) -> Vector3<Real> {
        self.normal
    }

    pub const fn offset(&self) -> Real {
        self.w
    }

    pub fn flip(&mut self) {
        self.normal = -self.normal;
        self.w = -self.w;
    }

    pub fn flipped(&self) -> Self {
        Plane { normal: -self.normal, w: -self.w }
    }

    /// Signed distance of `point`, positive in front.
    #[inline]
    pub fn distance(&self, point: &Point3<Real>) -> Real {
        self.normal.dot(&point.coords) - self.w
    }

    /// Classify a point as [`FRONT`], [`BACK`] or [`ON`] the plane.
    #[inline]
    pub fn orient_point(&self, point: &Point3<Real>, epsilon: Real) -> i8 {
        let d = self.distance(point);
        if d > epsilon {
            FRONT
        } else if d < -epsilon {
            BACK
        } else {
            ON
        }
    }

    /// Bitwise-or of the classification of every point.
    pub fn classify_points<'a>(
        &self,
        points: impl IntoIterator<Item = &'a Point3<Real>>,
        epsilon: Real,
    ) -> i8 {
        points
            .into_iter()
            .fold(ON, |acc, p| acc | self.orient_point(p, epsilon))
    }

    /// Index of the axis this plane is perpendicular to, if any.
    pub fn axial_type(&self) -> Option<usize> {
        (0..3).find(|&i| (self.normal[i].abs() - 1.0).abs() < NORMAL_EPSILON)
    }

    pub fn is_axial(&self) -> bool {
        self.axial_type().is_some()
    }

    /// Snap almost-axial normals onto the axis.
    pub fn fix_degenerate_normal(&mut self) {
        if let Some(axis) = self.axial_type() {
            let sign = self.normal[axis].signum();
            self.normal = Vector3::zeros();
            self.normal[axis] = sign;
        } else {
            for i in 0..3 {
                if self.normal[i].abs() < NORMAL_EPSILON {
                    self.normal[i] = 0.0;
                }
            }
            self.normal.normalize_mut();
        }
    }

    /// `true` when the largest normal component is positive. Of every pair of
    /// opposite planes exactly one is "positive" (the one stored first).
    pub fn is_positive(&self) -> bool {
        let mut dominant = 0;
        for i in 1..3 {
            if self.normal[i].abs() > self.normal[dominant].abs() + NORMAL_EPSILON {
                dominant = i;
            }
        }
        self.normal[dominant] > 0.0
    }

    /// An orthonormal pair spanning the plane, used to project onto 2D.
    pub fn basis(&self) -> (Vector3<Real>, Vector3<Real>) {
        let n = self.normal;
        let mut u = if n.z.abs() > n.x.abs() || n.z.abs() > n.y.abs() {
            // normal is closer to ±Z ⇒ cross with X
            Vector3::x().cross(&n)
        } else {
            // otherwise cross with Z
            Vector3::z().cross(&n)
        };
        u.normalize_mut();
        let v = n.cross(&u).normalize();
        (u, v)
    }

    /// Project a point onto the plane.
    pub fn project(&self, point: &Point3<Real>) -> Point3<Real> {
        point - self.normal * self.distance(point)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn from_points_follows_right_hand_rule() {
        let plane = Plane::from_points(
            &Point3::new(0.0, 0.0, 2.0),
            &Point3::new(1.0, 0.0, 2.0),
            &Point3::new(0.0, 1.0, 2.0),
        )
        .expect("non-degenerate");
        assert_eq!(plane.normal, Vector3::z());
        assert_eq!(plane.w, 2.0);
        assert_eq!(plane.orient_point(&Point3::new(0.0, 0.0, 3.0), 0.01), FRONT);
        assert_eq!(plane.orient_point(&Point3::new(0.0, 0.0, 1.0), 0.01), BACK);
        assert_eq!(plane.orient_point(&Point3::new(5.0, 5.0, 2.001), 0.01), ON);
    }

    #[test]
    fn collinear_points_have_no_plane() {
        assert!(Plane::from_points(
            &Point3::origin(),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(2.0, 0.0, 0.0)
        )
        .is_none());
    }

    #[test]
    fn exactly_one_of_a_pair_is_positive() {
        let plane = Plane::from_normal(Vector3::new(0.3, -0.9, 0.1), 4.0);
        assert_ne!(plane.is_positive(), plane.flipped().is_positive());
    }

    #[test]
    fn basis_is_orthonormal_and_in_plane() {
        let plane = Plane::from_normal(Vector3::new(1.0, 2.0, 3.0), 0.0);
        let (u, v) = plane.basis();
        assert!(u.dot(&plane.normal).abs() < 1e-9);
        assert!(v.dot(&plane.normal).abs() < 1e-9);
        assert!(u.dot(&v).abs() < 1e-9);
        assert!((u.norm() - 1.0).abs() < 1e-9);
    }
}
