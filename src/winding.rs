//! Convex polygons and the plane clipping primitives every later stage uses.

use crate::aabb::Aabb;
use crate::float_types::{CLIP_EPSILON, EDGE_LENGTH, MIN_WINDING_AREA, Real, tolerance};
use crate::plane::{BACK, FRONT, ON, Plane};
use nalgebra::{Point3, Vector3};

/// Consecutive points closer than this are collapsed into one.
const COLLAPSE_EPSILON: Real = 1e-3;

/// An ordered convex polygon. Points are counter-clockwise when seen from the
/// front of the plane that generated the winding.
#[derive(Debug, Clone, PartialEq)]
pub struct Winding {
    pub points: Vec<Point3<Real>>,
}

/// Result of splitting a winding by a plane. A missing half means nothing
/// (or nothing worth keeping) was left on that side.
#[derive(Debug, Clone, Default)]
pub struct WindingSplit {
    pub front: Option<Winding>,
    pub back: Option<Winding>,
}

impl Winding {
    pub const fn new(points: Vec<Point3<Real>>) -> Self {
        Winding { points }
    }

    /// A square of half size `extent` lying on `plane`, centred on the point
    /// of the plane closest to the origin.
    pub fn base_for_plane(plane: &Plane, extent: Real) -> Self {
        let normal = plane.normal;

        // find the major axis
        let mut major = 0;
        for i in 1..3 {
            if normal[i].abs() > normal[major].abs() {
                major = i;
            }
        }
        let mut vup = if major == 2 { Vector3::x() } else { Vector3::z() };
        vup -= normal * vup.dot(&normal);
        vup.normalize_mut();

        let org = Point3::from(normal * plane.w);
        let vright = normal.cross(&vup) * extent;
        let vup = vup * extent;

        Winding {
            points: vec![
                org - vright + vup,
                org + vright + vup,
                org + vright - vup,
                org - vright - vup,
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Split by `plane`, treating points within `epsilon` as on it.
    ///
    /// On points go to both halves. A winding lying entirely on the plane is
    /// returned as `front` when `keep_on` is set and dropped otherwise.
    pub fn clip_to_plane(&self, plane: &Plane, epsilon: Real, keep_on: bool) -> WindingSplit {
        let dists: Vec<Real> = self.points.iter().map(|p| plane.distance(p)).collect();
        let sides: Vec<i8> = dists
            .iter()
            .map(|&d| {
                if d > epsilon {
                    FRONT
                } else if d < -epsilon {
                    BACK
                } else {
                    ON
                }
            })
            .collect();
        let front_count = sides.iter().filter(|&&s| s == FRONT).count();
        let back_count = sides.iter().filter(|&&s| s == BACK).count();

        if front_count == 0 && back_count == 0 {
            return WindingSplit {
                front: keep_on.then(|| self.clone()),
                back: None,
            };
        }
        if back_count == 0 {
            return WindingSplit { front: Some(self.clone()), back: None };
        }
        if front_count == 0 {
            return WindingSplit { front: None, back: Some(self.clone()) };
        }

        let n = self.points.len();
        let mut front = Vec::with_capacity(n + 4);
        let mut back = Vec::with_capacity(n + 4);

        for i in 0..n {
            let p1 = self.points[i];
            match sides[i] {
                ON => {
                    let on = snap_to_plane(plane, plane.project(&p1));
                    front.push(on);
                    back.push(on);
                    continue;
                },
                FRONT => front.push(p1),
                _ => back.push(p1),
            }

            let j = (i + 1) % n;
            if sides[j] == ON || sides[j] == sides[i] {
                continue;
            }

            // generate a split point
            let p2 = self.points[j];
            let t = dists[i] / (dists[i] - dists[j]);
            let mid = snap_to_plane(plane, p1 + (p2 - p1) * t);
            front.push(mid);
            back.push(mid);
        }

        WindingSplit {
            front: Winding::new(front).into_valid(),
            back: Winding::new(back).into_valid(),
        }
    }

    /// Keep only the part in front of `plane`.
    pub fn chop(&self, plane: &Plane, epsilon: Real) -> Option<Winding> {
        self.clip_to_plane(plane, epsilon, true).front
    }

    /// Intersect with the convex volume behind every plane in `planes`
    /// (brush face planes point out of the brush).
    ///
    /// Returns `None` once nothing is left. A winding already inside every
    /// half-space comes back unchanged.
    pub fn clip_to_brush<'a>(&self, planes: impl IntoIterator<Item = &'a Plane>) -> Option<Winding> {
        let mut w = self.clone();
        for plane in planes {
            w = w.chop(&plane.flipped(), CLIP_EPSILON)?;
        }
        Some(w)
    }

    /// Collapse repeated points and reject what is not a real polygon.
    pub fn into_valid(mut self) -> Option<Winding> {
        self.remove_duplicate_points();
        if self.points.len() < 3 || self.area() < MIN_WINDING_AREA {
            return None;
        }
        Some(self)
    }

    fn remove_duplicate_points(&mut self) {
        let mut out: Vec<Point3<Real>> = Vec::with_capacity(self.points.len());
        for p in &self.points {
            if out.last().is_some_and(|last| (p - last).norm() < COLLAPSE_EPSILON) {
                continue;
            }
            out.push(*p);
        }
        while out.len() > 1 && (out[0] - out[out.len() - 1]).norm() < COLLAPSE_EPSILON {
            out.pop();
        }
        self.points = out;
    }

    /// Newell normal scaled by twice the area.
    fn area_vector(&self) -> Vector3<Real> {
        let n = self.points.len();
        if n < 3 {
            return Vector3::zeros();
        }
        let origin = self.points[0];
        (1..n - 1).fold(Vector3::zeros(), |acc, i| {
            acc + (self.points[i] - origin).cross(&(self.points[i + 1] - origin))
        })
    }

    pub fn area(&self) -> Real {
        self.area_vector().norm() * 0.5
    }

    /// The plane the points lie on, oriented by the winding order.
    pub fn plane(&self) -> Option<Plane> {
        let normal = self.area_vector();
        let len = normal.norm();
        if len < tolerance() {
            return None;
        }
        let normal = normal / len;
        Some(Plane { normal, w: normal.dot(&self.points[0].coords) })
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(&self.points)
    }

    /// Average of the points; inside the polygon because it is convex.
    pub fn center(&self) -> Point3<Real> {
        if self.points.is_empty() {
            return Point3::origin();
        }
        let sum = self
            .points
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords);
        Point3::from(sum / self.points.len() as Real)
    }

    pub fn reverse(&self) -> Winding {
        Winding { points: self.points.iter().rev().copied().collect() }
    }

    /// Fewer than three edges of a reasonable length.
    pub fn is_tiny(&self) -> bool {
        let n = self.points.len();
        let edges = (0..n)
            .filter(|&i| (self.points[(i + 1) % n] - self.points[i]).norm() > EDGE_LENGTH)
            .take(3)
            .count();
        edges < 3
    }

    pub fn translate(&mut self, offset: &Vector3<Real>) {
        for p in &mut self.points {
            *p += offset;
        }
    }

    /// Index triples of a triangle fan around the first point.
    pub fn fan_triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        (1..self.points.len().saturating_sub(1)).map(|i| [0, i, i + 1])
    }
}

/// Put an axial component of a point lying on `plane` exactly on it.
fn snap_to_plane(plane: &Plane, mut point: Point3<Real>) -> Point3<Real> {
    for k in 0..3 {
        // avoid round off error when possible
        if plane.normal[k] == 1.0 {
            point[k] = plane.w;
        } else if plane.normal[k] == -1.0 {
            point[k] = -plane.w;
        }
    }
    point
}
