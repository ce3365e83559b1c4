//! Light influence volumes and the per-group light culler.

use crate::aabb::Aabb;
use crate::float_types::Real;
use crate::plane::Plane;
use crate::scene::{LightShape, MapLight};
use arrayvec::ArrayVec;
use nalgebra::{Point3, Vector3};

/// Most lights one optimize group can be lit by.
pub const MAX_GROUP_LIGHTS: usize = 16;

/// Index of a light in the compile's light table.
pub type LightIndex = usize;

/// A light with its influence volume resolved.
#[derive(Debug, Clone)]
pub struct ProcLight {
    pub name: String,
    pub origin: Point3<Real>,
    pub shape: LightShape,
    pub color: Vector3<Real>,
    pub falloff: Real,
    /// Bounds of the whole influence volume.
    pub bounds: Aabb,
    /// Outward facing planes of a projected light's frustum; empty for point
    /// lights, whose volume is exactly `bounds`.
    pub frustum: Vec<Plane>,
    /// Corners of the influence volume.
    pub corners: Vec<Point3<Real>>,
}

impl ProcLight {
    pub fn new(light: &MapLight) -> Self {
        let (frustum, corners) = match &light.shape {
            LightShape::Point { radius } => {
                let bounds = Aabb::from_center(&light.origin, &radius.abs());
                (Vec::new(), bounds.corners().to_vec())
            },
            LightShape::Projected { target, right, up, start, end } => {
                projected_volume(&light.origin, target, right, up, start.as_ref(), end.as_ref())
            },
        };
        ProcLight {
            name: light.name.clone(),
            origin: light.origin,
            shape: light.shape.clone(),
            color: light.color,
            falloff: light.falloff,
            bounds: Aabb::from_points(&corners),
            frustum,
            corners,
        }
    }

    /// Can this light reach anything inside `bounds`? When `plane` is given
    /// the surface is one-sided and a light entirely behind it is rejected.
    pub fn affects(&self, bounds: &Aabb, plane: Option<&Plane>) -> bool {
        if !self.bounds.intersects(bounds) {
            return false;
        }
        let corners = bounds.corners();
        for side in &self.frustum {
            if corners.iter().all(|c| side.distance(c) > 0.0) {
                return false;
            }
        }
        if let Some(plane) = plane {
            if self.corners.iter().all(|c| plane.distance(c) < 0.0) {
                return false;
            }
        }
        true
    }
}

/// Planes and corners of the frustum from `origin` through the rectangle
/// `target ± right ± up`, cut at the `start` and `end` distances along the
/// target direction.
fn projected_volume(
    origin: &Point3<Real>,
    target: &Vector3<Real>,
    right: &Vector3<Real>,
    up: &Vector3<Real>,
    start: Option<&Vector3<Real>>,
    end: Option<&Vector3<Real>>,
) -> (Vec<Plane>, Vec<Point3<Real>>) {
    let target_len = target.norm();
    if target_len <= Real::EPSILON {
        return (Vec::new(), vec![*origin]);
    }
    let dir = target / target_len;
    let near = start.map_or(0.0, |s| s.dot(&dir).max(0.0));
    let far = end.map_or(target_len, |e| e.dot(&dir)).max(near + 1.0);

    // rectangle corners in winding order around the target
    let rect = [target - right - up, target + right - up, target + right + up, target - right + up];
    let center = origin + target;

    let mut planes = Vec::with_capacity(6);
    for i in 0..4 {
        let a = origin + rect[i];
        let b = origin + rect[(i + 1) % 4];
        if let Some(mut side) = Plane::from_points(origin, &a, &b) {
            if side.distance(&center) > 0.0 {
                side.flip();
            }
            planes.push(side);
        }
    }
    planes.push(Plane::from_normal(-dir, -(dir.dot(&origin.coords) + near)));
    planes.push(Plane::from_normal(dir, dir.dot(&origin.coords) + far));

    let mut corners = Vec::with_capacity(8);
    for distance in [near, far] {
        let scale = distance / target_len;
        corners.extend(rect.iter().map(|r| origin + r * scale));
    }
    (planes, corners)
}

/// Which lights a group keeps when more than [`MAX_GROUP_LIGHTS`] reach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightCapPolicy {
    /// The lights whose origin is nearest the group bounds.
    #[default]
    Nearest,
    /// The first lights registered.
    RegistrationOrder,
}

/// The lights kept for one group.
#[derive(Debug, Clone, Default)]
pub struct LightCull {
    /// Kept lights, in registration order.
    pub lights: ArrayVec<LightIndex, MAX_GROUP_LIGHTS>,
    /// How many lights touched the group before capping.
    pub touching: usize,
}

impl LightCull {
    pub fn capped(&self) -> bool {
        self.touching > self.lights.len()
    }
}

/// Find the lights reaching a group with `bounds`.
///
/// When more than [`MAX_GROUP_LIGHTS`] qualify `policy` picks the survivors;
/// distance ties go to the earlier light.
pub fn cull_lights(lights: &[ProcLight], bounds: &Aabb, plane: Option<&Plane>, policy: LightCapPolicy) -> LightCull {
    let mut touching: Vec<LightIndex> = lights
        .iter()
        .enumerate()
        .filter(|(_, light)| light.affects(bounds, plane))
        .map(|(index, _)| index)
        .collect();
    let count = touching.len();

    if count > MAX_GROUP_LIGHTS && policy == LightCapPolicy::Nearest {
        touching.sort_by(|&a, &b| {
            let da = bounds.distance_squared_to(&lights[a].origin);
            let db = bounds.distance_squared_to(&lights[b].origin);
            da.total_cmp(&db).then(a.cmp(&b))
        });
        touching.truncate(MAX_GROUP_LIGHTS);
        touching.sort_unstable();
    }

    touching.truncate(MAX_GROUP_LIGHTS);
    LightCull {
        lights: touching.into_iter().collect(),
        touching: count,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn unit_box() -> Aabb {
        Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn point_light_box_test() {
        let near = ProcLight::new(&MapLight::point("a", Point3::new(5.0, 0.0, 0.0), Vector3::repeat(10.0)));
        let far = ProcLight::new(&MapLight::point("b", Point3::new(50.0, 0.0, 0.0), Vector3::repeat(10.0)));
        assert!(near.affects(&unit_box(), None));
        assert!(!far.affects(&unit_box(), None));
    }

    #[test]
    fn light_behind_surface_is_rejected() {
        let light = ProcLight::new(&MapLight::point("a", Point3::new(0.0, 0.0, -20.0), Vector3::repeat(15.0)));
        let floor = Plane::from_normal(Vector3::z(), 0.0);
        let bounds = Aabb::new(Point3::new(-40.0, -40.0, -10.0), Point3::new(40.0, 40.0, 0.0));
        assert!(light.affects(&bounds, None));
        assert!(!light.affects(&bounds, Some(&floor)));
    }

    #[test]
    fn projected_light_misses_what_is_beside_it() {
        let light = ProcLight::new(&MapLight {
            name: "spot".into(),
            origin: Point3::origin(),
            shape: LightShape::Projected {
                target: Vector3::new(0.0, 0.0, -100.0),
                right: Vector3::new(20.0, 0.0, 0.0),
                up: Vector3::new(0.0, 20.0, 0.0),
                start: None,
                end: None,
            },
            color: Vector3::repeat(1.0),
            falloff: 0.0,
        });
        assert_eq!(light.frustum.len(), 6);
        let under = Aabb::new(Point3::new(-5.0, -5.0, -60.0), Point3::new(5.0, 5.0, -50.0));
        let beside = Aabb::new(Point3::new(60.0, -5.0, -60.0), Point3::new(70.0, 5.0, -50.0));
        assert!(light.affects(&under, None));
        assert!(!light.affects(&beside, None));
    }

    #[test]
    fn cap_keeps_nearest_in_registration_order() {
        let lights: Vec<ProcLight> = (0..20)
            .map(|i| {
                // lights 0..4 are the farthest
                let x = if i < 4 { 40.0 + i as Real } else { 2.0 + i as Real };
                ProcLight::new(&MapLight::point(format!("l{i}"), Point3::new(x, 0.0, 0.0), Vector3::repeat(100.0)))
            })
            .collect();
        let cull = cull_lights(&lights, &unit_box(), None, LightCapPolicy::Nearest);
        assert_eq!(cull.touching, 20);
        assert!(cull.capped());
        assert_eq!(cull.lights.as_slice(), (4..20).collect::<Vec<_>>().as_slice());

        let first = cull_lights(&lights, &unit_box(), None, LightCapPolicy::RegistrationOrder);
        assert_eq!(first.lights.as_slice(), (0..16).collect::<Vec<_>>().as_slice());
    }
}
