//! The read-only scene the compiler consumes.
//!
//! The editor hands over plain data: entities with their key/value pairs,
//! brushes as lists of face planes, patches as control meshes, and lights.
//! Nothing here refers back into the editor's scene graph.

use crate::float_types::Real;
use crate::plane::Plane;
use nalgebra::{Point3, Vector3};
use std::collections::BTreeMap;

/// Default texture matrix: one texture repeat every 128 units.
pub const DEFAULT_TEXTURE_MATRIX: [[Real; 3]; 2] = [[1.0 / 128.0, 0.0, 0.0], [0.0, 1.0 / 128.0, 0.0]];

/// One face plane of a brush. The normal points out of the brush.
#[derive(Debug, Clone, PartialEq)]
pub struct BrushSide {
    pub plane: Plane,
    pub material: String,
    /// Maps the plane's texture axes to texture coordinates:
    /// `s = m[0]·(x, y, 1)`, `t = m[1]·(x, y, 1)`.
    pub texture_matrix: [[Real; 3]; 2],
}

impl BrushSide {
    pub fn new(plane: Plane, material: impl Into<String>) -> Self {
        Self {
            plane,
            material: material.into(),
            texture_matrix: DEFAULT_TEXTURE_MATRIX,
        }
    }

    pub fn with_texture_matrix(mut self, texture_matrix: [[Real; 3]; 2]) -> Self {
        self.texture_matrix = texture_matrix;
        self
    }
}

/// A convex volume: the intersection of the half-spaces behind its sides.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MapBrush {
    pub sides: Vec<BrushSide>,
}

impl MapBrush {
    pub const fn new(sides: Vec<BrushSide>) -> Self {
        Self { sides }
    }

    /// An axis-aligned box with every side using `material`.
    pub fn from_bounds(mins: Point3<Real>, maxs: Point3<Real>, material: &str) -> Self {
        let mut sides = Vec::with_capacity(6);
        for axis in 0..3 {
            let mut normal = Vector3::zeros();
            normal[axis] = 1.0;
            sides.push(BrushSide::new(Plane::from_normal(normal, maxs[axis]), material));
            sides.push(BrushSide::new(Plane::from_normal(-normal, -mins[axis]), material));
        }
        Self { sides }
    }

    /// Replace the material of every side whose outward normal is `normal`.
    pub fn with_side_material(mut self, normal: Vector3<Real>, material: &str) -> Self {
        for side in &mut self.sides {
            if (side.plane.normal - normal).norm() < 1e-6 {
                side.material = material.to_string();
            }
        }
        self
    }
}

/// One control point of a patch mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatchControl {
    pub pos: Point3<Real>,
    pub uv: [Real; 2],
}

/// A bi-quadratic Bézier patch. `control` is row-major, `height` rows of
/// `width` points; both dimensions are odd and at least 3.
#[derive(Debug, Clone, PartialEq)]
pub struct MapPatch {
    pub width: usize,
    pub height: usize,
    pub control: Vec<PatchControl>,
    pub material: String,
    /// Fixed subdivisions per 3×3 sub-patch, overriding the compile options.
    pub subdivisions: Option<[usize; 2]>,
}

impl MapPatch {
    pub fn new(width: usize, height: usize, control: Vec<PatchControl>, material: impl Into<String>) -> Self {
        Self {
            width,
            height,
            control,
            material: material.into(),
            subdivisions: None,
        }
    }

    pub fn control(&self, row: usize, column: usize) -> &PatchControl {
        &self.control[row * self.width + column]
    }
}

/// A scene entity: key/value pairs plus its authored primitives.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MapEntity {
    pub key_values: BTreeMap<String, String>,
    pub brushes: Vec<MapBrush>,
    pub patches: Vec<MapPatch>,
}

impl MapEntity {
    pub fn new(classname: &str) -> Self {
        let mut entity = Self::default();
        entity.key_values.insert("classname".into(), classname.into());
        entity
    }

    pub fn with_key(mut self, key: &str, value: impl Into<String>) -> Self {
        self.key_values.insert(key.into(), value.into());
        self
    }

    pub fn with_brush(mut self, brush: MapBrush) -> Self {
        self.brushes.push(brush);
        self
    }

    pub fn with_patch(mut self, patch: MapPatch) -> Self {
        self.patches.push(patch);
        self
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.key_values.get(key).map(String::as_str)
    }

    pub fn classname(&self) -> &str {
        self.value("classname").unwrap_or("")
    }

    pub fn is_world(&self) -> bool {
        self.classname() == "worldspawn"
    }

    pub fn float(&self, key: &str) -> Option<Real> {
        self.value(key)?.trim().parse().ok()
    }

    /// Parses a `"x y z"` value.
    pub fn vector(&self, key: &str) -> Option<Vector3<Real>> {
        let mut parts = self.value(key)?.split_whitespace().map(str::parse::<Real>);
        let x = parts.next()?.ok()?;
        let y = parts.next()?.ok()?;
        let z = parts.next()?.ok()?;
        Some(Vector3::new(x, y, z))
    }

    pub fn origin(&self) -> Option<Point3<Real>> {
        self.vector("origin").map(Point3::from)
    }
}

/// The volume a light can reach.
#[derive(Debug, Clone, PartialEq)]
pub enum LightShape {
    /// Axis-aligned box of half extents `radius` around the origin.
    Point { radius: Vector3<Real> },
    /// A frustum from the origin towards `target`, widened by `right` and `up`
    /// and optionally clipped by `start`/`end` offsets along the target.
    Projected {
        target: Vector3<Real>,
        right: Vector3<Real>,
        up: Vector3<Real>,
        start: Option<Vector3<Real>>,
        end: Option<Vector3<Real>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapLight {
    pub name: String,
    pub origin: Point3<Real>,
    pub shape: LightShape,
    pub color: Vector3<Real>,
    pub falloff: Real,
}

/// Radius used by lights that do not say otherwise.
pub const DEFAULT_LIGHT_RADIUS: Real = 300.0;

impl MapLight {
    pub fn point(name: impl Into<String>, origin: Point3<Real>, radius: Vector3<Real>) -> Self {
        Self {
            name: name.into(),
            origin,
            shape: LightShape::Point { radius },
            color: Vector3::repeat(1.0),
            falloff: 0.0,
        }
    }

    /// Reads a light out of an entity with classname `light`.
    pub fn from_entity(entity: &MapEntity, index: usize) -> Option<Self> {
        if entity.classname() != "light" {
            return None;
        }
        let origin = entity.origin().unwrap_or_else(Point3::origin);
        let name = entity
            .value("name")
            .map(str::to_string)
            .unwrap_or_else(|| format!("light_{index}"));

        let shape = match (
            entity.vector("light_target"),
            entity.vector("light_right"),
            entity.vector("light_up"),
        ) {
            (Some(target), Some(right), Some(up)) => LightShape::Projected {
                target,
                right,
                up,
                start: entity.vector("light_start"),
                end: entity.vector("light_end"),
            },
            _ => {
                let radius = entity.vector("light_radius").unwrap_or_else(|| {
                    Vector3::repeat(entity.float("light").unwrap_or(DEFAULT_LIGHT_RADIUS))
                });
                LightShape::Point { radius }
            },
        };

        Some(Self {
            name,
            origin,
            shape,
            color: entity.vector("_color").unwrap_or_else(|| Vector3::repeat(1.0)),
            falloff: entity.float("falloff").unwrap_or(0.0),
        })
    }
}

/// Everything one compile consumes. Entity 0 is expected to be `worldspawn`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scene {
    pub entities: Vec<MapEntity>,
    pub lights: Vec<MapLight>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(mut self, entity: MapEntity) -> Self {
        self.entities.push(entity);
        self
    }

    pub fn with_light(mut self, light: MapLight) -> Self {
        self.lights.push(light);
        self
    }

    /// Explicit lights followed by every `light` entity, in registration order.
    pub fn all_lights(&self) -> Vec<MapLight> {
        let mut lights = self.lights.clone();
        lights.extend(
            self.entities
                .iter()
                .enumerate()
                .filter_map(|(index, entity)| MapLight::from_entity(entity, index)),
        );
        lights
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn box_brush_sides_point_outwards() {
        let brush = MapBrush::from_bounds(Point3::new(-1.0, -2.0, -3.0), Point3::new(1.0, 2.0, 3.0), "m");
        assert_eq!(brush.sides.len(), 6);
        let center = Point3::origin();
        for side in &brush.sides {
            assert!(side.plane.distance(&center) < 0.0);
        }
    }

    #[test]
    fn light_entity_keys() {
        let entity = MapEntity::new("light")
            .with_key("origin", "1 2 3")
            .with_key("light_radius", "100 200 300")
            .with_key("name", "lamp");
        let light = MapLight::from_entity(&entity, 4).expect("light entity");
        assert_eq!(light.name, "lamp");
        assert_eq!(light.origin, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(light.shape, LightShape::Point { radius: Vector3::new(100.0, 200.0, 300.0) });
        assert!(MapLight::from_entity(&MapEntity::new("func_static"), 0).is_none());
    }
}
