mod support;

use nalgebra::{Point3, Vector3};
use procmap::errors::Diagnostic;
use procmap::float_types::Real;
use procmap::light::MAX_GROUP_LIGHTS;
use procmap::{Compiler, DefaultMaterials, MapBrush, MapEntity, MapLight, NoProgress, Scene};
use support::{room_brushes, world};

fn crowded_room(lights: usize) -> Scene {
    (0..lights).fold(Scene::new().with_entity(world(room_brushes(None))), |scene, i| {
        let x = -24.0 + (i % 7) as Real * 8.0;
        let y = -24.0 + (i / 7) as Real * 8.0;
        scene.with_light(MapLight::point(format!("light_{i}"), Point3::new(x, y, 0.0), Vector3::repeat(200.0)))
    })
}

#[test]
fn groups_never_exceed_the_light_cap() {
    let output = Compiler::default()
        .compile(&crowded_room(40), &DefaultMaterials, &mut NoProgress)
        .expect("compiles");
    let world = output.proc_file.world().expect("world entity");
    assert!(world.num_groups() > 0);
    for group in world.areas.iter().flat_map(|a| a.groups.iter()) {
        assert_eq!(group.lights.len(), MAX_GROUP_LIGHTS);
        assert!(group.lights.windows(2).all(|w| w[0] < w[1]), "kept lights are in registration order");
    }
    assert!(
        output
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::LightCapExceeded { count: 40, .. }))
    );
}

#[test]
fn capped_groups_are_reported_by_their_written_index() {
    // thinner than the vertex epsilon, so its narrow faces collapse during t-junction repair
    let sliver = MapBrush::from_bounds(Point3::new(8.0, 8.0, 8.0), Point3::new(8.04, 16.0, 16.0), support::WALL);
    let mut brushes = room_brushes(None);
    brushes.push(sliver);
    let scene = (0..40).fold(Scene::new().with_entity(world(brushes)), |scene, i| {
        let x = -24.0 + (i % 7) as Real * 8.0;
        let y = -24.0 + (i / 7) as Real * 8.0;
        scene.with_light(MapLight::point(format!("light_{i}"), Point3::new(x, y, 0.0), Vector3::repeat(200.0)))
    });
    let output = Compiler::default()
        .compile(&scene, &DefaultMaterials, &mut NoProgress)
        .expect("compiles");
    let world = output.proc_file.world().expect("world entity");

    let mut reported = 0;
    for diagnostic in &output.diagnostics {
        if let Diagnostic::LightCapExceeded { entity: 0, area, group, .. } = diagnostic {
            let group = &world.areas[*area].groups[*group];
            assert!(!group.tri_list.is_empty());
            assert_eq!(group.lights.len(), MAX_GROUP_LIGHTS);
            reported += 1;
        }
    }
    assert_eq!(reported, world.num_groups());
}

#[test]
fn few_lights_are_all_kept() {
    let output = Compiler::default()
        .compile(&crowded_room(3), &DefaultMaterials, &mut NoProgress)
        .expect("compiles");
    let world = output.proc_file.world().expect("world entity");
    for group in world.areas.iter().flat_map(|a| a.groups.iter()) {
        assert_eq!(group.lights.as_slice(), &[0, 1, 2]);
    }
    assert!(!output.diagnostics.iter().any(|d| matches!(d, Diagnostic::LightCapExceeded { .. })));
}

#[test]
fn light_entities_are_registered() {
    let scene = Scene::new()
        .with_entity(world(room_brushes(None)))
        .with_entity(
            MapEntity::new("light")
                .with_key("origin", "0 0 8")
                .with_key("light_radius", "64 64 64")
                .with_key("name", "lamp"),
        );
    let output = Compiler::default()
        .compile(&scene, &DefaultMaterials, &mut NoProgress)
        .expect("compiles");
    assert_eq!(output.proc_file.lights.len(), 1);
    assert_eq!(output.proc_file.lights[0].name, "lamp");
    assert!(!output.proc_file.has_leak());
}
