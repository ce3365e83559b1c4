mod support;

use nalgebra::{Point3, Vector3};
use procmap::errors::{CompileError, Diagnostic, ReadError};
use procmap::float_types::Real;
use procmap::proc_file::ProcFile;
use procmap::{
    BrushSide, CompileOptions, Compiler, DefaultMaterials, MapBrush, MapEntity, MapPatch, NoProgress, PatchControl,
    ProcSummary, Scene,
};
use std::ops::ControlFlow;
use support::{INNER, leaking_room, room_brushes, sealed_room, world};

#[test]
fn sealed_room_compiles_to_one_area() {
    let output = Compiler::default()
        .compile(&sealed_room(), &DefaultMaterials, &mut NoProgress)
        .expect("compiles");
    let proc_file = &output.proc_file;
    assert!(!proc_file.has_leak());
    assert_eq!(proc_file.num_areas(), 1);
    assert!(proc_file.inter_area_portals.is_empty());
    assert_eq!(proc_file.num_world_brushes, 6);
    assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);

    let world = proc_file.world().expect("world entity");
    assert_eq!(world.tree.interior_leaves().count(), 1);
    // one group per inner wall face, each reduced to a quad
    assert_eq!(world.num_groups(), 6);
    assert_eq!(proc_file.num_world_tri_surfs, 6);
    assert!(output.stats.tris_out <= output.stats.tris_fixed);
    assert_eq!(output.stats.tris_out, 12);
    for group in world.areas[0].groups.iter() {
        assert_eq!(group.lights.as_slice(), &[0]);
        let area: Real = group.output_tris().iter().map(|t| t.area()).sum();
        assert!(support::approx_eq(area, (2.0 * INNER) * (2.0 * INNER), 1e-3));
    }
}

#[test]
fn optimization_never_adds_triangles() {
    let unoptimized = Compiler::new(CompileOptions::default().with_optimize(false))
        .compile(&sealed_room(), &DefaultMaterials, &mut NoProgress)
        .expect("compiles");
    let optimized = Compiler::default()
        .compile(&sealed_room(), &DefaultMaterials, &mut NoProgress)
        .expect("compiles");
    assert!(optimized.stats.tris_out <= unoptimized.stats.tris_out);
}

#[test]
fn sealed_room_round_trips_through_a_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join(format!("room.{}", ProcFile::EXTENSION));
    let output = Compiler::default()
        .compile_to_file(&sealed_room(), &DefaultMaterials, &mut NoProgress, &path)
        .expect("compiles");

    let summary = ProcSummary::read(&path).expect("readable");
    assert_eq!(summary.version, ProcFile::VERSION);
    assert_eq!(summary.num_entities, 1);
    assert_eq!(summary.num_areas, 1);
    assert_eq!(summary.num_groups, output.proc_file.world().map_or(0, |w| w.num_groups()));
    assert_eq!(summary.num_tris, output.stats.tris_out);
    assert_eq!(summary.num_lights, 1);
    assert_eq!(summary.num_planes, output.proc_file.planes.len());
    assert!(!summary.leaked);
}

#[test]
fn leaking_room_reports_leak_and_still_serializes() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("leak.proc");
    let output = Compiler::default()
        .compile_to_file(&leaking_room(), &DefaultMaterials, &mut NoProgress, &path)
        .expect("a leak is not fatal");

    let leak = output.proc_file.leak.as_ref().expect("leak path");
    assert_eq!(leak.entity_num, 0);
    assert_eq!(*leak.points.last().unwrap(), Point3::origin());
    assert!(output.diagnostics.iter().any(|d| matches!(d, Diagnostic::UnsealedMap { .. })));
    assert!(ProcSummary::read(&path).expect("readable").leaked);
}

#[test]
fn degenerate_brush_is_skipped() {
    let mut brushes = room_brushes(None);
    let plane = procmap::plane::Plane::from_normal(Vector3::z(), 0.0);
    brushes.push(MapBrush::new(vec![
        BrushSide::new(plane, support::WALL),
        BrushSide::new(plane.flipped(), support::WALL),
    ]));
    let scene = Scene::new().with_entity(world(brushes)).with_light(support::room_light());
    let output = Compiler::default()
        .compile(&scene, &DefaultMaterials, &mut NoProgress)
        .expect("compiles");
    assert_eq!(output.proc_file.num_world_brushes, 6);
    assert!(matches!(output.diagnostics[..], [Diagnostic::DegenerateGeometry { primitive: 6, .. }]));
    assert!(!output.proc_file.has_leak());
}

#[test]
fn patch_inside_room_is_drawn() {
    let control = (0..3)
        .flat_map(|r| {
            (0..3).map(move |c| PatchControl {
                pos: Point3::new(-16.0 + c as Real * 16.0, -16.0 + r as Real * 16.0, if c == 1 { 8.0 } else { 0.0 }),
                uv: [c as Real * 0.5, r as Real * 0.5],
            })
        })
        .collect();
    let scene = Scene::new()
        .with_entity(world(room_brushes(None)).with_patch(MapPatch::new(3, 3, control, "textures/base/curve")))
        .with_light(support::room_light());
    let output = Compiler::default()
        .compile(&scene, &DefaultMaterials, &mut NoProgress)
        .expect("compiles");
    assert_eq!(output.proc_file.num_patches, 1);
    let world = output.proc_file.world().expect("world entity");
    let smoothed: Vec<_> = world.areas[0].groups.iter().filter(|g| g.smoothed).collect();
    assert!(!smoothed.is_empty());
    for group in &smoothed {
        assert!(!group.optimized);
        assert!(!group.tri_list.is_empty());
        assert!(group.tri_list.iter().all(|t| t.plane_num == group.plane_num));
    }
}

#[test]
fn func_static_is_compiled_in_its_own_space() {
    let brush = MapBrush::from_bounds(Point3::new(4.0, -4.0, -28.0), Point3::new(12.0, 4.0, -20.0), support::WALL);
    let scene = sealed_room().with_entity(
        MapEntity::new("func_static")
            .with_key("origin", "8 0 -24")
            .with_key("name", "crate")
            .with_brush(brush),
    );
    let output = Compiler::default()
        .compile(&scene, &DefaultMaterials, &mut NoProgress)
        .expect("compiles");
    assert!(!output.proc_file.has_leak());
    assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);

    let entity = &output.proc_file.entities[1];
    assert_eq!(entity.name, "crate");
    assert_eq!(entity.origin, Point3::new(8.0, 0.0, -24.0));
    assert_eq!(entity.num_areas, 1);
    assert_eq!(entity.num_groups(), 6);
    let bounds = entity.tree.bounds;
    assert!(support::approx_eq(bounds.mins.x, -4.0, 1e-9));
    assert!(support::approx_eq(bounds.maxs.z, 4.0, 1e-9));
}

#[test]
fn cancellation_stops_without_writing() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("cancelled.proc");
    let mut calls = 0;
    let mut cancel_after_bsp = |_current: usize, _total: usize, label: &str| {
        calls += 1;
        if label.ends_with("bsp") { ControlFlow::Break(()) } else { ControlFlow::Continue(()) }
    };
    let result = Compiler::default().compile_to_file(&sealed_room(), &DefaultMaterials, &mut cancel_after_bsp, &path);
    match result {
        Err(CompileError::Cancelled { stage }) => assert!(stage.ends_with("bsp")),
        other => panic!("expected cancellation, got {other:?}"),
    }
    assert!(calls >= 2);
    assert!(!path.exists());
}

#[test]
fn unwritable_destination_is_a_serialization_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("missing").join("room.proc");
    let result = Compiler::default().compile_to_file(&sealed_room(), &DefaultMaterials, &mut NoProgress, &path);
    assert!(matches!(result, Err(CompileError::Serialization { .. })));
    assert!(!path.exists());
    assert_eq!(std::fs::read_dir(dir.path()).expect("listable").count(), 0);
}

#[test]
fn wrong_version_is_rejected() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("old.proc");
    std::fs::write(&path, format!("{} 2\nplanes 0\nleak 0\n", ProcFile::HEADER)).expect("writable");
    assert!(matches!(
        ProcSummary::read(&path),
        Err(ReadError::VersionMismatch { found: 2, .. })
    ));
}
