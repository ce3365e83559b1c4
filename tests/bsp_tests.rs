mod support;

use nalgebra::Point3;
use procmap::MapBrush;
use procmap::errors::Diagnostic;
use support::{INNER, OUTER, build_tree, room_brushes};

#[test]
fn sealed_box_has_one_interior_leaf_and_no_leak() {
    let (mut tree, planes, _) = build_tree(&room_brushes(None));
    let outcome = tree.flood_entities(0, &[Point3::origin()], &planes);
    assert!(outcome.leak.is_none());
    assert!(outcome.diagnostics.is_empty());
    assert_eq!(outcome.interior_leaves, 1);

    tree.fill_outside();
    assert_eq!(tree.interior_leaves().count(), 1);
    assert_eq!(tree.flood_areas(), 1);
    assert!(tree.inter_area_portals().is_empty());

    let leaf = tree.point_in_leaf(&Point3::new(10.0, -5.0, 3.0), &planes);
    assert_eq!(tree.nodes[leaf].area, Some(0));
}

#[test]
fn every_portal_joins_two_nodes() {
    let (tree, _, _) = build_tree(&room_brushes(None));
    for (id, portal) in tree.live_portals() {
        assert_ne!(portal.nodes[0], portal.nodes[1]);
        for node in portal.nodes {
            assert!(tree.nodes[node].is_leaf());
            assert!(tree.nodes[node].portals.contains(&id));
        }
    }
}

#[test]
fn box_missing_a_face_leaks_from_outside_to_inside() {
    let (mut tree, planes, _) = build_tree(&room_brushes(Some((0, 1.0))));
    let outcome = tree.flood_entities(0, &[Point3::origin()], &planes);
    let leak = outcome.leak.expect("room is open");
    assert_eq!(leak.occupant, Point3::origin());
    assert!(leak.points.len() >= 2);

    let first = leak.points[0];
    let outside_map = (0..3).any(|i| first[i].abs() > OUTER);
    assert!(outside_map, "leak starts outside the map, got {first}");
    assert_eq!(*leak.points.last().unwrap(), Point3::origin());
    assert!(matches!(outcome.diagnostics[0], Diagnostic::UnsealedMap { .. }));
}

#[test]
fn occupant_in_wall_is_reported() {
    let (mut tree, planes, _) = build_tree(&room_brushes(None));
    let in_wall = Point3::new(0.0, 0.0, INNER + 4.0);
    let outcome = tree.flood_entities(0, &[in_wall, Point3::origin()], &planes);
    assert!(outcome.leak.is_none());
    assert!(matches!(outcome.diagnostics[..], [Diagnostic::EntityInSolid { .. }]));
}

#[test]
fn no_occupants_keeps_unreachable_space() {
    let (mut tree, planes, _) = build_tree(&room_brushes(None));
    let outcome = tree.flood_entities(0, &[], &planes);
    assert!(matches!(outcome.diagnostics[..], [Diagnostic::NoOccupants { .. }]));
    assert_eq!(outcome.interior_leaves, 1);
}

#[test]
fn visportal_splits_room_into_two_areas() {
    let mut brushes = room_brushes(None);
    // a thin visportal slab across the middle of the room
    brushes.push(MapBrush::from_bounds(
        Point3::new(-1.0, -INNER, -INNER),
        Point3::new(1.0, INNER, INNER),
        "textures/editor/visportal",
    ));
    let (mut tree, planes, _) = build_tree(&brushes);
    let occupants = [Point3::new(-16.0, 0.0, 0.0), Point3::new(16.0, 0.0, 0.0)];
    let outcome = tree.flood_entities(0, &occupants, &planes);
    assert!(outcome.leak.is_none());
    tree.fill_outside();
    assert_eq!(tree.flood_areas(), 2);

    let portals = tree.inter_area_portals();
    assert!(!portals.is_empty());
    for portal in &portals {
        assert_ne!(portal.area0, portal.area1);
    }
    let west = tree.point_in_leaf(&occupants[0], &planes);
    let east = tree.point_in_leaf(&occupants[1], &planes);
    assert_ne!(tree.nodes[west].area, tree.nodes[east].area);
}
