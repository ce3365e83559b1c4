//! Flood fills over the portal graph: leak detection from the outside leaf,
//! occupancy from entity origins, outside filling and area numbering.

use crate::bsp::{BspTree, NodeId, PortalId};
use crate::errors::Diagnostic;
use crate::float_types::Real;
use crate::plane::{Plane, PlaneSet};
use crate::winding::Winding;
use nalgebra::Point3;
use std::collections::VecDeque;

/// The trail from outside the map to an occupant that can see it.
#[derive(Debug, Clone, PartialEq)]
pub struct LeakPath {
    pub entity_num: usize,
    /// Starts outside the map bounds, ends at `occupant`.
    pub points: Vec<Point3<Real>>,
    pub occupant: Point3<Real>,
}

/// A portal separating two different areas.
#[derive(Debug, Clone, PartialEq)]
pub struct InterAreaPortal {
    /// Area on the side the plane faces.
    pub area0: usize,
    /// Area behind the plane.
    pub area1: usize,
    pub plane: Plane,
    pub winding: Winding,
}

/// What the occupancy flood found.
#[derive(Debug, Clone, Default)]
pub struct FloodOutcome {
    pub leak: Option<LeakPath>,
    pub diagnostics: Vec<Diagnostic>,
    pub interior_leaves: usize,
}

impl BspTree {
    fn passable(&self, portal: PortalId) -> bool {
        let [a, b] = self.portals[portal].nodes;
        !self.nodes[a].opaque && !self.nodes[b].opaque
    }

    /// Breadth-first search from `starts` through passable portals. Returns,
    /// per node, how it was first reached: `Some(None)` for a start and
    /// `Some(Some((from, portal)))` otherwise.
    fn breadth_first(
        &self,
        starts: &[NodeId],
        enter_outside: bool,
    ) -> Vec<Option<Option<(NodeId, PortalId)>>> {
        let mut reached = vec![None; self.nodes.len()];
        let mut queue = VecDeque::new();
        for &start in starts {
            if reached[start].is_none() {
                reached[start] = Some(None);
                queue.push_back(start);
            }
        }
        while let Some(node) = queue.pop_front() {
            for &p in &self.nodes[node].portals {
                if !self.portals[p].live || !self.passable(p) {
                    continue;
                }
                let other = self.portals[p].other(node);
                if reached[other].is_some() || (other == self.outside && !enter_outside) {
                    continue;
                }
                reached[other] = Some(Some((node, p)));
                queue.push_back(other);
            }
        }
        reached
    }

    /// Flood from the outside leaf looking for `occupants`, then mark the
    /// interior reachable from them as occupied.
    ///
    /// A leak is the first occupant (in the given order) the outside flood
    /// reaches. Occupants in opaque leaves are reported and ignored. Without
    /// any occupant every empty leaf unreachable from outside is interior.
    pub fn flood_entities(&mut self, entity_num: usize, occupants: &[Point3<Real>], planes: &PlaneSet) -> FloodOutcome {
        let mut outcome = FloodOutcome::default();

        let mut occupant_leaves = Vec::new();
        for origin in occupants {
            let leaf = self.point_in_leaf(origin, planes);
            if self.nodes[leaf].opaque {
                outcome.diagnostics.push(Diagnostic::EntityInSolid { entity: entity_num, origin: *origin });
                continue;
            }
            occupant_leaves.push((leaf, *origin));
        }

        let from_outside = self.breadth_first(&[self.outside], true);

        if let Some(&(leaf, origin)) = occupant_leaves.iter().find(|(leaf, _)| from_outside[*leaf].is_some()) {
            let points = self.trace_leak(&from_outside, leaf, origin);
            outcome.diagnostics.push(Diagnostic::UnsealedMap {
                entity: entity_num,
                occupant: origin,
                path_len: points.len(),
            });
            outcome.leak = Some(LeakPath { entity_num, points, occupant: origin });
        }

        let interior: Vec<NodeId> = if occupant_leaves.is_empty() {
            outcome.diagnostics.push(Diagnostic::NoOccupants { entity: entity_num });
            self.leaves()
                .filter(|&n| !self.nodes[n].opaque && from_outside[n].is_none())
                .collect()
        } else {
            let starts: Vec<NodeId> = occupant_leaves.iter().map(|(leaf, _)| *leaf).collect();
            let reached = self.breadth_first(&starts, false);
            self.leaves().filter(|&n| reached[n].is_some()).collect()
        };
        for &leaf in &interior {
            self.nodes[leaf].occupied = true;
        }
        outcome.interior_leaves = interior.len();
        outcome
    }

    /// Portal centres from the outside leaf to `leaf`, then the occupant.
    fn trace_leak(
        &self,
        reached: &[Option<Option<(NodeId, PortalId)>>],
        leaf: NodeId,
        origin: Point3<Real>,
    ) -> Vec<Point3<Real>> {
        let mut points = vec![origin];
        let mut node = leaf;
        while let Some(Some((from, portal))) = reached[node] {
            points.push(self.portals[portal].winding.center());
            node = from;
        }
        points.reverse();
        points
    }

    /// Make every empty leaf the flood did not mark occupied opaque. Returns
    /// the number of leaves filled.
    pub fn fill_outside(&mut self) -> usize {
        let leaves: Vec<NodeId> = self.leaves().collect();
        let mut filled = 0;
        for leaf in leaves {
            let node = &mut self.nodes[leaf];
            if !node.opaque && !node.occupied {
                node.opaque = true;
                node.area_portal = false;
                filled += 1;
            }
        }
        tracing::debug!(filled, "outside filled");
        filled
    }

    /// Number the areas: connected groups of occupied leaves, not crossing
    /// area portal leaves. Area portal leaves then join a neighbouring area.
    /// Returns the number of areas.
    pub fn flood_areas(&mut self) -> usize {
        let leaves: Vec<NodeId> = self.leaves().collect();
        let mut num_areas = 0;

        for &start in &leaves {
            let n = &self.nodes[start];
            if !n.occupied || n.opaque || n.area_portal || n.area.is_some() {
                continue;
            }
            let area = num_areas;
            num_areas += 1;
            self.nodes[start].area = Some(area);
            let mut queue = VecDeque::from([start]);
            while let Some(node) = queue.pop_front() {
                for i in 0..self.nodes[node].portals.len() {
                    let p = self.nodes[node].portals[i];
                    if !self.portals[p].live {
                        continue;
                    }
                    let other = self.portals[p].other(node);
                    let o = &self.nodes[other];
                    if other == self.outside || !o.occupied || o.opaque || o.area_portal || o.area.is_some() {
                        continue;
                    }
                    self.nodes[other].area = Some(area);
                    queue.push_back(other);
                }
            }
        }

        // area portal leaves take the first neighbouring area
        let mut pending: Vec<NodeId> = leaves
            .iter()
            .copied()
            .filter(|&n| {
                let node = &self.nodes[n];
                node.occupied && !node.opaque && node.area_portal && node.area.is_none()
            })
            .collect();
        loop {
            let before = pending.len();
            pending.retain(|&leaf| {
                let neighbour_area = self.nodes[leaf]
                    .portals
                    .iter()
                    .filter(|&&p| self.portals[p].live)
                    .find_map(|&p| self.nodes[self.portals[p].other(leaf)].area);
                match neighbour_area {
                    Some(area) => {
                        self.nodes[leaf].area = Some(area);
                        false
                    },
                    None => true,
                }
            });
            if pending.is_empty() || pending.len() == before {
                break;
            }
        }
        for leaf in pending {
            self.nodes[leaf].area = Some(num_areas);
            num_areas += 1;
        }
        num_areas
    }

    /// Put every empty, non-outside leaf in area 0. Used by entities that are
    /// not flood filled.
    pub fn single_area(&mut self) -> usize {
        let leaves: Vec<NodeId> = self.leaves().collect();
        for leaf in leaves {
            if !self.nodes[leaf].opaque {
                self.nodes[leaf].occupied = true;
                self.nodes[leaf].area = Some(0);
            }
        }
        1
    }

    /// Portals whose two leaves belong to different areas.
    pub fn inter_area_portals(&self) -> Vec<InterAreaPortal> {
        self.live_portals()
            .filter_map(|(_, portal)| {
                let [a, b] = portal.nodes;
                let (na, nb) = (&self.nodes[a], &self.nodes[b]);
                if na.opaque || nb.opaque {
                    return None;
                }
                match (na.area, nb.area) {
                    (Some(area0), Some(area1)) if area0 != area1 => Some(InterAreaPortal {
                        area0,
                        area1,
                        plane: portal.plane,
                        winding: portal.winding.clone(),
                    }),
                    _ => None,
                }
            })
            .collect()
    }
}
