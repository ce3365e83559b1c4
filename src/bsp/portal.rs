//! Portalization: every leaf of the tree ends up bounded by portals shared
//! with its neighbours (or with the outside leaf).

use crate::aabb::Aabb;
use crate::bsp::{BspTree, NodeId, Portal, PortalId};
use crate::float_types::{CLIP_EPSILON, MAX_WORLD_SIZE, Real, SIDESPACE};
use crate::plane::{Plane, PlaneSet};
use crate::winding::Winding;
use nalgebra::Vector3;

const SPLIT_WINDING_EPSILON: Real = 0.001;

impl BspTree {
    /// Build the portals of the whole tree. The six portals of the expanded
    /// tree bounds connect the head node to the outside leaf; every node plane
    /// then adds one portal, and all portals are split down to the leaves.
    pub fn make_tree_portals(&mut self, planes: &PlaneSet) {
        if !self.bounds.is_valid() {
            return;
        }
        self.make_head_node_portals();
        self.make_tree_portals_r(self.head, planes);

        let live = self.portals.iter().filter(|p| p.live).count();
        tracing::debug!(portals = live, "tree portalized");
    }

    fn make_head_node_portals(&mut self) {
        let bounds = self.bounds.expanded(SIDESPACE);
        self.nodes[self.outside].bounds = Aabb::empty();

        let mut bplanes = Vec::with_capacity(6);
        let mut ids = Vec::with_capacity(6);
        for i in 0..3 {
            for j in 0..2 {
                // the plane faces into the box
                let mut normal = Vector3::zeros();
                let plane = if j == 0 {
                    normal[i] = 1.0;
                    Plane { normal, w: bounds.mins[i] }
                } else {
                    normal[i] = -1.0;
                    Plane { normal, w: -bounds.maxs[i] }
                };
                let id = self.portals.len();
                self.portals.push(Portal {
                    plane,
                    on_node: None,
                    nodes: [self.head, self.outside],
                    winding: Winding::base_for_plane(&plane, MAX_WORLD_SIZE),
                    live: true,
                });
                self.add_portal_to_nodes(id, self.head, self.outside);
                bplanes.push(plane);
                ids.push(id);
            }
        }

        // clip the base windings by all the other planes
        for (i, &id) in ids.iter().enumerate() {
            for (j, plane) in bplanes.iter().enumerate() {
                if i == j {
                    continue;
                }
                if let Some(w) = self.portals[id].winding.chop(plane, CLIP_EPSILON) {
                    self.portals[id].winding = w;
                }
            }
        }
    }

    fn make_tree_portals_r(&mut self, node: NodeId, planes: &PlaneSet) {
        self.calc_node_bounds(node);
        if self.nodes[node].is_leaf() {
            return;
        }
        self.make_node_portal(node, planes);
        self.split_node_portals(node, planes);

        let [front, back] = self.nodes[node].children;
        self.make_tree_portals_r(front, planes);
        self.make_tree_portals_r(back, planes);
    }

    fn calc_node_bounds(&mut self, node: NodeId) {
        let mut bounds = Aabb::empty();
        for &p in &self.nodes[node].portals {
            bounds.add_aabb(&self.portals[p].winding.bounds());
        }
        self.nodes[node].bounds = bounds;
    }

    /// Create the portal on the node's plane, bounded by the node's portals.
    fn make_node_portal(&mut self, node: NodeId, planes: &PlaneSet) {
        let Some(plane_num) = self.nodes[node].plane_num else {
            return;
        };
        let plane = planes[plane_num];
        let mut w = Some(Winding::base_for_plane(&plane, MAX_WORLD_SIZE));
        for &p in &self.nodes[node].portals {
            let portal = &self.portals[p];
            let clip = if portal.nodes[0] == node {
                portal.plane
            } else {
                portal.plane.flipped()
            };
            w = w.and_then(|w| w.chop(&clip, CLIP_EPSILON));
        }

        let Some(w) = w.filter(|w| !w.is_tiny()) else {
            tracing::trace!(node, "node portal clipped away");
            return;
        };
        let [front, back] = self.nodes[node].children;
        let id = self.portals.len();
        self.portals.push(Portal {
            plane,
            on_node: Some(node),
            nodes: [front, back],
            winding: w,
            live: true,
        });
        self.add_portal_to_nodes(id, front, back);
    }

    /// Move every portal of `node` onto its children, splitting the ones that
    /// cross the node plane.
    fn split_node_portals(&mut self, node: NodeId, planes: &PlaneSet) {
        let Some(plane_num) = self.nodes[node].plane_num else {
            return;
        };
        let plane = planes[plane_num];
        let [front, back] = self.nodes[node].children;

        let list: Vec<PortalId> = self.nodes[node].portals.clone();
        for p in list {
            let side = self.portals[p].side_of(node);
            let other = self.portals[p].other(node);
            let [n0, n1] = self.portals[p].nodes;
            self.remove_portal_from_node(p, n0);
            self.remove_portal_from_node(p, n1);

            let split = self.portals[p].winding.clip_to_plane(&plane, SPLIT_WINDING_EPSILON, false);
            let front_w = split.front.filter(|w| !w.is_tiny());
            let back_w = split.back.filter(|w| !w.is_tiny());

            match (front_w, back_w) {
                (None, None) => {
                    self.portals[p].live = false;
                },
                (Some(w), None) => {
                    self.portals[p].winding = w;
                    self.attach(p, side, front, other);
                },
                (None, Some(w)) => {
                    self.portals[p].winding = w;
                    self.attach(p, side, back, other);
                },
                (Some(fw), Some(bw)) => {
                    let mut new_portal = self.portals[p].clone();
                    new_portal.winding = bw;
                    let new_id = self.portals.len();
                    self.portals.push(new_portal);
                    self.portals[p].winding = fw;
                    self.attach(p, side, front, other);
                    self.attach(new_id, side, back, other);
                },
            }
        }
    }

    /// Reconnect a portal that used to touch the parent so that `child` takes
    /// the parent's place on side `side`.
    fn attach(&mut self, portal: PortalId, side: usize, child: NodeId, other: NodeId) {
        if side == 0 {
            self.add_portal_to_nodes(portal, child, other);
        } else {
            self.add_portal_to_nodes(portal, other, child);
        }
    }

    fn add_portal_to_nodes(&mut self, portal: PortalId, front: NodeId, back: NodeId) {
        self.portals[portal].nodes = [front, back];
        self.nodes[front].portals.push(portal);
        self.nodes[back].portals.push(portal);
    }

    fn remove_portal_from_node(&mut self, portal: PortalId, node: NodeId) {
        self.nodes[node].portals.retain(|&p| p != portal);
    }
}
