//! Binary space partitioning of an entity's brush faces, portalization of the
//! resulting leaves, and the flood fills that find leaks and areas.
//!
//! Nodes and portals are stored in arenas inside [`BspTree`] and reference each
//! other by index, so the portal graph has no ownership cycles.

pub mod flood;
pub mod node;
pub mod portal;
pub mod serial;
pub mod traits;

pub use flood::{FloodOutcome, InterAreaPortal, LeakPath};
pub use node::{BspNode, NodeId, Portal, PortalId};
pub use traits::{AxialBalancedStrategy, SplitPlaneStrategy};

use crate::aabb::Aabb;
use crate::float_types::Real;
use crate::plane::{PlaneIndex, PlaneSet};
use crate::winding::Winding;
use nalgebra::Point3;

/// A polygon fed to the face BSP, on plane `plane_num`.
#[derive(Debug, Clone)]
pub struct BspFace {
    pub plane_num: PlaneIndex,
    pub winding: Winding,
}

#[derive(Debug, Clone)]
pub struct BspTree {
    pub nodes: Vec<BspNode>,
    pub portals: Vec<Portal>,
    pub head: NodeId,
    /// The leaf standing for everything beyond the entity bounds.
    pub outside: NodeId,
    /// Bounds of the faces the tree was built from.
    pub bounds: Aabb,
}

impl Default for BspTree {
    fn default() -> Self {
        BspTree {
            nodes: vec![BspNode::leaf(None), BspNode::leaf(None)],
            portals: Vec::new(),
            head: 0,
            outside: 1,
            bounds: Aabb::empty(),
        }
    }
}

impl BspTree {
    /// Every leaf except the outside leaf.
    pub fn leaves(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).filter(move |&n| n != self.outside && self.nodes[n].is_leaf())
    }

    /// The leaf containing `point`. Points on a plane go to the front.
    pub fn point_in_leaf(&self, point: &Point3<Real>, planes: &PlaneSet) -> NodeId {
        let mut node = self.head;
        while let Some(plane_num) = self.nodes[node].plane_num {
            let d = planes[plane_num].distance(point);
            node = self.nodes[node].children[if d >= 0.0 { 0 } else { 1 }];
        }
        node
    }

    /// A point strictly inside a portalized leaf: the average of its portal
    /// points, or the tree bounds centre when it has no portals.
    pub fn leaf_center(&self, leaf: NodeId) -> Point3<Real> {
        let mut sum = nalgebra::Vector3::zeros();
        let mut count = 0usize;
        for &p in &self.nodes[leaf].portals {
            for point in &self.portals[p].winding.points {
                sum += point.coords;
                count += 1;
            }
        }
        if count == 0 {
            return self.bounds.center();
        }
        Point3::from(sum / count as Real)
    }

    pub fn num_leaves(&self) -> usize {
        self.leaves().count()
    }

    pub fn live_portals(&self) -> impl Iterator<Item = (PortalId, &Portal)> {
        self.portals.iter().enumerate().filter(|(_, p)| p.live)
    }

    /// Empty leaves that were reached from an occupant.
    pub fn interior_leaves(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.leaves()
            .filter(move |&n| !self.nodes[n].opaque && self.nodes[n].occupied)
    }
}
