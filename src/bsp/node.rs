//! BSP tree storage: nodes and portals live in arenas and refer to each
//! other by index.

use crate::aabb::Aabb;
use crate::plane::{Plane, PlaneIndex};
use crate::winding::Winding;

pub type NodeId = usize;
pub type PortalId = usize;

/// A BSP node, or a leaf when `plane_num` is `None`.
#[derive(Debug, Clone)]
pub struct BspNode {
    /// Splitting plane (always the positive member of its pair).
    pub plane_num: Option<PlaneIndex>,
    /// Front and back subtrees. Meaningless for leaves.
    pub children: [NodeId; 2],
    pub parent: Option<NodeId>,
    /// Bounds of the portals touching the node.
    pub bounds: Aabb,
    /// Filled by an opaque brush, or by the outside fill.
    pub opaque: bool,
    /// Inside an area portal brush.
    pub area_portal: bool,
    /// Reached from an occupant during the flood fill.
    pub occupied: bool,
    pub area: Option<usize>,
    /// Portals bounding this node. Only leaves keep portals once the tree is
    /// fully portalized.
    pub portals: Vec<PortalId>,
}

impl BspNode {
    pub fn leaf(parent: Option<NodeId>) -> Self {
        BspNode {
            plane_num: None,
            children: [0, 0],
            parent,
            bounds: Aabb::empty(),
            opaque: false,
            area_portal: false,
            occupied: false,
            area: None,
            portals: Vec::new(),
        }
    }

    pub const fn is_leaf(&self) -> bool {
        self.plane_num.is_none()
    }
}

/// The shared boundary between exactly two nodes. The plane faces `nodes[0]`.
#[derive(Debug, Clone)]
pub struct Portal {
    pub plane: Plane,
    /// Node whose splitting plane created the portal; `None` for the portals
    /// around the head node.
    pub on_node: Option<NodeId>,
    pub nodes: [NodeId; 2],
    pub winding: Winding,
    /// Cleared when the portal is clipped away.
    pub live: bool,
}

impl Portal {
    /// The node on the other side from `node`.
    pub fn other(&self, node: NodeId) -> NodeId {
        if self.nodes[0] == node { self.nodes[1] } else { self.nodes[0] }
    }

    /// 0 if `node` is in front of the portal plane, 1 if behind.
    pub fn side_of(&self, node: NodeId) -> usize {
        if self.nodes[0] == node { 0 } else { 1 }
    }
}
