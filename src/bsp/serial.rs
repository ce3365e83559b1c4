//! Face BSP construction, brush filtering and winding filtering.

use crate::aabb::Aabb;
use crate::bsp::traits::SplitPlaneStrategy;
use crate::bsp::{BspFace, BspNode, BspTree, NodeId};
use crate::float_types::{CLIP_EPSILON, Real};
use crate::plane::{PlaneIndex, PlaneSet};
use crate::primitive::ProcBrush;
use crate::winding::Winding;

/// How far inside a brush a leaf centre must be to count as filled.
const LEAF_INSIDE_MARGIN: Real = CLIP_EPSILON;

impl BspTree {
    /// Partition space by the planes of `faces` until no face is left.
    ///
    /// Faces on a node's plane are consumed by that node; every other face is
    /// split into the children. A node left without faces becomes a leaf.
    pub fn build<SP: SplitPlaneStrategy + ?Sized>(faces: Vec<BspFace>, planes: &PlaneSet, strategy: &SP) -> Self {
        let mut bounds = Aabb::empty();
        for face in &faces {
            bounds.add_aabb(&face.winding.bounds());
        }

        let mut tree = BspTree {
            nodes: Vec::new(),
            portals: Vec::new(),
            head: 0,
            outside: 0,
            bounds,
        };
        tree.head = tree.build_node(faces, None, planes, strategy);
        tree.outside = tree.nodes.len();
        tree.nodes.push(BspNode::leaf(None));

        tracing::debug!(
            nodes = tree.nodes.len(),
            leaves = tree.num_leaves(),
            "face bsp built"
        );
        tree
    }

    fn build_node<SP: SplitPlaneStrategy + ?Sized>(
        &mut self,
        faces: Vec<BspFace>,
        parent: Option<NodeId>,
        planes: &PlaneSet,
        strategy: &SP,
    ) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(BspNode::leaf(parent));

        let Some(split) = strategy.select_split_plane(&faces, planes) else {
            return id;
        };
        let plane = planes[split];

        let mut front = Vec::with_capacity(faces.len() / 2);
        let mut back = Vec::with_capacity(faces.len() / 2);
        for face in faces {
            if PlaneSet::canonical(face.plane_num) == split {
                continue;
            }
            let pieces = face.winding.clip_to_plane(&plane, CLIP_EPSILON, false);
            if let Some(winding) = pieces.front {
                front.push(BspFace { plane_num: face.plane_num, winding });
            }
            if let Some(winding) = pieces.back {
                back.push(BspFace { plane_num: face.plane_num, winding });
            }
        }

        self.nodes[id].plane_num = Some(split);
        let front_child = self.build_node(front, Some(id), planes, strategy);
        let back_child = self.build_node(back, Some(id), planes, strategy);
        self.nodes[id].children = [front_child, back_child];
        id
    }

    /// Mark leaves inside opaque brushes as opaque, and leaves inside area
    /// portal brushes as area portals. Needs portals for the leaf centres.
    pub fn filter_brushes(&mut self, brushes: &[&ProcBrush], planes: &PlaneSet) -> usize {
        let leaves: Vec<NodeId> = self.leaves().collect();
        let mut opaque = 0;
        for leaf in leaves {
            let center = self.leaf_center(leaf);
            let containing = brushes.iter().filter(|b| {
                b.bounds.contains_point(&center) && b.contains_point(&center, planes, LEAF_INSIDE_MARGIN)
            });
            for brush in containing {
                if brush.opaque {
                    self.nodes[leaf].opaque = true;
                } else if brush.area_portal {
                    self.nodes[leaf].area_portal = true;
                }
            }
            if self.nodes[leaf].opaque {
                self.nodes[leaf].area_portal = false;
                opaque += 1;
            }
        }
        tracing::debug!(opaque, "brushes filtered into tree");
        opaque
    }

    /// Push `winding` (lying on `plane_num`) down the tree and collect the
    /// fragments that land in empty leaves with an area, as `(area, fragment)`.
    ///
    /// A winding on a node's own plane goes to the front, on the opposite
    /// plane to the back, so faces end up on the side they face.
    pub fn filter_winding(&self, winding: Winding, plane_num: PlaneIndex, planes: &PlaneSet) -> Vec<(usize, Winding)> {
        let mut out = Vec::new();
        let mut stack = vec![(self.head, winding)];
        while let Some((node, w)) = stack.pop() {
            let n = &self.nodes[node];
            let Some(split) = n.plane_num else {
                if node != self.outside && !n.opaque {
                    if let Some(area) = n.area {
                        out.push((area, w));
                    }
                }
                continue;
            };
            if split == plane_num {
                stack.push((n.children[0], w));
            } else if split == PlaneSet::opposite(plane_num) {
                stack.push((n.children[1], w));
            } else {
                let pieces = w.clip_to_plane(&planes[split], CLIP_EPSILON, true);
                if let Some(back) = pieces.back {
                    stack.push((n.children[1], back));
                }
                if let Some(front) = pieces.front {
                    stack.push((n.children[0], front));
                }
            }
        }
        out
    }
}
