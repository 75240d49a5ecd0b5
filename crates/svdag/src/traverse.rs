//! Random-access point-location and per-child navigation over a flat
//! encoding (see `encode`). Read-only: holds only the word stream and the
//! handful of header values needed to interpret it.

use glam::Vec3;
use svdag_core::Aabb;

use crate::node::MirrorAxes;

/// A cursor into the encoded word stream: its absolute word offset and the
/// octree level it sits at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TravNode {
    pub idx: u32,
    pub level: u32,
}

/// Octant `c`'s child center, given the parent `center`/`half_side`. Kept
/// local rather than shared with the voxelizer's identical helper, since the
/// two live in otherwise-unrelated, independently-testable modules.
fn child_center(center: Vec3, half_side: f32, c: usize) -> Vec3 {
    let q = half_side * 0.5;
    let sx = if c & 0b100 != 0 { q } else { -q };
    let sy = if c & 0b010 != 0 { q } else { -q };
    let sz = if c & 0b001 != 0 { q } else { -q };
    center + Vec3::new(sx, sy, sz)
}

fn octant_for_point(center: Vec3, point: Vec3) -> usize {
    let x = (point.x > center.x) as usize;
    let y = (point.y > center.y) as usize;
    let z = (point.z > center.z) as usize;
    (x << 2) | (y << 1) | z
}

/// Read-only view over an encoded DAG/SDAG word stream.
pub struct EncodedTraverser<'a> {
    words: &'a [u32],
    levels: u32,
    bbox: Aabb,
    root_side: f32,
}

impl<'a> EncodedTraverser<'a> {
    pub fn new(words: &'a [u32], levels: u32, bbox: Aabb, root_side: f32) -> Self {
        Self { words, levels, bbox, root_side }
    }

    pub fn get_root_trav_node(&self) -> TravNode {
        TravNode { idx: 0, level: 0 }
    }

    fn header(&self, node: TravNode) -> u32 {
        self.words[node.idx as usize]
    }

    pub fn has_child(&self, node: TravNode, c: usize) -> bool {
        (self.header(node) & 0xFF) & (1 << c) != 0
    }

    /// Returns the child cursor and the mirror flags to apply while
    /// descending into it, or `None` if octant `c` is empty.
    pub fn get_child(&self, node: TravNode, c: usize) -> Option<(TravNode, MirrorAxes)> {
        if !self.has_child(node, c) {
            return None;
        }
        let header = self.header(node);
        let mask = (header & 0xFF) as u8;
        // Children are stored descending (7..0); bit c's pointer word sits
        // at the count of set bits at or above c.
        let offset = (mask >> c).count_ones();
        let ptr = self.words[node.idx as usize + offset as usize];
        let axes = MirrorAxes {
            x: (header >> 8) & (1 << c) != 0,
            y: (header >> 16) & (1 << c) != 0,
            z: (header >> 24) & (1 << c) != 0,
        };
        Some((TravNode { idx: ptr, level: node.level + 1 }, axes))
    }

    pub fn is_leaf(&self, node: TravNode) -> bool {
        node.level == self.levels - 1
    }

    /// Descends from the root, selecting the child octant on each side of
    /// the current cell's center (half-open: a point exactly on a split
    /// plane falls to the positive side), reflecting the query point about
    /// the child's center whenever a mirror flag arrives. Returns the
    /// deepest level reached, or `-1` if `p` is outside the scene bbox.
    pub fn traverse(&self, p: Vec3) -> i32 {
        if !self.bbox.contains_point_half_open(p) {
            return -1;
        }

        let mut node = self.get_root_trav_node();
        let mut center = self.bbox.center();
        let mut half_side = self.root_side * 0.5;
        let mut point = p;

        for level in 0..self.levels {
            let c = octant_for_point(center, point);
            if !self.has_child(node, c) {
                return level as i32;
            }
            if level + 1 == self.levels {
                // Leaf level: childMask is an occupancy mask, not a pointer
                // table, so there is nothing further to descend into.
                break;
            }
            let (child, axes) = self.get_child(node, c).expect("hasChild true");
            let next_center = child_center(center, half_side, c);
            if axes.x {
                point.x = 2.0 * next_center.x - point.x;
            }
            if axes.y {
                point.y = 2.0 * next_center.y - point.y;
            }
            if axes.z {
                point.z = 2.0 * next_center.z - point.z;
            }
            center = next_center;
            half_side *= 0.5;
            node = child;
        }

        self.levels as i32
    }
}
