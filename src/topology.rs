//! Topology planner: computes a balanced B-tree layout for a file's data
//! given a byte budget per node, without touching any bytes itself.
//!
//! Interior nodes carry no inline data of their own, only child hashes; all
//! of `total_size` lives in the leaves. This is the simplest layout that
//! still keeps every node's encoded image within `node_limit`, stays
//! deterministic and balanced, and matches the one-s-node-per-leaf chunking
//! the controller's write path expects.

use alloc::vec::Vec;

use crate::error::CasError;
use crate::header::{CHILD_HASH_SIZE, HEADER_SIZE, MAX_CONTENT_TYPE_LEN, MIN_NODE_LIMIT};

/// One node in the planned layout. Leaves have `data_size > 0` (or `0` only
/// for the degenerate empty-file tree, a single leaf of size 0) and no
/// children; interior nodes have `data_size == 0` and one or more children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutNode {
    pub data_size: u64,
    pub children: Vec<LayoutNode>,
}

impl LayoutNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// The maximum inline data bytes a childless node can hold under `node_limit`.
///
/// Reserves the header and a worst-case content-type slot (the root f-node
/// always carries one) in addition to the data itself, so a leaf planned at
/// this capacity still fits within `node_limit` once it is encoded as the
/// file root.
pub fn usable_space(node_limit: u32) -> u32 {
    node_limit.saturating_sub(HEADER_SIZE as u32 + MAX_CONTENT_TYPE_LEN as u32)
}

/// The maximum number of child hashes a node with no inline data can hold
/// under `node_limit`.
fn branching_factor(node_limit: u32) -> u32 {
    usable_space(node_limit) / CHILD_HASH_SIZE as u32
}

/// Computes a balanced layout for `total_size` bytes under `node_limit`.
///
/// Fails with `NodeLimitTooSmall` if `node_limit` is below the documented
/// minimum, or if it admits a leaf capacity but a branching factor too small
/// (`< 2`) to ever merge more than one leaf — such a limit can represent a
/// single leaf but can never plan a multi-node tree.
pub fn compute_layout(total_size: u64, node_limit: u32) -> Result<LayoutNode, CasError> {
    if node_limit < MIN_NODE_LIMIT {
        return Err(CasError::NodeLimitTooSmall);
    }

    let cap = usable_space(node_limit) as u64;

    if total_size <= cap {
        return Ok(LayoutNode { data_size: total_size, children: Vec::new() });
    }

    let branching = branching_factor(node_limit) as u64;
    if branching < 2 {
        return Err(CasError::NodeLimitTooSmall);
    }

    let num_leaves = div_ceil_u64(total_size, cap);
    let mut layer: Vec<LayoutNode> = Vec::with_capacity(num_leaves as usize);
    let mut remaining = total_size;
    for _ in 0..num_leaves {
        let chunk = core::cmp::min(cap, remaining);
        layer.push(LayoutNode { data_size: chunk, children: Vec::new() });
        remaining -= chunk;
    }

    while layer.len() > 1 {
        let mut next = Vec::with_capacity(div_ceil_usize(layer.len(), branching as usize));
        let mut iter = layer.into_iter();
        loop {
            let group: Vec<LayoutNode> = iter.by_ref().take(branching as usize).collect();
            if group.is_empty() {
                break;
            }
            next.push(LayoutNode { data_size: 0, children: group });
        }
        layer = next;
    }

    Ok(layer.into_iter().next().expect("at least one leaf was planned"))
}

/// Total bytes a layout subtree's nodes would store inline, summed
/// recursively. Used to check the "sum equals total_size" invariant.
pub fn total_data_size(node: &LayoutNode) -> u64 {
    node.data_size + node.children.iter().map(total_data_size).sum::<u64>()
}

/// Depth of the subtree rooted at `node` (0 for a leaf).
pub fn depth(node: &LayoutNode) -> usize {
    if node.children.is_empty() {
        0
    } else {
        1 + depth(&node.children[0])
    }
}

/// True if every leaf under `node` sits at the same depth.
pub fn is_balanced(node: &LayoutNode) -> bool {
    fn leaf_depths(node: &LayoutNode, depth: usize, out: &mut Vec<usize>) {
        if node.children.is_empty() {
            out.push(depth);
        } else {
            for c in &node.children {
                leaf_depths(c, depth + 1, out);
            }
        }
    }
    let mut depths = Vec::new();
    leaf_depths(node, 0, &mut depths);
    depths.windows(2).all(|w| w[0] == w[1])
}

fn div_ceil_u64(a: u64, b: u64) -> u64 {
    (a + b - 1) / b
}

fn div_ceil_usize(a: usize, b: usize) -> usize {
    (a + b - 1) / b
}
