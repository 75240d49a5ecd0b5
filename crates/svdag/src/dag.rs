//! Bottom-up deduplication of identical subtrees, turning an SVO into a DAG.

use hashbrown::HashMap;
use svdag_core::{Error, Result};

use crate::level::{CompressionStage, LevelStructure};
use crate::node::{DagKey, NULL_NODE};

/// Compresses an SVO (or any `LevelStructure`) into a DAG in place by
/// merging structurally-identical nodes within each level, deepest level
/// first, and rewriting the parent level's child pointers to match.
pub struct DagCompressor;

impl DagCompressor {
    /// Errors with [`Error::WrongStateTransform`] if `levels` has already
    /// been through a DAG or SDAG pass — compressing twice would dedup an
    /// already-deduplicated tree against itself.
    #[tracing::instrument(skip_all)]
    pub fn compress(levels: &mut LevelStructure) -> Result<()> {
        if levels.stage() != CompressionStage::Svo {
            return Err(Error::WrongStateTransform(format!(
                "DAG compression requires an uncompressed structure, found {:?}",
                levels.stage()
            )));
        }
        let num_levels = levels.num_levels();
        for lev in (1..num_levels).rev() {
            Self::compress_level(levels, lev);
        }
        levels.set_stage(CompressionStage::Dag);
        tracing::debug!(n_nodes = levels.total_nodes(), "DAG compression complete");
        Ok(())
    }

    /// Deduplicates `levels[lev]` and remaps every child pointer in
    /// `levels[lev - 1]` accordingly. Empty nodes (`childMask == 0`) are
    /// skipped entirely — after `clean_empty_nodes` they are unreachable,
    /// so they retain no correspondence.
    fn compress_level(levels: &mut LevelStructure, lev: u32) {
        let old = std::mem::take(levels.level_mut(lev));
        let mut unique = Vec::with_capacity(old.len());
        let mut correspondences = vec![NULL_NODE; old.len()];

        {
            let mut seen = HashMap::with_capacity(old.len());
            for (i, node) in old.iter().enumerate() {
                if node.child_mask == 0 {
                    continue;
                }
                let key = DagKey(node);
                if let Some(&idx) = seen.get(&key) {
                    correspondences[i] = idx;
                } else {
                    let idx = unique.len() as u32;
                    seen.insert(key, idx);
                    unique.push(node.clone());
                    correspondences[i] = idx;
                }
            }
        }

        *levels.level_mut(lev) = unique;

        for node in levels.level_mut(lev - 1) {
            for c in 0..8usize {
                let child = node.children[c];
                if child != NULL_NODE {
                    node.children[c] = correspondences[child as usize];
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    fn level_with(nodes: Vec<Node>) -> LevelStructure {
        let mut ls = LevelStructure::new(2);
        *ls.level_mut(1) = nodes;
        ls
    }

    #[test]
    fn identical_leaves_merge_to_one() {
        let mut ls = level_with(vec![
            Node { child_mask: 0b0000_0001, ..Default::default() },
            Node { child_mask: 0b0000_0001, ..Default::default() },
        ]);
        ls.root_mut().set_child_bit(0);
        ls.root_mut().children[0] = 0;
        ls.root_mut().set_child_bit(7);
        ls.root_mut().children[7] = 1;

        DagCompressor::compress(&mut ls).unwrap();

        assert_eq!(ls.level(1).len(), 1);
        assert_eq!(ls.root().children[0], ls.root().children[7]);
    }

    #[test]
    fn distinct_leaves_stay_distinct() {
        let mut ls = level_with(vec![
            Node { child_mask: 0b0000_0001, ..Default::default() },
            Node { child_mask: 0b0000_0010, ..Default::default() },
        ]);
        ls.root_mut().set_child_bit(0);
        ls.root_mut().children[0] = 0;
        ls.root_mut().set_child_bit(7);
        ls.root_mut().children[7] = 1;

        DagCompressor::compress(&mut ls).unwrap();

        assert_eq!(ls.level(1).len(), 2);
        assert_ne!(ls.root().children[0], ls.root().children[7]);
    }

    #[test]
    fn compressing_twice_is_rejected() {
        let mut ls = LevelStructure::new(2);
        DagCompressor::compress(&mut ls).unwrap();
        assert!(DagCompressor::compress(&mut ls).is_err());
    }
}
