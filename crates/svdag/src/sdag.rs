//! Symmetry-aware compression: deduplicates subtrees up to the 8 axis
//! mirror variants, turning a DAG into an SDAG.

use hashbrown::HashMap;
use svdag_core::{Error, Result};

use crate::level::{CompressionStage, LevelStructure};
use crate::node::{MirrorAxes, Node, SdagKeyOwned, NULL_NODE};

/// Which of the two subtree-matching strategies to run per level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// Probe the node itself plus its 7 mirror variants against the level's
    /// unique set, in the fixed order `MirrorAxes::NON_IDENTITY`. First hit
    /// wins. O(unique) per probe but never builds an intermediate form.
    EightLookup,
    /// Reduce each node to its lexicographically-smallest mirror variant
    /// first, then dedup by that canonical form. One hash lookup per node.
    Canonical,
}

pub struct SdagCompressor;

impl SdagCompressor {
    /// Errors with [`Error::WrongStateTransform`] if `levels` has already
    /// been through a DAG or SDAG pass — this stage operates on an
    /// uncompressed SVO directly (it does its own, symmetry-aware dedup),
    /// so running it after `DagCompressor` or a prior SDAG pass would
    /// dedup already-merged nodes against each other.
    #[tracing::instrument(skip_all)]
    pub fn compress(levels: &mut LevelStructure, strategy: Strategy) -> Result<()> {
        if levels.stage() != CompressionStage::Svo {
            return Err(Error::WrongStateTransform(format!(
                "SDAG compression requires an uncompressed structure, found {:?}",
                levels.stage()
            )));
        }
        let num_levels = levels.num_levels();
        for lev in (1..num_levels).rev() {
            Self::compress_level(levels, lev, strategy);
        }
        levels.set_stage(CompressionStage::Sdag);
        tracing::debug!(n_nodes = levels.total_nodes(), ?strategy, "SDAG compression complete");
        Ok(())
    }

    fn compress_level(levels: &mut LevelStructure, lev: u32, strategy: Strategy) {
        let mut old = std::mem::take(levels.level_mut(lev));

        for node in old.iter_mut() {
            node.compute_invariance();
        }
        if lev + 1 < levels.num_levels() {
            let below = levels.level(lev + 1);
            for node in old.iter_mut() {
                invert_invs(node, below);
            }
        }

        let (unique, correspondences) = match strategy {
            Strategy::EightLookup => compress_eight_lookup(&old),
            Strategy::Canonical => compress_canonical(&old),
        };

        *levels.level_mut(lev) = unique;

        for node in levels.level_mut(lev - 1) {
            for c in 0..8usize {
                let child = node.children[c];
                if child == NULL_NODE {
                    continue;
                }
                let (idx, axes) = correspondences[child as usize];
                node.children[c] = idx;
                if axes.x {
                    node.mirror_x |= 1 << c;
                }
                if axes.y {
                    node.mirror_y |= 1 << c;
                }
                if axes.z {
                    node.mirror_z |= 1 << c;
                }
            }
        }
    }
}

/// Clears per-child mirror bits that would be redundant: if child `c`'s
/// target node is already invariant under an axis, flagging that edge
/// mirrored about the same axis produces an identical traversal, so the two
/// encodings would otherwise count as distinct nodes for no reason.
fn invert_invs(node: &mut Node, child_level: &[Node]) {
    for c in 0..8usize {
        if node.child_mask & (1 << c) == 0 {
            continue;
        }
        let child = node.children[c];
        if child == NULL_NODE {
            continue;
        }
        let inv = child_level[child as usize].invariant_mask;
        if inv & 0b001 != 0 {
            node.mirror_x &= !(1 << c);
        }
        if inv & 0b010 != 0 {
            node.mirror_y &= !(1 << c);
        }
        if inv & 0b100 != 0 {
            node.mirror_z &= !(1 << c);
        }
    }
}

type Correspondence = (u32, MirrorAxes);

fn compress_eight_lookup(old: &[Node]) -> (Vec<Node>, Vec<Correspondence>) {
    let mut unique: Vec<Node> = Vec::with_capacity(old.len());
    let mut seen: HashMap<SdagKeyOwned, u32> = HashMap::with_capacity(old.len());
    let mut correspondences = vec![(NULL_NODE, MirrorAxes::IDENTITY); old.len()];

    for (i, node) in old.iter().enumerate() {
        if node.child_mask == 0 {
            continue;
        }
        let key = SdagKeyOwned::from(node);
        let mut found = seen.get(&key).map(|&idx| (idx, MirrorAxes::IDENTITY));
        if found.is_none() {
            for &axes in &MirrorAxes::NON_IDENTITY {
                let variant = node.mirror(axes);
                if let Some(&idx) = seen.get(&SdagKeyOwned::from(&variant)) {
                    found = Some((idx, axes));
                    break;
                }
            }
        }
        correspondences[i] = match found {
            Some(hit) => hit,
            None => {
                let idx = unique.len() as u32;
                seen.insert(key, idx);
                unique.push(node.clone());
                (idx, MirrorAxes::IDENTITY)
            }
        };
    }

    (unique, correspondences)
}

fn compress_canonical(old: &[Node]) -> (Vec<Node>, Vec<Correspondence>) {
    let mut unique: Vec<Node> = Vec::with_capacity(old.len());
    let mut seen: HashMap<SdagKeyOwned, u32> = HashMap::with_capacity(old.len());
    let mut correspondences = vec![(NULL_NODE, MirrorAxes::IDENTITY); old.len()];

    for (i, node) in old.iter().enumerate() {
        if node.child_mask == 0 {
            continue;
        }
        let (canon, axes) = node.canonical();
        let key = SdagKeyOwned::from(&canon);
        let idx = if let Some(&idx) = seen.get(&key) {
            idx
        } else {
            let idx = unique.len() as u32;
            seen.insert(key, idx);
            unique.push(canon);
            idx
        };
        correspondences[i] = (idx, axes);
    }

    (unique, correspondences)
}
