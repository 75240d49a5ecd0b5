//! Packs a level-structured DAG/SDAG into one contiguous 32-bit word stream
//! with inline child pointers.

use svdag_core::{Error, Result};

use crate::level::LevelStructure;

/// The flat encoding of a DAG: a word stream plus the two values needed to
/// interpret it (`first_leaf_ptr` is the word index where leaf-only records
/// begin; `n_nodes` is the logical node count, not the word count).
#[derive(Clone, Debug)]
pub struct EncodedDag {
    pub words: Vec<u32>,
    pub first_leaf_ptr: u32,
    pub n_nodes: u32,
}

impl EncodedDag {
    /// Walks every inner-node header in the word stream and checks that
    /// each of its child pointer words (one per set `childMask` bit,
    /// descending octant order) lands inside the buffer. Catches a
    /// truncated or hand-corrupted stream before traversal walks off the
    /// end of `words`; off by default (see [`crate::stats::BuildConfig::check_integrity`]).
    pub fn validate(&self) -> Result<()> {
        let word_count = self.words.len() as u32;
        if self.first_leaf_ptr > word_count {
            return Err(Error::CorruptEncoding(format!(
                "first_leaf_ptr {} exceeds word_count {word_count}",
                self.first_leaf_ptr
            )));
        }
        let mut pos = 0u32;
        while pos < self.first_leaf_ptr {
            let header = self.words[pos as usize];
            let child_mask = (header & 0xFF) as u8;
            let n_children = child_mask.count_ones();
            let first_ptr = pos + 1;
            let last_ptr = first_ptr + n_children;
            if last_ptr > word_count {
                return Err(Error::CorruptEncoding(format!(
                    "node at word {pos} claims {n_children} child pointers past the end of a {word_count}-word stream"
                )));
            }
            for w in &self.words[first_ptr as usize..last_ptr as usize] {
                if *w >= word_count {
                    return Err(Error::CorruptEncoding(format!(
                        "node at word {pos} has a child pointer {w} outside the {word_count}-word stream"
                    )));
                }
            }
            pos = last_ptr;
        }
        if pos != self.first_leaf_ptr {
            return Err(Error::CorruptEncoding(format!(
                "inner-node region ends at word {pos}, not first_leaf_ptr {}",
                self.first_leaf_ptr
            )));
        }
        Ok(())
    }
}

pub struct Encoder;

impl Encoder {
    /// Two-phase encode: `truePtrs` construction assigns each node its
    /// absolute word offset, then emission writes `childMask` (plus, in the
    /// upper 24 bits, the per-child mirror flags) followed by one pointer
    /// word per set child bit in descending octant order.
    #[tracing::instrument(skip_all)]
    pub fn encode(levels: &LevelStructure) -> EncodedDag {
        let num_levels = levels.num_levels();
        let n_nodes = levels.total_nodes() as u32;

        // Global node id base for each level, i.e. Σ_{k<l} |levels[k]|.
        let mut level_base = vec![0u32; num_levels as usize];
        let mut running = 0u32;
        for l in 0..num_levels {
            level_base[l as usize] = running;
            running += levels.level(l).len() as u32;
        }

        let mut true_ptrs = vec![0u32; n_nodes as usize];
        let mut counter = 0u32;
        let mut first_leaf_ptr = 0u32;
        for l in 0..num_levels {
            if levels.is_leaf_level(l) {
                first_leaf_ptr = counter;
            }
            let is_leaf = levels.is_leaf_level(l);
            for (i, node) in levels.level(l).iter().enumerate() {
                let global = level_base[l as usize] as usize + i;
                true_ptrs[global] = counter;
                counter += if is_leaf { 1 } else { 1 + node.num_children() };
            }
        }
        let word_count = counter;

        let mut words = Vec::with_capacity(word_count as usize);
        for l in 0..num_levels {
            let is_leaf = levels.is_leaf_level(l);
            for node in levels.level(l) {
                let header = u32::from(node.child_mask)
                    | (u32::from(node.mirror_x) << 8)
                    | (u32::from(node.mirror_y) << 16)
                    | (u32::from(node.mirror_z) << 24);
                words.push(header);
                if is_leaf {
                    continue;
                }
                for c in (0..8u8).rev() {
                    if node.child_mask & (1 << c) == 0 {
                        continue;
                    }
                    let c = c as usize;
                    let child_level = l + 1 + u32::from(node.child_level_offset[c]);
                    let global = level_base[child_level as usize] as usize + node.children[c] as usize;
                    words.push(true_ptrs[global]);
                }
            }
        }

        tracing::debug!(n_nodes, word_count, first_leaf_ptr, "encoded DAG");
        debug_assert_eq!(words.len() as u32, word_count);
        EncodedDag { words, first_leaf_ptr, n_nodes }
    }
}
