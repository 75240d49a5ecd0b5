//! Build configuration and progress/result statistics.
//!
//! The design notes call out that the source keeps a process clock and
//! logging as side channels; this reimplementation exposes the same
//! information as explicit return values instead of a singleton. `tracing`
//! spans (see each stage's `#[tracing::instrument]`) provide the
//! observability side-channel for anyone who wants it, but callers never
//! have to reach into global state to get timing or node counts.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Parameters controlling a voxelization + compression run.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Number of octree levels (size per axis is `2^levels`).
    pub levels: u32,
    /// If set, build a shallow root SVO of this depth first, then
    /// voxelize+DAG each occupied leaf's sub-cube independently before a
    /// final global dedup pass (the hierarchical subtree-parallel builder).
    pub hierarchical_split_level: Option<u32>,
    /// Run independent subtree jobs (only meaningful alongside
    /// `hierarchical_split_level`) on a rayon thread pool.
    pub parallel: bool,
    /// Whether embedders should validate child-pointer bounds after
    /// decoding a saved stream, via `Serializer::load_checked` instead of
    /// `Serializer::load` (off by default — the extra bounds walk isn't
    /// needed for a stream this crate just wrote itself).
    pub check_integrity: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            levels: 8,
            hierarchical_split_level: None,
            parallel: false,
            check_integrity: false,
        }
    }
}

/// Aggregated statistics returned from a build, covering both the serial
/// and (if used) the parallel hierarchical path.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct BuildStats {
    pub n_nodes_svo: u64,
    pub n_nodes_last_lev_svo: u64,
    pub n_voxels: u64,
    pub n_nodes_dag: u64,
    pub n_nodes_sdag: u64,
    #[serde(skip, default)]
    pub build_svo_time: Duration,
    #[serde(skip, default)]
    pub to_dag_time: Duration,
    #[serde(skip, default)]
    pub to_sdag_time: Duration,
    #[serde(skip, default)]
    pub encode_time: Duration,
    /// Rough in-memory footprint estimate, in bytes, at the point the
    /// statistics were captured.
    pub mem_footprint: u64,
}
