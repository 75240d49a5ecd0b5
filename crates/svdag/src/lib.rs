//! Sparse Voxel DAG construction, symmetry compression, flat encoding, and
//! traversal.
//!
//! Pipeline: [`scene::Scene`]/[`scene::PointStream`] -> [`voxelize::Voxelizer`]
//! -> SVO ([`level::LevelStructure`]) -> [`dag::DagCompressor`] -> DAG ->
//! optionally [`sdag::SdagCompressor`] -> SDAG -> [`encode::Encoder`] -> flat
//! word stream -> [`traverse::EncodedTraverser`] / [`serialize::Serializer`].

pub mod dag;
pub mod encode;
pub mod level;
pub mod node;
pub mod scene;
pub mod sdag;
pub mod serialize;
pub mod stats;
pub mod traverse;
pub mod voxelize;

pub use dag::DagCompressor;
pub use encode::{EncodedDag, Encoder};
pub use level::{CompressionStage, LevelStructure};
pub use node::{MirrorAxes, Node, NULL_NODE};
pub use scene::{tri_box_overlap, PointStream, Scene, TextPointStream, Triangle, TriangleSoup};
pub use sdag::{SdagCompressor, Strategy};
pub use serialize::{SerializedDag, Serializer};
pub use stats::{BuildConfig, BuildStats};
pub use traverse::{EncodedTraverser, TravNode};
pub use voxelize::{VoxelizedScene, Voxelizer};
