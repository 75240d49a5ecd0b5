//! Shared types, math, and error handling for the `svdag` crate.
//!
//! This crate provides the foundational pieces used throughout the
//! voxelization/compression pipeline:
//! - Scalar/vector aliases and axis-aligned bounding boxes
//! - Material identifiers
//! - The crate-wide error type

pub mod error;
pub mod math;
pub mod types;

pub use error::{Error, Result};
pub use math::Aabb;
pub use types::MaterialId;
