//! Small shared identifier types.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Material identifier stamped into leaf voxels during triangle
/// voxelization.
///
/// `MaterialId(0)` is reserved to mean "no material" / empty, mirroring the
/// engine convention of reserving id 0 for the absence of a thing.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct MaterialId(pub u32);

impl MaterialId {
    /// No material assigned.
    pub const NONE: Self = Self(0);

    /// Returns true if this is the "no material" sentinel.
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn material_none_is_zero() {
        assert!(MaterialId::NONE.is_none());
        assert!(!MaterialId(1).is_none());
    }
}
