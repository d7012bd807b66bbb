//! Merging per-view depth samples into a bounded-size weighted point cloud.
//!
//! [`BinningPointCloudBuilder`] is the deduplicating core; [`assembler`]
//! drives it from a [`ViewGroupLoader`](crate::scene::ViewGroupLoader).

mod binning;
pub use binning::*;

mod assembler;
pub use assembler::*;

use crate::math::FreePoint;

/// A deduplicated, weighted point cloud: two parallel arrays.
///
/// No ordering is guaranteed; in particular, the order produced by
/// [`BinningPointCloudBuilder::positions_and_weights()`] is shard-major and
/// unspecified within a shard.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointCloud {
    /// World-space point positions.
    pub positions: Vec<FreePoint>,
    /// Per-point accumulated weights, parallel to `positions`.
    pub weights: Vec<f32>,
}

impl PointCloud {
    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        debug_assert_eq!(self.positions.len(), self.weights.len());
        self.positions.len()
    }

    /// Whether the cloud has no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Borrows the cloud as a [`PointSet`](crate::tiling::PointSet) for tiling.
    #[inline]
    pub fn as_point_set(&self) -> crate::tiling::PointSet<'_> {
        crate::tiling::PointSet {
            positions: &self.positions,
            weights: &self.weights,
        }
    }
}
