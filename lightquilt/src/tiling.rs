//! Opaque collaborators of the pipeline: the tile optimizer, the precise
//! frame sorter, and reconstruction pixel filters.
//!
//! The tiler and sorter are consumed strictly as trait objects; their
//! internal algorithms are out of scope. The pixel filters are small enough
//! that concrete implementations live here.

use core::fmt;
use std::error::Error;

use crate::frame::Frame;
use crate::math::{FreeCoordinate, FreePoint};

// -------------------------------------------------------------------------------------------------

/// A borrowed weighted point set, as handed to a [`Tiler`].
#[derive(Clone, Copy, Debug)]
#[expect(clippy::exhaustive_structs)]
pub struct PointSet<'a> {
    /// World-space point positions.
    pub positions: &'a [FreePoint],
    /// Per-point weights, parallel to `positions`.
    pub weights: &'a [f32],
}

/// A textured quad produced by a [`Tiler`]: four corner points forming a
/// simple planar polygon in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
#[expect(clippy::exhaustive_structs)]
pub struct Tile {
    /// Corner points, in winding order.
    pub quad: [FreePoint; 4],
}

/// The tile optimizer: fits a small set of quads to a weighted point cloud.
///
/// The optimization algorithm is external to this crate; the reconstruction
/// core only defines this consumption contract.
pub trait Tiler: fmt::Debug {
    /// Computes a quad set approximating `points`.
    fn tile(&mut self, points: PointSet<'_>) -> Result<Vec<Tile>, TileError>;
}

/// An error produced by a [`Tiler`].
#[derive(Debug, displaydoc::Display)]
/// tile optimization failed
pub struct TileError(
    /// The tiler's underlying failure.
    pub Box<dyn Error + Send + Sync>,
);

impl Error for TileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.0.as_ref())
    }
}

// -------------------------------------------------------------------------------------------------

/// Refines the approximate draw order of a frame list using global visibility
/// information.
///
/// `positions` are world-space reference viewpoints (typically the camera
/// positions of all view groups). Implementations must assign each frame's
/// `draw_order` a distinct rank in `0..frames.len()`.
pub trait FrameSorter: fmt::Debug {
    /// Mutates each frame's `draw_order` field to a total back-to-front order.
    fn compute_draw_order(&mut self, positions: &[FreePoint], frames: &mut [Frame]);
}

/// A [`FrameSorter`] that keeps the approximate distance-based order
/// already present in the frames.
#[derive(Clone, Copy, Debug, Default)]
#[expect(clippy::exhaustive_structs)]
pub struct KeepApproximateOrder;

impl FrameSorter for KeepApproximateOrder {
    fn compute_draw_order(&mut self, _positions: &[FreePoint], _frames: &mut [Frame]) {}
}

// -------------------------------------------------------------------------------------------------

/// A separable reconstruction filter kernel, evaluated per axis by the
/// radiance accumulator.
pub trait PixelFilter: Send + Sync + fmt::Debug {
    /// Half-width of the filter's support, in texels.
    fn radius(&self) -> FreeCoordinate;

    /// The filter weight at a signed 1-dimensional `offset` from the filter
    /// center, in texels. Must be zero for `|offset| > radius()`.
    fn eval(&self, offset: FreeCoordinate) -> FreeCoordinate;
}

/// A truncated Gaussian [`PixelFilter`].
#[derive(Clone, Copy, Debug)]
pub struct GaussianFilter {
    sigma: FreeCoordinate,
    radius: FreeCoordinate,
}

impl GaussianFilter {
    /// Constructs a Gaussian filter with the given standard deviation,
    /// truncated at `radius` texels.
    ///
    /// Panics unless both parameters are positive and finite.
    pub fn new(sigma: FreeCoordinate, radius: FreeCoordinate) -> Self {
        assert!(sigma > 0.0 && sigma.is_finite(), "bad sigma {sigma}");
        assert!(radius > 0.0 && radius.is_finite(), "bad radius {radius}");
        Self { sigma, radius }
    }
}

impl Default for GaussianFilter {
    /// A σ = 0.5, radius 1.5 filter: mild antialiasing without visible blur.
    fn default() -> Self {
        Self::new(0.5, 1.5)
    }
}

impl PixelFilter for GaussianFilter {
    fn radius(&self) -> FreeCoordinate {
        self.radius
    }

    fn eval(&self, offset: FreeCoordinate) -> FreeCoordinate {
        if offset.abs() > self.radius {
            return 0.0;
        }
        (-0.5 * (offset / self.sigma).powi(2)).exp()
    }
}

/// A box [`PixelFilter`]: constant weight within its radius.
#[derive(Clone, Copy, Debug)]
pub struct BoxFilter {
    radius: FreeCoordinate,
}

impl BoxFilter {
    /// Constructs a box filter with the given half-width in texels.
    pub fn new(radius: FreeCoordinate) -> Self {
        assert!(radius > 0.0 && radius.is_finite(), "bad radius {radius}");
        Self { radius }
    }
}

impl PixelFilter for BoxFilter {
    fn radius(&self) -> FreeCoordinate {
        self.radius
    }

    fn eval(&self, offset: FreeCoordinate) -> FreeCoordinate {
        if offset.abs() <= self.radius { 1.0 } else { 0.0 }
    }
}

// -------------------------------------------------------------------------------------------------
