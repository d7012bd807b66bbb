//! Numeric types used for coordinates and related quantities.

use euclid::{Point2D, Point3D, Size2D, Vector3D};

/// Unit-of-measure tag for [`euclid`] types that are in world space:
/// the coordinate system shared by all cameras, frames, and point cloud points.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum World {}

/// Unit-of-measure tag for [`euclid`] types that are in a camera's eye space:
/// `x` right, `y` up, looking along `-z`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Eye {}

/// Unit-of-measure tag for [`euclid`] types that are in the `[0, 1]²`
/// parameterization of a frame quad (`u` along the first edge, `v` along the
/// second).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FrameUv {}

/// Unit-of-measure tag for [`euclid`] types measured in image pixels
/// (camera images, layered depth images, and output textures alike).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ImagePixel {}

/// Continuous coordinates.
///
/// We use `f64` so that positions derived from deep depth samples keep more
/// precision than the `f32` colors they carry.
pub type FreeCoordinate = f64;

/// World-space positions.
pub type FreePoint = Point3D<FreeCoordinate, World>;

/// World-space vectors.
pub type FreeVector = Vector3D<FreeCoordinate, World>;

/// A position within the `[0, 1]²` parameterization of a frame quad.
pub type UvPoint = Point2D<FreeCoordinate, FrameUv>;

/// Size of a camera image, layered depth image, or output texture, in pixels.
pub type ImageSize = Size2D<u32, ImagePixel>;

/// A discrete pixel position in an image.
pub type PixelPoint = Point2D<u32, ImagePixel>;
