//! Textured-quad scene primitives ("frames") and their construction.
//!
//! A [`Frame`] is a planar quadrilateral with a bilinear texture
//! parameterization and a back-to-front draw order. [`geometry`] provides the
//! coordinate mappings, [`generator`] builds frames from a point cloud via a
//! [`Tiler`](crate::tiling::Tiler), and [`cache`] persists generated frames
//! between runs.

mod geometry;
pub use geometry::*;

mod generator;
pub use generator::*;

mod cache;
pub use cache::*;
