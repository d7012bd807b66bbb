//! Offline reconstruction of tile-based layered-depth-image "frames" from
//! calibrated RGBD captures.
//!
//! The pipeline, in dependency order:
//!
//! 1. [`scene`] defines the input interfaces: cameras, layered depth images
//!    (LDIs), and prefetched view-group loading.
//! 2. [`pointcloud`] merges every depth sample of every view into a
//!    bounded-size weighted point cloud using six perspective binning grids.
//! 3. An external [`tiling::Tiler`] converts the point cloud into textured
//!    quads, which [`frame`] turns into [`frame::Frame`]s with texture
//!    parameterization and an approximate back-to-front draw order.
//! 4. [`raster`] re-projects every input ray against every frame,
//!    accumulates filtered radiance into per-frame textures, and fills
//!    unobserved texels by coarse-to-fine inpainting.
//!
//! This is an offline batch process; none of it is intended for real-time
//! use. Image codecs, manifest parsing, and the tile optimizer itself are
//! out of scope and appear only as traits.

// Crate-specific lint settings. (General settings can be found in the workspace manifest.)
#![forbid(unsafe_code)]

pub mod frame;
pub mod pointcloud;
pub mod raster;
pub mod scene;
pub mod tiling;

/// Re-exported mathematical primitives from `lightquilt-base`.
pub mod math {
    pub use lightquilt_base::math::*;
}
