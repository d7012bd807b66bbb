use core::fmt;
use std::sync::Arc;

use crate::frame::{Frame, initialize_approximate_draw_order};
use crate::math::{Aab, FreeCoordinate, FreePoint};
use crate::pointcloud::{AssembleError, BinningPointCloudBuilder, PointCloudAssembler};
use crate::scene::ViewGroupLoader;
use crate::tiling::{FrameSorter, TileError, Tiler};

// -------------------------------------------------------------------------------------------------

/// An error from frame generation.
#[derive(Debug, displaydoc::Display)]
#[non_exhaustive]
pub enum GenerateError {
    /// failed to assemble the scene point cloud
    Assemble(AssembleError),
    /// failed to tile the point cloud
    Tile(TileError),
}

impl std::error::Error for GenerateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GenerateError::Assemble(e) => Some(e),
            GenerateError::Tile(e) => Some(e),
        }
    }
}

impl From<AssembleError> for GenerateError {
    fn from(e: AssembleError) -> Self {
        GenerateError::Assemble(e)
    }
}

impl From<TileError> for GenerateError {
    fn from(e: TileError) -> Self {
        GenerateError::Tile(e)
    }
}

// -------------------------------------------------------------------------------------------------

/// Produces the scene's frame list. Implemented by [`FrameGenerator`] and by
/// [`CachedFrameGenerator`](crate::frame::CachedFrameGenerator), which wraps
/// another implementation with a disk cache.
pub trait GenerateFrames: fmt::Debug {
    /// Generates (or retrieves) the complete frame list of the scene, with
    /// texture parameterization and draw order assigned.
    fn generate_frames(&mut self) -> Result<Vec<Frame>, GenerateError>;
}

/// The end-to-end frame construction pipeline: assemble a point cloud from
/// all views, tile it, parameterize the resulting quads, and order them
/// back to front.
#[derive(Debug)]
pub struct FrameGenerator {
    loader: Arc<dyn ViewGroupLoader>,
    tiler: Box<dyn Tiler>,
    sorter: Box<dyn FrameSorter>,
    headbox: Aab,
    pixels_per_degree: FreeCoordinate,
    thread_count: usize,
}

impl FrameGenerator {
    /// Constructs the pipeline.
    ///
    /// `headbox` is the region the viewer's head may move through; the
    /// binning grid wraps around it. `pixels_per_degree` sets the angular
    /// density of the binning grid (see
    /// [`BinningPointCloudBuilder::compute_resolution_and_near_clip()`]).
    pub fn new(
        loader: Arc<dyn ViewGroupLoader>,
        tiler: Box<dyn Tiler>,
        sorter: Box<dyn FrameSorter>,
        headbox: Aab,
        pixels_per_degree: FreeCoordinate,
        thread_count: usize,
    ) -> Self {
        Self {
            loader,
            tiler,
            sorter,
            headbox,
            pixels_per_degree,
            thread_count,
        }
    }
}

impl GenerateFrames for FrameGenerator {
    fn generate_frames(&mut self) -> Result<Vec<Frame>, GenerateError> {
        let (resolution, near_clip) = BinningPointCloudBuilder::compute_resolution_and_near_clip(
            &self.headbox,
            self.pixels_per_degree,
        );
        let assembler = PointCloudAssembler::new(self.thread_count, resolution, near_clip);
        let scene = assembler.assemble(&*self.loader)?;
        log::info!(
            "assembled {points} points; tiling",
            points = scene.point_cloud.len()
        );

        let tiles = self.tiler.tile(scene.point_cloud.as_point_set())?;
        let mut frames: Vec<Frame> = tiles
            .into_iter()
            .map(|tile| {
                let mut frame = Frame::from_corners(tile.quad);
                frame.texcoord_w = projective_texture_weights(&frame.corners);
                frame
            })
            .collect();

        initialize_approximate_draw_order(&mut frames);
        let reference_positions: Vec<FreePoint> = scene
            .view_region
            .map(|region| region.corner_points().collect())
            .unwrap_or_default();
        self.sorter
            .compute_draw_order(&reference_positions, &mut frames);

        log::info!("generated {count} frames", count = frames.len());
        Ok(frames)
    }
}

/// Homogeneous texture weights for a quad's corners: proportional to each
/// corner's distance from the origin, normalized so the nearest corner has
/// weight 1. Quads touching the origin fall back to uniform weights.
fn projective_texture_weights(corners: &[FreePoint; 4]) -> [FreeCoordinate; 4] {
    let distances = corners.map(|c| c.distance_to(FreePoint::origin()));
    let nearest = distances.iter().copied().fold(FreeCoordinate::INFINITY, FreeCoordinate::min);
    if nearest > 0.0 && nearest.is_finite() {
        distances.map(|d| d / nearest)
    } else {
        [1.0; 4]
    }
}

// -------------------------------------------------------------------------------------------------
