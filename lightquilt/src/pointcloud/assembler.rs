use rayon::iter::{IntoParallelIterator as _, ParallelIterator as _};

use crate::math::{Aab, FreeCoordinate, FreePoint};
use crate::pointcloud::{BinningPointCloudBuilder, BinningError, GridResolution, PointCloud};
use crate::scene::{Camera, Ldi, LoadError, ViewGroupLoader, for_each_view_group};

// -------------------------------------------------------------------------------------------------

/// An error from [`PointCloudAssembler::assemble()`].
#[derive(Debug, displaydoc::Display)]
#[non_exhaustive]
pub enum AssembleError {
    /// failed to load input views
    Load(LoadError),
    /// failed to bin sample points
    Binning(BinningError),
}

impl std::error::Error for AssembleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AssembleError::Load(e) => Some(e),
            AssembleError::Binning(e) => Some(e),
        }
    }
}

impl From<LoadError> for AssembleError {
    fn from(e: LoadError) -> Self {
        AssembleError::Load(e)
    }
}

impl From<BinningError> for AssembleError {
    fn from(e: BinningError) -> Self {
        AssembleError::Binning(e)
    }
}

// -------------------------------------------------------------------------------------------------

/// Everything [`PointCloudAssembler::assemble()`] learned about the scene: the
/// deduplicated point cloud and the region the capture cameras moved through.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct AssembledScene {
    /// The merged, weighted point cloud of every view's samples.
    pub point_cloud: PointCloud,
    /// Bounding box of all capture camera positions, if there was at least
    /// one view.
    pub view_region: Option<Aab>,
}

/// Unprojects every sample of every view into world space and merges them all
/// through a [`BinningPointCloudBuilder`].
#[derive(Debug)]
pub struct PointCloudAssembler {
    builder: BinningPointCloudBuilder,
}

impl PointCloudAssembler {
    /// Constructs an assembler binning into grids of the given resolution.
    /// See [`BinningPointCloudBuilder::new()`] for the parameters' meaning
    /// and panics.
    pub fn new(
        thread_count: usize,
        resolution: GridResolution,
        near_clip: FreeCoordinate,
    ) -> Self {
        Self {
            builder: BinningPointCloudBuilder::new(thread_count, resolution, near_clip),
        }
    }

    /// Unprojects all samples of one view to world-space points, one per LDI
    /// sample, in row-major pixel order. Rows are processed in parallel.
    pub fn positions_from_view(camera: &dyn Camera, ldi: &Ldi) -> Vec<FreePoint> {
        let size = ldi.size();
        (0..size.height)
            .into_par_iter()
            .flat_map_iter(|y| {
                (0..size.width).flat_map(move |x| {
                    let pixel = euclid::point2(x, y);
                    ldi.depths(pixel)
                        .iter()
                        .map(move |&depth| camera.ray_end(pixel, FreeCoordinate::from(depth)))
                })
            })
            .collect()
    }

    /// Streams every view group out of `loader` (with prefetching), bins every
    /// sample of every view, and returns the merged cloud together with the
    /// bounding box of the capture camera positions.
    pub fn assemble(
        mut self,
        loader: &dyn ViewGroupLoader,
    ) -> Result<AssembledScene, AssembleError> {
        let mut view_region: Option<Aab> = None;
        for_each_view_group(loader, |index, view_group| {
            log::info!(
                "binning view group {index}/{count}: {views} views",
                count = loader.view_group_count(),
                views = view_group.view_count(),
            );
            for (camera, ldi) in view_group.views() {
                let position = camera.position();
                view_region = Some(match view_region {
                    None => Aab::from_lower_upper(position, position),
                    Some(region) => region.enlarged_to_contain(position),
                });
                let positions = Self::positions_from_view(&**camera, ldi);
                self.builder.add_points(&positions)?;
            }
            Ok::<(), AssembleError>(())
        })?;
        Ok(AssembledScene {
            point_cloud: self.builder.positions_and_weights(),
            view_region,
        })
    }
}

// -------------------------------------------------------------------------------------------------
