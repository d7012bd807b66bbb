use std::sync::Arc;

use rayon::iter::{
    IndexedParallelIterator as _, IntoParallelRefMutIterator as _, ParallelIterator as _,
};

use crate::frame::Frame;
use crate::raster::{RadianceAccumulator, RayClassifier, ViewGroupRayBundle};
use crate::scene::{LoadError, ViewGroupLoader, for_each_view_group};

// -------------------------------------------------------------------------------------------------

/// An error from [`FrameRasterizer::run()`].
#[derive(Debug, displaydoc::Display)]
#[non_exhaustive]
pub enum RasterError {
    /// {frames} frames were given with {accumulators} accumulators
    MismatchedAccumulators {
        /// Number of frames.
        frames: usize,
        /// Number of accumulators.
        accumulators: usize,
    },
    /// failed to load input views
    Load(LoadError),
}

impl std::error::Error for RasterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RasterError::MismatchedAccumulators { .. } => None,
            RasterError::Load(e) => Some(e),
        }
    }
}

impl From<LoadError> for RasterError {
    fn from(e: LoadError) -> Self {
        RasterError::Load(e)
    }
}

// -------------------------------------------------------------------------------------------------

/// The top-level accumulation driver: re-projects every input ray of every
/// view group against every frame and dispatches the classified samples to
/// the per-frame accumulators.
#[derive(Debug)]
pub struct FrameRasterizer {
    loader: Arc<dyn ViewGroupLoader>,
    classifier: Box<dyn RayClassifier>,
}

impl FrameRasterizer {
    /// Constructs a rasterizer over the given capture source and classifier.
    pub fn new(loader: Arc<dyn ViewGroupLoader>, classifier: Box<dyn RayClassifier>) -> Self {
        Self { loader, classifier }
    }

    /// Runs accumulation: for every view group (prefetched), classifies all
    /// rays against all frames and, in parallel across frames, feeds each
    /// frame's classified rays to its accumulator.
    ///
    /// `accumulators` must be parallel to `frames`; after this returns, each
    /// accumulator holds the fully accumulated (unresolved) texture of its
    /// frame.
    pub fn run(
        &mut self,
        frames: &[Frame],
        accumulators: &mut [RadianceAccumulator],
    ) -> Result<(), RasterError> {
        if frames.len() != accumulators.len() {
            return Err(RasterError::MismatchedAccumulators {
                frames: frames.len(),
                accumulators: accumulators.len(),
            });
        }
        self.classifier.initialize(frames);

        let view_group_count = self.loader.view_group_count();
        let classifier = &*self.classifier;
        for_each_view_group(&*self.loader, |index, view_group| {
            let bundle = ViewGroupRayBundle::new(view_group);
            let classified = classifier.classify(&bundle);
            accumulators
                .par_iter_mut()
                .zip_eq(&classified)
                .for_each(|(accumulator, rays)| accumulator.add(&bundle, rays));
            log::info!(
                "accumulated view group {n}/{view_group_count} ({rays} rays)",
                n = index + 1,
                rays = bundle.ray_count(),
            );
            Ok::<(), RasterError>(())
        })
    }
}

// -------------------------------------------------------------------------------------------------
