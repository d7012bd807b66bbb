use core::fmt;

use rayon::iter::{IntoParallelRefIterator as _, ParallelIterator as _};

use crate::frame::{Frame, freespace_ray_to_frame_space, plane_from_frame};
use crate::math::FreeCoordinate;
use crate::raster::ViewGroupRayBundle;

// -------------------------------------------------------------------------------------------------

/// The rays of one view group attributed to one frame.
///
/// Produced once per view group per frame and consumed exactly once by that
/// frame's [`RadianceAccumulator`](crate::raster::RadianceAccumulator).
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct ClassifiedRays {
    /// `(ray index, sample index)` pairs attributed to the frame as opaque
    /// hits.
    pub solid_samples: Vec<(usize, usize)>,
    /// Rays that cross the frame's quad without a qualifying hit. Reserved
    /// for occlusion-aware weighting; the accumulator currently accepts but
    /// does not use them.
    pub freespace_rays: Vec<usize>,
}

/// Attributes every ray/sample pair of a view group to frames.
///
/// The classification algorithm is replaceable; the pipeline only relies on
/// this contract: [`RayClassifier::initialize()`] is called once with the
/// full frame set before any [`RayClassifier::classify()`] call, and
/// `classify` returns one [`ClassifiedRays`] per frame, in frame order.
pub trait RayClassifier: Send + Sync + fmt::Debug {
    /// Supplies the frame set that subsequent [`Self::classify()`] calls
    /// attribute rays to.
    fn initialize(&mut self, frames: &[Frame]);

    /// Classifies every ray of `bundle` against every frame. Frames are
    /// processed in parallel.
    fn classify(&self, bundle: &ViewGroupRayBundle) -> Vec<ClassifiedRays>;
}

// -------------------------------------------------------------------------------------------------

/// A purely geometric [`RayClassifier`]: a sample is a solid hit of a frame
/// if its ray crosses the frame's quad and the sample lies within
/// `distance_tolerance` (along the ray, in world units) of the crossing.
///
/// A ray whose quad crossing exists but which has no qualifying sample is a
/// freespace ray for that frame. Rays that miss the quad entirely are not
/// attributed at all. A sample may be attributed to several overlapping
/// frames; accumulation tolerates that.
#[derive(Debug)]
pub struct GeometricClassifier {
    distance_tolerance: FreeCoordinate,
    frames: Vec<Frame>,
}

impl GeometricClassifier {
    /// Constructs a classifier attributing samples within
    /// `distance_tolerance` world units of a frame's plane.
    ///
    /// Panics unless the tolerance is positive and finite.
    pub fn new(distance_tolerance: FreeCoordinate) -> Self {
        assert!(
            distance_tolerance > 0.0 && distance_tolerance.is_finite(),
            "bad distance tolerance {distance_tolerance}"
        );
        Self {
            distance_tolerance,
            frames: Vec::new(),
        }
    }

    fn classify_one(&self, frame: &Frame, bundle: &ViewGroupRayBundle) -> ClassifiedRays {
        let plane = plane_from_frame(frame);
        let mut classified = ClassifiedRays::default();
        for ray in 0..bundle.ray_count() {
            let origin = bundle.ray_origin(ray);
            let direction = bundle.ray_direction(ray);
            // Cheap rejection: rays that never touch the quad are irrelevant
            // to this frame.
            if freespace_ray_to_frame_space(frame, origin, direction).is_none() {
                continue;
            }
            let denominator = direction.dot(plane.normal);
            debug_assert!(denominator != 0.0, "crossing exists, so not parallel");
            let t_plane = (plane.point - origin).dot(plane.normal) / denominator;
            let direction_length = direction.length();

            let mut hit = false;
            for sample in 0..bundle.sample_count(ray) {
                let end = bundle.sample_end(ray, sample);
                let t_sample = (end - origin).dot(direction) / (direction_length * direction_length);
                if (t_sample - t_plane).abs() * direction_length <= self.distance_tolerance {
                    classified.solid_samples.push((ray, sample));
                    hit = true;
                    break; // front-to-back: first qualifying sample wins
                }
            }
            if !hit {
                classified.freespace_rays.push(ray);
            }
        }
        classified
    }
}

impl RayClassifier for GeometricClassifier {
    fn initialize(&mut self, frames: &[Frame]) {
        self.frames = frames.to_vec();
    }

    fn classify(&self, bundle: &ViewGroupRayBundle) -> Vec<ClassifiedRays> {
        self.frames
            .par_iter()
            .map(|frame| self.classify_one(frame, bundle))
            .collect()
    }
}

// -------------------------------------------------------------------------------------------------
