use std::error::Error;
use std::fmt;
use std::sync::Arc;

use itertools::Itertools as _;

use crate::scene::{Camera, Ldi};

// -------------------------------------------------------------------------------------------------

/// One group of views captured together (for example, the six faces of a cube
/// map): cameras and their layered depth images, in matching order.
#[derive(Clone, Debug)]
pub struct ViewGroup {
    cameras: Vec<Arc<dyn Camera>>,
    ldis: Vec<Ldi>,
}

impl ViewGroup {
    /// Pairs up cameras and LDIs.
    ///
    /// Panics if the two lists have different lengths or if any LDI's size
    /// does not match its camera's image size.
    pub fn new(cameras: Vec<Arc<dyn Camera>>, ldis: Vec<Ldi>) -> Self {
        for (i, (camera, ldi)) in cameras.iter().zip_eq(ldis.iter()).enumerate() {
            assert_eq!(
                camera.image_size(),
                ldi.size(),
                "view {i}: camera image size does not match LDI size"
            );
        }
        Self { cameras, ldis }
    }

    /// Number of views in the group.
    #[inline]
    pub fn view_count(&self) -> usize {
        self.cameras.len()
    }

    /// Iterates over the (camera, LDI) pairs of the group.
    pub fn views(&self) -> impl ExactSizeIterator<Item = (&Arc<dyn Camera>, &Ldi)> {
        self.cameras.iter().zip(self.ldis.iter())
    }

    /// The cameras of the group.
    #[inline]
    pub fn cameras(&self) -> &[Arc<dyn Camera>] {
        &self.cameras
    }

    /// The layered depth images of the group.
    #[inline]
    pub fn ldis(&self) -> &[Ldi] {
        &self.ldis
    }
}

// -------------------------------------------------------------------------------------------------

/// Source of [`ViewGroup`]s, usually backed by capture files on disk.
///
/// Loading may be slow; the pipeline overlaps it with processing via
/// [`for_each_view_group()`](crate::scene::for_each_view_group).
pub trait ViewGroupLoader: Send + Sync + fmt::Debug {
    /// Number of view groups this loader can produce.
    fn view_group_count(&self) -> usize;

    /// Loads the view group at `index`.
    ///
    /// Returns [`LoadError::OutOfRange`] if `index` is not less than
    /// [`Self::view_group_count()`].
    fn load_view_group(&self, index: usize) -> Result<ViewGroup, LoadError>;
}

/// An error indicating that a [`ViewGroupLoader`] failed to produce a view group.
#[derive(Debug, displaydoc::Display)]
#[non_exhaustive]
pub enum LoadError {
    /// view group index {index} out of range; loader has {count} view groups
    OutOfRange {
        /// The requested index.
        index: usize,
        /// The loader's view group count.
        count: usize,
    },

    /// failed to load view group {index}
    Failed {
        /// The requested index.
        index: usize,
        /// The loader's underlying failure (I/O, parse, …).
        source: Box<dyn Error + Send + Sync>,
    },
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LoadError::OutOfRange { .. } => None,
            LoadError::Failed { source, .. } => Some(source.as_ref()),
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::ImageSize;
    use crate::scene::PinholeCamera;
    use euclid::{point3, vec3};

    fn _loader_is_object_safe(_: &dyn ViewGroupLoader) {}

    #[test]
    #[should_panic(expected = "does not match LDI size")]
    fn view_group_rejects_size_mismatch() {
        let camera: Arc<dyn Camera> = Arc::new(PinholeCamera::looking(
            point3(0., 0., 0.),
            vec3(0., 0., -1.),
            vec3(0., 1., 0.),
            ImageSize::new(4, 4),
            60.0,
        ));
        let _ = ViewGroup::new(vec![camera], vec![Ldi::empty(ImageSize::new(2, 2))]);
    }
}
