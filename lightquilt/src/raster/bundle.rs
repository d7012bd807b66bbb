use euclid::point2;

use crate::math::{FreeCoordinate, FreePoint, FreeVector, PixelPoint};
use crate::scene::ViewGroup;

// -------------------------------------------------------------------------------------------------

/// A flat, read-only ray-indexed view of one [`ViewGroup`].
///
/// Every pixel of every view contributes exactly one ray; rays are numbered
/// view-major, row-major within a view. A ray's samples are its pixel's LDI
/// samples, front to back. Geometry is evaluated on demand through the view's
/// camera, so constructing a bundle is cheap.
#[derive(Debug)]
pub struct ViewGroupRayBundle {
    view_group: ViewGroup,
    /// `ray_offsets[v]..ray_offsets[v + 1]` is the ray range of view `v`.
    ray_offsets: Vec<usize>,
}

impl ViewGroupRayBundle {
    /// Wraps a loaded view group.
    pub fn new(view_group: ViewGroup) -> Self {
        let mut ray_offsets = Vec::with_capacity(view_group.view_count() + 1);
        let mut total = 0;
        ray_offsets.push(0);
        for ldi in view_group.ldis() {
            let size = ldi.size();
            total += size.width as usize * size.height as usize;
            ray_offsets.push(total);
        }
        Self {
            view_group,
            ray_offsets,
        }
    }

    /// Total number of rays across all views.
    #[inline]
    pub fn ray_count(&self) -> usize {
        *self.ray_offsets.last().unwrap_or(&0)
    }

    /// The view index and pixel that `ray` originates from.
    ///
    /// Panics if `ray` is out of range.
    pub fn view_and_pixel(&self, ray: usize) -> (usize, PixelPoint) {
        assert!(ray < self.ray_count(), "ray {ray} out of range");
        let view = self.ray_offsets.partition_point(|&offset| offset <= ray) - 1;
        let within = ray - self.ray_offsets[view];
        let width = self.view_group.ldis()[view].size().width as usize;
        (
            view,
            point2((within % width) as u32, (within / width) as u32),
        )
    }

    /// World-space origin of `ray`.
    pub fn ray_origin(&self, ray: usize) -> FreePoint {
        let (view, pixel) = self.view_and_pixel(ray);
        self.view_group.cameras()[view].ray_origin(pixel)
    }

    /// World-space direction of `ray`; not necessarily normalized.
    pub fn ray_direction(&self, ray: usize) -> FreeVector {
        let (view, pixel) = self.view_and_pixel(ray);
        self.view_group.cameras()[view].ray_direction(pixel)
    }

    /// Number of depth samples along `ray`.
    pub fn sample_count(&self, ray: usize) -> usize {
        let (view, pixel) = self.view_and_pixel(ray);
        self.view_group.ldis()[view].sample_count(pixel)
    }

    /// RGBA color of the `sample`-th sample (front to back) along `ray`.
    pub fn sample_color(&self, ray: usize, sample: usize) -> [f32; 4] {
        let (view, pixel) = self.view_and_pixel(ray);
        self.view_group.ldis()[view].colors(pixel)[sample]
    }

    /// World-space position of the `sample`-th sample along `ray`, by
    /// evaluating the view's camera at the sample's depth.
    pub fn sample_end(&self, ray: usize, sample: usize) -> FreePoint {
        let (view, pixel) = self.view_and_pixel(ray);
        let depth = self.view_group.ldis()[view].depths(pixel)[sample];
        self.view_group.cameras()[view].ray_end(pixel, FreeCoordinate::from(depth))
    }
}

// -------------------------------------------------------------------------------------------------
