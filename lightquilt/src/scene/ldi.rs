use crate::math::{ImageSize, PixelPoint};

// -------------------------------------------------------------------------------------------------

/// A layered depth image: per pixel, a variable-length list of depth-sorted
/// (front-to-back) RGBA + depth samples.
///
/// Storage is dense and flat, with a prefix-sum offset table, so that an LDI
/// with millions of samples is three allocations regardless of how samples
/// are distributed among pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct Ldi {
    size: ImageSize,
    /// `offsets[i]..offsets[i + 1]` is the sample range of pixel `i`
    /// (row-major). Length is `width * height + 1`; `offsets[0] == 0`.
    offsets: Vec<u32>,
    colors: Vec<[f32; 4]>,
    depths: Vec<f32>,
}

/// Reasons an [`Ldi`] could not be constructed from its raw buffers.
#[derive(Clone, Debug, Eq, PartialEq, displaydoc::Display)]
#[non_exhaustive]
pub enum LdiError {
    /// offset table has length {actual} but {expected} pixels + 1 were expected
    OffsetTableLength {
        /// Expected table length (pixel count + 1).
        expected: usize,
        /// Actual table length.
        actual: usize,
    },
    /// offset table is not monotonic or does not span the sample buffers
    BadOffsets,
    /// color buffer has {colors} entries but depth buffer has {depths}
    MismatchedBuffers {
        /// Color sample count.
        colors: usize,
        /// Depth sample count.
        depths: usize,
    },
    /// samples of pixel {pixel} are not sorted front to back
    UnsortedDepths {
        /// Row-major index of the offending pixel.
        pixel: usize,
    },
}

impl std::error::Error for LdiError {}

impl Ldi {
    /// Constructs an [`Ldi`] from its flat buffers, validating the offset
    /// table and the front-to-back ordering of every pixel's samples.
    pub fn new(
        size: ImageSize,
        offsets: Vec<u32>,
        colors: Vec<[f32; 4]>,
        depths: Vec<f32>,
    ) -> Result<Self, LdiError> {
        let pixel_count = size.width as usize * size.height as usize;
        if offsets.len() != pixel_count + 1 {
            return Err(LdiError::OffsetTableLength {
                expected: pixel_count + 1,
                actual: offsets.len(),
            });
        }
        if colors.len() != depths.len() {
            return Err(LdiError::MismatchedBuffers {
                colors: colors.len(),
                depths: depths.len(),
            });
        }
        if offsets[0] != 0
            || !offsets.windows(2).all(|w| w[0] <= w[1])
            || *offsets.last().unwrap() as usize != depths.len()
        {
            return Err(LdiError::BadOffsets);
        }
        for pixel in 0..pixel_count {
            let range = offsets[pixel] as usize..offsets[pixel + 1] as usize;
            if !depths[range].is_sorted() {
                return Err(LdiError::UnsortedDepths { pixel });
            }
        }
        Ok(Self {
            size,
            offsets,
            colors,
            depths,
        })
    }

    /// Constructs an empty [`Ldi`] (zero samples at every pixel).
    pub fn empty(size: ImageSize) -> Self {
        let pixel_count = size.width as usize * size.height as usize;
        Self {
            size,
            offsets: vec![0; pixel_count + 1],
            colors: Vec::new(),
            depths: Vec::new(),
        }
    }

    /// Width and height in pixels.
    #[inline]
    pub fn size(&self) -> ImageSize {
        self.size
    }

    #[inline]
    fn pixel_index(&self, pixel: PixelPoint) -> usize {
        debug_assert!(pixel.x < self.size.width && pixel.y < self.size.height);
        pixel.y as usize * self.size.width as usize + pixel.x as usize
    }

    #[inline]
    fn sample_range(&self, pixel: PixelPoint) -> core::ops::Range<usize> {
        let i = self.pixel_index(pixel);
        self.offsets[i] as usize..self.offsets[i + 1] as usize
    }

    /// Number of depth samples at `pixel`.
    #[inline]
    pub fn sample_count(&self, pixel: PixelPoint) -> usize {
        self.sample_range(pixel).len()
    }

    /// The RGBA colors of the samples at `pixel`, front to back.
    #[inline]
    pub fn colors(&self, pixel: PixelPoint) -> &[[f32; 4]] {
        &self.colors[self.sample_range(pixel)]
    }

    /// The depths of the samples at `pixel`, front to back.
    #[inline]
    pub fn depths(&self, pixel: PixelPoint) -> &[f32] {
        &self.depths[self.sample_range(pixel)]
    }

    /// Total number of samples across all pixels.
    #[inline]
    pub fn total_sample_count(&self) -> usize {
        self.depths.len()
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use euclid::point2;
    use pretty_assertions::assert_eq;

    const RED: [f32; 4] = [1., 0., 0., 1.];
    const GREEN: [f32; 4] = [0., 1., 0., 1.];
    const BLUE: [f32; 4] = [0., 0., 1., 1.];

    fn two_by_one() -> Ldi {
        // Pixel (0,0): two samples; pixel (1,0): one sample.
        Ldi::new(
            ImageSize::new(2, 1),
            vec![0, 2, 3],
            vec![RED, GREEN, BLUE],
            vec![1.0, 2.5, 4.0],
        )
        .unwrap()
    }

    #[test]
    fn accessors() {
        let ldi = two_by_one();
        assert_eq!(ldi.sample_count(point2(0, 0)), 2);
        assert_eq!(ldi.sample_count(point2(1, 0)), 1);
        assert_eq!(ldi.colors(point2(0, 0)), &[RED, GREEN]);
        assert_eq!(ldi.depths(point2(0, 0)), &[1.0, 2.5]);
        assert_eq!(ldi.colors(point2(1, 0)), &[BLUE]);
        assert_eq!(ldi.total_sample_count(), 3);
    }

    #[test]
    fn empty_has_no_samples() {
        let ldi = Ldi::empty(ImageSize::new(3, 2));
        for y in 0..2 {
            for x in 0..3 {
                assert_eq!(ldi.sample_count(point2(x, y)), 0);
            }
        }
    }

    #[test]
    fn validation_failures() {
        let size = ImageSize::new(2, 1);
        assert_eq!(
            Ldi::new(size, vec![0, 1], vec![RED], vec![1.0]),
            Err(LdiError::OffsetTableLength {
                expected: 3,
                actual: 2
            })
        );
        assert_eq!(
            Ldi::new(size, vec![0, 1, 2], vec![RED, GREEN], vec![1.0]),
            Err(LdiError::MismatchedBuffers {
                colors: 2,
                depths: 1
            })
        );
        assert_eq!(
            Ldi::new(size, vec![0, 2, 1], vec![RED, GREEN], vec![1.0, 2.0]),
            Err(LdiError::BadOffsets)
        );
        assert_eq!(
            Ldi::new(size, vec![0, 2, 2], vec![RED, GREEN], vec![2.0, 1.0]),
            Err(LdiError::UnsortedDepths { pixel: 0 })
        );
    }
}
