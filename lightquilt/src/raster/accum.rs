use std::sync::Arc;

use imgref::ImgVec;

use crate::frame::{Frame, solid_ray_to_frame_space};
use crate::math::{FreeCoordinate, FreePoint, FreeVector, ImageSize};
use crate::raster::{ClassifiedRays, ViewGroupRayBundle, inpaint_smooth};
use crate::tiling::PixelFilter;

// -------------------------------------------------------------------------------------------------

/// Lower clamp on the directional weight, so that sharply specular samples
/// seen far from the resampling eye are attenuated but never fully dropped.
const MIN_DIRECTIONAL_WEIGHT: FreeCoordinate = 1e-6;

/// Accumulates filtered radiance from classified ray samples into one frame's
/// texture.
///
/// The accumulation buffer is additive only: [`Self::add()`] may be called
/// once per view group (from a single worker at a time; different frames'
/// accumulators run in parallel), and [`Self::resolve()`] divides, masks, and
/// inpaints once at the end.
#[derive(Debug)]
pub struct RadianceAccumulator {
    frame: Frame,
    /// Resampling reference point: radiance is re-weighted towards rays that
    /// pass near this eye position.
    eye: FreePoint,
    sigma2_eye: FreeCoordinate,
    filter: Arc<dyn PixelFilter>,
    /// Premultiplied (R, G, B, weight) accumulators, one per output texel.
    rgbw: ImgVec<[f64; 4]>,
}

impl RadianceAccumulator {
    /// Constructs an accumulator for `frame` with a `texture_size` output.
    ///
    /// `sigma2_eye` is the falloff scale of the directional weight, in world
    /// units of perpendicular distance from `eye`.
    ///
    /// Panics if the texture size has a zero axis or `sigma2_eye` is not a
    /// positive finite number.
    pub fn new(
        frame: Frame,
        texture_size: ImageSize,
        eye: FreePoint,
        sigma2_eye: FreeCoordinate,
        filter: Arc<dyn PixelFilter>,
    ) -> Self {
        assert!(
            texture_size.width > 0 && texture_size.height > 0,
            "degenerate texture size {texture_size:?}"
        );
        assert!(
            sigma2_eye > 0.0 && sigma2_eye.is_finite(),
            "bad directional falloff {sigma2_eye}"
        );
        let width = texture_size.width as usize;
        let height = texture_size.height as usize;
        Self {
            frame,
            eye,
            sigma2_eye,
            filter,
            rgbw: ImgVec::new(vec![[0.0; 4]; width * height], width, height),
        }
    }

    /// The frame this accumulator is building a texture for.
    #[inline]
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Output texture dimensions.
    pub fn texture_size(&self) -> ImageSize {
        ImageSize::new(self.rgbw.width() as u32, self.rgbw.height() as u32)
    }

    /// Accumulates one view group's classified rays.
    ///
    /// Every solid sample is projected to frame space (samples that fail to
    /// project are silently skipped; upstream classification is tolerant),
    /// weighted by the directional falloff around the eye and by the pixel
    /// filter, and splatted over the filter's footprint. `freespace_rays` in
    /// `classified` are accepted but currently unused, reserved for
    /// occlusion-aware weighting.
    pub fn add(&mut self, bundle: &ViewGroupRayBundle, classified: &ClassifiedRays) {
        let width = self.rgbw.width();
        let height = self.rgbw.height();
        let stride = self.rgbw.stride();
        let radius = self.filter.radius();

        for &(ray, sample) in &classified.solid_samples {
            let origin = bundle.ray_origin(ray);
            let end = bundle.sample_end(ray, sample);
            let Some(uv) = solid_ray_to_frame_space(&self.frame, origin, end) else {
                continue;
            };
            let center_x = texel_center(uv.x, width);
            let center_y = texel_center(uv.y, height);
            let weight = directional_weight(self.eye, origin, end - origin, self.sigma2_eye);
            let color = bundle.sample_color(ray, sample);

            // Half-open footprint of the reconstruction filter.
            let x_range = (center_x - radius).round() as i64..(center_x + radius).round() as i64;
            let y_range = (center_y - radius).round() as i64..(center_y + radius).round() as i64;
            for y in y_range.clone() {
                let Ok(y) = usize::try_from(y) else { continue };
                if y >= height {
                    continue;
                }
                let filter_y = self.filter.eval(y as FreeCoordinate + 0.5 - center_y);
                for x in x_range.clone() {
                    let Ok(x) = usize::try_from(x) else { continue };
                    if x >= width {
                        continue;
                    }
                    let filter_x = self.filter.eval(x as FreeCoordinate + 0.5 - center_x);
                    let splat = weight * filter_x * filter_y;
                    if splat == 0.0 {
                        continue;
                    }
                    let texel = &mut self.rgbw.buf_mut()[y * stride + x];
                    for (accumulator, channel) in texel[..3].iter_mut().zip(color) {
                        *accumulator += f64::from(channel) * splat;
                    }
                    texel[3] += splat;
                }
            }
        }
    }

    /// Divides accumulated radiance by accumulated weight, clamps to
    /// `[0, 1]`, and fills unfilled texels by inpainting.
    ///
    /// A texel is unfilled (masked) exactly when its accumulated weight is
    /// zero or the per-channel quotient is non-finite.
    pub fn resolve(&self) -> ImgVec<[f32; 3]> {
        let (mut image, mask) = self.resolve_unfilled();
        inpaint_smooth(mask.as_ref(), &mut image);
        image
    }

    /// The division/clamping step of [`Self::resolve()`], before inpainting,
    /// with the mask of unfilled texels.
    pub(crate) fn resolve_unfilled(&self) -> (ImgVec<[f32; 3]>, ImgVec<bool>) {
        let width = self.rgbw.width();
        let height = self.rgbw.height();
        let mut image = vec![[0.0_f32; 3]; width * height];
        let mut mask = vec![false; width * height];
        for (index, &[r, g, b, weight]) in self.rgbw.buf().iter().enumerate() {
            let quotient = [r / weight, g / weight, b / weight];
            if weight == 0.0 || quotient.iter().any(|channel| !channel.is_finite()) {
                mask[index] = true;
            } else {
                image[index] = quotient.map(|channel| channel.clamp(0.0, 1.0) as f32);
            }
        }
        (
            ImgVec::new(image, width, height),
            ImgVec::new(mask, width, height),
        )
    }
}

/// Continuous texture coordinate of frame coordinate `u` for a `resolution`
/// texel axis: texel centers at integer + 0.5, with a 1×1 axis special-cased
/// to its center.
fn texel_center(u: FreeCoordinate, resolution: usize) -> FreeCoordinate {
    if resolution == 1 {
        0.5
    } else {
        0.5 + u * (resolution - 1) as FreeCoordinate
    }
}

/// Gaussian falloff in the perpendicular distance from `eye` to the infinite
/// line through the sample's originating ray, clamped to
/// [`MIN_DIRECTIONAL_WEIGHT`].
fn directional_weight(
    eye: FreePoint,
    origin: FreePoint,
    direction: FreeVector,
    sigma2_eye: FreeCoordinate,
) -> FreeCoordinate {
    let square_length = direction.square_length();
    if square_length == 0.0 {
        return MIN_DIRECTIONAL_WEIGHT;
    }
    let t = (eye - origin).dot(direction) / square_length;
    let distance = (eye - (origin + direction * t)).length();
    (-0.5 * (distance / sigma2_eye).powi(2))
        .exp()
        .max(MIN_DIRECTIONAL_WEIGHT)
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Camera, Ldi, PinholeCamera, ViewGroup};
    use crate::tiling::BoxFilter;
    use euclid::{point3, vec3};
    use pretty_assertions::assert_eq;

    fn frame_at(z: FreeCoordinate) -> Frame {
        Frame::from_corners([
            point3(-1., -1., z),
            point3(1., -1., z),
            point3(1., 1., z),
            point3(-1., 1., z),
        ])
    }

    /// A single centered ray from the origin with one sample of `color` at
    /// `depth`.
    fn single_sample_bundle(color: [f32; 4], depth: f32) -> ViewGroupRayBundle {
        let size = ImageSize::new(1, 1);
        let camera: Arc<dyn Camera> = Arc::new(PinholeCamera::looking(
            point3(0., 0., 0.),
            vec3(0., 0., -1.),
            vec3(0., 1., 0.),
            size,
            60.0,
        ));
        let ldi = Ldi::new(size, vec![0, 1], vec![color], vec![depth]).unwrap();
        ViewGroupRayBundle::new(ViewGroup::new(vec![camera], vec![ldi]))
    }

    fn solid_hit() -> ClassifiedRays {
        let mut classified = ClassifiedRays::default();
        classified.solid_samples.push((0, 0));
        classified
    }

    fn accumulator(texture_size: ImageSize) -> RadianceAccumulator {
        RadianceAccumulator::new(
            frame_at(-2.0),
            texture_size,
            point3(0., 0., 0.),
            0.5,
            Arc::new(BoxFilter::new(0.5)),
        )
    }

    #[test]
    fn resolve_normalizes_regardless_of_weight() {
        let mut accumulator = accumulator(ImageSize::new(1, 1));
        let bundle = single_sample_bundle([0.25, 0.5, 0.75, 1.0], 2.0);
        accumulator.add(&bundle, &solid_hit());
        accumulator.add(&bundle, &solid_hit());
        let image = accumulator.resolve();
        // Two accumulations divide out: sum/weight is the original color.
        let [r, g, b] = image.buf()[0];
        assert!((r - 0.25).abs() < 1e-6 && (g - 0.5).abs() < 1e-6 && (b - 0.75).abs() < 1e-6);
    }

    #[test]
    fn resolve_clamps_to_unit_range() {
        let mut accumulator = accumulator(ImageSize::new(1, 1));
        accumulator.add(&single_sample_bundle([4.0, -1.0, 0.5, 1.0], 2.0), &solid_hit());
        let [r, g, b] = accumulator.resolve().buf()[0];
        assert_eq!((r, g, b), (1.0, 0.0, 0.5));
    }

    #[test]
    fn unfilled_texels_are_masked_exactly() {
        let mut accumulator = accumulator(ImageSize::new(4, 4));
        // One centered sample fills only part of the texture; the rest must
        // be masked, and exactly the zero-weight texels.
        accumulator.add(&single_sample_bundle([0.5, 0.5, 0.5, 1.0], 2.0), &solid_hit());
        let (_, mask) = accumulator.resolve_unfilled();
        for (texel, masked) in accumulator.rgbw.buf().iter().zip(mask.buf()) {
            assert_eq!(texel[3] == 0.0, *masked);
        }
        assert!(mask.buf().iter().any(|m| !*m), "the sample filled something");
    }

    #[test]
    fn sample_off_the_frame_is_skipped() {
        let mut accumulator = accumulator(ImageSize::new(2, 2));
        // Sample at depth 1: well in front of the frame's plane at z = -2.
        accumulator.add(&single_sample_bundle([1.0; 4], 1.0), &solid_hit());
        let (_, mask) = accumulator.resolve_unfilled();
        assert!(mask.buf().iter().all(|m| *m), "nothing may be accumulated");
    }

    #[test]
    fn footprint_is_clipped_at_texture_edges() {
        let mut accumulator = RadianceAccumulator::new(
            frame_at(-2.0),
            ImageSize::new(4, 4),
            point3(0., 0., 0.),
            0.5,
            Arc::new(BoxFilter::new(1.5)),
        );
        // One sample near the (u, v) = (0, 0) corner of the quad, so the
        // filter footprint extends past the texture's left and top edges on
        // both axes and must be clipped, not wrapped or panicked on.
        let toward_corner = vec3(-0.9, -0.9, -2.0);
        let size = ImageSize::new(1, 1);
        let camera: Arc<dyn Camera> = Arc::new(PinholeCamera::looking(
            point3(0., 0., 0.),
            toward_corner,
            vec3(0., 1., 0.),
            size,
            60.0,
        ));
        let depth = toward_corner.length() as f32;
        let ldi = Ldi::new(size, vec![0, 1], vec![[0.5; 4]], vec![depth]).unwrap();
        let bundle = ViewGroupRayBundle::new(ViewGroup::new(vec![camera], vec![ldi]));
        accumulator.add(&bundle, &solid_hit());

        // The sample lands at texel center (0.65, 0.65); a radius-1.5 box
        // reaches texels 0 and 1 on each axis and nothing else.
        let (_, mask) = accumulator.resolve_unfilled();
        for y in 0..4usize {
            for x in 0..4usize {
                let expected_filled = x < 2 && y < 2;
                assert_eq!(
                    !mask.buf()[y * 4 + x],
                    expected_filled,
                    "texel ({x}, {y})"
                );
            }
        }
    }

    #[test]
    fn directional_weight_behavior() {
        let origin = point3(0., 0., 0.);
        let direction = vec3(0., 0., -1.);
        // Eye on the ray line: no falloff.
        assert_eq!(
            directional_weight(point3(0., 0., -3.), origin, direction, 0.5),
            1.0
        );
        // Far off the line: clamped, never zero.
        assert_eq!(
            directional_weight(point3(100., 0., 0.), origin, direction, 0.5),
            MIN_DIRECTIONAL_WEIGHT
        );
        // Nearby eye: attenuated but meaningful.
        let near = directional_weight(point3(0.25, 0., -3.), origin, direction, 0.5);
        assert!(near < 1.0 && near > MIN_DIRECTIONAL_WEIGHT);
    }
}
