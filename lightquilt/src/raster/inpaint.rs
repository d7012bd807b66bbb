use imgref::{ImgRef, ImgVec};

/// Gauss-Seidel passes run at every pyramid level.
const RELAXATION_PASSES: usize = 30;

/// Fills every masked texel of `image` with a smooth interpolation of the
/// unmasked texels, leaving unmasked texels bit-identical.
///
/// This is a multiresolution-accelerated iterative solver for the discrete
/// Laplace equation with Dirichlet boundary conditions at the unmasked
/// texels: the image is recursively 2× box-downsampled (averaging unmasked
/// source texels only; a fully masked 2×2 block stays masked at the coarse
/// level), solved at the coarse level, upsampled into still-masked fine
/// texels by nearest-pixel replication, and relaxed with
/// [`RELAXATION_PASSES`] Gauss-Seidel sweeps at every level. The result is a
/// smooth fill, not a plausible-looking one.
///
/// Panics if `mask` and `image` dimensions differ.
pub fn inpaint_smooth(mask: ImgRef<'_, bool>, image: &mut ImgVec<[f32; 3]>) {
    assert_eq!(
        (mask.width(), mask.height()),
        (image.width(), image.height()),
        "mask and image dimensions must match"
    );
    if image.width() > 2 && image.height() > 2 {
        let (coarse_mask, mut coarse_image) = masked_downsample(mask, image.as_ref());
        inpaint_smooth(coarse_mask.as_ref(), &mut coarse_image);
        masked_upsample(coarse_image.as_ref(), mask, image);
    }
    relax(mask, image);
}

/// 2× box downsample of `image` that averages only unmasked texels of each
/// (clipped) 2×2 block. Blocks with no unmasked texel produce a masked,
/// zero-valued coarse texel.
fn masked_downsample(
    mask: ImgRef<'_, bool>,
    image: ImgRef<'_, [f32; 3]>,
) -> (ImgVec<bool>, ImgVec<[f32; 3]>) {
    let coarse_width = image.width().div_ceil(2);
    let coarse_height = image.height().div_ceil(2);
    let mut coarse_mask = vec![true; coarse_width * coarse_height];
    let mut coarse_image = vec![[0.0_f32; 3]; coarse_width * coarse_height];

    for coarse_y in 0..coarse_height {
        for coarse_x in 0..coarse_width {
            let mut sum = [0.0_f64; 3];
            let mut contributors = 0u32;
            for y in (coarse_y * 2)..((coarse_y * 2 + 2).min(image.height())) {
                for x in (coarse_x * 2)..((coarse_x * 2 + 2).min(image.width())) {
                    if !mask.buf()[y * mask.stride() + x] {
                        let texel = image.buf()[y * image.stride() + x];
                        for (accumulator, channel) in sum.iter_mut().zip(texel) {
                            *accumulator += f64::from(channel);
                        }
                        contributors += 1;
                    }
                }
            }
            if contributors > 0 {
                let index = coarse_y * coarse_width + coarse_x;
                coarse_mask[index] = false;
                coarse_image[index] = sum.map(|channel| (channel / f64::from(contributors)) as f32);
            }
        }
    }
    (
        ImgVec::new(coarse_mask, coarse_width, coarse_height),
        ImgVec::new(coarse_image, coarse_width, coarse_height),
    )
}

/// Copies the coarse solution into the texels still masked at the fine level,
/// by nearest-pixel replication. Unmasked fine texels are untouched.
fn masked_upsample(
    coarse: ImgRef<'_, [f32; 3]>,
    mask: ImgRef<'_, bool>,
    image: &mut ImgVec<[f32; 3]>,
) {
    let stride = image.stride();
    for y in 0..image.height() {
        for x in 0..image.width() {
            if mask.buf()[y * mask.stride() + x] {
                image.buf_mut()[y * stride + x] = coarse.buf()[(y / 2) * coarse.stride() + x / 2];
            }
        }
    }
}

/// [`RELAXATION_PASSES`] in-place Gauss-Seidel sweeps: every masked texel is
/// replaced by the average of its in-bounds 4-connected neighbors. A texel
/// with no in-bounds neighbor (a 1×1 image) is left unchanged.
fn relax(mask: ImgRef<'_, bool>, image: &mut ImgVec<[f32; 3]>) {
    let (width, height) = (image.width(), image.height());
    let stride = image.stride();
    for _ in 0..RELAXATION_PASSES {
        for y in 0..height {
            for x in 0..width {
                if !mask.buf()[y * mask.stride() + x] {
                    continue;
                }
                let mut sum = [0.0_f32; 3];
                let mut neighbors = 0u32;
                let mut visit = |nx: usize, ny: usize| {
                    let texel = image.buf()[ny * stride + nx];
                    for (accumulator, channel) in sum.iter_mut().zip(texel) {
                        *accumulator += channel;
                    }
                    neighbors += 1;
                };
                if x > 0 {
                    visit(x - 1, y);
                }
                if x + 1 < width {
                    visit(x + 1, y);
                }
                if y > 0 {
                    visit(x, y - 1);
                }
                if y + 1 < height {
                    visit(x, y + 1);
                }
                if neighbors > 0 {
                    image.buf_mut()[y * stride + x] =
                        sum.map(|channel| channel / neighbors as f32);
                }
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn solid(value: f32) -> [f32; 3] {
        [value; 3]
    }

    #[test]
    fn unmasked_texels_are_bit_identical() {
        let width = 9;
        let height = 7;
        // A deterministic speckle of values and mask bits.
        let image: Vec<[f32; 3]> = (0..width * height)
            .map(|i| solid((i as f32 * 0.37).fract()))
            .collect();
        let mask: Vec<bool> = (0..width * height).map(|i| i % 3 == 0).collect();
        let before = image.clone();

        let mut image = ImgVec::new(image, width, height);
        inpaint_smooth(ImgVec::new(mask.clone(), width, height).as_ref(), &mut image);

        for (i, (masked, original)) in mask.iter().zip(before).enumerate() {
            if !masked {
                assert_eq!(image.buf()[i], original, "texel {i} must not change");
            }
        }
    }

    #[test]
    fn vertical_gradient_between_fixed_rows() {
        let width = 8;
        let height = 16;
        let top = 0.125_f32;
        let bottom = 0.875_f32;
        let mut image = vec![solid(0.0); width * height];
        let mut mask = vec![true; width * height];
        for x in 0..width {
            image[x] = solid(top);
            mask[x] = false;
            image[(height - 1) * width + x] = solid(bottom);
            mask[(height - 1) * width + x] = false;
        }

        let mut image = ImgVec::new(image, width, height);
        inpaint_smooth(ImgVec::new(mask, width, height).as_ref(), &mut image);

        // Near-constant along each row (the in-place sweep order leaves a
        // small left-to-right residual), strictly monotonic down each column.
        for y in 0..height {
            let row_value = image.buf()[y * image.stride()][0];
            for x in 0..width {
                let texel = image.buf()[y * image.stride() + x][0];
                assert!(
                    (texel - row_value).abs() < 1e-3,
                    "row {y}: {texel} deviates from {row_value}"
                );
            }
            if y > 0 {
                let above = image.buf()[(y - 1) * image.stride()][0];
                assert!(
                    row_value > above,
                    "row {y}: {row_value} not above {above}"
                );
            }
        }
    }

    #[test]
    fn fully_masked_image_stays_zero() {
        let mut image = ImgVec::new(vec![solid(0.0); 12], 4, 3);
        inpaint_smooth(ImgVec::new(vec![true; 12], 4, 3).as_ref(), &mut image);
        assert!(image.buf().iter().all(|texel| *texel == solid(0.0)));
    }

    #[test]
    fn single_hole_takes_neighbor_average() {
        // A 3x3 image of 0.4 with a masked center must resolve to 0.4.
        let mut image_buf = vec![solid(0.4); 9];
        image_buf[4] = solid(0.0);
        let mut mask = vec![false; 9];
        mask[4] = true;
        let mut image = ImgVec::new(image_buf, 3, 3);
        inpaint_smooth(ImgVec::new(mask, 3, 3).as_ref(), &mut image);
        assert_eq!(image.buf()[4], solid(0.4));
    }
}
