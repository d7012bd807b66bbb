use core::fmt;

use euclid::Transform3D;

use crate::math::{Eye, FreeCoordinate, FreePoint, FreeVector, ImageSize, PixelPoint, World};

// -------------------------------------------------------------------------------------------------

/// A calibrated camera, as consumed by the reconstruction pipeline.
///
/// Implementations define their own projection model; the pipeline only ever
/// asks for rays. In particular, the meaning of the `depth` value passed to
/// [`Camera::ray_end()`] (window-Z, eye-Z, distance along the ray, …) is
/// implementation-defined and must match the depth channel of the
/// [`Ldi`](crate::scene::Ldi)s captured with this camera.
///
/// This trait is object-safe so that heterogeneous camera models can be used
/// without generics.
pub trait Camera: Send + Sync + fmt::Debug {
    /// Width and height of this camera's images, in pixels.
    fn image_size(&self) -> ImageSize;

    /// World-space position of the camera: its center of projection, or a
    /// representative location for models without a single one. This may
    /// differ from per-pixel [`Camera::ray_origin()`]s.
    fn position(&self) -> FreePoint;

    /// The rigid transform placing the camera's eye space
    /// (`x` right, `y` up, looking along `-z`) in world space.
    fn world_from_eye(&self) -> Transform3D<FreeCoordinate, Eye, World>;

    /// World-space origin of the ray through the center of `pixel`.
    fn ray_origin(&self, pixel: PixelPoint) -> FreePoint;

    /// World-space direction of the ray through the center of `pixel`.
    /// Not necessarily normalized.
    fn ray_direction(&self, pixel: PixelPoint) -> FreeVector;

    /// World-space position of the sample at `depth` along the ray through the
    /// center of `pixel`.
    fn ray_end(&self, pixel: PixelPoint, depth: FreeCoordinate) -> FreePoint;
}

// -------------------------------------------------------------------------------------------------

/// A simple pinhole [`Camera`] with a centered principal point and
/// distance-along-the-ray depth semantics.
///
/// This is sufficient for synthetic captures and for tests; real capture rigs
/// will generally provide their own [`Camera`] implementations.
#[derive(Clone, Debug)]
pub struct PinholeCamera {
    image_size: ImageSize,
    position: FreePoint,
    right: FreeVector,
    up: FreeVector,
    forward: FreeVector,
    /// Focal length in pixel units.
    focal_length: FreeCoordinate,
}

impl PinholeCamera {
    /// Constructs a camera at `position` looking along `forward`, with the given
    /// vertical field of view in degrees.
    ///
    /// `up` need not be orthogonal to `forward`; it is re-orthogonalized.
    ///
    /// Panics if `forward` is zero, `up` is parallel to `forward`, or the field
    /// of view is not within (0°, 180°).
    pub fn looking(
        position: FreePoint,
        forward: FreeVector,
        up: FreeVector,
        image_size: ImageSize,
        fov_y_degrees: FreeCoordinate,
    ) -> Self {
        assert!(
            fov_y_degrees > 0.0 && fov_y_degrees < 180.0,
            "field of view {fov_y_degrees}° out of range"
        );
        let forward = forward.normalize();
        assert!(forward.length().is_finite(), "zero or non-finite forward vector");
        let right = forward.cross(up).normalize();
        assert!(
            right.length().is_finite(),
            "up vector parallel to forward vector"
        );
        let up = right.cross(forward);

        let focal_length =
            FreeCoordinate::from(image_size.height) / 2.0 / (fov_y_degrees.to_radians() / 2.0).tan();
        Self {
            image_size,
            position,
            right,
            up,
            forward,
            focal_length,
        }
    }

    fn eye_direction(&self, pixel: PixelPoint) -> FreeVector {
        let center_x = FreeCoordinate::from(self.image_size.width) / 2.0;
        let center_y = FreeCoordinate::from(self.image_size.height) / 2.0;
        let x = FreeCoordinate::from(pixel.x) + 0.5 - center_x;
        // Pixel rows run top to bottom; eye-space y runs up.
        let y = center_y - (FreeCoordinate::from(pixel.y) + 0.5);
        (self.right * x + self.up * y + self.forward * self.focal_length).normalize()
    }
}

impl Camera for PinholeCamera {
    fn image_size(&self) -> ImageSize {
        self.image_size
    }

    fn position(&self) -> FreePoint {
        self.position
    }

    fn world_from_eye(&self) -> Transform3D<FreeCoordinate, Eye, World> {
        let Self {
            position: p,
            right: r,
            up: u,
            forward: f,
            ..
        } = *self;
        // Row-vector convention: rows are the images of the eye-space basis
        // vectors, and eye space looks along -z.
        Transform3D::new(
            r.x, r.y, r.z, 0.0, //
            u.x, u.y, u.z, 0.0, //
            -f.x, -f.y, -f.z, 0.0, //
            p.x, p.y, p.z, 1.0,
        )
    }

    fn ray_origin(&self, _pixel: PixelPoint) -> FreePoint {
        self.position
    }

    fn ray_direction(&self, pixel: PixelPoint) -> FreeVector {
        self.eye_direction(pixel)
    }

    fn ray_end(&self, pixel: PixelPoint, depth: FreeCoordinate) -> FreePoint {
        self.position + self.eye_direction(pixel) * depth
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use euclid::{point2, point3, vec3};

    fn _camera_is_object_safe(_: &dyn Camera) {}

    fn test_camera() -> PinholeCamera {
        PinholeCamera::looking(
            point3(1., 2., 3.),
            vec3(0., 0., -1.),
            vec3(0., 1., 0.),
            ImageSize::new(8, 8),
            90.0,
        )
    }

    #[test]
    fn center_rays_point_forward() {
        let camera = test_camera();
        // The four pixels around the center straddle the axis symmetrically.
        let mean: FreeVector = [(3, 3), (4, 3), (3, 4), (4, 4)]
            .into_iter()
            .map(|(x, y)| camera.ray_direction(point2(x, y)))
            .fold(FreeVector::zero(), |a, b| a + b)
            / 4.0;
        assert!((mean.normalize() - vec3(0., 0., -1.)).length() < 1e-9);
    }

    #[test]
    fn ray_end_is_at_depth_distance() {
        let camera = test_camera();
        let pixel = point2(0, 7);
        let end = camera.ray_end(pixel, 5.0);
        assert!(((end - camera.ray_origin(pixel)).length() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn fov_covers_image_edge() {
        let camera = test_camera();
        // With a 90° vertical fov, the top edge of the image is 45° off axis.
        let top = camera.ray_direction(point2(3, 0));
        let angle = top.dot(vec3(0., 0., -1.)).acos().to_degrees();
        assert!(angle < 45.0, "{angle}");
        assert!(angle > 35.0, "{angle}");
    }

    #[test]
    fn world_from_eye_translation_is_position() {
        let camera = test_camera();
        let m = camera.world_from_eye();
        let p = m.transform_point3d(point3(0., 0., 0.)).unwrap();
        assert_eq!(p, point3(1., 2., 3.));
        // -z is forward
        let q = m.transform_point3d(point3(0., 0., -2.)).unwrap();
        assert_eq!(q, point3(1., 2., 1.));
    }
}
