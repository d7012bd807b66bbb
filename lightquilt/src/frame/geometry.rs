use euclid::point2;
use ordered_float::OrderedFloat;

use crate::math::{FreeCoordinate, FreePoint, FreeVector, UvPoint};

// -------------------------------------------------------------------------------------------------

/// Relative plane-distance tolerance for treating a point as lying on a
/// frame's plane, as a fraction of the quad diagonal.
const PLANE_TOLERANCE: FreeCoordinate = 1e-6;

/// Tolerance on frame coordinates at the quad boundary, so that round trips
/// through [`frame_to_world()`] and [`world_to_frame()`] do not reject
/// points that land a rounding error outside `[0, 1]`.
const UV_TOLERANCE: FreeCoordinate = 1e-9;

// -------------------------------------------------------------------------------------------------

/// A planar textured quadrilateral, the output primitive of reconstruction.
///
/// The four corners are ordered so that corner `i` carries frame coordinate
/// `(u, v)` equal to `(0,0)`, `(1,0)`, `(1,1)`, `(0,1)` respectively, and must
/// be coplanar and non-self-intersecting. That invariant is established by the
/// generator, not re-checked at every use.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    /// World-space corner positions, in `(u, v)` order
    /// `(0,0), (1,0), (1,1), (0,1)`.
    pub corners: [FreePoint; 4],
    /// Per-corner homogeneous texture coordinate `w`, for projective
    /// texturing of quads seen at an angle.
    pub texcoord_w: [FreeCoordinate; 4],
    /// Back-to-front compositing rank: 0 draws first (farthest). −1 until
    /// assigned by [`initialize_approximate_draw_order()`] or a
    /// [`FrameSorter`](crate::tiling::FrameSorter).
    pub draw_order: i32,
}

impl Frame {
    /// A frame over the given corners with unit texture weights and an
    /// unassigned draw order.
    pub fn from_corners(corners: [FreePoint; 4]) -> Self {
        Self {
            corners,
            texcoord_w: [1.0; 4],
            draw_order: -1,
        }
    }

    /// Centroid of the four corners.
    pub fn centroid(&self) -> FreePoint {
        let sum = self
            .corners
            .iter()
            .fold(FreeVector::zero(), |acc, c| acc + c.to_vector());
        FreePoint::origin() + sum / 4.0
    }
}

/// An infinite plane, as a point on it and a (not necessarily unit) normal.
#[derive(Clone, Copy, Debug, PartialEq)]
#[expect(clippy::exhaustive_structs)]
pub struct Plane {
    /// A point on the plane.
    pub point: FreePoint,
    /// Normal vector; not normalized.
    pub normal: FreeVector,
}

/// The supporting plane of a frame: through corner 0 with normal
/// `(corner1 − corner0) × (corner3 − corner0)`.
pub fn plane_from_frame(frame: &Frame) -> Plane {
    let [c0, c1, _, c3] = frame.corners;
    Plane {
        point: c0,
        normal: (c1 - c0).cross(c3 - c0),
    }
}

/// Parameter `t` at which `origin + t·direction` crosses `plane`, or [`None`]
/// if the ray is (numerically) parallel to it.
fn ray_plane_intersection(
    plane: &Plane,
    origin: FreePoint,
    direction: FreeVector,
) -> Option<FreeCoordinate> {
    let denominator = direction.dot(plane.normal);
    if denominator == 0.0 {
        return None;
    }
    let t = (plane.point - origin).dot(plane.normal) / denominator;
    t.is_finite().then_some(t)
}

// -------------------------------------------------------------------------------------------------

/// Forward bilinear evaluation: the world-space point at frame coordinates
/// `(u, v)`.
///
/// Fails for coordinates outside `[0, 1]²`.
pub fn frame_to_world(frame: &Frame, frame_coords: UvPoint) -> Option<FreePoint> {
    let UvPoint { x: u, y: v, .. } = frame_coords;
    if !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&v) {
        return None;
    }
    let [c0, c1, c2, c3] = frame.corners.map(FreePoint::to_vector);
    let blended =
        c0 * ((1.0 - u) * (1.0 - v)) + c1 * (u * (1.0 - v)) + c2 * (u * v) + c3 * ((1.0 - u) * v);
    Some(FreePoint::origin() + blended)
}

/// Inverse bilinear mapping: the frame coordinates `(u, v) ∈ [0, 1]²` at which
/// [`frame_to_world()`] produces `point`.
///
/// Fails if the point lies off the frame's plane (beyond a tolerance
/// proportional to the quad diagonal), projects outside the quad, or the
/// quad is numerically degenerate. The mapping inverts the bilinear patch in
/// closed form; when the underlying quadratic has two roots in range, the
/// smaller `v` is chosen.
pub fn world_to_frame(frame: &Frame, point: FreePoint) -> Option<UvPoint> {
    let [c0, c1, c2, c3] = frame.corners;
    let normal = (c1 - c0).cross(c3 - c0);
    let normal_length = normal.length();
    let diagonal = (c2 - c0).length().max((c3 - c1).length());
    if !(normal_length.is_finite() && normal_length > 0.0 && diagonal > 0.0) {
        return None; // degenerate quad
    }
    let unit_normal = normal / normal_length;
    if (point - c0).dot(unit_normal).abs() > diagonal * PLANE_TOLERANCE {
        return None; // off-plane
    }

    // Project everything into a 2D basis of the plane; the bilinear structure
    // is preserved by any injective linear projection of a planar quad.
    let u_axis = (c1 - c0).normalize();
    if !u_axis.length().is_finite() {
        return None;
    }
    let v_axis = unit_normal.cross(u_axis);
    let project =
        |p: FreePoint| euclid::default::Vector2D::new((p - c0).dot(u_axis), (p - c0).dot(v_axis));
    let cross2 = |a: euclid::default::Vector2D<FreeCoordinate>,
                  b: euclid::default::Vector2D<FreeCoordinate>| a.x * b.y - a.y * b.x;

    // Solve h = e·u + f·v + g·u·v for (u, v) via the quadratic in v.
    let e = project(c1);
    let f = project(c3);
    let g = project(c0) - project(c1) + project(c2) - project(c3);
    let h = project(point);
    let k2 = cross2(g, f);
    let k1 = cross2(e, f) + cross2(h, g);
    let k0 = cross2(h, e);

    let in_range = |v: FreeCoordinate| (-UV_TOLERANCE..=1.0 + UV_TOLERANCE).contains(&v);
    let v = if k2.abs() < 1e-12 * k1.abs().max(1.0) {
        // Parallelogram case: the quadratic degenerates to linear.
        if k1 == 0.0 {
            return None;
        }
        -k0 / k1
    } else {
        let discriminant = k1 * k1 - 4.0 * k2 * k0;
        if discriminant < 0.0 {
            return None;
        }
        let sqrt_d = discriminant.sqrt();
        let v_a = (-k1 - sqrt_d) / (2.0 * k2);
        let v_b = (-k1 + sqrt_d) / (2.0 * k2);
        let (v_min, v_max) = if v_a <= v_b { (v_a, v_b) } else { (v_b, v_a) };
        if in_range(v_min) {
            v_min
        } else if in_range(v_max) {
            v_max
        } else {
            return None;
        }
    };
    if !in_range(v) {
        return None;
    }

    // Recover u from whichever axis has the better-conditioned denominator.
    let denominator = e + g * v;
    let u = if denominator.x.abs() >= denominator.y.abs() {
        (h.x - f.x * v) / denominator.x
    } else {
        (h.y - f.y * v) / denominator.y
    };
    if !u.is_finite() || !in_range(u) {
        return None;
    }
    Some(point2(u.clamp(0.0, 1.0), v.clamp(0.0, 1.0)))
}

// -------------------------------------------------------------------------------------------------

/// Maps a conceptually infinite ray to frame coordinates: the ray is
/// intersected with the frame's plane (the crossing parameter clamped to be
/// non-negative) and the crossing point inverted through the bilinear map.
///
/// Fails if the ray is parallel to the plane or the crossing lies outside the
/// quad.
pub fn freespace_ray_to_frame_space(
    frame: &Frame,
    origin: FreePoint,
    direction: FreeVector,
) -> Option<UvPoint> {
    ray_to_frame_space(frame, origin, direction, FreeCoordinate::INFINITY)
}

/// Maps a ray terminated at a known solid intersection `end` to frame
/// coordinates: as [`freespace_ray_to_frame_space()`], but the crossing
/// parameter is additionally clamped to not overshoot `end`.
pub fn solid_ray_to_frame_space(
    frame: &Frame,
    origin: FreePoint,
    end: FreePoint,
) -> Option<UvPoint> {
    ray_to_frame_space(frame, origin, end - origin, 1.0)
}

fn ray_to_frame_space(
    frame: &Frame,
    origin: FreePoint,
    direction: FreeVector,
    max_t: FreeCoordinate,
) -> Option<UvPoint> {
    let plane = plane_from_frame(frame);
    let t = ray_plane_intersection(&plane, origin, direction)?.clamp(0.0, max_t);
    world_to_frame(frame, origin + direction * t)
}

// -------------------------------------------------------------------------------------------------

/// Reasons [`dilate_frame()`] could not expand a frame.
#[derive(Clone, Copy, Debug, Eq, PartialEq, displaydoc::Display)]
#[non_exhaustive]
pub enum DilateError {
    /// cannot dilate a degenerate (zero-area) quad
    DegenerateQuad,
    /// dilation amount must be nonzero
    ZeroAmount,
}

impl std::error::Error for DilateError {}

/// Expands the quad uniformly within its own plane by the world-space margin
/// `amount`: every corner moves away from the centroid by `amount`.
///
/// Texture weights and draw order are preserved.
pub fn dilate_frame(frame: &Frame, amount: FreeCoordinate) -> Result<Frame, DilateError> {
    if amount == 0.0 {
        return Err(DilateError::ZeroAmount);
    }
    let normal_length = plane_from_frame(frame).normal.length();
    if !(normal_length.is_finite() && normal_length > 0.0) {
        return Err(DilateError::DegenerateQuad);
    }
    let centroid = frame.centroid();
    let mut dilated = *frame;
    for corner in &mut dilated.corners {
        let outward = (*corner - centroid).normalize();
        if !outward.length().is_finite() {
            return Err(DilateError::DegenerateQuad);
        }
        *corner += outward * amount;
    }
    Ok(dilated)
}

// -------------------------------------------------------------------------------------------------

/// Assigns every frame a provisional `draw_order` by ranking centroid
/// distance from the world origin: the farthest frame gets rank 0 (drawn
/// first, back-to-front), ties broken by list position.
///
/// This is a cheap approximation; a [`FrameSorter`](crate::tiling::FrameSorter)
/// with real visibility information may refine it afterwards.
pub fn initialize_approximate_draw_order(frames: &mut [Frame]) {
    let mut order: Vec<usize> = (0..frames.len()).collect();
    order.sort_by_key(|&i| {
        (
            OrderedFloat(-frames[i].centroid().distance_to(FreePoint::origin())),
            i,
        )
    });
    for (rank, index) in order.into_iter().enumerate() {
        frames[index].draw_order = rank as i32;
    }
}

// -------------------------------------------------------------------------------------------------
