use core::fmt;
use core::iter::FusedIterator;

use euclid::{Point3D, Size3D};

use crate::math::{FreeCoordinate, FreePoint, FreeVector, World};

/// Axis-Aligned Box data type, used for the reconstruction headbox and for
/// bounding regions of camera positions.
#[derive(Copy, Clone, PartialEq)]
pub struct Aab {
    // Invariant: lower_bounds ≤ upper_bounds on every axis, and no NaNs.
    lower_bounds: FreePoint,
    upper_bounds: FreePoint,
}

impl Aab {
    /// The [`Aab`] of zero size at the origin.
    pub const ZERO: Aab = Aab {
        lower_bounds: Point3D::new(0., 0., 0.),
        upper_bounds: Point3D::new(0., 0., 0.),
    };

    /// Constructs an [`Aab`] from most-negative and most-positive corner points.
    ///
    /// Panics if the points are not in the proper order or if they are NaN.
    #[inline]
    #[track_caller]
    pub fn from_lower_upper(
        lower_bounds: impl Into<FreePoint>,
        upper_bounds: impl Into<FreePoint>,
    ) -> Self {
        let lower_bounds = lower_bounds.into();
        let upper_bounds = upper_bounds.into();
        match Self::checked_from_lower_upper(lower_bounds, upper_bounds) {
            Some(aab) => aab,
            None => panic!(
                "invalid AAB points that are misordered or NaN: \
                lower {lower_bounds:?} upper {upper_bounds:?}"
            ),
        }
    }

    /// Constructs an [`Aab`] from most-negative and most-positive corner points.
    ///
    /// Returns [`None`] if the points are not in the proper order or if they are NaN.
    #[inline]
    pub fn checked_from_lower_upper(
        lower_bounds: FreePoint,
        upper_bounds: FreePoint,
    ) -> Option<Self> {
        if lower_bounds.x <= upper_bounds.x
            && lower_bounds.y <= upper_bounds.y
            && lower_bounds.z <= upper_bounds.z
        {
            Some(Self {
                lower_bounds,
                upper_bounds,
            })
        } else {
            None
        }
    }

    /// Constructs the smallest [`Aab`] containing all of the given points,
    /// or [`None`] if the iterator is empty.
    pub fn from_points(points: impl IntoIterator<Item = FreePoint>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut aab = Self {
            lower_bounds: first,
            upper_bounds: first,
        };
        for point in points {
            aab = aab.enlarged_to_contain(point);
        }
        Some(aab)
    }

    /// The most negative corner of the box.
    #[inline]
    pub const fn lower_bounds(&self) -> FreePoint {
        self.lower_bounds
    }

    /// The most positive corner of the box.
    #[inline]
    pub const fn upper_bounds(&self) -> FreePoint {
        self.upper_bounds
    }

    /// Size of the box in each axis; equivalent to
    /// `self.upper_bounds() - self.lower_bounds()`.
    #[inline]
    pub fn size(&self) -> Size3D<FreeCoordinate, World> {
        Size3D::new(
            self.upper_bounds.x - self.lower_bounds.x,
            self.upper_bounds.y - self.lower_bounds.y,
            self.upper_bounds.z - self.lower_bounds.z,
        )
    }

    /// The smallest of the three extents of the box.
    ///
    /// This is zero if the box is degenerate in any axis.
    #[inline]
    pub fn smallest_extent(&self) -> FreeCoordinate {
        let size = self.size();
        size.width.min(size.height).min(size.depth)
    }

    /// The center of the enclosed volume.
    #[inline]
    pub fn center(&self) -> FreePoint {
        (self.lower_bounds + self.upper_bounds.to_vector()) * 0.5
    }

    /// Iterates over the eight corner points of the box.
    /// The ordering is deterministic but not currently declared stable.
    #[inline]
    pub fn corner_points(
        self,
    ) -> impl DoubleEndedIterator<Item = FreePoint> + ExactSizeIterator + FusedIterator {
        let l = self.lower_bounds;
        let u = self.upper_bounds;
        (0..8).map(move |i| {
            Point3D::new(
                if i & 1 == 0 { l.x } else { u.x },
                if i & 2 == 0 { l.y } else { u.y },
                if i & 4 == 0 { l.z } else { u.z },
            )
        })
    }

    /// Returns whether this AAB, including the boundary, contains the point.
    #[inline]
    pub fn contains(&self, point: FreePoint) -> bool {
        self.lower_bounds.x <= point.x
            && point.x <= self.upper_bounds.x
            && self.lower_bounds.y <= point.y
            && point.y <= self.upper_bounds.y
            && self.lower_bounds.z <= point.z
            && point.z <= self.upper_bounds.z
    }

    /// Returns the smallest [`Aab`] which contains both `self` and `point`.
    #[must_use]
    #[inline]
    pub fn enlarged_to_contain(self, point: FreePoint) -> Self {
        Self {
            lower_bounds: self.lower_bounds.min(point),
            upper_bounds: self.upper_bounds.max(point),
        }
    }

    /// Returns the smallest [`Aab`] which contains both `self` and `other`.
    #[must_use]
    #[inline]
    pub fn union(self, other: Aab) -> Self {
        Self {
            lower_bounds: self.lower_bounds.min(other.lower_bounds),
            upper_bounds: self.upper_bounds.max(other.upper_bounds),
        }
    }

    /// Returns this box expanded on all six sides by the given distance.
    ///
    /// Panics if `distance` is negative enough to turn the box inside out,
    /// or NaN.
    #[must_use]
    #[inline]
    pub fn expand(self, distance: FreeCoordinate) -> Self {
        let expansion = FreeVector::splat(distance);
        Self::from_lower_upper(self.lower_bounds - expansion, self.upper_bounds + expansion)
    }
}

impl fmt::Debug for Aab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            lower_bounds: l,
            upper_bounds: u,
        } = *self;
        f.write_fmt(format_args!(
            "Aab({:?} to {:?}, {:?} to {:?}, {:?} to {:?})",
            l.x, u.x, l.y, u.y, l.z, u.z,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use euclid::point3;
    use pretty_assertions::assert_eq;

    #[test]
    fn zero_is_degenerate_but_valid() {
        assert_eq!(Aab::ZERO.smallest_extent(), 0.0);
        assert_eq!(Aab::ZERO.center(), FreePoint::origin());
        assert!(Aab::ZERO.contains(FreePoint::origin()));
    }

    #[test]
    #[should_panic(expected = "invalid AAB")]
    fn from_lower_upper_rejects_misordered() {
        let _ = Aab::from_lower_upper([0., 0., 0.], [1., -1., 1.]);
    }

    #[test]
    fn from_points_matches_enlarge() {
        let points = [
            point3(1., 2., 3.),
            point3(-4., 0., 0.),
            point3(0., 5., -1.),
        ];
        let aab = Aab::from_points(points).unwrap();
        assert_eq!(aab, Aab::from_lower_upper([-4., 0., -1.], [1., 5., 3.]));
        assert_eq!(Aab::from_points([]), None);
    }

    #[test]
    fn smallest_extent_picks_minimum_axis() {
        let aab = Aab::from_lower_upper([0., 0., 0.], [4., 1., 9.]);
        assert_eq!(aab.smallest_extent(), 1.0);
    }

    #[test]
    fn contains_boundary() {
        let aab = Aab::from_lower_upper([0., 0., 0.], [1., 1., 1.]);
        assert!(aab.contains(point3(1., 1., 1.)));
        assert!(aab.contains(point3(0., 0.5, 0.)));
        assert!(!aab.contains(point3(1.0001, 0.5, 0.5)));
    }

    #[test]
    fn union_and_expand() {
        let a = Aab::from_lower_upper([0., 0., 0.], [1., 1., 1.]);
        let b = Aab::from_lower_upper([-2., 0.5, 0.5], [0.5, 0.5, 3.]);
        assert_eq!(a.union(b), Aab::from_lower_upper([-2., 0., 0.], [1., 1., 3.]));
        assert_eq!(
            a.expand(0.5),
            Aab::from_lower_upper([-0.5, -0.5, -0.5], [1.5, 1.5, 1.5])
        );
    }

    #[test]
    fn corner_points_count_and_bounds() {
        let aab = Aab::from_lower_upper([0., 0., 0.], [1., 2., 3.]);
        let corners: Vec<FreePoint> = aab.corner_points().collect();
        assert_eq!(corners.len(), 8);
        for corner in corners {
            assert!(aab.contains(corner));
        }
    }
}
