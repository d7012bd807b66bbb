use hashbrown::HashMap;
use hashbrown::hash_map::Entry;
use rand::{Rng as _, SeedableRng as _};
use rand_xoshiro::Xoshiro256Plus;
use rayon::iter::{
    IndexedParallelIterator as _, IntoParallelIterator as _, IntoParallelRefMutIterator as _,
    ParallelIterator as _,
};

use crate::math::{Aab, CubeFace, FreeCoordinate, FreePoint};
use crate::pointcloud::PointCloud;

// -------------------------------------------------------------------------------------------------

/// Cell counts of one face's perspective binning grid: `x` and `y` across the
/// face, `z` in depth.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[expect(clippy::exhaustive_structs)]
pub struct GridResolution {
    /// Cells across the face horizontally.
    pub x: u32,
    /// Cells across the face vertically.
    pub y: u32,
    /// Cells in depth, from the near clip out to infinity.
    pub z: u32,
}

/// Reasons a point could not be binned.
#[derive(Clone, Debug, PartialEq, displaydoc::Display)]
#[non_exhaustive]
pub enum BinningError {
    /// point {position:?} is behind the binning camera; degenerate input geometry
    PointBehindGrid {
        /// The offending point.
        position: FreePoint,
    },
    /// point {position:?} is outside the binning frustum; it is inside the headbox or invalid
    PointOutsideFrustum {
        /// The offending point.
        position: FreePoint,
    },
    /// point {position:?} has a non-finite coordinate
    NonFinitePoint {
        /// The offending point.
        position: FreePoint,
    },
    /// negative cell index computed for point {position:?}; this is a bug
    NegativeCellIndex {
        /// The offending point.
        position: FreePoint,
    },
    /// {positions} positions were given with {weights} weights
    MismatchedLengths {
        /// Number of positions.
        positions: usize,
        /// Number of weights.
        weights: usize,
    },
}

impl std::error::Error for BinningError {}

// -------------------------------------------------------------------------------------------------

/// One representative point for a grid cell, plus the total weight of every
/// point that has ever mapped to that cell.
#[derive(Clone, Copy, Debug)]
struct BinCell {
    position: FreePoint,
    weight: f32,
}

/// One shard of the cell map. A cell with index `i` belongs to shard
/// `i % thread_count`, so each shard can be updated by its owning worker with
/// no synchronization at all.
#[derive(Debug)]
struct Shard {
    cells: HashMap<u64, BinCell>,
    /// Per-shard RNG for reservoir sampling, seeded by shard index so that
    /// results are reproducible for a given input order and thread count.
    rng: Xoshiro256Plus,
}

/// A point routed to a shard during phase 1 of
/// [`BinningPointCloudBuilder::add_points()`].
#[derive(Clone, Copy, Debug)]
struct Routed {
    cell: u64,
    position: FreePoint,
    weight: f32,
}

// -------------------------------------------------------------------------------------------------

/// Merges unbounded streams of world-space samples into a bounded-size
/// weighted point cloud.
///
/// Space around the headbox is partitioned into six perspective grids, one
/// per cube face, whose cameras sit at the origin with an infinite far plane;
/// each grid cell keeps exactly one representative point (chosen by weighted
/// reservoir sampling) and the exact sum of the weights mapped to it. The
/// output size is therefore bounded by the grid resolution no matter how many
/// samples are added.
#[derive(Debug)]
pub struct BinningPointCloudBuilder {
    thread_count: usize,
    resolution: GridResolution,
    near_clip: FreeCoordinate,
    shards: Vec<Shard>,
}

impl BinningPointCloudBuilder {
    /// Constructs a builder with `thread_count` map shards, the given per-face
    /// grid resolution, and the near clip distance (from the headbox center)
    /// at which the grids start.
    ///
    /// Panics if `thread_count` is zero, any resolution axis is zero, or
    /// `near_clip` is not a positive finite number.
    pub fn new(
        thread_count: usize,
        resolution: GridResolution,
        near_clip: FreeCoordinate,
    ) -> Self {
        assert!(thread_count > 0, "thread_count must be nonzero");
        assert!(
            resolution.x > 0 && resolution.y > 0 && resolution.z > 0,
            "degenerate grid resolution {resolution:?}"
        );
        assert!(
            near_clip > 0.0 && near_clip.is_finite(),
            "bad near clip distance {near_clip}"
        );
        Self {
            thread_count,
            resolution,
            near_clip,
            shards: (0..thread_count)
                .map(|i| Shard {
                    cells: HashMap::new(),
                    rng: Xoshiro256Plus::seed_from_u64(i as u64),
                })
                .collect(),
        }
    }

    /// Chooses a grid resolution and near clip for the given headbox such that
    /// the most distant bin subtends roughly one output pixel.
    ///
    /// The near clip is half the smallest headbox extent; if the headbox is
    /// degenerate (zero extent in some axis) it falls back to 0.1, with a
    /// warning. The x/y resolution is `90° · pixels_per_degree · 2` rounded to
    /// an integer, and the z resolution is half of that.
    pub fn compute_resolution_and_near_clip(
        headbox: &Aab,
        pixels_per_degree: FreeCoordinate,
    ) -> (GridResolution, FreeCoordinate) {
        let mut near_clip = headbox.smallest_extent() / 2.0;
        if near_clip <= 0.0 {
            log::warn!(
                "headbox {headbox:?} has a degenerate extent; falling back to near clip 0.1"
            );
            near_clip = 0.1;
        }
        let xy = (90.0 * pixels_per_degree * 2.0).round() as u32;
        let xy = xy.max(1);
        let resolution = GridResolution {
            x: xy,
            y: xy,
            z: (xy / 2).max(1),
        };
        (resolution, near_clip)
    }

    /// The grid resolution this builder was constructed with.
    #[inline]
    pub fn resolution(&self) -> GridResolution {
        self.resolution
    }

    /// Computes the globally unique 64-bit cell index of the grid cell
    /// containing `position`.
    ///
    /// The index encodes `(face, x, y, z)` as
    /// `x + y·Rx + z·Rx·Ry + face·Rx·Ry·Rz`, computed entirely in 64-bit
    /// arithmetic.
    ///
    /// Errors:
    /// *   [`BinningError::PointBehindGrid`] if the point projects behind its
    ///     face's camera (`w ≤ 0`); only the origin itself can do this.
    /// *   [`BinningError::PointOutsideFrustum`] if it falls outside the
    ///     `[-w, w]³` clip frustum, i.e. closer than the near clip.
    /// *   [`BinningError::NonFinitePoint`] for NaN coordinates.
    /// *   [`BinningError::NegativeCellIndex`] if the composed index is
    ///     negative, which should be unreachable.
    pub fn cell_index_from_point(&self, position: FreePoint) -> Result<u64, BinningError> {
        let face = CubeFace::from_snapped_vector(position.to_vector())
            .ok_or(BinningError::NonFinitePoint { position })?;
        let eye = face.eye_from_world(position);

        // Infinite-far perspective projection with a ±45° field of view:
        // x and y pass through, w = distance along the face normal.
        let w = -eye.z;
        if w <= 0.0 {
            return Err(BinningError::PointBehindGrid { position });
        }
        let z_clip = -eye.z - 2.0 * self.near_clip;
        if eye.x.abs() > w || eye.y.abs() > w || z_clip.abs() > w {
            return Err(BinningError::PointOutsideFrustum { position });
        }

        let res = self.resolution;
        let discretize = |ndc: FreeCoordinate, cells: u32| -> i64 {
            let cells = i64::from(cells);
            (((ndc * 0.5 + 0.5) * cells as FreeCoordinate).floor() as i64).clamp(0, cells - 1)
        };
        let x = discretize(eye.x / w, res.x);
        let y = discretize(eye.y / w, res.y);
        let z = discretize(z_clip / w, res.z);

        let (rx, ry, rz) = (i64::from(res.x), i64::from(res.y), i64::from(res.z));
        let index = x + y * rx + z * rx * ry + (face.index() as i64) * rx * ry * rz;
        if index < 0 {
            return Err(BinningError::NegativeCellIndex { position });
        }
        Ok(index as u64)
    }

    /// Adds points with weight 1.0 each. See
    /// [`add_points_with_weights()`](Self::add_points_with_weights).
    pub fn add_points(&mut self, positions: &[FreePoint]) -> Result<(), BinningError> {
        self.add_points_inner(positions, None)
    }

    /// Merges `positions` into the cloud, in parallel.
    ///
    /// Phase 1 partitions the input among workers, classifies each point into
    /// a grid cell, and routes it to the owning shard (`cell % thread_count`).
    /// Phase 2 lets each shard's worker fold its incoming points into its own
    /// map: accumulating weights exactly, and replacing the representative
    /// position with probability `incoming_weight / new_total_weight`
    /// (weighted reservoir sampling).
    ///
    /// On failure, the error of the first failing worker *by worker index* is
    /// returned; the other workers' routed points are discarded and no shard
    /// map is modified.
    pub fn add_points_with_weights(
        &mut self,
        positions: &[FreePoint],
        weights: &[f32],
    ) -> Result<(), BinningError> {
        if positions.len() != weights.len() {
            return Err(BinningError::MismatchedLengths {
                positions: positions.len(),
                weights: weights.len(),
            });
        }
        self.add_points_inner(positions, Some(weights))
    }

    fn add_points_inner(
        &mut self,
        positions: &[FreePoint],
        weights: Option<&[f32]>,
    ) -> Result<(), BinningError> {
        let thread_count = self.thread_count;
        let chunk_size = positions.len().div_ceil(thread_count).max(1);

        // Phase 1: parallel classification and routing.
        let routed_or_error: Vec<Result<Vec<Vec<Routed>>, BinningError>> = (0..thread_count)
            .into_par_iter()
            .map(|worker| {
                let lo = (worker * chunk_size).min(positions.len());
                let hi = (lo + chunk_size).min(positions.len());
                let mut routed: Vec<Vec<Routed>> =
                    (0..thread_count).map(|_| Vec::new()).collect();
                for i in lo..hi {
                    // Any failure aborts this worker's entire iteration.
                    let cell = self.cell_index_from_point(positions[i])?;
                    routed[(cell % thread_count as u64) as usize].push(Routed {
                        cell,
                        position: positions[i],
                        weight: weights.map_or(1.0, |w| w[i]),
                    });
                }
                Ok(routed)
            })
            .collect();
        // `collect()` preserves worker order, so this reports the first
        // failing worker by index, not by wall-clock completion.
        let mut per_worker = Vec::with_capacity(thread_count);
        for result in routed_or_error {
            per_worker.push(result?);
        }

        // Phase 2: parallel folding, one worker per shard. Shard ownership is
        // a partition, so no locking is needed.
        self.shards
            .par_iter_mut()
            .enumerate()
            .for_each(|(shard_index, shard)| {
                for worker_output in &per_worker {
                    for &Routed {
                        cell,
                        position,
                        weight,
                    } in &worker_output[shard_index]
                    {
                        match shard.cells.entry(cell) {
                            Entry::Occupied(mut entry) => {
                                let bin = entry.get_mut();
                                bin.weight += weight;
                                if shard.rng.random::<f32>() < weight / bin.weight {
                                    bin.position = position;
                                }
                            }
                            Entry::Vacant(entry) => {
                                entry.insert(BinCell { position, weight });
                            }
                        }
                    }
                }
            });
        Ok(())
    }

    /// Flattens all shards into a [`PointCloud`] and **drains them**.
    ///
    /// This is a one-shot operation per accumulation epoch: after it returns,
    /// the builder is empty again. Output order is shard-major and
    /// unspecified within a shard; each shard writes a disjoint output range,
    /// in parallel.
    pub fn positions_and_weights(&mut self) -> PointCloud {
        let total: usize = self.shards.iter().map(|shard| shard.cells.len()).sum();
        let mut positions = vec![FreePoint::origin(); total];
        let mut weights = vec![0.0_f32; total];

        // Hand each shard its own disjoint slice of the output.
        let mut jobs: Vec<(&mut Shard, &mut [FreePoint], &mut [f32])> =
            Vec::with_capacity(self.shards.len());
        let mut positions_rest = positions.as_mut_slice();
        let mut weights_rest = weights.as_mut_slice();
        for shard in &mut self.shards {
            let n = shard.cells.len();
            let (p, p_rest) = std::mem::take(&mut positions_rest).split_at_mut(n);
            let (w, w_rest) = std::mem::take(&mut weights_rest).split_at_mut(n);
            positions_rest = p_rest;
            weights_rest = w_rest;
            jobs.push((shard, p, w));
        }

        jobs.into_par_iter()
            .for_each(|(shard, out_positions, out_weights)| {
                for (i, (_, bin)) in shard.cells.drain().enumerate() {
                    out_positions[i] = bin.position;
                    out_weights[i] = bin.weight;
                }
            });

        PointCloud { positions, weights }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use euclid::point3;
    use pretty_assertions::assert_eq;

    fn small_builder(thread_count: usize) -> BinningPointCloudBuilder {
        BinningPointCloudBuilder::new(
            thread_count,
            GridResolution { x: 2, y: 2, z: 2 },
            1.0,
        )
    }

    /// The world-space center of a grid cell, by inverting the projection in
    /// `cell_index_from_point()`.
    fn cell_center(
        builder: &BinningPointCloudBuilder,
        face: CubeFace,
        cx: u32,
        cy: u32,
        cz: u32,
        near_clip: FreeCoordinate,
    ) -> FreePoint {
        let res = builder.resolution();
        let ndc = |c: u32, cells: u32| {
            (FreeCoordinate::from(c) + 0.5) / FreeCoordinate::from(cells) * 2.0 - 1.0
        };
        // Invert the depth mapping z_ndc = 1 - 2·near/d.
        let z01 = (FreeCoordinate::from(cz) + 0.5) / FreeCoordinate::from(res.z);
        let distance = near_clip / (1.0 - z01);
        face.world_from_eye(point3(
            ndc(cx, res.x) * distance,
            ndc(cy, res.y) * distance,
            -distance,
        ))
    }

    #[test]
    fn merged_weight_is_exact_sum() {
        let mut builder = small_builder(3);
        // All points lie in the same cell of the +Z face.
        let positions: Vec<FreePoint> =
            (0..100).map(|i| point3(0.01, 0.01, 3.0 + (i as f64) * 0.001)).collect();
        let weights = vec![1.0_f32; positions.len()];
        let expected_cells: Vec<u64> = positions
            .iter()
            .map(|&p| builder.cell_index_from_point(p).unwrap())
            .collect();
        assert!(expected_cells.windows(2).all(|w| w[0] == w[1]), "test setup");

        builder.add_points_with_weights(&positions, &weights).unwrap();
        let cloud = builder.positions_and_weights();
        assert_eq!(cloud.len(), 1);
        assert_eq!(cloud.weights[0], 100.0);
        assert!(
            positions.contains(&cloud.positions[0]),
            "representative must be one of the inputs"
        );
    }

    #[test]
    fn one_point_per_cell_for_all_faces() {
        let near_clip = 1.0;
        let mut builder = small_builder(4);
        let res = builder.resolution();

        let mut centers = Vec::new();
        for face in CubeFace::ALL {
            for cz in 0..res.z {
                for cy in 0..res.y {
                    for cx in 0..res.x {
                        centers.push(cell_center(&builder, face, cx, cy, cz, near_clip));
                    }
                }
            }
        }
        // Every center maps to a distinct cell.
        let mut indices: Vec<u64> = centers
            .iter()
            .map(|&p| builder.cell_index_from_point(p).unwrap())
            .collect();
        indices.sort_unstable();
        indices.dedup();
        assert_eq!(indices.len(), centers.len());

        builder.add_points(&centers).unwrap();
        let cloud = builder.positions_and_weights();
        assert_eq!(cloud.len(), centers.len());
        assert!(cloud.weights.iter().all(|&w| w == 1.0));

        // Feeding the same set twice doubles every weight exactly.
        builder.add_points(&centers).unwrap();
        builder.add_points(&centers).unwrap();
        let cloud = builder.positions_and_weights();
        assert_eq!(cloud.len(), centers.len());
        assert!(cloud.weights.iter().all(|&w| w == 2.0));
    }

    #[test]
    fn classification_failures() {
        let builder = small_builder(1);
        // The origin is behind every face camera.
        assert_eq!(
            builder.cell_index_from_point(point3(0., 0., 0.)),
            Err(BinningError::PointBehindGrid {
                position: point3(0., 0., 0.)
            })
        );
        // Closer than the near clip: inside the headbox.
        assert_eq!(
            builder.cell_index_from_point(point3(0., 0., 0.5)),
            Err(BinningError::PointOutsideFrustum {
                position: point3(0., 0., 0.5)
            })
        );
        assert!(matches!(
            builder.cell_index_from_point(point3(f64::NAN, 0., 1.)),
            Err(BinningError::NonFinitePoint { .. })
        ));
    }

    #[test]
    fn failed_add_points_leaves_builder_empty() {
        let mut builder = small_builder(2);
        let mut positions: Vec<FreePoint> = (0..20).map(|i| point3(0.0, 0.0, 2.0 + f64::from(i))).collect();
        positions.push(point3(0., 0., 0.)); // behind every camera
        assert_eq!(
            builder.add_points(&positions),
            Err(BinningError::PointBehindGrid {
                position: point3(0., 0., 0.)
            })
        );
        // The successful workers' routed points were discarded.
        assert_eq!(builder.positions_and_weights().len(), 0);
    }

    #[test]
    fn mismatched_lengths_rejected() {
        let mut builder = small_builder(1);
        assert_eq!(
            builder.add_points_with_weights(&[point3(0., 0., 3.)], &[1.0, 2.0]),
            Err(BinningError::MismatchedLengths {
                positions: 1,
                weights: 2
            })
        );
    }

    #[test]
    fn drain_is_one_shot() {
        let mut builder = small_builder(2);
        builder.add_points(&[point3(0., 0., 3.)]).unwrap();
        assert_eq!(builder.positions_and_weights().len(), 1);
        assert_eq!(builder.positions_and_weights().len(), 0, "destructive drain");
    }

    #[test]
    fn reservoir_choice_is_reproducible() {
        let positions: Vec<FreePoint> =
            (0..50).map(|i| point3(0.2, -0.1, 4.0 + (i as f64) * 1e-4)).collect();
        let run = || {
            let mut builder = small_builder(3);
            builder.add_points(&positions).unwrap();
            builder.positions_and_weights()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn resolution_and_near_clip_from_headbox() {
        let headbox = Aab::from_lower_upper([-1., -2., -3.], [1., 2., 3.]);
        let (resolution, near_clip) =
            BinningPointCloudBuilder::compute_resolution_and_near_clip(&headbox, 10.0);
        assert_eq!(near_clip, 1.0);
        assert_eq!(
            resolution,
            GridResolution {
                x: 1800,
                y: 1800,
                z: 900
            }
        );

        // Degenerate headbox falls back to 0.1.
        let (_, fallback) =
            BinningPointCloudBuilder::compute_resolution_and_near_clip(&Aab::ZERO, 10.0);
        assert_eq!(fallback, 0.1);
    }
}
