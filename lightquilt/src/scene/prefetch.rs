use std::collections::VecDeque;
use std::thread;

use crate::scene::{LoadError, ViewGroup, ViewGroupLoader};

/// Number of view groups that may be loading concurrently while one is being
/// processed.
pub const PREFETCH_WINDOW: usize = 4;

/// Feeds every view group of `loader`, in index order, to `consume`,
/// overlapping loading with processing.
///
/// Up to [`PREFETCH_WINDOW`] loads are in flight at once; the consumer blocks
/// on the oldest, and a new load is started each time one completes.
///
/// If a load or `consume` fails, already-started loads are still awaited to
/// completion (not cancelled) before the error is returned, so that no loader
/// thread outlives this call; their results are discarded. The error returned
/// is the earliest one by view-group index.
pub fn for_each_view_group<E, F>(loader: &dyn ViewGroupLoader, mut consume: F) -> Result<(), E>
where
    E: From<LoadError>,
    F: FnMut(usize, ViewGroup) -> Result<(), E>,
{
    let count = loader.view_group_count();
    thread::scope(|scope| {
        let mut in_flight = VecDeque::with_capacity(PREFETCH_WINDOW);
        let start = |in_flight: &mut VecDeque<_>, index: usize| {
            in_flight.push_back((index, scope.spawn(move || loader.load_view_group(index))));
        };
        for index in 0..count.min(PREFETCH_WINDOW) {
            start(&mut in_flight, index);
        }
        let mut next_to_start = in_flight.len();

        while let Some((index, handle)) = in_flight.pop_front() {
            let result = handle
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic));

            // Keep the window full before processing, so that loading continues
            // while `consume` runs.
            if next_to_start < count {
                start(&mut in_flight, next_to_start);
                next_to_start += 1;
            }

            let outcome = match result {
                Ok(view_group) => consume(index, view_group),
                Err(load_error) => Err(E::from(load_error)),
            };
            if let Err(error) = outcome {
                // Await the rest of the window; see the function documentation.
                for (_, handle) in in_flight.drain(..) {
                    let _ = handle
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
                }
                return Err(error);
            }
        }
        Ok(())
    })
}
