//! Bounded worker pool for per-dataset work.

use log::warn;
use rayon::prelude::*;

use crate::config::ConcurrencyConfig;

/// Apply `f` to every item, on a `workers`-sized pool when parallelism is
/// enabled. Results are always in input order.
pub(crate) fn map_ordered<T, R, F>(items: &[T], config: &ConcurrencyConfig, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Send + Sync,
{
    if config.parallel && items.len() > 1 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .build()
        {
            Ok(pool) => return pool.install(|| items.par_iter().map(&f).collect()),
            Err(e) => warn!("cannot start worker pool ({e}); processing sequentially"),
        }
    }
    items.iter().map(f).collect()
}
