use rayon::prelude::*;
use rmx_core::errors::{ErrorInfo, RmError};
use rmx_kernel::backends::Backend;
use tracing::debug;

use crate::progress::ProgressSink;

/// Computes one value per item, returning them in item order.
///
/// Parallel backends fan out over a dedicated pool of `workers` threads and
/// tag every result with its index; the native backend and single-worker runs
/// stay on the calling thread. The first failing cell aborts the run.
pub(crate) fn run_cells<T, R, F>(
    items: &[T],
    backend: Backend,
    workers: usize,
    progress: Option<&dyn ProgressSink>,
    description: &str,
    compute: F,
) -> Result<Vec<R>, RmError>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> Result<R, RmError> + Sync,
{
    let run_one = |index: usize, item: &T| -> Result<(usize, R), RmError> {
        let value = compute(item).map_err(|err| err.with_context("cell", index))?;
        if let Some(sink) = progress {
            sink.set_description(description);
        }
        Ok((index, value))
    };

    if !backend.runs_parallel() || workers <= 1 {
        debug!(backend = backend.as_str(), cells = items.len(), "running cells serially");
        return items
            .iter()
            .enumerate()
            .map(|(index, item)| run_one(index, item).map(|(_, value)| value))
            .collect();
    }

    debug!(backend = backend.as_str(), cells = items.len(), workers, "dispatching cells");
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|err| {
            RmError::Config(ErrorInfo::new("thread-pool", err.to_string()).with_context("workers", workers))
        })?;
    let results: Result<Vec<(usize, R)>, RmError> = pool.install(|| {
        items
            .par_iter()
            .enumerate()
            .map(|(index, item)| run_one(index, item))
            .collect()
    });
    let mut ordered = results?;
    ordered.sort_by_key(|(index, _)| *index);
    Ok(ordered.into_iter().map(|(_, value)| value).collect())
}
