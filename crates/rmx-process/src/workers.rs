use std::num::NonZeroUsize;
use std::thread;

use tracing::warn;

/// Number of threads the host offers, at least one.
pub fn available_workers() -> usize {
    thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

/// Resolves a requested worker count against the host.
///
/// `None` uses every available core; zero is raised to one and requests
/// beyond the host are capped, both with a warning.
pub fn resolve_workers(requested: Option<usize>) -> usize {
    clamp_workers(requested, available_workers())
}

pub(crate) fn clamp_workers(requested: Option<usize>, available: usize) -> usize {
    match requested {
        None => available,
        Some(0) => {
            warn!("worker count 0 requested, using a single worker");
            1
        }
        Some(n) if n > available => {
            warn!(requested = n, available, "worker count exceeds available parallelism, capping");
            available
        }
        Some(n) => n,
    }
}
