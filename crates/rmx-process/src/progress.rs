use tracing::debug;

/// Receives a textual description each time a cell completes.
///
/// Sinks are shared with worker threads and never influence results.
pub trait ProgressSink: Send + Sync {
    /// Replaces the current progress description.
    fn set_description(&self, description: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn set_description(&self, description: &str) {
        self(description)
    }
}

/// Sink forwarding descriptions to `tracing` at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn set_description(&self, description: &str) {
        debug!(target: "rmx_process::progress", "{description}");
    }
}
