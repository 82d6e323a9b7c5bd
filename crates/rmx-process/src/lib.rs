#![deny(missing_docs)]
#![doc = "Multi-cell estimators for randomized-measurement experiments: Renyi-2 entropy, wavefunction overlap, depolarizing error mitigation, Hadamard-test purity, magnetization square and classical shadows."]

/// Classical-shadow snapshots, density matrix and purity.
pub mod classical_shadow;
/// Options controlling backend, worker count and measure range.
pub mod config;
/// Cell fan-out over a worker pool.
mod dispatch;
/// Estimator entry points.
pub mod estimator;
/// Canonical JSON hashing of analysis inputs.
pub mod hash;
/// Hadamard-test purity and echo.
pub mod hadamard;
/// Magnetization square from two-qubit parities.
pub mod magnet_square;
/// Depolarizing error mitigation.
pub mod mitigation;
/// Progress notification.
pub mod progress;
/// Report records returned by the estimators.
pub mod report;
/// Aggregate statistics over per-cell values.
pub mod stats;
/// Backend availability table rendering.
pub mod status;
/// Worker-count resolution.
pub mod workers;

pub use config::ProcessOpts;
pub use estimator::{entangled_entropy, wavefunction_overlap, Estimator};
pub use progress::{ProgressSink, TracingProgress};
pub use classical_shadow::ShadowBasis;
pub use report::{
    AllSystemSource, AllSystemStats, ClassicalShadowReport, EntropyReport, ExistingAllSystem, MagnetSquareReport,
    MitigatedEntropyReport, OverlapReport, Subsystem,
};
pub use rmx_core::{BitRange, ErrorInfo, OutcomeCounts, PartitionSpec, RmError};
pub use rmx_kernel::{Backend, BackendSelection, CapabilityRegistry};
