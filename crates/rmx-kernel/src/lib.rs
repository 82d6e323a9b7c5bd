#![deny(missing_docs)]
#![doc = "Kernels for randomized-measurement estimators: partition resolution, cyclic extraction, the pairwise ensemble term and per-cell aggregation on three interchangeable backends."]

pub mod availability;
pub mod backends;
pub mod cell;
pub mod construct;
pub mod dummy;
pub mod ensemble;

pub use availability::{Availability, CapabilityRegistry, EstimatorFamily};
pub use backends::{Backend, BackendSelection, KernelBackend};
pub use construct::{resolve_measure, resolve_partition, Projection};
pub use ensemble::{ensemble_cell, ensemble_weight, hamming_distance};
