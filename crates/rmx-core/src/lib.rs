#![deny(missing_docs)]
#![doc = "Core data types for randomized-measurement post-processing: outcome counts, partition specifications, errors and seeded randomness."]

pub mod counts;
pub mod errors;
pub mod partition;
pub mod rng;

pub use counts::OutcomeCounts;
pub use errors::{ErrorInfo, RmError};
pub use partition::{BitRange, PartitionSpec};
pub use rng::{derive_substream_seed, RngHandle};
