//! Interchangeable numeric backends.
//!
//! Every backend merges projected outcomes, walks the merged entries in
//! ascending bitstring order and accumulates `ensemble_weight * p_i * p_j`
//! into a single running sum. Results are therefore bit-identical across
//! backends.

use std::fmt;

use rmx_core::counts::OutcomeCounts;
use rmx_core::errors::{ErrorInfo, RmError};
use serde::{Deserialize, Serialize};

use crate::construct::Projection;

#[cfg(feature = "accelerated")]
mod accelerated;
#[cfg(feature = "native")]
mod native;
mod reference;

/// Numeric kernel shared by all backends.
pub trait KernelBackend: Send + Sync {
    /// Identifier of the backend.
    fn backend(&self) -> Backend;

    /// Generalized cyclic slice of `target`.
    fn cycling_slice(&self, target: &str, start: i64, end: i64, step: i64) -> Result<String, RmError>;

    /// Purity estimate of one measurement series.
    fn purity_cell(&self, counts: &OutcomeCounts, projection: &Projection) -> Result<f64, RmError>;

    /// Overlap estimate between two measurement series.
    fn echo_cell(
        &self,
        first: &OutcomeCounts,
        second: &OutcomeCounts,
        projection: &Projection,
    ) -> Result<f64, RmError>;
}

/// Backend identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Plain string-based implementation.
    Reference,
    /// Byte-level implementation with hashed grouping (tier 1).
    Accelerated,
    /// Bit-packed implementation (tier 2).
    Native,
}

impl Backend {
    /// All backends in declaration order.
    pub const ALL: [Backend; 3] = [Backend::Reference, Backend::Accelerated, Backend::Native];

    /// Fallback order, fastest first.
    pub const PRIORITY: [Backend; 3] = [Backend::Native, Backend::Accelerated, Backend::Reference];

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Reference => "reference",
            Backend::Accelerated => "accelerated",
            Backend::Native => "native",
        }
    }

    /// Whether the backend was compiled into this build.
    pub fn is_compiled(&self) -> bool {
        match self {
            Backend::Reference => true,
            Backend::Accelerated => cfg!(feature = "accelerated"),
            Backend::Native => cfg!(feature = "native"),
        }
    }

    /// Whether cells are dispatched to a worker pool on this backend.
    pub fn runs_parallel(&self) -> bool {
        !matches!(self, Backend::Native)
    }

    /// Kernel implementing this backend.
    pub fn kernel(&self) -> Result<&'static dyn KernelBackend, RmError> {
        match self {
            Backend::Reference => Ok(&reference::ReferenceKernel),
            #[cfg(feature = "accelerated")]
            Backend::Accelerated => Ok(&accelerated::AcceleratedKernel),
            #[cfg(feature = "native")]
            Backend::Native => Ok(&native::NativeKernel),
            #[allow(unreachable_patterns)]
            other => Err(RmError::Backend(
                ErrorInfo::new("backend-not-compiled", "backend is not part of this build")
                    .with_context("backend", other.as_str())
                    .with_hint(format!("enable the `{}` cargo feature", other.as_str())),
            )),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Backend {
    type Err = RmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Backend::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| {
                RmError::Config(
                    ErrorInfo::new("backend-unknown", "unknown backend name")
                        .with_context("backend", s)
                        .with_hint("expected one of reference, accelerated, native"),
                )
            })
    }
}

/// How the caller wants the backend chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendSelection {
    /// Use this backend when available, otherwise fall back to the next fastest.
    Preferred(Backend),
    /// Use exactly this backend or fail.
    Pinned(Backend),
}

impl BackendSelection {
    /// The requested backend.
    pub fn backend(&self) -> Backend {
        match self {
            BackendSelection::Preferred(b) | BackendSelection::Pinned(b) => *b,
        }
    }
}

impl Default for BackendSelection {
    fn default() -> Self {
        BackendSelection::Preferred(Backend::Native)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for backend in Backend::ALL {
            assert_eq!(backend.as_str().parse::<Backend>().unwrap(), backend);
            assert_eq!(backend.to_string(), backend.as_str());
        }
        assert!("fortran".parse::<Backend>().is_err());
    }

    #[test]
    fn selection_serializes_snake_case() {
        let json = serde_json::to_string(&BackendSelection::Pinned(Backend::Accelerated)).unwrap();
        assert_eq!(json, r#"{"pinned":"accelerated"}"#);
        assert_eq!(BackendSelection::default().backend(), Backend::Native);
    }

    #[test]
    fn compiled_backends_expose_kernels() {
        for backend in Backend::ALL {
            match backend.kernel() {
                Ok(kernel) => assert_eq!(kernel.backend(), backend),
                Err(err) => {
                    assert!(!backend.is_compiled());
                    assert_eq!(err.code(), "backend-not-compiled");
                }
            }
        }
    }
}
