//! Backend capability registry.
//!
//! Each compiled backend tier is checked once per process with a small set of
//! fixtures. The outcome is exposed as an `area -> operation -> backend` table
//! and drives backend selection for the estimators.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use once_cell::sync::Lazy;
use rmx_core::counts::OutcomeCounts;
use rmx_core::errors::{ErrorInfo, RmError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backends::{Backend, BackendSelection, KernelBackend};
use crate::construct::Projection;

/// Self-test result for one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum Availability {
    /// Backend passed its self-test.
    Supported,
    /// Backend is not compiled in or does not implement the operation.
    NotSupported,
    /// Backend is compiled in but its self-test failed.
    Failing(String),
}

impl Availability {
    /// Whether the backend can be used.
    pub fn is_supported(&self) -> bool {
        matches!(self, Availability::Supported)
    }

    /// Short marker used by status tables.
    pub fn symbol(&self) -> &'static str {
        match self {
            Availability::Supported => "Yes",
            Availability::NotSupported => "No",
            Availability::Failing(_) => "Error",
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::Failing(reason) => write!(f, "failing: {reason}"),
            other => f.write_str(other.symbol()),
        }
    }
}

/// Estimator families that select a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatorFamily {
    /// Purity / entropy.
    Purity,
    /// Echo / overlap.
    Echo,
    /// Two-point magnetization square.
    MagnetSquare,
    /// Classical-shadow density matrix and purity.
    ClassicalShadow,
}

impl EstimatorFamily {
    /// Registry area holding this family.
    pub fn area(&self) -> &'static str {
        match self {
            EstimatorFamily::Purity | EstimatorFamily::Echo => RANDOMIZED_MEASURE,
            EstimatorFamily::MagnetSquare => MAGNET_SQUARE,
            EstimatorFamily::ClassicalShadow => CLASSICAL_SHADOW,
        }
    }

    /// Registry operation consulted for this family.
    pub fn operation(&self) -> &'static str {
        match self {
            EstimatorFamily::Purity => "purity_cell",
            EstimatorFamily::Echo => "echo_cell",
            EstimatorFamily::MagnetSquare => "magsq_cell",
            EstimatorFamily::ClassicalShadow => "rho_m_cell",
        }
    }
}

/// Area of the randomized-measurement estimators.
pub const RANDOMIZED_MEASURE: &str = "randomized_measure";
/// Area of the magnetization-square estimator.
pub const MAGNET_SQUARE: &str = "magnet_square";
/// Area of the classical-shadow estimators.
pub const CLASSICAL_SHADOW: &str = "classical_shadow";

const EVERY_TIER: &[Backend] = &Backend::ALL;
const REFERENCE_ONLY: &[Backend] = &[Backend::Reference];

/// `(area, operation, backends implementing it)`.
const OPERATIONS: &[(&str, &str, &[Backend])] = &[
    (RANDOMIZED_MEASURE, "entangled_core", EVERY_TIER),
    (RANDOMIZED_MEASURE, "purity_cell", EVERY_TIER),
    (RANDOMIZED_MEASURE, "wavefunction_overlap", EVERY_TIER),
    (RANDOMIZED_MEASURE, "echo_cell", EVERY_TIER),
    ("utils", "construct", EVERY_TIER),
    ("utils", "randomized", EVERY_TIER),
    ("utils", "dummy", REFERENCE_ONLY),
    ("hadamard_test", "purity_echo_core", REFERENCE_ONLY),
    (MAGNET_SQUARE, "magsq_cell", REFERENCE_ONLY),
    (MAGNET_SQUARE, "magnetic_square_core", REFERENCE_ONLY),
    (CLASSICAL_SHADOW, "rho_m_cell", REFERENCE_ONLY),
    (CLASSICAL_SHADOW, "classical_shadow", REFERENCE_ONLY),
];

/// Nested `area -> operation -> backend -> availability` table.
pub type Snapshot = BTreeMap<String, BTreeMap<String, BTreeMap<Backend, Availability>>>;

static GLOBAL: Lazy<CapabilityRegistry> = Lazy::new(CapabilityRegistry::detect);
static NOT_SUPPORTED: Availability = Availability::NotSupported;

/// Read-only table of backend capabilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityRegistry {
    tiers: BTreeMap<Backend, Availability>,
}

impl CapabilityRegistry {
    /// Process-wide registry, detected on first use.
    pub fn global() -> &'static CapabilityRegistry {
        &GLOBAL
    }

    /// Self-tests every backend tier.
    pub fn detect() -> Self {
        let tiers = Backend::ALL
            .into_iter()
            .map(|backend| {
                let availability = self_test_tier(backend);
                debug!(backend = backend.as_str(), %availability, "checked backend tier");
                (backend, availability)
            })
            .collect();
        Self { tiers }
    }

    /// Builds a registry from explicit self-test results; unlisted tiers are `NotSupported`.
    pub fn from_tiers(tiers: impl IntoIterator<Item = (Backend, Availability)>) -> Self {
        let mut table: BTreeMap<Backend, Availability> = Backend::ALL
            .into_iter()
            .map(|backend| (backend, Availability::NotSupported))
            .collect();
        table.extend(tiers);
        Self { tiers: table }
    }

    /// Self-test result of a whole tier.
    pub fn tier(&self, backend: Backend) -> &Availability {
        self.tiers.get(&backend).unwrap_or(&NOT_SUPPORTED)
    }

    /// Availability of `operation` in `area` on `backend`.
    pub fn availability(&self, area: &str, operation: &str, backend: Backend) -> Availability {
        let implemented = OPERATIONS
            .iter()
            .find(|(a, op, _)| *a == area && *op == operation)
            .map_or(false, |(_, _, backends)| backends.contains(&backend));
        if implemented {
            self.tier(backend).clone()
        } else {
            Availability::NotSupported
        }
    }

    /// Full nested table.
    pub fn snapshot(&self) -> Snapshot {
        let mut snapshot = Snapshot::new();
        for (area, operation, _) in OPERATIONS {
            let row = Backend::ALL
                .into_iter()
                .map(|backend| (backend, self.availability(area, operation, backend)))
                .collect();
            snapshot
                .entry(area.to_string())
                .or_default()
                .insert(operation.to_string(), row);
        }
        snapshot
    }

    /// Fastest supported tier.
    pub fn default_backend(&self) -> Result<Backend, RmError> {
        Backend::PRIORITY
            .into_iter()
            .find(|backend| self.tier(*backend).is_supported())
            .ok_or_else(|| {
                RmError::Backend(ErrorInfo::new("backend-none", "no backend tier passed its self-test"))
            })
    }

    /// Resolves the backend used for `family` under `selection`.
    ///
    /// A pinned backend must be available. A preferred backend falls back to
    /// the fastest remaining tier with a warning.
    pub fn select(&self, family: EstimatorFamily, selection: BackendSelection) -> Result<Backend, RmError> {
        let (area, operation) = (family.area(), family.operation());
        let requested = selection.backend();
        let status = self.availability(area, operation, requested);
        if status.is_supported() {
            return Ok(requested);
        }
        if let BackendSelection::Pinned(_) = selection {
            return Err(RmError::Backend(
                ErrorInfo::new("backend-unavailable", "pinned backend is not available")
                    .with_context("backend", requested)
                    .with_context("operation", operation)
                    .with_context("status", &status),
            ));
        }
        let fallback = Backend::PRIORITY
            .into_iter()
            .filter(|backend| *backend != requested)
            .find(|backend| self.availability(area, operation, *backend).is_supported())
            .ok_or_else(|| {
                RmError::Backend(
                    ErrorInfo::new("backend-none", "no backend supports the operation")
                        .with_context("operation", operation),
                )
            })?;
        warn!(
            requested = requested.as_str(),
            fallback = fallback.as_str(),
            %status,
            "preferred backend unavailable, falling back"
        );
        Ok(fallback)
    }
}

fn self_test_tier(backend: Backend) -> Availability {
    let kernel = match backend.kernel() {
        Ok(kernel) => kernel,
        Err(_) => return Availability::NotSupported,
    };
    match catch_unwind(AssertUnwindSafe(|| self_test(kernel))) {
        Ok(Ok(())) => Availability::Supported,
        Ok(Err(err)) => Availability::Failing(err.to_string()),
        Err(_) => Availability::Failing("self-test panicked".to_string()),
    }
}

fn self_test(kernel: &dyn KernelBackend) -> Result<(), RmError> {
    let mismatch = |fixture: &str, found: String| {
        RmError::Backend(
            ErrorInfo::new("self-test-mismatch", "backend self-test produced an unexpected value")
                .with_context("backend", kernel.backend())
                .with_context("fixture", fixture)
                .with_context("found", found),
        )
    };

    let sliced = kernel.cycling_slice("01101", -2, 2, 1)?;
    if sliced != "0101" {
        return Err(mismatch("cycling_slice", sliced));
    }

    let single: OutcomeCounts = [("0110", 64)].into_iter().collect();
    let purity = kernel.purity_cell(&single, &Projection::full(4))?;
    if purity != 16.0 {
        return Err(mismatch("purity_cell", purity.to_string()));
    }

    let bell: OutcomeCounts = [("00", 32), ("11", 32)].into_iter().collect();
    let echo = kernel.echo_cell(&bell, &bell, &Projection::full(2))?;
    if echo != 2.5 {
        return Err(mismatch("echo_cell", echo.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiled_tiers_pass_self_test() {
        let registry = CapabilityRegistry::detect();
        for backend in Backend::ALL {
            let expected = if backend.is_compiled() {
                Availability::Supported
            } else {
                Availability::NotSupported
            };
            assert_eq!(registry.tier(backend), &expected);
        }
        let fastest = Backend::PRIORITY.into_iter().find(Backend::is_compiled);
        assert_eq!(registry.default_backend().ok(), fastest);
    }

    #[test]
    fn reference_only_operations() {
        let registry = CapabilityRegistry::from_tiers([
            (Backend::Reference, Availability::Supported),
            (Backend::Native, Availability::Supported),
        ]);
        assert!(registry
            .availability("hadamard_test", "purity_echo_core", Backend::Reference)
            .is_supported());
        assert_eq!(
            registry.availability("hadamard_test", "purity_echo_core", Backend::Native),
            Availability::NotSupported
        );
        assert_eq!(
            registry.availability("nowhere", "nothing", Backend::Reference),
            Availability::NotSupported
        );
    }

    #[test]
    fn reference_only_families_fall_back_or_fail_when_pinned() {
        let registry = CapabilityRegistry::from_tiers([
            (Backend::Reference, Availability::Supported),
            (Backend::Native, Availability::Supported),
        ]);
        for family in [EstimatorFamily::MagnetSquare, EstimatorFamily::ClassicalShadow] {
            let chosen = registry
                .select(family, BackendSelection::Preferred(Backend::Native))
                .unwrap();
            assert_eq!(chosen, Backend::Reference);
            let err = registry
                .select(family, BackendSelection::Pinned(Backend::Native))
                .unwrap_err();
            assert_eq!(err.code(), "backend-unavailable");
        }
        assert_eq!(
            registry.select(EstimatorFamily::Purity, BackendSelection::Pinned(Backend::Native)).ok(),
            Some(Backend::Native)
        );
    }

    #[test]
    fn snapshot_nests_area_operation_backend() {
        let registry = CapabilityRegistry::from_tiers([(Backend::Reference, Availability::Supported)]);
        let snapshot = registry.snapshot();
        let row = &snapshot[RANDOMIZED_MEASURE]["purity_cell"];
        assert_eq!(row.len(), 3);
        assert!(row[&Backend::Reference].is_supported());
        assert_eq!(row[&Backend::Native], Availability::NotSupported);
        assert!(snapshot["utils"].contains_key("dummy"));
    }
}
