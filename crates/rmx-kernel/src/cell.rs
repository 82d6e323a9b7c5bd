//! Per-cell entry points and the checks every backend shares.

use rmx_core::counts::OutcomeCounts;
use rmx_core::errors::{ErrorInfo, RmError};

use crate::backends::Backend;
use crate::construct::Projection;

/// Total shots of one series; an empty or zero-count series is rejected.
pub fn series_shots(counts: &OutcomeCounts) -> Result<u64, RmError> {
    match counts.shots()? {
        0 => Err(RmError::Shots(
            ErrorInfo::new("shots-zero", "series carries no shots").with_context("outcomes", counts.len()),
        )),
        shots => Ok(shots),
    }
}

/// Common shot count of two compared series.
pub fn paired_shots(first: &OutcomeCounts, second: &OutcomeCounts) -> Result<u64, RmError> {
    let first_shots = series_shots(first)?;
    let second_shots = series_shots(second)?;
    if first_shots != second_shots {
        return Err(RmError::Shots(
            ErrorInfo::new("shots-series-mismatch", "compared series have different shot counts")
                .with_context("first", first_shots)
                .with_context("second", second_shots),
        ));
    }
    Ok(first_shots)
}

/// Checks that an outcome is a binary string of the projection's width.
pub(crate) fn check_outcome(key: &str, width: usize) -> Result<(), RmError> {
    if key.len() != width {
        return Err(RmError::Counts(
            ErrorInfo::new("counts-width-mismatch", "outcome width differs from the register width")
                .with_context("key", key)
                .with_context("expected", width)
                .with_context("found", key.len()),
        ));
    }
    if key.bytes().any(|b| b != b'0' && b != b'1') {
        return Err(RmError::Counts(
            ErrorInfo::new("counts-non-binary", "bitstring contains a non-binary character")
                .with_context("key", key),
        ));
    }
    Ok(())
}

/// Purity of one series on `backend`.
pub fn purity_cell(backend: Backend, counts: &OutcomeCounts, projection: &Projection) -> Result<f64, RmError> {
    backend.kernel()?.purity_cell(counts, projection)
}

/// Overlap of two series on `backend`.
pub fn echo_cell(
    backend: Backend,
    first: &OutcomeCounts,
    second: &OutcomeCounts,
    projection: &Projection,
) -> Result<f64, RmError> {
    backend.kernel()?.echo_cell(first, second, projection)
}

/// Cyclic slice on `backend`.
pub fn cycling_slice(backend: Backend, target: &str, start: i64, end: i64, step: i64) -> Result<String, RmError> {
    backend.kernel()?.cycling_slice(target, start, end, step)
}
