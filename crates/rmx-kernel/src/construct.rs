//! Partition resolution and subsystem projection.
//!
//! A projection maps a full measured outcome onto the bits of the subsystem
//! under study, either through a measure range followed by a partition inside
//! it, or through an explicit list of classical registers.

use std::fmt;

use rmx_core::errors::{ErrorInfo, RmError};
use rmx_core::partition::{BitRange, PartitionSpec};
use serde::{Deserialize, Serialize};

fn partition_error(code: &str, message: impl Into<String>) -> ErrorInfo {
    ErrorInfo::new(code, message.into())
}

/// Resolves a partition specification against a range of `len` bits.
///
/// `Degree(d)` selects the trailing window `[len - d, len)`. A pair is
/// normalized by adding `len` to negative bounds; when the normalized start
/// exceeds the end, the range wraps around the end of the register.
pub fn resolve_partition(spec: PartitionSpec, len: usize) -> Result<BitRange, RmError> {
    let register = len as i64;
    match spec {
        PartitionSpec::Full => Ok(BitRange::full(len)),
        PartitionSpec::Degree(degree) => {
            if degree <= 0 || degree > register {
                return Err(RmError::Partition(
                    partition_error("partition-degree", "degree must lie in 1..=len")
                        .with_context("degree", degree)
                        .with_context("len", len),
                ));
            }
            Ok(BitRange {
                start: (register - degree) as usize,
                end: len,
                wrap: false,
                register_len: len,
            })
        }
        PartitionSpec::Range(start, end) => {
            if start <= -register && end >= register {
                return Err(RmError::Partition(
                    partition_error("partition-out-of-range", "range spans the register more than once")
                        .with_context("start", start)
                        .with_context("end", end)
                        .with_context("len", len),
                ));
            }
            for (name, bound) in [("start", start), ("end", end)] {
                if bound < -register || bound > register {
                    return Err(RmError::Partition(
                        partition_error("partition-out-of-range", "bound lies outside [-len, len]")
                            .with_context(name, bound)
                            .with_context("len", len),
                    ));
                }
            }
            let lo = if start < 0 { start + register } else { start };
            let hi = if end < 0 { end + register } else { end };
            let (lo, hi, wrap) = if lo > hi {
                match (lo == register, hi == 0) {
                    (true, _) => (0, hi, false),
                    (_, true) => (lo, register, false),
                    _ => (lo, hi, true),
                }
            } else {
                (lo, hi, false)
            };
            let size = if wrap { register - lo + hi } else { hi - lo };
            if size <= 0 || size > register {
                return Err(RmError::Partition(
                    partition_error("partition-size", "resolved window is empty or too wide")
                        .with_context("start", start)
                        .with_context("end", end)
                        .with_context("len", len),
                ));
            }
            Ok(BitRange {
                start: lo as usize,
                end: hi as usize,
                wrap,
                register_len: len,
            })
        }
    }
}

/// Resolves the measured sub-range of a register, defaulting to the whole register.
pub fn resolve_measure(measure: Option<(i64, i64)>, register_len: usize) -> Result<BitRange, RmError> {
    resolve_partition(PartitionSpec::from(measure), register_len)
        .map_err(|err| err.with_context("target", "measure"))
}

/// Positions selected by the generalized cyclic slice `[start:end:step]`
/// over a sequence of `len` items.
///
/// A negative start with a non-negative end concatenates the tail `[start:]`
/// and the head `[:end]`. Requests with `start <= -len` and `end >= len` are
/// rejected.
pub fn slice_positions(len: usize, start: i64, end: i64, step: i64) -> Result<Vec<usize>, RmError> {
    let length = len as i64;
    if start <= -length && end >= length {
        return Err(RmError::Slice(
            ErrorInfo::new("slice-out-of-range", "slice out of range")
                .with_context("start", start)
                .with_context("end", end)
                .with_context("len", len),
        ));
    }
    if step == 0 {
        return Err(RmError::Slice(
            ErrorInfo::new("slice-step-zero", "slice step cannot be zero").with_context("step", step),
        ));
    }
    let clamp = |index: i64| -> usize {
        if index < 0 {
            (index + length).max(0) as usize
        } else {
            index.min(length) as usize
        }
    };
    let positions: Vec<usize> = if len == 0 {
        Vec::new()
    } else if start < 0 && end >= 0 {
        (clamp(start)..len).chain(0..clamp(end)).collect()
    } else {
        let (lo, hi) = (clamp(start), clamp(end));
        (lo..hi.max(lo)).collect()
    };
    let stride = step.unsigned_abs() as usize;
    Ok(if step > 0 {
        positions.into_iter().step_by(stride).collect()
    } else {
        positions.into_iter().rev().step_by(stride).collect()
    })
}

/// Mapping from a full outcome onto the analysed subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Projection {
    /// Measure range of the register, then a partition inside it.
    Range {
        /// Measured bits of the full register.
        measure: BitRange,
        /// Subsystem, relative to the measured bits.
        partition: BitRange,
    },
    /// Explicit classical registers; register `i` is character `width - 1 - i`.
    Registers {
        /// Width of the full outcome.
        width: usize,
        /// Selected registers in ascending order.
        registers: Vec<usize>,
    },
}

impl Projection {
    /// Builds a range projection, checking the partition was resolved inside `measure`.
    pub fn range(measure: BitRange, partition: BitRange) -> Result<Self, RmError> {
        if partition.register_len != measure.len() {
            return Err(RmError::Partition(
                partition_error(
                    "partition-measure-mismatch",
                    "partition was not resolved against the measured range",
                )
                .with_context("partition_len", partition.register_len)
                .with_context("measure_len", measure.len()),
            ));
        }
        Ok(Projection::Range { measure, partition })
    }

    /// Projection keeping every bit of a `width`-bit outcome.
    pub fn full(width: usize) -> Self {
        Projection::Range {
            measure: BitRange::full(width),
            partition: BitRange::full(width),
        }
    }

    /// Builds a register-selection projection.
    ///
    /// The selection is sorted; duplicates and registers beyond `width` are rejected.
    pub fn registers(width: usize, selection: &[usize]) -> Result<Self, RmError> {
        if selection.is_empty() {
            return Err(RmError::Partition(
                partition_error("registers-empty", "no classical register selected")
                    .with_context("width", width),
            ));
        }
        let mut registers = selection.to_vec();
        registers.sort_unstable();
        for pair in registers.windows(2) {
            if pair[0] == pair[1] {
                return Err(RmError::Partition(
                    partition_error("registers-duplicate", "classical register selected twice")
                        .with_context("register", pair[0]),
                ));
            }
        }
        if let Some(&last) = registers.last() {
            if last >= width {
                return Err(RmError::Partition(
                    partition_error("registers-out-of-range", "classical register beyond outcome width")
                        .with_context("register", last)
                        .with_context("width", width),
                ));
            }
        }
        Ok(Projection::Registers { width, registers })
    }

    /// Width of the full outcomes this projection expects.
    pub fn register_width(&self) -> usize {
        match self {
            Projection::Range { measure, .. } => measure.register_len,
            Projection::Registers { width, .. } => *width,
        }
    }

    /// Number of bits of the projected subsystem.
    pub fn subsystem_size(&self) -> usize {
        match self {
            Projection::Range { partition, .. } => partition.len(),
            Projection::Registers { registers, .. } => registers.len(),
        }
    }

    /// Positions of the full outcome kept by the projection, in output order.
    pub fn positions(&self) -> Vec<usize> {
        match self {
            Projection::Range { measure, partition } => {
                let measured = measure.positions();
                partition.positions().into_iter().map(|p| measured[p]).collect()
            }
            Projection::Registers { width, registers } => {
                registers.iter().map(|r| width - 1 - r).collect()
            }
        }
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Projection::Range { measure, partition } => {
                write!(f, "partition {partition} of measure {measure}")
            }
            Projection::Registers { registers, .. } => write!(f, "registers {registers:?}"),
        }
    }
}
