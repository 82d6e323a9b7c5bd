use std::collections::BTreeMap;

use rmx_core::counts::OutcomeCounts;
use rmx_core::errors::{ErrorInfo, RmError};

use super::{Backend, KernelBackend};
use crate::cell::{check_outcome, paired_shots, series_shots};
use crate::construct::Projection;
use crate::ensemble::ensemble_cell;

/// String-based kernel; every other backend is checked against it.
pub(crate) struct ReferenceKernel;

fn clamp(index: i64, length: i64) -> usize {
    if index < 0 {
        (index + length).max(0) as usize
    } else {
        index.min(length) as usize
    }
}

fn slice_chars(target: &str, start: i64, end: i64, step: i64) -> Result<String, RmError> {
    let chars: Vec<char> = target.chars().collect();
    let length = chars.len() as i64;
    if start <= -length && end >= length {
        return Err(RmError::Slice(
            ErrorInfo::new("slice-out-of-range", "slice out of range")
                .with_context("start", start)
                .with_context("end", end)
                .with_context("len", length),
        ));
    }
    if step == 0 {
        return Err(RmError::Slice(
            ErrorInfo::new("slice-step-zero", "slice step cannot be zero").with_context("step", step),
        ));
    }
    let selected: Vec<char> = if chars.is_empty() {
        chars
    } else if start < 0 && end >= 0 {
        let mut joined = chars[clamp(start, length)..].to_vec();
        joined.extend_from_slice(&chars[..clamp(end, length)]);
        joined
    } else {
        let (lo, hi) = (clamp(start, length), clamp(end, length));
        if lo < hi {
            chars[lo..hi].to_vec()
        } else {
            Vec::new()
        }
    };
    let stride = step.unsigned_abs() as usize;
    let out: String = if step > 0 {
        selected.iter().step_by(stride).collect()
    } else {
        selected.iter().rev().step_by(stride).collect()
    };
    Ok(out)
}

fn project(key: &str, projection: &Projection) -> Result<String, RmError> {
    match projection {
        Projection::Range { measure, partition } => {
            let (m_start, m_end) = measure.slice_bounds();
            let measured = slice_chars(key, m_start, m_end, 1)?;
            let (p_start, p_end) = partition.slice_bounds();
            slice_chars(&measured, p_start, p_end, 1)
        }
        Projection::Registers { width, registers } => {
            let chars: Vec<char> = key.chars().collect();
            Ok(registers.iter().map(|r| chars[width - 1 - r]).collect())
        }
    }
}

fn group(counts: &OutcomeCounts, projection: &Projection) -> Result<BTreeMap<String, u64>, RmError> {
    let width = projection.register_width();
    let mut grouped = BTreeMap::new();
    for (key, count) in counts {
        check_outcome(key, width)?;
        *grouped.entry(project(key, projection)?).or_insert(0) += *count;
    }
    Ok(grouped)
}

fn pair_sum(
    left: &BTreeMap<String, u64>,
    right: &BTreeMap<String, u64>,
    subsystem_size: usize,
    shots: u64,
) -> Result<f64, RmError> {
    let mut total = 0.0;
    for (s_i, n_i) in left {
        for (s_j, n_j) in right {
            total += ensemble_cell(s_i, *n_i, s_j, *n_j, subsystem_size, shots)?;
        }
    }
    Ok(total)
}

impl KernelBackend for ReferenceKernel {
    fn backend(&self) -> Backend {
        Backend::Reference
    }

    fn cycling_slice(&self, target: &str, start: i64, end: i64, step: i64) -> Result<String, RmError> {
        slice_chars(target, start, end, step)
    }

    fn purity_cell(&self, counts: &OutcomeCounts, projection: &Projection) -> Result<f64, RmError> {
        let shots = series_shots(counts)?;
        let grouped = group(counts, projection)?;
        pair_sum(&grouped, &grouped, projection.subsystem_size(), shots)
    }

    fn echo_cell(
        &self,
        first: &OutcomeCounts,
        second: &OutcomeCounts,
        projection: &Projection,
    ) -> Result<f64, RmError> {
        let shots = paired_shots(first, second)?;
        let first = group(first, projection)?;
        let second = group(second, projection)?;
        pair_sum(&first, &second, projection.subsystem_size(), shots)
    }
}
