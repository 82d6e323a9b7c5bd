use rmx_core::counts::OutcomeCounts;
use rmx_core::errors::{ErrorInfo, RmError};
use rustc_hash::FxHashMap;

use super::{Backend, KernelBackend};
use crate::cell::{check_outcome, paired_shots, series_shots};
use crate::construct::Projection;
use crate::ensemble::ensemble_weight;

/// Byte-level kernel with hashed grouping.
pub(crate) struct AcceleratedKernel;

fn normalize(index: i64, length: usize) -> usize {
    if index < 0 {
        length.saturating_sub(index.unsigned_abs() as usize)
    } else {
        (index as usize).min(length)
    }
}

/// Cyclic slice over any sequence of copyable items.
fn slice_items<T: Copy>(target: &[T], start: i64, end: i64, step: i64) -> Result<Vec<T>, RmError> {
    let length = target.len();
    if start <= -(length as i64) && end >= length as i64 {
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
    let (lo, hi) = (normalize(start, length), normalize(end, length));
    let (head, tail): (&[T], &[T]) = if length == 0 {
        (&[], &[])
    } else if start < 0 && end >= 0 {
        (&target[lo..], &target[..hi])
    } else if lo < hi {
        (&target[lo..hi], &[])
    } else {
        (&[], &[])
    };
    let stride = step.unsigned_abs() as usize;
    let joined = head.iter().chain(tail.iter()).copied();
    Ok(if step > 0 {
        joined.step_by(stride).collect()
    } else {
        joined.rev().step_by(stride).collect()
    })
}

/// Groups projected outcomes and returns them sorted by projected bytes.
fn group(counts: &OutcomeCounts, projection: &Projection) -> Result<Vec<(Vec<u8>, u64)>, RmError> {
    let width = projection.register_width();
    let positions = projection.positions();
    let mut grouped: FxHashMap<Vec<u8>, u64> = FxHashMap::default();
    grouped.reserve(counts.len());
    for (key, count) in counts {
        check_outcome(key, width)?;
        let bytes = key.as_bytes();
        let projected: Vec<u8> = positions.iter().map(|&p| bytes[p]).collect();
        *grouped.entry(projected).or_insert(0) += *count;
    }
    let mut entries: Vec<(Vec<u8>, u64)> = grouped.into_iter().collect();
    entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

fn pair_sum(left: &[(Vec<u8>, u64)], right: &[(Vec<u8>, u64)], subsystem_size: usize, shots: u64) -> f64 {
    let weights: Vec<f64> = (0..=subsystem_size as u32)
        .map(|d| ensemble_weight(subsystem_size, d))
        .collect();
    let shots = shots as f64;
    let mut total = 0.0;
    for (s_i, n_i) in left {
        let p_i = *n_i as f64 / shots;
        for (s_j, n_j) in right {
            let distance = s_i.iter().zip(s_j).filter(|(a, b)| a != b).count();
            total += weights[distance] * p_i * (*n_j as f64 / shots);
        }
    }
    total
}

impl KernelBackend for AcceleratedKernel {
    fn backend(&self) -> Backend {
        Backend::Accelerated
    }

    fn cycling_slice(&self, target: &str, start: i64, end: i64, step: i64) -> Result<String, RmError> {
        if target.is_ascii() {
            let sliced = slice_items(target.as_bytes(), start, end, step)?;
            return Ok(sliced.into_iter().map(char::from).collect());
        }
        let chars: Vec<char> = target.chars().collect();
        Ok(slice_items(&chars, start, end, step)?.into_iter().collect())
    }

    fn purity_cell(&self, counts: &OutcomeCounts, projection: &Projection) -> Result<f64, RmError> {
        let shots = series_shots(counts)?;
        let grouped = group(counts, projection)?;
        Ok(pair_sum(&grouped, &grouped, projection.subsystem_size(), shots))
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
        Ok(pair_sum(&first, &second, projection.subsystem_size(), shots))
    }
}
