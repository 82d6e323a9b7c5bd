use rmx_core::counts::OutcomeCounts;
use rmx_core::errors::RmError;

use super::{Backend, KernelBackend};
use crate::cell::{check_outcome, paired_shots, series_shots};
use crate::construct::{slice_positions, Projection};
use crate::ensemble::ensemble_weight;

/// Bit-packed kernel: projected outcomes become `u64` words compared with XOR/popcount.
pub(crate) struct NativeKernel;

const WORD: usize = 64;

/// Projected outcome packed most-significant-bit first, so word order matches
/// the lexicographic order of the projected bitstring.
type Packed = Vec<u64>;

struct PackPlan {
    positions: Vec<usize>,
    width: usize,
    words: usize,
}

impl PackPlan {
    fn new(projection: &Projection) -> Self {
        let positions = projection.positions();
        let words = positions.len().div_ceil(WORD).max(1);
        Self {
            positions,
            width: projection.register_width(),
            words,
        }
    }

    fn pack(&self, key: &[u8]) -> Packed {
        let mut packed = vec![0u64; self.words];
        for (bit, &position) in self.positions.iter().enumerate() {
            if key[position] == b'1' {
                packed[bit / WORD] |= 1u64 << (WORD - 1 - bit % WORD);
            }
        }
        packed
    }

    fn group(&self, counts: &OutcomeCounts) -> Result<Vec<(Packed, u64)>, RmError> {
        let mut packed = Vec::with_capacity(counts.len());
        for (key, count) in counts {
            check_outcome(key, self.width)?;
            packed.push((self.pack(key.as_bytes()), *count));
        }
        packed.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        let mut merged: Vec<(Packed, u64)> = Vec::with_capacity(packed.len());
        for (bits, count) in packed {
            match merged.last_mut() {
                Some((last, total)) if *last == bits => *total += count,
                _ => merged.push((bits, count)),
            }
        }
        Ok(merged)
    }
}

fn distance(a: &[u64], b: &[u64]) -> usize {
    a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones() as usize).sum()
}

fn pair_sum(left: &[(Packed, u64)], right: &[(Packed, u64)], subsystem_size: usize, shots: u64) -> f64 {
    let weights: Vec<f64> = (0..=subsystem_size as u32)
        .map(|d| ensemble_weight(subsystem_size, d))
        .collect();
    let shots = shots as f64;
    let left_p: Vec<f64> = left.iter().map(|(_, n)| *n as f64 / shots).collect();
    let right_p: Vec<f64> = right.iter().map(|(_, n)| *n as f64 / shots).collect();
    let mut total = 0.0;
    for ((s_i, _), p_i) in left.iter().zip(&left_p) {
        for ((s_j, _), p_j) in right.iter().zip(&right_p) {
            total += weights[distance(s_i, s_j)] * p_i * p_j;
        }
    }
    total
}

impl KernelBackend for NativeKernel {
    fn backend(&self) -> Backend {
        Backend::Native
    }

    fn cycling_slice(&self, target: &str, start: i64, end: i64, step: i64) -> Result<String, RmError> {
        let chars: Vec<char> = target.chars().collect();
        let positions = slice_positions(chars.len(), start, end, step)?;
        Ok(positions.into_iter().map(|p| chars[p]).collect())
    }

    fn purity_cell(&self, counts: &OutcomeCounts, projection: &Projection) -> Result<f64, RmError> {
        let shots = series_shots(counts)?;
        let grouped = PackPlan::new(projection).group(counts)?;
        Ok(pair_sum(&grouped, &grouped, projection.subsystem_size(), shots))
    }

    fn echo_cell(
        &self,
        first: &OutcomeCounts,
        second: &OutcomeCounts,
        projection: &Projection,
    ) -> Result<f64, RmError> {
        let shots = paired_shots(first, second)?;
        let plan = PackPlan::new(projection);
        let first = plan.group(first)?;
        let second = plan.group(second)?;
        Ok(pair_sum(&first, &second, projection.subsystem_size(), shots))
    }
}
