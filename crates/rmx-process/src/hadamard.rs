use rmx_core::counts::OutcomeCounts;
use rmx_core::errors::{ErrorInfo, RmError};
use serde::{Deserialize, Serialize};

use crate::stats::renyi2;

/// Purity (or echo) from the ancilla outcomes of a Hadamard test.
///
/// With `n0`/`n1` the counts of `"0"`/`"1"`: `(n0 - n1) / shots` when both
/// outcomes occur, otherwise the single present count over `shots`.
pub fn purity_echo(shots: u64, counts: &OutcomeCounts) -> Result<f64, RmError> {
    let sample_shots = counts.shots()?;
    if shots == 0 || sample_shots != shots {
        return Err(RmError::Shots(
            ErrorInfo::new("shots-mismatch", "counts do not sum to the declared shots")
                .with_context("shots", shots)
                .with_context("sample_shots", sample_shots),
        ));
    }
    let shots = shots as f64;
    match (counts.get("0"), counts.get("1")) {
        (Some(zero), Some(one)) => Ok((zero as f64 - one as f64) / shots),
        (Some(only), None) | (None, Some(only)) => Ok(only as f64 / shots),
        (None, None) => Err(RmError::Counts(
            ErrorInfo::new("hadamard-no-ancilla", "expected outcomes '0' and '1'")
                .with_context("outcomes", counts.len()),
        )),
    }
}

/// Purity and entropy from a Hadamard test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HadamardEntropy {
    /// Measured purity.
    pub purity: f64,
    /// `-log2(purity)`.
    pub entropy: f64,
}

/// Entropy estimate from the first series of a Hadamard-test experiment.
pub fn hadamard_entangled_entropy(shots: u64, counts: &[OutcomeCounts]) -> Result<HadamardEntropy, RmError> {
    let purity = purity_echo(shots, first_series(counts)?)?;
    Ok(HadamardEntropy {
        purity,
        entropy: renyi2(purity)?,
    })
}

/// Overlap echo from the first series of a Hadamard-test experiment.
pub fn hadamard_overlap_echo(shots: u64, counts: &[OutcomeCounts]) -> Result<f64, RmError> {
    purity_echo(shots, first_series(counts)?)
}

fn first_series(counts: &[OutcomeCounts]) -> Result<&OutcomeCounts, RmError> {
    counts.first().ok_or_else(|| {
        RmError::Counts(ErrorInfo::new("cells-empty", "no measurement series supplied"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(pairs: &[(&str, u64)]) -> OutcomeCounts {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn balanced_outcomes_cancel() {
        assert_eq!(purity_echo(100, &series(&[("0", 50), ("1", 50)])).unwrap(), 0.0);
    }

    #[test]
    fn single_outcome_is_unit() {
        assert_eq!(purity_echo(100, &series(&[("0", 100)])).unwrap(), 1.0);
        assert_eq!(purity_echo(100, &series(&[("1", 100)])).unwrap(), 1.0);
    }

    #[test]
    fn rejects_mismatch_and_missing_ancilla() {
        assert!(matches!(
            purity_echo(99, &series(&[("0", 100)])),
            Err(RmError::Shots(_))
        ));
        assert!(matches!(
            purity_echo(10, &series(&[("00", 10)])),
            Err(RmError::Counts(_))
        ));
    }

    #[test]
    fn entropy_uses_first_series() {
        let result = hadamard_entangled_entropy(8, &[series(&[("0", 6), ("1", 2)])]).unwrap();
        assert_eq!(result.purity, 0.5);
        assert_eq!(result.entropy, 1.0);
        assert!(hadamard_overlap_echo(8, &[]).is_err());
    }

    #[test]
    fn balanced_series_has_no_entropy() {
        let err = hadamard_entangled_entropy(8, &[series(&[("0", 4), ("1", 4)])]).unwrap_err();
        assert_eq!(err.code(), "entropy-non-positive-purity");
    }
}
