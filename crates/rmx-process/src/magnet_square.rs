use rmx_core::counts::OutcomeCounts;
use rmx_core::errors::{ErrorInfo, RmError};
use rmx_kernel::cell::series_shots;

/// Parity expectation `<Z_i Z_j>` of one two-bit cell.
///
/// Equal bits (`00`, `11`) add their frequency, unequal bits subtract it.
pub fn magnet_square_cell(shots: u64, counts: &OutcomeCounts) -> Result<f64, RmError> {
    let sample_shots = series_shots(counts)?;
    if sample_shots != shots {
        return Err(RmError::Shots(
            ErrorInfo::new("shots-mismatch", "cell counts do not sum to the declared shots")
                .with_context("shots", shots)
                .with_context("sample_shots", sample_shots),
        ));
    }
    let shots = shots as f64;
    let mut parity = 0.0;
    for (outcome, count) in counts {
        let bits = outcome.as_bytes();
        if bits.len() != 2 {
            return Err(RmError::Counts(
                ErrorInfo::new("magnet-square-width", "magnetization cells hold two-bit outcomes")
                    .with_context("key", outcome)
                    .with_context("found", bits.len()),
            ));
        }
        let ratio = *count as f64 / shots;
        if bits[0] == bits[1] {
            parity += ratio;
        } else {
            parity -= ratio;
        }
    }
    Ok(parity)
}

/// Magnetization square `(sum_{i != j} <Z_i Z_j> + n) / n^2` from the
/// per-pair parities of `num_qubits` spins.
pub fn magnet_square(parities: &[f64], num_qubits: usize) -> f64 {
    let n = num_qubits as f64;
    let total: f64 = parities.iter().sum();
    (total + n) / (n * n)
}
