//! Pairwise ensemble term of the randomized-measurement purity estimator.

use rmx_core::errors::{ErrorInfo, RmError};

/// Number of positions at which two equal-length bitstrings differ.
pub fn hamming_distance(s_i: &str, s_j: &str) -> Result<u32, RmError> {
    if s_i.len() != s_j.len() {
        return Err(RmError::Counts(
            ErrorInfo::new("hamming-length-mismatch", "bitstrings differ in length")
                .with_context("s_i", s_i)
                .with_context("s_j", s_j),
        ));
    }
    Ok(s_i
        .bytes()
        .zip(s_j.bytes())
        .filter(|(a, b)| a != b)
        .count() as u32)
}

/// Prefactor `2^n * (-2)^(-d)` shared by every backend.
#[inline]
pub fn ensemble_weight(subsystem_size: usize, distance: u32) -> f64 {
    f64::powi(2.0, subsystem_size as i32) * f64::powi(-2.0, -(distance as i32))
}

/// Ensemble term `2^n * (-2)^(-D) * (n_i / shots) * (n_j / shots)`.
///
/// `D` is the Hamming distance between the projected bitstrings and
/// `subsystem_size` is the partition length `n`.
pub fn ensemble_cell(
    s_i: &str,
    n_i: u64,
    s_j: &str,
    n_j: u64,
    subsystem_size: usize,
    shots: u64,
) -> Result<f64, RmError> {
    if shots == 0 {
        return Err(RmError::Shots(
            ErrorInfo::new("shots-zero", "shot count must be positive").with_context("shots", shots),
        ));
    }
    let distance = hamming_distance(s_i, s_j)?;
    let shots = shots as f64;
    Ok(ensemble_weight(subsystem_size, distance) * (n_i as f64 / shots) * (n_j as f64 / shots))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_square_the_probability() {
        let value = ensemble_cell("10010101", 421, "10010101", 421, 8, 4096).unwrap();
        assert_eq!(value, 421.0 * 421.0 / 65536.0);
    }

    #[test]
    fn odd_distance_flips_sign() {
        let value = ensemble_cell("10010101", 421, "00000000", 11, 8, 4096).unwrap();
        assert_eq!(hamming_distance("10010101", "00000000").unwrap(), 4);
        assert_eq!(value, 421.0 * 11.0 / 1048576.0);
        let flipped = ensemble_cell("1", 1, "0", 1, 1, 2).unwrap();
        assert_eq!(flipped, -0.25);
    }

    #[test]
    fn rejects_bad_inputs() {
        assert!(matches!(
            ensemble_cell("01", 1, "011", 1, 2, 4),
            Err(RmError::Counts(_))
        ));
        assert!(matches!(ensemble_cell("01", 1, "01", 1, 2, 0), Err(RmError::Shots(_))));
    }
}
