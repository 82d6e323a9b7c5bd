//! Classical-shadow reconstruction from randomized single-qubit measurements.
//!
//! Every cell was measured after rotating each qubit into one of three bases.
//! A cell's snapshot is the Kronecker product, highest register first, of
//! per-register factors `sum_s p(s) (3 U^dagger |s><s| U - 1)`.

use std::collections::BTreeMap;
use std::f64::consts::FRAC_1_SQRT_2;

use nalgebra::{Complex, DMatrix, Matrix2};
use rmx_core::counts::OutcomeCounts;
use rmx_core::errors::{ErrorInfo, RmError};
use rmx_kernel::cell::series_shots;
use serde::{Deserialize, Serialize};

/// Complex matrix entry.
pub type C64 = Complex<f64>;

/// Averaged single-register snapshots of one cell, keyed by register.
pub type ShadowFactors = BTreeMap<usize, Matrix2<C64>>;

/// Widest selection whose averaged density matrix is materialized.
pub const MAX_SHADOW_REGISTERS: usize = 10;

/// Rotation applied to a qubit before its computational-basis measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadowBasis {
    /// `RX(pi/2)`.
    X,
    /// `RY(-pi/2)`.
    Y,
    /// Identity.
    Z,
}

impl ShadowBasis {
    /// Unitary of the rotation.
    pub fn unitary(self) -> Matrix2<C64> {
        let c = C64::new(FRAC_1_SQRT_2, 0.0);
        let i_s = C64::new(0.0, FRAC_1_SQRT_2);
        match self {
            ShadowBasis::X => Matrix2::new(c, -i_s, -i_s, c),
            ShadowBasis::Y => Matrix2::new(c, c, -c, c),
            ShadowBasis::Z => Matrix2::identity(),
        }
    }

    /// Single-shot snapshot `3 U^dagger |b><b| U - 1` for measured bit `b`.
    pub fn snapshot(self, bit: bool) -> Matrix2<C64> {
        let (one, zero) = (C64::new(1.0, 0.0), C64::new(0.0, 0.0));
        let projector = if bit {
            Matrix2::new(zero, zero, zero, one)
        } else {
            Matrix2::new(one, zero, zero, zero)
        };
        let unitary = self.unitary();
        (unitary.adjoint() * projector * unitary).map(|z| z * 3.0) - Matrix2::identity()
    }
}

impl TryFrom<u8> for ShadowBasis {
    type Error = RmError;

    /// `0 -> X`, `1 -> Y`, `2 -> Z`.
    fn try_from(index: u8) -> Result<Self, Self::Error> {
        match index {
            0 => Ok(ShadowBasis::X),
            1 => Ok(ShadowBasis::Y),
            2 => Ok(ShadowBasis::Z),
            other => Err(RmError::Config(
                ErrorInfo::new("shadow-basis", "shadow basis index must be 0, 1 or 2").with_context("index", other),
            )),
        }
    }
}

/// Per-register factors of one cell for the given `registers`.
pub fn rho_m_factors(
    shots: u64,
    counts: &OutcomeCounts,
    directions: &BTreeMap<usize, ShadowBasis>,
    registers: &[usize],
) -> Result<ShadowFactors, RmError> {
    let sample_shots = series_shots(counts)?;
    if sample_shots != shots {
        return Err(RmError::Shots(
            ErrorInfo::new("shots-mismatch", "cell counts do not sum to the declared shots")
                .with_context("shots", shots)
                .with_context("sample_shots", sample_shots),
        ));
    }
    let width = counts.validate()?;
    let shots = shots as f64;
    let mut factors = ShadowFactors::new();
    for &register in registers {
        if register >= width {
            return Err(RmError::Partition(
                ErrorInfo::new("registers-out-of-range", "classical register beyond outcome width")
                    .with_context("register", register)
                    .with_context("width", width),
            ));
        }
        let basis = directions.get(&register).copied().ok_or_else(|| {
            RmError::Counts(
                ErrorInfo::new("shadow-direction-missing", "no measurement basis recorded for register")
                    .with_context("register", register),
            )
        })?;
        let snapshots = [basis.snapshot(false), basis.snapshot(true)];
        let position = width - 1 - register;
        let mut factor = Matrix2::zeros();
        for (outcome, count) in counts {
            let bit = outcome.as_bytes()[position] == b'1';
            let weight = *count as f64 / shots;
            factor += snapshots[usize::from(bit)].map(|z| z * weight);
        }
        factors.insert(register, factor);
    }
    Ok(factors)
}

/// Full snapshot of one cell.
pub fn rho_m(factors: &ShadowFactors) -> DMatrix<C64> {
    factors.values().rev().fold(DMatrix::identity(1, 1), |rho, factor| {
        rho.kronecker(&DMatrix::from_column_slice(2, 2, factor.as_slice()))
    })
}

fn too_few_cells(found: usize, needed: usize) -> RmError {
    RmError::Numeric(
        ErrorInfo::new("shadow-too-few-cells", "not enough cells for the shadow estimate")
            .with_context("cells", found)
            .with_context("needed", needed),
    )
}

/// Mean snapshot over all cells.
pub fn expectation_rho(cells: &[ShadowFactors]) -> Result<DMatrix<C64>, RmError> {
    let first = cells.first().ok_or_else(|| too_few_cells(0, 1))?;
    let dim = 1usize << first.len();
    let mut sum = DMatrix::zeros(dim, dim);
    for cell in cells {
        sum += rho_m(cell);
    }
    let n = cells.len() as f64;
    Ok(sum.map(|z| z / n))
}

/// Purity `tr(rho^2)` as the mean of `Re tr(rho_i rho_j)` over ordered pairs
/// of distinct cells. The trace of a Kronecker product factorizes per register.
pub fn trace_rho_square(cells: &[ShadowFactors]) -> Result<f64, RmError> {
    if cells.len() < 2 {
        return Err(too_few_cells(cells.len(), 2));
    }
    let mut total = 0.0;
    for (index, first) in cells.iter().enumerate() {
        for second in &cells[index + 1..] {
            let product = first
                .values()
                .zip(second.values())
                .fold(C64::new(1.0, 0.0), |acc, (a, b)| acc * (a * b).trace());
            total += product.re;
        }
    }
    let n = cells.len() as f64;
    Ok(2.0 * total / (n * (n - 1.0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: C64, b: f64) -> bool {
        (a.re - b).abs() < 1e-12 && a.im.abs() < 1e-12
    }

    #[test]
    fn snapshots_have_unit_trace() {
        for basis in [ShadowBasis::X, ShadowBasis::Y, ShadowBasis::Z] {
            for bit in [false, true] {
                assert!(close(basis.snapshot(bit).trace(), 1.0));
            }
        }
        let z0 = ShadowBasis::Z.snapshot(false);
        assert!(close(z0[(0, 0)], 2.0));
        assert!(close(z0[(1, 1)], -1.0));
    }

    #[test]
    fn factor_trace_matches_full_product() {
        let counts: OutcomeCounts = [("01", 3), ("10", 5)].into_iter().collect();
        let a_dirs = BTreeMap::from([(0, ShadowBasis::X), (1, ShadowBasis::Z)]);
        let b_dirs = BTreeMap::from([(0, ShadowBasis::Y), (1, ShadowBasis::X)]);
        let a = rho_m_factors(8, &counts, &a_dirs, &[1, 0]).unwrap();
        let b = rho_m_factors(8, &counts, &b_dirs, &[1, 0]).unwrap();
        let full = (rho_m(&a) * rho_m(&b)).trace().re;
        assert!((trace_rho_square(&[a, b]).unwrap() - full).abs() < 1e-12);
    }

    #[test]
    fn basis_indices_and_missing_directions() {
        assert_eq!(ShadowBasis::try_from(1u8).unwrap(), ShadowBasis::Y);
        assert_eq!(ShadowBasis::try_from(3u8).unwrap_err().code(), "shadow-basis");
        let counts: OutcomeCounts = [("01", 4)].into_iter().collect();
        let err = rho_m_factors(4, &counts, &BTreeMap::new(), &[0]).unwrap_err();
        assert_eq!(err.code(), "shadow-direction-missing");
        assert_eq!(trace_rho_square(&[]).unwrap_err().code(), "shadow-too-few-cells");
    }
}
