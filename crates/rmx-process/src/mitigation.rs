use rmx_core::errors::{ErrorInfo, RmError};
use serde::{Deserialize, Serialize};

use crate::stats::renyi2;

fn numeric_error(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
}

/// Both roots `(p+, p-)` of `a p^2 + b p + c = 0` for full-system purity
/// `purity_all_system` on `system_size` bits.
pub fn solve_p(purity_all_system: f64, system_size: usize) -> Result<(f64, f64), RmError> {
    let n = system_size as i32;
    let b = 1.0 / f64::powi(2.0, n - 1) - 2.0;
    let a = 1.0 + 1.0 / f64::powi(2.0, n) - 1.0 / f64::powi(2.0, n - 1);
    let c = 1.0 - purity_all_system;
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 || a == 0.0 {
        return Err(RmError::Numeric(
            numeric_error("mitigation-no-root", "error-rate equation has no real root")
                .with_context("purity_all_system", purity_all_system)
                .with_context("system_size", system_size)
                .with_context("discriminant", discriminant),
        ));
    }
    let root = discriminant.sqrt();
    Ok(((-b + root) / 2.0 / a, (-b - root) / 2.0 / a))
}

/// Mitigated subsystem purity for error rate `p` on a subsystem of `n_a` bits.
pub fn mitigation_equation(p: f64, purity: f64, n_a: usize) -> f64 {
    let n = n_a as i32;
    let p_sq = p * p;
    (purity - p_sq / f64::powi(2.0, n) - (p - p_sq) / f64::powi(2.0, n - 1)) / ((1.0 - p) * (1.0 - p))
}

/// Outcome of depolarizing error mitigation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mitigation {
    /// Estimated depolarizing error rate.
    pub error_rate: f64,
    /// Mitigated purity.
    pub mitigated_purity: f64,
    /// `-log2` of the mitigated purity.
    pub mitigated_entropy: f64,
}

/// Depolarizing error mitigation of a subsystem purity using the negative
/// root of the full-system error-rate equation.
pub fn depolarizing_error_mitigation(
    purity: f64,
    purity_all_system: f64,
    n_a: usize,
    system_size: usize,
) -> Result<Mitigation, RmError> {
    let (_, error_rate) = solve_p(purity_all_system, system_size)?;
    if error_rate == 1.0 {
        return Err(RmError::Numeric(
            numeric_error("mitigation-full-depolarization", "error rate of one cannot be mitigated")
                .with_context("purity_all_system", purity_all_system),
        ));
    }
    let mitigated_purity = mitigation_equation(error_rate, purity, n_a);
    if !(mitigated_purity > 0.0 && mitigated_purity.is_finite()) {
        return Err(RmError::Numeric(
            numeric_error("mitigation-non-positive-purity", "mitigated purity is not positive")
                .with_context("mitigated_purity", mitigated_purity)
                .with_context("purity", purity)
                .with_context("purity_all_system", purity_all_system)
                .with_context("error_rate", error_rate),
        ));
    }
    Ok(Mitigation {
        error_rate,
        mitigated_purity,
        mitigated_entropy: renyi2(mitigated_purity)?,
    })
}
