use rmx_core::errors::{ErrorInfo, RmError};
use serde::{Deserialize, Serialize};

fn empty_error() -> RmError {
    RmError::Numeric(ErrorInfo::new("stats-empty", "statistics need at least one value"))
}

/// Arithmetic mean, accumulated as offsets from the first value.
///
/// Identical inputs therefore reproduce their common value exactly.
pub fn mean(values: &[f64]) -> Result<f64, RmError> {
    let (&first, rest) = values.split_first().ok_or_else(empty_error)?;
    let offset: f64 = rest.iter().map(|v| v - first).sum();
    Ok(first + offset / values.len() as f64)
}

/// Sample standard deviation (`n - 1` denominator); a single value has deviation zero.
pub fn sample_sd(values: &[f64]) -> Result<f64, RmError> {
    let centre = mean(values)?;
    if values.len() < 2 {
        return Ok(0.0);
    }
    let squares: f64 = values.iter().map(|v| (v - centre) * (v - centre)).sum();
    Ok((squares / (values.len() - 1) as f64).sqrt())
}

/// Renyi-2 entropy of a purity value. Values above one yield negative entropies.
///
/// Non-positive or non-finite purities have no finite entropy and are rejected.
pub fn renyi2(purity: f64) -> Result<f64, RmError> {
    if !(purity > 0.0 && purity.is_finite()) {
        return Err(RmError::Numeric(
            ErrorInfo::new("entropy-non-positive-purity", "entropy needs a positive finite purity")
                .with_context("purity", purity),
        ));
    }
    Ok(-purity.log2())
}

/// Mean, entropy and spreads of a set of per-cell purities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PuritySummary {
    /// Mean purity.
    pub purity: f64,
    /// `-log2` of the mean purity.
    pub entropy: f64,
    /// Sample standard deviation of the per-cell purities.
    pub purity_sd: f64,
    /// Sample standard deviation of the per-cell entropies.
    pub entropy_sd: f64,
}

impl PuritySummary {
    /// Summarises per-cell purities.
    pub fn from_cells(purities: &[f64]) -> Result<Self, RmError> {
        let purity = mean(purities)?;
        let entropies = purities
            .iter()
            .enumerate()
            .map(|(index, p)| renyi2(*p).map_err(|err| err.with_context("cell", index)))
            .collect::<Result<Vec<f64>, RmError>>()?;
        Ok(Self {
            purity,
            entropy: renyi2(purity)?,
            purity_sd: sample_sd(purities)?,
            entropy_sd: sample_sd(&entropies)?,
        })
    }
}
