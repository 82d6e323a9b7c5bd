use std::collections::BTreeMap;

use rmx_core::errors::{ErrorInfo, RmError};
use rmx_core::partition::BitRange;
use nalgebra::DMatrix;
use rmx_kernel::backends::Backend;
use serde::{Deserialize, Serialize};

use crate::classical_shadow::{ShadowFactors, C64};
use crate::stats::{mean, sample_sd, PuritySummary};

/// Subsystem a report was computed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Subsystem {
    /// Contiguous (possibly wrapping) partition inside a measure range.
    Range {
        /// Partition, relative to the measured bits.
        bit_string_range: BitRange,
        /// Measured bits of the full register.
        measure_range: BitRange,
    },
    /// Explicit classical registers.
    Registers {
        /// Selected registers, ascending.
        selected: Vec<usize>,
        /// Width of the full outcomes.
        width: usize,
    },
}

impl Subsystem {
    /// Number of bits in the subsystem.
    pub fn size(&self) -> usize {
        match self {
            Subsystem::Range { bit_string_range, .. } => bit_string_range.len(),
            Subsystem::Registers { selected, .. } => selected.len(),
        }
    }
}

/// Purity and Renyi-2 entropy aggregated over cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntropyReport {
    /// Hash of the shots, cells and subsystem analysed.
    pub analysis_hash: String,
    /// Mean purity.
    pub purity: f64,
    /// `-log2(purity)`; negative when the estimate exceeds one.
    pub entropy: f64,
    /// Per-cell purities keyed by cell index.
    pub purity_cells: BTreeMap<usize, f64>,
    /// Sample standard deviation of the per-cell purities.
    pub purity_sd: f64,
    /// Sample standard deviation of the per-cell entropies.
    pub entropy_sd: f64,
    /// Subsystem analysed.
    pub subsystem: Subsystem,
    /// Number of cells.
    pub counts_num: usize,
    /// Backend that computed the cells.
    pub backend: Backend,
    /// Wall-clock seconds spent on the cells.
    pub taking_time_secs: f64,
}

impl EntropyReport {
    pub(crate) fn from_cells(
        purities: Vec<f64>,
        subsystem: Subsystem,
        backend: Backend,
        analysis_hash: String,
        taking_time_secs: f64,
    ) -> Result<Self, RmError> {
        let summary = PuritySummary::from_cells(&purities)?;
        Ok(Self {
            analysis_hash,
            purity: summary.purity,
            entropy: summary.entropy,
            purity_sd: summary.purity_sd,
            entropy_sd: summary.entropy_sd,
            counts_num: purities.len(),
            purity_cells: purities.into_iter().enumerate().collect(),
            subsystem,
            backend,
            taking_time_secs,
        })
    }
}

/// Overlap (echo) aggregated over paired cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapReport {
    /// Hash of the shots, cell pairs and subsystem analysed.
    pub analysis_hash: String,
    /// Mean echo.
    pub echo: f64,
    /// Per-cell echoes keyed by cell index.
    pub echo_cells: BTreeMap<usize, f64>,
    /// Sample standard deviation of the per-cell echoes.
    pub echo_sd: f64,
    /// Subsystem analysed.
    pub subsystem: Subsystem,
    /// Number of cell pairs.
    pub counts_num: usize,
    /// Backend that computed the cells.
    pub backend: Backend,
    /// Wall-clock seconds spent on the cells.
    pub taking_time_secs: f64,
}

impl OverlapReport {
    pub(crate) fn from_cells(
        echoes: Vec<f64>,
        subsystem: Subsystem,
        backend: Backend,
        analysis_hash: String,
        taking_time_secs: f64,
    ) -> Result<Self, RmError> {
        Ok(Self {
            analysis_hash,
            echo: mean(&echoes)?,
            echo_sd: sample_sd(&echoes)?,
            counts_num: echoes.len(),
            echo_cells: echoes.into_iter().enumerate().collect(),
            subsystem,
            backend,
            taking_time_secs,
        })
    }
}

/// Where the full-system purities of a mitigated estimate came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllSystemSource {
    /// Computed from the same cells over the whole measured range.
    Independent,
    /// Supplied by the caller under this label.
    Existing(String),
}

fn registers_error() -> RmError {
    RmError::Partition(ErrorInfo::new(
        "all-system-registers",
        "full-system purities must come from a range analysis",
    ))
}

/// Full-system purities computed by an earlier analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistingAllSystem {
    /// Per-cell full-system purities.
    pub purity_cells: BTreeMap<usize, f64>,
    /// Partition the purities were computed on.
    pub bit_string_range: BitRange,
    /// Measure range the purities were computed on.
    pub measure_range: BitRange,
    /// Label identifying the earlier analysis.
    pub source: String,
}

impl ExistingAllSystem {
    /// Reuses the cells of a full-system entropy report.
    pub fn from_report(report: &EntropyReport, source: impl Into<String>) -> Result<Self, RmError> {
        match &report.subsystem {
            Subsystem::Range {
                bit_string_range,
                measure_range,
            } => Ok(Self {
                purity_cells: report.purity_cells.clone(),
                bit_string_range: *bit_string_range,
                measure_range: *measure_range,
                source: source.into(),
            }),
            Subsystem::Registers { .. } => Err(registers_error()),
        }
    }
}

/// Full-system statistics used for mitigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllSystemStats {
    /// Mean full-system purity.
    pub purity: f64,
    /// Full-system entropy.
    pub entropy: f64,
    /// Per-cell full-system purities.
    pub purity_cells: BTreeMap<usize, f64>,
    /// Sample standard deviation of the full-system purities.
    pub purity_sd: f64,
    /// Sample standard deviation of the full-system entropies.
    pub entropy_sd: f64,
    /// Partition of the full-system analysis.
    pub bit_string_range: BitRange,
    /// Measure range of the full-system analysis.
    pub measure_range: BitRange,
    /// Origin of the data.
    pub source: AllSystemSource,
    /// Wall-clock seconds spent; zero for reused data.
    pub taking_time_secs: f64,
}

impl AllSystemStats {
    pub(crate) fn from_existing(existing: &ExistingAllSystem) -> Result<Self, RmError> {
        if let Some((cell, purity)) = existing
            .purity_cells
            .iter()
            .find(|(_, purity)| !(**purity > 0.0 && purity.is_finite()))
        {
            return Err(RmError::Numeric(
                ErrorInfo::new("all-system-non-positive-purity", "full-system purities must be positive and finite")
                    .with_context("cell", cell)
                    .with_context("purity", purity)
                    .with_context("source", &existing.source),
            ));
        }
        let cells: Vec<f64> = existing.purity_cells.values().copied().collect();
        let summary = PuritySummary::from_cells(&cells).map_err(|err| err.with_context("source", &existing.source))?;
        Ok(Self {
            purity: summary.purity,
            entropy: summary.entropy,
            purity_cells: existing.purity_cells.clone(),
            purity_sd: summary.purity_sd,
            entropy_sd: summary.entropy_sd,
            bit_string_range: existing.bit_string_range,
            measure_range: existing.measure_range,
            source: AllSystemSource::Existing(existing.source.clone()),
            taking_time_secs: 0.0,
        })
    }

    pub(crate) fn from_report(report: EntropyReport) -> Result<Self, RmError> {
        let Subsystem::Range {
            bit_string_range,
            measure_range,
        } = report.subsystem
        else {
            return Err(registers_error());
        };
        Ok(Self {
            purity: report.purity,
            entropy: report.entropy,
            purity_cells: report.purity_cells,
            purity_sd: report.purity_sd,
            entropy_sd: report.entropy_sd,
            bit_string_range,
            measure_range,
            source: AllSystemSource::Independent,
            taking_time_secs: report.taking_time_secs,
        })
    }

    /// Size of the full system.
    pub fn system_size(&self) -> usize {
        self.bit_string_range.len()
    }
}

/// Subsystem entropy with depolarizing error mitigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MitigatedEntropyReport {
    /// Unmitigated subsystem statistics.
    pub subsystem: EntropyReport,
    /// Full-system statistics.
    pub all_system: AllSystemStats,
    /// Depolarizing error rate.
    pub error_rate: f64,
    /// Mitigated subsystem purity.
    pub mitigated_purity: f64,
    /// `-log2` of the mitigated purity.
    pub mitigated_entropy: f64,
}

/// Magnetization square over two-qubit parity cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MagnetSquareReport {
    /// Hash of the shots, cells and spin count analysed.
    pub analysis_hash: String,
    /// `(sum of cell parities + n) / n^2`.
    pub magnet_square: f64,
    /// Per-cell parities keyed by cell index.
    pub magnet_square_cells: BTreeMap<usize, f64>,
    /// Number of spins.
    pub num_qubits: usize,
    /// Number of cells.
    pub counts_num: usize,
    /// Backend that computed the cells.
    pub backend: Backend,
    /// Wall-clock seconds spent on the cells.
    pub taking_time_secs: f64,
}

/// Classical-shadow density matrix and purity of a register selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassicalShadowReport {
    /// Hash of the shots, cells, bases and subsystem analysed.
    pub analysis_hash: String,
    /// Mean of the per-cell snapshots.
    pub expect_rho: DMatrix<C64>,
    /// Purity from distinct pairs of snapshots.
    pub purity: f64,
    /// Per-register factors of every cell, keyed by cell index.
    pub rho_m_i_cells: BTreeMap<usize, ShadowFactors>,
    /// Registers in Kronecker order, highest first.
    pub selected_registers: Vec<usize>,
    /// Subsystem analysed.
    pub subsystem: Subsystem,
    /// Number of cells.
    pub counts_num: usize,
    /// Backend that computed the cells.
    pub backend: Backend,
    /// Wall-clock seconds spent on the cells.
    pub taking_time_secs: f64,
}
