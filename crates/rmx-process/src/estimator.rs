use std::collections::BTreeMap;
use std::time::Instant;

use rmx_core::counts::OutcomeCounts;
use rmx_core::errors::{ErrorInfo, RmError};
use rmx_core::partition::PartitionSpec;
use rmx_kernel::availability::{CapabilityRegistry, EstimatorFamily};
use rmx_kernel::backends::Backend;
use rmx_kernel::construct::{resolve_measure, resolve_partition, Projection};
use tracing::{debug, info, warn};

use crate::classical_shadow::{expectation_rho, rho_m_factors, trace_rho_square, ShadowBasis, MAX_SHADOW_REGISTERS};
use crate::config::ProcessOpts;
use crate::dispatch::run_cells;
use crate::hash::stable_hash_string;
use crate::magnet_square::{magnet_square, magnet_square_cell};
use crate::mitigation::depolarizing_error_mitigation;
use crate::progress::ProgressSink;
use crate::report::{
    AllSystemStats, ClassicalShadowReport, EntropyReport, ExistingAllSystem, MagnetSquareReport,
    MitigatedEntropyReport, OverlapReport, Subsystem,
};
use crate::workers::resolve_workers;

/// Checks shots and every cell before any computation; returns the common outcome width.
fn validate_cells<'a>(shots: u64, cells: impl IntoIterator<Item = &'a OutcomeCounts>) -> Result<usize, RmError> {
    if shots == 0 {
        return Err(RmError::Shots(
            ErrorInfo::new("shots-zero", "shot count must be positive").with_context("shots", shots),
        ));
    }
    let mut width = None;
    for (index, cell) in cells.into_iter().enumerate() {
        let cell_width = cell.validate().map_err(|err| err.with_context("cell", index))?;
        let sample_shots = cell.shots().map_err(|err| err.with_context("cell", index))?;
        if sample_shots != shots {
            return Err(RmError::Shots(
                ErrorInfo::new("shots-mismatch", "cell counts do not sum to the declared shots")
                    .with_context("cell", index)
                    .with_context("shots", shots)
                    .with_context("sample_shots", sample_shots),
            ));
        }
        match width {
            None => width = Some(cell_width),
            Some(expected) if expected != cell_width => {
                return Err(RmError::Counts(
                    ErrorInfo::new("cells-width-mismatch", "cells measured different numbers of bits")
                        .with_context("cell", index)
                        .with_context("expected", expected)
                        .with_context("found", cell_width),
                ));
            }
            Some(_) => {}
        }
    }
    width.ok_or_else(|| {
        RmError::Counts(
            ErrorInfo::new("cells-empty", "no cells supplied").with_hint("pass at least one outcome-counts mapping"),
        )
    })
}

/// Multi-cell estimator bound to a capability registry and options.
#[derive(Debug, Clone)]
pub struct Estimator<'r> {
    registry: &'r CapabilityRegistry,
    opts: ProcessOpts,
}

impl Estimator<'static> {
    /// Estimator using the process-wide registry.
    pub fn new(opts: ProcessOpts) -> Self {
        Self {
            registry: CapabilityRegistry::global(),
            opts,
        }
    }
}

impl Default for Estimator<'static> {
    fn default() -> Self {
        Self::new(ProcessOpts::default())
    }
}

impl<'r> Estimator<'r> {
    /// Estimator using an explicit registry.
    pub fn with_registry(registry: &'r CapabilityRegistry, opts: ProcessOpts) -> Self {
        Self { registry, opts }
    }

    /// Options in effect.
    pub fn opts(&self) -> &ProcessOpts {
        &self.opts
    }

    fn range_projection(&self, width: usize, partition: PartitionSpec) -> Result<Projection, RmError> {
        let measure = resolve_measure(self.opts.measure, width)?;
        let bits = resolve_partition(partition, measure.len())?;
        Projection::range(measure, bits)
    }

    fn subsystem_of(projection: &Projection) -> Subsystem {
        match projection {
            Projection::Range { measure, partition } => Subsystem::Range {
                bit_string_range: *partition,
                measure_range: *measure,
            },
            Projection::Registers { width, registers } => Subsystem::Registers {
                selected: registers.clone(),
                width: *width,
            },
        }
    }

    fn purity_report(
        &self,
        shots: u64,
        cells: &[OutcomeCounts],
        projection: Projection,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<EntropyReport, RmError> {
        let backend = self.registry.select(EstimatorFamily::Purity, self.opts.backend)?;
        let kernel = backend.kernel()?;
        let workers = resolve_workers(self.opts.workers);
        let description = format!("Calculate {projection} by {backend}");
        let started = Instant::now();
        let purities = run_cells(cells, backend, workers, progress, &description, |cell| {
            kernel.purity_cell(cell, &projection)
        })?;
        let elapsed = started.elapsed().as_secs_f64();
        info!(%backend, cells = cells.len(), elapsed, "purity cells computed");
        let subsystem = Self::subsystem_of(&projection);
        let analysis_hash = stable_hash_string(&(shots, cells, &subsystem))?;
        EntropyReport::from_cells(purities, subsystem, backend, analysis_hash, elapsed)
    }

    fn overlap_report(
        &self,
        shots: u64,
        pairs: &[(&OutcomeCounts, &OutcomeCounts)],
        projection: Projection,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<OverlapReport, RmError> {
        let backend = self.registry.select(EstimatorFamily::Echo, self.opts.backend)?;
        let kernel = backend.kernel()?;
        let workers = resolve_workers(self.opts.workers);
        let description = format!("Calculate overlap of {projection} by {backend}");
        let started = Instant::now();
        let echoes = run_cells(pairs, backend, workers, progress, &description, |(first, second)| {
            kernel.echo_cell(first, second, &projection)
        })?;
        let elapsed = started.elapsed().as_secs_f64();
        info!(%backend, cells = pairs.len(), elapsed, "echo cells computed");
        let subsystem = Self::subsystem_of(&projection);
        let analysis_hash = stable_hash_string(&(shots, pairs, &subsystem))?;
        OverlapReport::from_cells(echoes, subsystem, backend, analysis_hash, elapsed)
    }

    /// Renyi-2 entropy of the subsystem `partition` over all `cells`.
    pub fn entangled_entropy(
        &self,
        shots: u64,
        cells: &[OutcomeCounts],
        partition: impl Into<PartitionSpec>,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<EntropyReport, RmError> {
        let width = validate_cells(shots, cells)?;
        let projection = self.range_projection(width, partition.into())?;
        self.purity_report(shots, cells, projection, progress)
    }

    /// Renyi-2 entropy of an explicit set of classical registers.
    ///
    /// The measure range option does not apply to register selections.
    pub fn entangled_entropy_registers(
        &self,
        shots: u64,
        cells: &[OutcomeCounts],
        registers: &[usize],
        progress: Option<&dyn ProgressSink>,
    ) -> Result<EntropyReport, RmError> {
        let width = validate_cells(shots, cells)?;
        let projection = Projection::registers(width, registers)?;
        self.purity_report(shots, cells, projection, progress)
    }

    /// Overlap between two equally long sequences of cells, paired by index.
    pub fn wavefunction_overlap(
        &self,
        shots: u64,
        first: &[OutcomeCounts],
        second: &[OutcomeCounts],
        partition: impl Into<PartitionSpec>,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<OverlapReport, RmError> {
        let pairs = pair_cells(first, second)?;
        let width = validate_cells(shots, first.iter().chain(second))?;
        let projection = self.range_projection(width, partition.into())?;
        self.overlap_report(shots, &pairs, projection, progress)
    }

    /// Overlap where the first half of `counts` is paired with the second half.
    pub fn wavefunction_overlap_halves(
        &self,
        shots: u64,
        counts: &[OutcomeCounts],
        partition: impl Into<PartitionSpec>,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<OverlapReport, RmError> {
        if counts.len() % 2 != 0 {
            return Err(RmError::Counts(
                ErrorInfo::new("cells-odd", "counts cannot be split into two equal halves")
                    .with_context("cells", counts.len()),
            ));
        }
        let (first, second) = counts.split_at(counts.len() / 2);
        self.wavefunction_overlap(shots, first, second, partition, progress)
    }

    /// Overlap over an explicit set of classical registers.
    pub fn wavefunction_overlap_registers(
        &self,
        shots: u64,
        first: &[OutcomeCounts],
        second: &[OutcomeCounts],
        registers: &[usize],
        progress: Option<&dyn ProgressSink>,
    ) -> Result<OverlapReport, RmError> {
        let pairs = pair_cells(first, second)?;
        let width = validate_cells(shots, first.iter().chain(second))?;
        let projection = Projection::registers(width, registers)?;
        self.overlap_report(shots, &pairs, projection, progress)
    }

    /// Subsystem entropy corrected for depolarizing noise.
    ///
    /// Full-system purities are computed from the same cells over the whole
    /// measured range unless `existing_all_system` supplies them.
    pub fn entangled_entropy_mitigated(
        &self,
        shots: u64,
        cells: &[OutcomeCounts],
        partition: impl Into<PartitionSpec>,
        existing_all_system: Option<&ExistingAllSystem>,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<MitigatedEntropyReport, RmError> {
        let subsystem = self.entangled_entropy(shots, cells, partition, progress)?;
        let all_system = match existing_all_system {
            None => {
                let report = self.entangled_entropy(shots, cells, PartitionSpec::Full, progress)?;
                AllSystemStats::from_report(report)?
            }
            Some(existing) => {
                if let Some(sink) = progress {
                    sink.set_description(&format!("Using existing all system from '{}'", existing.source));
                }
                AllSystemStats::from_existing(existing)?
            }
        };
        let n_a = subsystem.subsystem.size();
        let system_size = all_system.system_size();
        debug!(n_a, system_size, source = ?all_system.source, "mitigating depolarizing error");
        let mitigation = depolarizing_error_mitigation(subsystem.purity, all_system.purity, n_a, system_size)?;
        Ok(MitigatedEntropyReport {
            subsystem,
            all_system,
            error_rate: mitigation.error_rate,
            mitigated_purity: mitigation.mitigated_purity,
            mitigated_entropy: mitigation.mitigated_entropy,
        })
    }

    /// Magnetization square of `num_qubits` spins.
    ///
    /// Every cell holds the two-bit counts of one ordered pair of distinct spins.
    pub fn magnet_square(
        &self,
        shots: u64,
        cells: &[OutcomeCounts],
        num_qubits: usize,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<MagnetSquareReport, RmError> {
        let width = validate_cells(shots, cells)?;
        if width != 2 {
            return Err(RmError::Counts(
                ErrorInfo::new("magnet-square-width", "magnetization cells hold two-bit outcomes")
                    .with_context("found", width),
            ));
        }
        if num_qubits == 0 {
            return Err(RmError::Config(
                ErrorInfo::new("magnet-square-qubits", "magnetization needs at least one spin")
                    .with_context("num_qubits", num_qubits),
            ));
        }
        let ordered_pairs = num_qubits * (num_qubits - 1);
        if cells.len() != ordered_pairs {
            warn!(cells = cells.len(), ordered_pairs, "cell count differs from the ordered spin pairs");
        }
        let backend = self.registry.select(EstimatorFamily::MagnetSquare, self.opts.backend)?;
        let workers = resolve_workers(self.opts.workers);
        let started = Instant::now();
        let parities = run_cells(cells, backend, workers, progress, "Magnet Square being calculated.", |cell| {
            magnet_square_cell(shots, cell)
        })?;
        let elapsed = started.elapsed().as_secs_f64();
        info!(%backend, cells = cells.len(), elapsed, "magnetization cells computed");
        let analysis_hash = stable_hash_string(&(shots, cells, num_qubits))?;
        Ok(MagnetSquareReport {
            analysis_hash,
            magnet_square: magnet_square(&parities, num_qubits),
            counts_num: parities.len(),
            magnet_square_cells: parities.into_iter().enumerate().collect(),
            num_qubits,
            backend,
            taking_time_secs: elapsed,
        })
    }

    /// Classical-shadow density matrix and purity of the subsystem `partition`.
    ///
    /// `directions[i]` maps every register of cell `i` to its measurement basis.
    pub fn classical_shadow(
        &self,
        shots: u64,
        cells: &[OutcomeCounts],
        directions: &[BTreeMap<usize, ShadowBasis>],
        partition: impl Into<PartitionSpec>,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<ClassicalShadowReport, RmError> {
        let width = validate_cells(shots, cells)?;
        let projection = self.range_projection(width, partition.into())?;
        self.shadow_report(shots, cells, directions, projection, progress)
    }

    /// Classical shadow of an explicit set of classical registers.
    pub fn classical_shadow_registers(
        &self,
        shots: u64,
        cells: &[OutcomeCounts],
        directions: &[BTreeMap<usize, ShadowBasis>],
        registers: &[usize],
        progress: Option<&dyn ProgressSink>,
    ) -> Result<ClassicalShadowReport, RmError> {
        let width = validate_cells(shots, cells)?;
        let projection = Projection::registers(width, registers)?;
        self.shadow_report(shots, cells, directions, projection, progress)
    }

    fn shadow_report(
        &self,
        shots: u64,
        cells: &[OutcomeCounts],
        directions: &[BTreeMap<usize, ShadowBasis>],
        projection: Projection,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<ClassicalShadowReport, RmError> {
        if directions.len() != cells.len() {
            return Err(RmError::Counts(
                ErrorInfo::new("shadow-directions-unpaired", "every cell needs its measurement bases")
                    .with_context("cells", cells.len())
                    .with_context("directions", directions.len()),
            ));
        }
        let width = projection.register_width();
        let mut registers: Vec<usize> = projection.positions().into_iter().map(|p| width - 1 - p).collect();
        registers.sort_unstable_by(|a, b| b.cmp(a));
        if registers.len() > MAX_SHADOW_REGISTERS {
            return Err(RmError::Partition(
                ErrorInfo::new("shadow-too-wide", "too many registers for a dense shadow density matrix")
                    .with_context("registers", registers.len())
                    .with_context("max", MAX_SHADOW_REGISTERS),
            ));
        }
        let backend = self.registry.select(EstimatorFamily::ClassicalShadow, self.opts.backend)?;
        let workers = resolve_workers(self.opts.workers);
        let description = format!("Calculate classical shadow of {projection} by {backend}");
        let items: Vec<(&OutcomeCounts, &BTreeMap<usize, ShadowBasis>)> = cells.iter().zip(directions).collect();
        let started = Instant::now();
        let factors = run_cells(&items, backend, workers, progress, &description, |(cell, direction)| {
            rho_m_factors(shots, cell, direction, &registers)
        })?;
        let expect_rho = expectation_rho(&factors)?;
        let purity = trace_rho_square(&factors)?;
        let elapsed = started.elapsed().as_secs_f64();
        info!(%backend, cells = cells.len(), elapsed, "shadow cells computed");
        let subsystem = Self::subsystem_of(&projection);
        let analysis_hash = stable_hash_string(&(shots, cells, directions, &subsystem))?;
        Ok(ClassicalShadowReport {
            analysis_hash,
            expect_rho,
            purity,
            counts_num: factors.len(),
            rho_m_i_cells: factors.into_iter().enumerate().collect(),
            selected_registers: registers,
            subsystem,
            backend,
            taking_time_secs: elapsed,
        })
    }

    /// Backend that a purity estimate would run on.
    pub fn backend(&self) -> Result<Backend, RmError> {
        self.registry.select(EstimatorFamily::Purity, self.opts.backend)
    }
}

fn pair_cells<'a>(
    first: &'a [OutcomeCounts],
    second: &'a [OutcomeCounts],
) -> Result<Vec<(&'a OutcomeCounts, &'a OutcomeCounts)>, RmError> {
    if first.len() != second.len() {
        return Err(RmError::Counts(
            ErrorInfo::new("cells-unpaired", "both series need the same number of cells")
                .with_context("first", first.len())
                .with_context("second", second.len()),
        ));
    }
    Ok(first.iter().zip(second).collect())
}

/// Renyi-2 entropy with the process-wide registry and default options.
pub fn entangled_entropy(
    shots: u64,
    cells: &[OutcomeCounts],
    partition: impl Into<PartitionSpec>,
) -> Result<EntropyReport, RmError> {
    Estimator::default().entangled_entropy(shots, cells, partition, None)
}

/// Overlap with the process-wide registry and default options.
pub fn wavefunction_overlap(
    shots: u64,
    first: &[OutcomeCounts],
    second: &[OutcomeCounts],
    partition: impl Into<PartitionSpec>,
) -> Result<OverlapReport, RmError> {
    Estimator::default().wavefunction_overlap(shots, first, second, partition, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(pairs: &[(&str, u64)]) -> OutcomeCounts {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn validation_precedes_computation() {
        let cells = vec![cell(&[("01", 2)]), cell(&[("011", 2)])];
        let err = validate_cells(2, &cells).unwrap_err();
        assert_eq!(err.code(), "cells-width-mismatch");
        assert_eq!(err.info().context.get("cell").map(String::as_str), Some("1"));

        let err = validate_cells(3, &cells).unwrap_err();
        assert_eq!(err.code(), "shots-mismatch");
        assert_eq!(validate_cells(0, &cells).unwrap_err().code(), "shots-zero");
        assert_eq!(validate_cells(2, &[]).unwrap_err().code(), "cells-empty");
    }

    #[test]
    fn unpaired_series_are_rejected() {
        let a = vec![cell(&[("0", 1)])];
        let err = pair_cells(&a, &[]).unwrap_err();
        assert_eq!(err.code(), "cells-unpaired");
    }
}
