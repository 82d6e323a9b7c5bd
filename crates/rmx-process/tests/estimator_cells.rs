use std::sync::atomic::{AtomicUsize, Ordering};

use rmx_kernel::availability::Availability;
use rmx_kernel::dummy::make_dummy_case;
use rmx_process::{
    Backend, BackendSelection, CapabilityRegistry, EntropyReport, Estimator, OutcomeCounts, PartitionSpec,
    ProcessOpts, RmError, Subsystem,
};

fn counts(pairs: &[(&str, u64)]) -> OutcomeCounts {
    pairs.iter().map(|(k, v)| (*k, *v)).collect()
}

fn mixed_cells() -> Vec<OutcomeCounts> {
    vec![
        counts(&[("0000", 40), ("0110", 12), ("1011", 8), ("1111", 4)]),
        counts(&[("0001", 16), ("0110", 16), ("1000", 16), ("1110", 16)]),
        counts(&[("0011", 32), ("1100", 32)]),
        counts(&[("0101", 60), ("1010", 4)]),
    ]
}

fn pinned(backend: Backend) -> ProcessOpts {
    ProcessOpts::default().with_backend(BackendSelection::Pinned(backend))
}

fn compiled() -> impl Iterator<Item = Backend> {
    Backend::ALL.into_iter().filter(Backend::is_compiled)
}

#[test]
fn identical_cells_have_zero_spread_on_every_backend() {
    let cell = make_dummy_case(8, 256, Some(16), 11).expect("dummy case");
    assert_eq!(cell.shots().unwrap(), 4096);
    let cells = vec![cell; 100];

    let mut purities = Vec::new();
    let mut hashes = Vec::new();
    for backend in compiled() {
        let report = Estimator::new(pinned(backend))
            .entangled_entropy(4096, &cells, PartitionSpec::Degree(6), None)
            .expect("entropy");
        assert_eq!(report.backend, backend);
        assert_eq!(report.counts_num, 100);
        assert_eq!(report.purity_sd, 0.0);
        assert_eq!(report.entropy_sd, 0.0);
        assert_eq!(report.purity.to_bits(), report.purity_cells[&0].to_bits());
        purities.push(report.purity.to_bits());
        hashes.push(report.analysis_hash);
    }
    assert!(purities.windows(2).all(|pair| pair[0] == pair[1]));
    assert!(hashes.windows(2).all(|pair| pair[0] == pair[1]));
}

#[test]
fn single_outcome_cells_give_negative_entropy() {
    let cells = vec![counts(&[("0110", 64)]); 3];
    let report = Estimator::default()
        .entangled_entropy(64, &cells, PartitionSpec::Full, None)
        .expect("entropy");
    assert_eq!(report.purity, 16.0);
    assert_eq!(report.entropy, -4.0);
    assert_eq!(report.subsystem.size(), 4);
}

#[test]
fn shots_must_match_every_cell() {
    let err = Estimator::default()
        .entangled_entropy(100, &mixed_cells(), PartitionSpec::Degree(2), None)
        .unwrap_err();
    assert!(matches!(err, RmError::Shots(_)));
    assert_eq!(err.code(), "shots-mismatch");
    assert_eq!(err.info().context.get("cell").map(String::as_str), Some("0"));
}

#[test]
fn invalid_partitions_fail_before_any_cell() {
    let estimator = Estimator::default();
    let err = estimator.entangled_entropy(64, &mixed_cells(), PartitionSpec::Degree(5), None).unwrap_err();
    assert!(matches!(err, RmError::Partition(_)));
    let err = estimator
        .entangled_entropy(64, &mixed_cells(), PartitionSpec::Range(0, 9), None)
        .unwrap_err();
    assert_eq!(err.code(), "partition-out-of-range");

    let wide = vec![counts(&[("01101001", 40), ("11110000", 24)]); 2];
    let err = estimator
        .entangled_entropy(64, &wide, PartitionSpec::Range(-8, 8), None)
        .unwrap_err();
    assert!(matches!(err, RmError::Partition(_)));
    assert_eq!(err.code(), "partition-out-of-range");

    let measured = Estimator::new(ProcessOpts::default().with_measure(0, 7));
    let err = measured.entangled_entropy(64, &mixed_cells(), PartitionSpec::Degree(2), None).unwrap_err();
    assert_eq!(err.info().context.get("target").map(String::as_str), Some("measure"));
}

#[test]
fn pinned_backend_must_be_available() {
    let registry = CapabilityRegistry::from_tiers([(Backend::Reference, Availability::Supported)]);
    let err = Estimator::with_registry(&registry, pinned(Backend::Native))
        .entangled_entropy(64, &mixed_cells(), PartitionSpec::Degree(2), None)
        .unwrap_err();
    assert!(matches!(err, RmError::Backend(_)));
    assert_eq!(err.code(), "backend-unavailable");

    let report = Estimator::with_registry(&registry, ProcessOpts::default())
        .entangled_entropy(64, &mixed_cells(), PartitionSpec::Degree(2), None)
        .expect("fallback");
    assert_eq!(report.backend, Backend::Reference);
}

#[test]
fn worker_count_does_not_change_results() {
    let base = ProcessOpts::default().with_backend(BackendSelection::Pinned(Backend::Reference));
    let serial = Estimator::new(base.clone().with_workers(1))
        .entangled_entropy(64, &mixed_cells(), PartitionSpec::Degree(3), None)
        .expect("serial");
    let zero = Estimator::new(base.clone().with_workers(0))
        .entangled_entropy(64, &mixed_cells(), PartitionSpec::Degree(3), None)
        .expect("zero workers");
    let wide = Estimator::new(base.with_workers(4096))
        .entangled_entropy(64, &mixed_cells(), PartitionSpec::Degree(3), None)
        .expect("capped workers");
    assert_eq!(serial.purity_cells, zero.purity_cells);
    assert_eq!(serial.purity_cells, wide.purity_cells);
}

#[test]
fn register_selection_matches_equivalent_range() {
    let estimator = Estimator::default();
    let cells = mixed_cells();

    let trailing = estimator.entangled_entropy(64, &cells, PartitionSpec::Degree(2), None).expect("degree");
    let registers = estimator
        .entangled_entropy_registers(64, &cells, &[1, 0], None)
        .expect("registers");
    assert!((trailing.purity - registers.purity).abs() < 1e-12);
    assert_ne!(trailing.analysis_hash, registers.analysis_hash);
    assert_eq!(
        registers.subsystem,
        Subsystem::Registers {
            selected: vec![0, 1],
            width: 4
        }
    );

    let wrapped = estimator.entangled_entropy(64, &cells, PartitionSpec::Range(-1, 1), None).expect("wrap");
    let ends = estimator
        .entangled_entropy_registers(64, &cells, &[0, 3], None)
        .expect("end registers");
    assert!((wrapped.purity - ends.purity).abs() < 1e-12);

    let err = estimator
        .entangled_entropy_registers(64, &cells, &[0, 4], None)
        .unwrap_err();
    assert!(matches!(err, RmError::Partition(_)));
}

#[test]
fn measure_range_restricts_the_register() {
    let cells = mixed_cells();
    let measured = Estimator::new(ProcessOpts::default().with_measure(0, 3))
        .entangled_entropy(64, &cells, PartitionSpec::Full, None)
        .expect("measured");
    let registers = Estimator::default()
        .entangled_entropy_registers(64, &cells, &[1, 2, 3], None)
        .expect("registers");
    assert_eq!(measured.subsystem.size(), 3);
    assert!((measured.purity - registers.purity).abs() < 1e-12);
}

#[test]
fn overlap_with_itself_equals_purity() {
    let estimator = Estimator::new(pinned(Backend::Reference));
    let cells = mixed_cells();
    let purity = estimator.entangled_entropy(64, &cells, PartitionSpec::Degree(3), None).expect("purity");
    let overlap = estimator
        .wavefunction_overlap(64, &cells, &cells, PartitionSpec::Degree(3), None)
        .expect("overlap");
    assert_eq!(overlap.echo_cells, purity.purity_cells);
    assert_eq!(overlap.counts_num, cells.len());

    let mut doubled = cells.clone();
    doubled.extend(cells.iter().cloned());
    let halves = estimator
        .wavefunction_overlap_halves(64, &doubled, PartitionSpec::Degree(3), None)
        .expect("halves");
    assert_eq!(halves.echo_cells, overlap.echo_cells);

    let err = estimator
        .wavefunction_overlap_halves(64, &cells[..3], PartitionSpec::Degree(3), None)
        .unwrap_err();
    assert_eq!(err.code(), "cells-odd");
    let err = estimator
        .wavefunction_overlap(64, &cells, &cells[..2], PartitionSpec::Degree(3), None)
        .unwrap_err();
    assert_eq!(err.code(), "cells-unpaired");
}

#[test]
fn progress_is_reported_once_per_cell() {
    let calls = AtomicUsize::new(0);
    let sink = |description: &str| {
        assert!(description.contains("by"));
        calls.fetch_add(1, Ordering::SeqCst);
    };
    let cells = mixed_cells();
    Estimator::new(ProcessOpts::default().with_workers(2))
        .entangled_entropy(64, &cells, PartitionSpec::Degree(2), Some(&sink))
        .expect("entropy");
    assert_eq!(calls.load(Ordering::SeqCst), cells.len());
}

#[test]
fn reports_survive_json() {
    let report = Estimator::default()
        .entangled_entropy(64, &mixed_cells(), PartitionSpec::Range(1, 3), None)
        .expect("entropy");
    assert_eq!(report.analysis_hash.len(), 64);
    let bytes = serde_json::to_vec(&report).expect("encode");
    let back: EntropyReport = serde_json::from_slice(&bytes).expect("decode");
    assert_eq!(back, report);
}
