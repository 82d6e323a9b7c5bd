use std::collections::BTreeMap;
use nalgebra::Normed;

use rmx_kernel::availability::Availability;
use rmx_process::status::render_status;
use rmx_process::{
    Backend, BackendSelection, CapabilityRegistry, ClassicalShadowReport, Estimator, OutcomeCounts, PartitionSpec,
    ProcessOpts, RmError, ShadowBasis,
};

fn counts(pairs: &[(&str, u64)]) -> OutcomeCounts {
    pairs.iter().map(|(k, v)| (*k, *v)).collect()
}

/// Three cells per basis of a single qubit prepared in `|0>`.
fn ground_state_shadow() -> (Vec<OutcomeCounts>, Vec<BTreeMap<usize, ShadowBasis>>) {
    let mut cells = Vec::new();
    let mut directions = Vec::new();
    for basis in [ShadowBasis::Z, ShadowBasis::X, ShadowBasis::Y] {
        for _ in 0..3 {
            cells.push(match basis {
                ShadowBasis::Z => counts(&[("0", 100)]),
                _ => counts(&[("0", 50), ("1", 50)]),
            });
            directions.push(BTreeMap::from([(0, basis)]));
        }
    }
    (cells, directions)
}

#[test]
fn ground_state_shadow_recovers_the_projector() {
    let (cells, directions) = ground_state_shadow();
    let report = Estimator::default()
        .classical_shadow_registers(100, &cells, &directions, &[0], None)
        .expect("shadow");
    assert_eq!(report.backend, Backend::Reference);
    assert_eq!(report.counts_num, 9);
    assert_eq!(report.selected_registers, vec![0]);
    assert_eq!(report.expect_rho.shape(), (2, 2));
    assert!((report.expect_rho[(0, 0)].re - 1.0).abs() < 1e-12);
    assert!(report.expect_rho[(1, 1)].norm() < 1e-12);
    assert!(report.expect_rho[(0, 1)].norm() < 1e-12);
    // Same-basis Z pairs contribute 5, every other distinct pair 1/2: 63 / 72.
    assert!((report.purity - 0.875).abs() < 1e-12);

    let bytes = serde_json::to_vec(&report).expect("encode");
    let back: ClassicalShadowReport = serde_json::from_slice(&bytes).expect("decode");
    assert_eq!(back.analysis_hash, report.analysis_hash);
    assert_eq!(back.selected_registers, report.selected_registers);
}

#[test]
fn shadow_partition_and_register_selection_agree() {
    let cells = vec![
        counts(&[("011", 6), ("110", 2)]),
        counts(&[("000", 4), ("101", 4)]),
        counts(&[("111", 8)]),
    ];
    let directions: Vec<BTreeMap<usize, ShadowBasis>> = [
        [ShadowBasis::Z, ShadowBasis::X, ShadowBasis::Y],
        [ShadowBasis::Y, ShadowBasis::Z, ShadowBasis::Z],
        [ShadowBasis::X, ShadowBasis::Y, ShadowBasis::X],
    ]
    .into_iter()
    .map(|bases| bases.into_iter().enumerate().collect())
    .collect();
    let estimator = Estimator::default();
    let by_range = estimator
        .classical_shadow(8, &cells, &directions, PartitionSpec::Degree(2), None)
        .expect("range");
    let by_registers = estimator
        .classical_shadow_registers(8, &cells, &directions, &[0, 1], None)
        .expect("registers");
    assert_eq!(by_range.selected_registers, vec![1, 0]);
    assert_eq!(by_range.selected_registers, by_registers.selected_registers);
    assert_eq!(by_range.expect_rho.shape(), (4, 4));
    assert!((by_range.purity - by_registers.purity).abs() < 1e-12);
    assert_eq!(by_range.rho_m_i_cells, by_registers.rho_m_i_cells);
}

#[test]
fn shadow_inputs_are_checked() {
    let (cells, mut directions) = ground_state_shadow();
    let estimator = Estimator::default();
    let err = estimator
        .classical_shadow_registers(100, &cells, &directions[..4], &[0], None)
        .unwrap_err();
    assert_eq!(err.code(), "shadow-directions-unpaired");

    directions[5].clear();
    let err = estimator
        .classical_shadow_registers(100, &cells, &directions, &[0], None)
        .unwrap_err();
    assert_eq!(err.code(), "shadow-direction-missing");
    assert_eq!(err.info().context.get("cell").map(String::as_str), Some("5"));

    let err = estimator
        .classical_shadow_registers(100, &cells[..1], &directions[..1], &[0], None)
        .unwrap_err();
    assert_eq!(err.code(), "shadow-too-few-cells");
}

#[test]
fn magnet_square_of_aligned_and_opposed_spins() {
    let estimator = Estimator::default();
    let aligned = vec![counts(&[("00", 30), ("11", 34)]); 6];
    let report = estimator.magnet_square(64, &aligned, 3, None).expect("aligned");
    assert_eq!(report.magnet_square, 1.0);
    assert_eq!(report.counts_num, 6);
    assert_eq!(report.magnet_square_cells[&5], 1.0);
    assert_eq!(report.backend, Backend::Reference);

    let opposed = vec![counts(&[("01", 32), ("10", 32)]); 2];
    let report = estimator.magnet_square(64, &opposed, 2, None).expect("opposed");
    assert_eq!(report.magnet_square, 0.0);
}

#[test]
fn magnet_square_rejects_bad_cells() {
    let estimator = Estimator::default();
    let err = estimator
        .magnet_square(8, &[counts(&[("000", 8)])], 2, None)
        .unwrap_err();
    assert!(matches!(err, RmError::Counts(_)));
    assert_eq!(err.code(), "magnet-square-width");

    let err = estimator.magnet_square(8, &[counts(&[("00", 8)])], 0, None).unwrap_err();
    assert!(matches!(err, RmError::Config(_)));

    let err = estimator
        .magnet_square(8, &[counts(&[("00", 8)]), counts(&[("11", 7)])], 2, None)
        .unwrap_err();
    assert_eq!(err.code(), "shots-mismatch");
    assert_eq!(err.info().context.get("cell").map(String::as_str), Some("1"));
}

#[test]
fn pinned_native_cannot_run_reference_only_families() {
    let registry = CapabilityRegistry::from_tiers([
        (Backend::Reference, Availability::Supported),
        (Backend::Native, Availability::Supported),
    ]);
    let pinned = ProcessOpts::default().with_backend(BackendSelection::Pinned(Backend::Native));
    let err = Estimator::with_registry(&registry, pinned)
        .magnet_square(8, &[counts(&[("00", 8)]), counts(&[("11", 8)])], 2, None)
        .unwrap_err();
    assert_eq!(err.code(), "backend-unavailable");

    let table = render_status(&registry);
    assert!(table.contains("magsq_cell"));
    assert!(table.contains("rho_m_cell"));
}
