use rmx_core::OutcomeCounts;
use rmx_kernel::cell::cycling_slice;
use rmx_kernel::dummy::make_dummy_case;
use rmx_process::status::render_status;
use rmx_process::{
    entangled_entropy, wavefunction_overlap, Backend, CapabilityRegistry, Estimator, PartitionSpec, ProcessOpts,
    TracingProgress,
};

const CELLS_JSON: &str = r#"[
    {"000000": 30, "000111": 18, "111000": 10, "101010": 6},
    {"110011": 20, "001100": 20, "011110": 24},
    {"100001": 32, "011110": 32}
]"#;

fn load_cells() -> Vec<OutcomeCounts> {
    let values: Vec<serde_json::Value> = serde_json::from_str(CELLS_JSON).expect("cells json");
    values
        .iter()
        .map(|value| OutcomeCounts::from_json_slice(value.to_string().as_bytes()).expect("counts"))
        .collect()
}

#[test]
fn yaml_options_drive_a_full_analysis() {
    let opts = ProcessOpts::from_yaml_str("backend:\n  preferred: native\nworkers: 2\nmeasure: [0, 6]\n")
        .expect("opts");
    let cells = load_cells();
    let estimator = Estimator::new(opts);
    let report = estimator
        .entangled_entropy(64, &cells, PartitionSpec::Degree(3), Some(&TracingProgress))
        .expect("entropy");
    assert_eq!(report.counts_num, 3);
    assert_eq!(report.subsystem.size(), 3);

    let plain = entangled_entropy(64, &cells, PartitionSpec::Degree(3)).expect("plain entropy");
    assert_eq!(plain.purity_cells, report.purity_cells);

    let overlap = wavefunction_overlap(64, &cells, &cells, PartitionSpec::Degree(3)).expect("overlap");
    assert_eq!(overlap.echo_cells.len(), 3);

    let json = serde_json::to_string(&report).expect("report json");
    assert!(json.contains("\"purity_cells\""));
    assert!(json.contains("\"kind\":\"range\""));
}

#[test]
fn compiled_backends_agree_on_slices_and_purities() {
    let cells: Vec<OutcomeCounts> = (0..8)
        .map(|seed| make_dummy_case(10, 4, Some(32), seed).expect("dummy"))
        .collect();
    let mut reference = None;
    for backend in Backend::ALL.into_iter().filter(Backend::is_compiled) {
        assert_eq!(cycling_slice(backend, "0110100", -3, 2, 1).expect("slice"), "10001");
        let opts = ProcessOpts::default().with_backend(rmx_process::BackendSelection::Pinned(backend));
        let report = Estimator::new(opts)
            .entangled_entropy(128, &cells, PartitionSpec::Range(7, 2), None)
            .expect("wrapped entropy");
        let bits: Vec<u64> = report.purity_cells.values().map(|p| p.to_bits()).collect();
        match &reference {
            None => reference = Some(bits),
            Some(expected) => assert_eq!(&bits, expected, "{backend} diverged"),
        }
    }
}

#[test]
fn status_table_covers_the_process_registry() {
    let table = render_status(CapabilityRegistry::global());
    assert!(table.contains("randomized_measure"));
    assert!(table.contains("wavefunction_overlap"));
    let header = table.lines().next().expect("header");
    for backend in Backend::ALL {
        assert!(header.contains(backend.as_str()));
    }
}
