//! Measuring a culture must never change it: assay noise draws from its own
//! stream, so runs with and without measurements stay bitwise identical.

use vitro_bench::Bench;
use vitro_core::{CompoundId, ReadoutKind, SimConfig, VesselId, VesselSnapshot};

fn config() -> SimConfig {
    let mut config = SimConfig::default();
    config.contamination_risk = 0.0;
    config
}

fn run(measure_heavily: bool) -> VesselSnapshot {
    let mut bench = Bench::new(config(), 19);
    let id = VesselId::new("E7");
    let _ = bench
        .seed_vessel(id.clone(), "hela", 8.0e5, 1.0e7, 1.0)
        .expect("seed");
    let _ = bench
        .treat_with_compound(&id, &CompoundId::new("oligomycin"), 1.6, 1.0, 1.0)
        .expect("treat");
    bench.advance_time(24.0).expect("first day");
    if measure_heavily {
        for _ in 0..10 {
            let _ = bench.measure_viability(&id).expect("viability");
            let _ = bench.measure_cell_count(&id).expect("count");
            let _ = bench.measure_confluence(&id).expect("confluence");
        }
    }
    bench.advance_time(24.0).expect("second day");
    bench.vessel_state(&id).expect("state")
}

#[test]
fn measurement_never_perturbs_the_biology() {
    let observed = run(true);
    let unobserved = run(false);
    assert_eq!(observed.viability.to_bits(), unobserved.viability.to_bits());
    assert_eq!(
        observed.population.to_bits(),
        unobserved.population.to_bits()
    );
    assert_eq!(
        observed.ledger.total().to_bits(),
        unobserved.ledger.total().to_bits()
    );
    assert_eq!(
        observed.stress.mito.to_bits(),
        unobserved.stress.mito.to_bits()
    );
}

#[test]
fn readouts_are_noisy_views_of_the_truth() {
    let mut bench = Bench::new(config(), 19);
    let id = VesselId::new("E7");
    let _ = bench
        .seed_vessel(id.clone(), "hela", 8.0e5, 1.0e7, 0.9)
        .expect("seed");

    let truth = bench.vessel_state(&id).expect("state");
    let viability = bench.measure_viability(&id).expect("viability");
    assert_eq!(viability.kind, ReadoutKind::Viability);
    assert!((0.0..=1.0).contains(&viability.value));
    assert!(
        (viability.value - truth.viability).abs() < 0.5,
        "noise should stay near the truth"
    );

    let count = bench.measure_cell_count(&id).expect("count");
    assert_eq!(count.kind, ReadoutKind::CellCount);
    assert!(count.value > 0.0);

    // Repeated measurements differ; the snapshot does not.
    let again = bench.measure_viability(&id).expect("viability");
    assert_ne!(viability.value.to_bits(), again.value.to_bits());
    let truth_again = bench.vessel_state(&id).expect("state");
    assert_eq!(truth.viability.to_bits(), truth_again.viability.to_bits());
}
