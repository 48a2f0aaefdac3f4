//! Discretization invariance: the same protocol advanced in coarse or fine
//! steps must land on the same biology.

use vitro_bench::Bench;
use vitro_core::{CompoundId, SimConfig, VesselId, VesselSnapshot};

fn quiet_config() -> SimConfig {
    let mut config = SimConfig::default();
    config.growth_jitter_sd = 0.0;
    config.contamination_risk = 0.0;
    config
}

/// Seeds, doses, then advances 48 hours in the given steps.
fn run(steps: &[f64]) -> VesselSnapshot {
    let total: f64 = steps.iter().sum();
    assert!((total - 48.0).abs() < 1e-9, "steps must cover 48 h");

    let mut bench = Bench::new(quiet_config(), 23);
    let id = VesselId::new("B2");
    let _ = bench
        .seed_vessel(id.clone(), "a549", 1.0e6, 1.0e7, 1.0)
        .expect("seed");
    let _ = bench
        .treat_with_compound(&id, &CompoundId::new("staurosporine"), 0.5, 1.0, 0.5)
        .expect("treat");
    for &dt in steps {
        bench.advance_time(dt).expect("advance");
    }
    bench.vessel_state(&id).expect("state")
}

fn relative_gap(left: f64, right: f64) -> f64 {
    (left - right).abs() / right.abs().max(1e-12)
}

#[test]
fn hourly_steps_match_one_coarse_advance() {
    let coarse = run(&[48.0]);
    let fine = run(&[1.0; 48]);

    assert!(
        relative_gap(fine.viability, coarse.viability) < 0.03,
        "viability {} vs {}",
        fine.viability,
        coarse.viability
    );
    assert!(
        relative_gap(fine.population, coarse.population) < 0.03,
        "population {} vs {}",
        fine.population,
        coarse.population
    );
    assert!(
        relative_gap(
            fine.ledger.fraction(vitro_core::LedgerField::Compound),
            coarse.ledger.fraction(vitro_core::LedgerField::Compound),
        ) < 0.03
    );
}

#[test]
fn refinement_converges() {
    let fine = run(&[1.0; 48]);
    let medium = run(&[6.0; 8]);
    let coarse = run(&[24.0, 24.0]);

    let medium_gap = relative_gap(medium.viability, fine.viability);
    let coarse_gap = relative_gap(coarse.viability, fine.viability);
    assert!(medium_gap < 0.02, "6 h steps off by {medium_gap}");
    assert!(coarse_gap < 0.03, "24 h steps off by {coarse_gap}");
}

#[test]
fn every_discretization_conserves_the_ledger() {
    for steps in [&[48.0][..], &[12.0; 4][..], &[1.0; 48][..]] {
        let state = run(steps);
        let gap = (state.ledger.total() - (1.0 - state.viability)).abs();
        assert!(gap < 1e-9, "{} steps drifted by {gap}", steps.len());
    }
}
