//! Scripted bench scenarios exercising instant effects, ongoing attrition,
//! conservation, and washout causality end to end.

use vitro_bench::{query, Bench};
use vitro_core::{CompoundId, DeathMode, LedgerField, SimConfig, VesselId};

/// Config with the operational noise sources disabled so assertions can be
/// exact; biological draws still come from the run seed.
fn quiet_config() -> SimConfig {
    let mut config = SimConfig::default();
    config.growth_jitter_sd = 0.0;
    config.contamination_risk = 0.0;
    config
}

/// Quiet config with deterministic commitment delays.
fn fixed_delay_config() -> SimConfig {
    let mut config = quiet_config();
    for compound in config.compounds.values_mut() {
        compound.commitment_delay_sigma = 0.0;
    }
    config
}

fn staurosporine() -> CompoundId {
    CompoundId::new("staurosporine")
}

#[test]
fn dose_at_ic50_halves_viability_and_books_it_to_compound() {
    let mut bench = Bench::new(quiet_config(), 17);
    let id = VesselId::new("B2");
    let _ = bench
        .seed_vessel(id.clone(), "a549", 1.0e6, 1.0e7, 1.0)
        .expect("seed");

    // IC50 of staurosporine in the default library.
    let report = bench
        .treat_with_compound(&id, &staurosporine(), 0.05, 1.0, 1.0)
        .expect("treat");
    assert!((report.viability_effect - 0.5).abs() < 1e-12);

    let state = bench.vessel_state(&id).expect("state");
    assert!((state.viability - 0.5).abs() < 1e-12);
    assert!((state.ledger.fraction(LedgerField::Compound) - 0.5).abs() < 1e-12);
    assert!((state.ledger.total() - (1.0 - state.viability)).abs() < 1e-12);
    assert_eq!(state.death_mode, DeathMode::Single(LedgerField::Compound));
}

#[test]
fn ongoing_attrition_keeps_the_ledger_conserved_every_step() {
    let mut bench = Bench::new(quiet_config(), 17);
    let id = VesselId::new("B2");
    let _ = bench
        .seed_vessel(id.clone(), "a549", 1.0e6, 1.0e7, 1.0)
        .expect("seed");
    let _ = bench
        .treat_with_compound(&id, &staurosporine(), 0.05, 1.0, 1.0)
        .expect("treat");

    for _ in 0..8 {
        bench.advance_time(6.0).expect("advance");
        let state = bench.vessel_state(&id).expect("state");
        let gap = (state.ledger.total() - (1.0 - state.viability)).abs();
        assert!(gap < 1e-9, "conservation drifted by {gap}");
    }

    let state = bench.vessel_state(&id).expect("state");
    assert!(
        state.viability < 0.3,
        "committed attrition should keep killing, viability {}",
        state.viability
    );
    assert!(state.ledger.fraction(LedgerField::Compound) > 0.6);
    assert_eq!(state.death_mode, DeathMode::Single(LedgerField::Compound));
}

#[test]
fn seeding_viability_below_one_is_a_known_unknown() {
    let mut bench = Bench::new(quiet_config(), 17);
    let id = VesselId::new("B2");
    let _ = bench
        .seed_vessel(id.clone(), "a549", 1.0e6, 1.0e7, 0.95)
        .expect("seed");
    bench.advance_time(0.0).expect("flush only");

    let state = bench.vessel_state(&id).expect("state");
    assert!((state.viability - 0.95).abs() < 1e-12);
    assert!((state.ledger.fraction(LedgerField::KnownUnknown) - 0.05).abs() < 1e-12);
    assert_eq!(state.death_mode, DeathMode::Unknown);
}

#[test]
fn the_dead_fraction_never_decreases() {
    let mut bench = Bench::new(quiet_config(), 29);
    let id = VesselId::new("C4");
    let _ = bench
        .seed_vessel(id.clone(), "hela", 5.0e5, 1.0e7, 0.98)
        .expect("seed");
    let _ = bench
        .treat_with_compound(&id, &CompoundId::new("tunicamycin"), 2.4, 1.0, 1.0)
        .expect("treat");

    let mut dead = 0.0;
    for step in 0..24 {
        bench.advance_time(4.0).expect("advance");
        if step == 12 {
            let _ = bench.feed_vessel(&id, None, None).expect("feed");
        }
        let state = bench.vessel_state(&id).expect("state");
        let now_dead = 1.0 - state.viability;
        assert!(
            now_dead >= dead - 1e-12,
            "dead fraction regressed from {dead} to {now_dead} at step {step}"
        );
        dead = now_dead;
    }
    assert!(dead > 0.0);
}

#[test]
fn washout_zeroes_the_medium_but_the_hazard_decays_on_clearance() {
    let mut bench = Bench::new(fixed_delay_config(), 41);
    let id = VesselId::new("B2");
    let _ = bench
        .seed_vessel(id.clone(), "a549", 1.0e6, 1.0e7, 1.0)
        .expect("seed");
    let _ = bench
        .treat_with_compound(&id, &staurosporine(), 0.5, 1.0, 0.2)
        .expect("treat");

    // Committed at exactly 8 h with the fixed delay; washout at 12 h.
    bench.advance_time(12.0).expect("advance to washout");
    let at_washout = bench.vessel_state(&id).expect("state").viability;
    let report = bench.washout_compound(&id, Some(&staurosporine())).expect("washout");
    assert_eq!(report.removed_compounds, vec![staurosporine()]);
    assert_eq!(
        query::concentration_um(&bench, &id, &staurosporine()).expect("record"),
        0.0,
        "the spine concentration drops immediately"
    );

    // The residual burden keeps killing on the clearance scale.
    bench.advance_time(6.0).expect("advance past washout");
    let shortly_after = bench.vessel_state(&id).expect("state").viability;
    assert!(
        at_washout - shortly_after > 0.01,
        "committed death must continue after washout, drop {}",
        at_washout - shortly_after
    );

    // Long after washout the burden has cleared and the killing stops.
    bench.advance_time(60.0).expect("advance to clearance");
    let settled = bench.vessel_state(&id).expect("state").viability;
    bench.advance_time(6.0).expect("final window");
    let late = bench.vessel_state(&id).expect("state").viability;
    assert!(
        settled - late < 1e-3,
        "hazard should decay to nothing, late drop {}",
        settled - late
    );
}

#[test]
fn washout_before_the_commitment_delay_cancels_future_killing() {
    let mut bench = Bench::new(fixed_delay_config(), 41);
    let id = VesselId::new("B2");
    let _ = bench
        .seed_vessel(id.clone(), "a549", 1.0e6, 1.0e7, 1.0)
        .expect("seed");
    let _ = bench
        .treat_with_compound(&id, &staurosporine(), 0.1, 1.0, 1.0)
        .expect("treat");

    // Washout at 4 h, before the 8 h commitment delay.
    bench.advance_time(4.0).expect("advance");
    let _ = bench.washout_compound(&id, None).expect("washout");
    let after_washout = bench.vessel_state(&id).expect("state").viability;

    bench.advance_time(36.0).expect("long tail");
    let late = bench.vessel_state(&id).expect("state").viability;
    assert_eq!(
        late.to_bits(),
        after_washout.to_bits(),
        "an uncommitted exposure must never kill after washout"
    );
}

#[test]
fn passaging_reseeds_the_survivors_into_fresh_medium() {
    let mut bench = Bench::new(quiet_config(), 11);
    let id = VesselId::new("B2");
    let _ = bench
        .seed_vessel(id.clone(), "a549", 2.0e6, 1.0e7, 1.0)
        .expect("seed");
    let _ = bench
        .treat_with_compound(&id, &staurosporine(), 0.05, 1.0, 1.0)
        .expect("treat");
    bench.advance_time(24.0).expect("advance");

    let before = bench.vessel_state(&id).expect("state");
    let report = bench.passage_vessel(&id, 4.0).expect("passage");
    assert!(!report.vessel_consumed);
    assert_eq!(report.passage, 1);
    let expected = before.population * before.viability / 4.0;
    assert!((report.surviving_population - expected).abs() < 1e-6);

    let after = bench.vessel_state(&id).expect("state");
    assert_eq!(after.viability, 1.0);
    assert_eq!(after.ledger.total(), 0.0);
    assert!(after.exposures.is_empty());
    assert_eq!(
        query::concentration_um(&bench, &id, &staurosporine()).expect("record"),
        0.0,
        "fresh medium carries no compound"
    );

    // The lag clock restarted with the passage.
    bench.advance_time(2.0).expect("post-passage growth");
    let regrown = bench.vessel_state(&id).expect("state");
    assert!(regrown.population >= after.population);
}

#[test]
fn a_split_leaving_less_than_one_cell_consumes_the_vessel() {
    let mut bench = Bench::new(quiet_config(), 11);
    let id = VesselId::new("B2");
    let _ = bench
        .seed_vessel(id.clone(), "a549", 2.0, 1.0e7, 1.0)
        .expect("seed");
    assert!(matches!(
        bench.passage_vessel(&id, 0.5),
        Err(vitro_core::SimError::InvalidOperation(_))
    ));
    let report = bench.passage_vessel(&id, 8.0).expect("lethal split");
    assert!(report.vessel_consumed);
    assert_eq!(report.surviving_population, 0.0);
    assert!(bench.vessel_state(&id).is_err());
}

#[test]
fn persisters_outlive_the_bulk_under_a_saturating_dose() {
    let mut bench = Bench::new(quiet_config(), 53);
    let id = VesselId::new("D6");
    let _ = bench
        .seed_vessel(id.clone(), "hct116-persister", 1.0e6, 1.0e7, 1.0)
        .expect("seed");
    let _ = bench
        .treat_with_compound(&id, &staurosporine(), 0.5, 1.0, 1.0)
        .expect("treat");
    bench.advance_time(48.0).expect("advance");

    let state = bench.vessel_state(&id).expect("state");
    let bulk = state
        .cohorts
        .iter()
        .find(|cohort| cohort.name == "bulk")
        .expect("bulk cohort");
    let persister = state
        .cohorts
        .iter()
        .find(|cohort| cohort.name == "persister")
        .expect("persister cohort");
    assert!(
        persister.viability > 2.0 * bulk.viability,
        "persister {} vs bulk {}",
        persister.viability,
        bulk.viability
    );
    assert!((state.ledger.total() - (1.0 - state.viability)).abs() < 1e-9);
}
