//! Death accounting: combine proposed hazards, commit survival, keep the
//! ledger conserved.
//!
//! Competing risks share one interval: the cohort's survival is
//! `exp(-sum(h) * dt)` and the realized kill is allocated to each cause in
//! proportion to its hazard share. The conservation law
//! `ledger_sum <= 1 - viability + epsilon` is asserted after every commit
//! and every instant kill; a violation aborts the operation as a fatal
//! error, and nothing is ever clamped or renormalized to hide one.

use vitro_core::{InvalidOperationKind, LedgerField, SimError};
use vitro_system_death::NamedHazard;
use vitro_system_subpopulation::blended_viability;

use crate::vessel::{HazardPhase, Vessel};

/// Commits one interval of proposed hazards, one proposal list per cohort.
pub(crate) fn commit_interval(
    vessel: &mut Vessel,
    proposals: &[Vec<NamedHazard>],
    dt_h: f64,
    epsilon: f64,
) -> Result<(), SimError> {
    vessel.phase = HazardPhase::Proposing;
    for cohort_proposals in proposals {
        for hazard in cohort_proposals {
            let rate = hazard.rate_per_h();
            if !rate.is_finite() || rate < 0.0 {
                vessel.phase = HazardPhase::Idle;
                return Err(SimError::invalid(InvalidOperationKind::NegativeHazard {
                    rate_per_h: rate,
                }));
            }
        }
    }

    vessel.phase = HazardPhase::Committing;
    let viability_before = blended_viability(&vessel.cohorts);
    let mut realized: Vec<(LedgerField, f64)> = Vec::new();
    for (cohort, cohort_proposals) in vessel.cohorts.iter_mut().zip(proposals) {
        let total: f64 = cohort_proposals.iter().map(NamedHazard::rate_per_h).sum();
        cohort.record_hazard(total);
        let survival = if total > 0.0 { (-total * dt_h).exp() } else { 1.0 };
        let kill = cohort.fraction() * cohort.viability() * (1.0 - survival);
        if total > 0.0 && kill > 0.0 {
            for hazard in cohort_proposals {
                realized.push((hazard.field(), kill * hazard.rate_per_h() / total));
            }
        }
        cohort.apply_survival(survival);
    }

    let viability_after = blended_viability(&vessel.cohorts);
    if viability_before > 0.0 {
        vessel.population *= viability_after / viability_before;
    }
    vessel.viability = viability_after;
    for (field, amount) in realized {
        vessel.ledger.credit(field, amount)?;
    }
    // The allocated kills equal the viability drop up to rounding; the
    // residual keeps ledger_sum == 1 - viability exact.
    let residual = (1.0 - viability_after) - vessel.ledger.total();
    if residual > 0.0 {
        vessel.ledger.credit(LedgerField::Unattributed, residual)?;
    }
    vessel
        .ledger
        .assert_conserved(&vessel.id, viability_after, epsilon)?;
    vessel.phase = HazardPhase::Idle;
    Ok(())
}

/// Applies one immediate kill fraction per cohort and credits the realized
/// drop in blended viability to one ledger field. Returns that drop.
pub(crate) fn instant_kill(
    vessel: &mut Vessel,
    fractions: &[f64],
    field: LedgerField,
    epsilon: f64,
) -> Result<f64, SimError> {
    if vessel.phase != HazardPhase::Idle {
        return Err(SimError::invalid(
            InvalidOperationKind::InstantKillDuringAccounting,
        ));
    }
    for &fraction in fractions {
        if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
            return Err(SimError::invalid(
                InvalidOperationKind::FractionOutOfRange { value: fraction },
            ));
        }
    }

    let viability_before = blended_viability(&vessel.cohorts);
    for (cohort, &fraction) in vessel.cohorts.iter_mut().zip(fractions) {
        cohort.apply_survival(1.0 - fraction);
    }
    let viability_after = blended_viability(&vessel.cohorts);
    let killed = viability_before - viability_after;

    if viability_before > 0.0 {
        vessel.population *= viability_after / viability_before;
    }
    vessel.viability = viability_after;
    vessel.ledger.credit(field, killed)?;
    vessel
        .ledger
        .assert_conserved(&vessel.id, viability_after, epsilon)?;
    Ok(killed)
}

#[cfg(test)]
mod tests {
    use super::{commit_interval, instant_kill};
    use crate::vessel::{HazardPhase, Vessel};
    use vitro_core::{CohortSpec, Hours, LedgerField, SimError, VesselId};
    use vitro_system_death::NamedHazard;
    use vitro_system_subpopulation::Cohort;

    fn vessel() -> Vessel {
        Vessel::new(
            VesselId::new("B2"),
            "a549".to_owned(),
            1.0e6,
            1.0e7,
            1.0,
            vec![Cohort::from_spec(&CohortSpec::bulk(), 1.0)],
            Hours::ZERO,
        )
    }

    #[test]
    fn competing_risks_split_the_kill_by_hazard_share() {
        let mut vessel = vessel();
        let proposals = vec![vec![
            NamedHazard::new(LedgerField::Compound, 0.03),
            NamedHazard::new(LedgerField::Starvation, 0.01),
        ]];
        commit_interval(&mut vessel, &proposals, 10.0, 1e-9).expect("commit");

        let survival = (-0.04_f64 * 10.0).exp();
        let dead = 1.0 - survival;
        assert!((vessel.viability - survival).abs() < 1e-12);
        assert!((vessel.ledger.fraction(LedgerField::Compound) - dead * 0.75).abs() < 1e-12);
        assert!((vessel.ledger.fraction(LedgerField::Starvation) - dead * 0.25).abs() < 1e-12);
    }

    #[test]
    fn commit_keeps_the_ledger_exactly_conserved() {
        let mut vessel = vessel();
        for _ in 0..50 {
            let proposals = vec![vec![NamedHazard::new(LedgerField::Compound, 0.05)]];
            commit_interval(&mut vessel, &proposals, 1.0, 1e-9).expect("commit");
            let gap = (vessel.ledger.total() - (1.0 - vessel.viability)).abs();
            assert!(gap < 1e-12, "ledger drifted by {gap}");
        }
    }

    #[test]
    fn population_shrinks_with_the_survival_factor() {
        let mut vessel = vessel();
        let proposals = vec![vec![NamedHazard::new(LedgerField::Compound, 0.1)]];
        commit_interval(&mut vessel, &proposals, 5.0, 1e-9).expect("commit");
        let survival = (-0.1_f64 * 5.0).exp();
        assert!((vessel.population - 1.0e6 * survival).abs() < 1.0);
    }

    #[test]
    fn negative_hazard_aborts_without_effect() {
        let mut vessel = vessel();
        let proposals = vec![vec![NamedHazard::new(LedgerField::Compound, -0.01)]];
        let error = commit_interval(&mut vessel, &proposals, 1.0, 1e-9).expect_err("reject");
        assert!(matches!(error, SimError::InvalidOperation(_)));
        assert_eq!(vessel.viability, 1.0);
        assert_eq!(vessel.ledger.total(), 0.0);
        assert_eq!(vessel.phase, HazardPhase::Idle);
    }

    #[test]
    fn instant_kill_is_rejected_mid_commit() {
        let mut vessel = vessel();
        vessel.phase = HazardPhase::Committing;
        let error =
            instant_kill(&mut vessel, &[0.5], LedgerField::Compound, 1e-9).expect_err("guard");
        assert!(matches!(error, SimError::InvalidOperation(_)));
        assert_eq!(vessel.viability, 1.0);
    }

    #[test]
    fn instant_kill_credits_the_realized_drop() {
        let mut vessel = vessel();
        let killed =
            instant_kill(&mut vessel, &[0.5], LedgerField::Compound, 1e-9).expect("kill half");
        assert!((killed - 0.5).abs() < 1e-12);
        assert!((vessel.viability - 0.5).abs() < 1e-12);
        assert!((vessel.ledger.fraction(LedgerField::Compound) - 0.5).abs() < 1e-12);
        assert!((vessel.population - 5.0e5).abs() < 1e-6);
    }

    #[test]
    fn instant_kill_blends_per_cohort_fractions() {
        let mut vessel = Vessel::new(
            VesselId::new("B2"),
            "hct116-persister".to_owned(),
            1.0e6,
            1.0e7,
            1.0,
            vec![
                Cohort::from_spec(
                    &CohortSpec {
                        name: "bulk".to_owned(),
                        fraction: 0.9,
                        ic50_shift: 1.0,
                        stress_threshold_shift: 1.0,
                    },
                    1.0,
                ),
                Cohort::from_spec(
                    &CohortSpec {
                        name: "persister".to_owned(),
                        fraction: 0.1,
                        ic50_shift: 6.0,
                        stress_threshold_shift: 1.4,
                    },
                    1.0,
                ),
            ],
            Hours::ZERO,
        );
        let killed =
            instant_kill(&mut vessel, &[0.8, 0.2], LedgerField::Compound, 1e-9).expect("kill");
        let expected = 0.9 * 0.8 + 0.1 * 0.2;
        assert!((killed - expected).abs() < 1e-12);
        assert!((vessel.viability - (1.0 - expected)).abs() < 1e-12);
        assert!((vessel.ledger.total() - expected).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_fraction_is_rejected() {
        let mut vessel = vessel();
        assert!(instant_kill(&mut vessel, &[1.5], LedgerField::Compound, 1e-9).is_err());
        assert!(instant_kill(&mut vessel, &[-0.1], LedgerField::Compound, 1e-9).is_err());
        assert!(instant_kill(&mut vessel, &[f64::NAN], LedgerField::Compound, 1e-9).is_err());
    }
}
