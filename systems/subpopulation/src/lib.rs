#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Subpopulation hazard layer.
//!
//! Cohorts carry their own viability, stress, and commitment state, plus
//! sensitivity shifts on the vessel-level hazard model. Hazards are always
//! computed per cohort with the shifted parameters, never copied from the
//! vessel, so cohorts diverge after dosing. Vessel-level viability and
//! stress are recovered only through explicit fraction-weighted
//! aggregation over the cohorts, never the reverse.

use std::collections::BTreeMap;

use vitro_core::{CohortSpec, CompoundId, StressLevels};
use vitro_system_death::ExposureTerm;

/// Timing and pharmacology of one exposure, before cohort shifts.
#[derive(Clone, Debug, PartialEq)]
pub struct ExposureContext {
    /// Compound the exposure applies.
    pub compound: CompoundId,
    /// Dose applied to the medium, in micromolar.
    pub dose_um: f64,
    /// Potency scalar from the treatment call.
    pub potency: f64,
    /// Hours since the exposure started, as of the interval start.
    pub exposed_for_h: f64,
    /// Hours the exposure ran before washout, if it was washed out.
    pub washed_out_after_h: Option<f64>,
    /// Unshifted IC50 of the compound, in micromolar.
    pub ic50_um: f64,
    /// Hill coefficient of the dose-response curve.
    pub hill_slope: f64,
    /// Attrition hazard at saturating burden, per hour.
    pub attrition_hazard_per_h: f64,
    /// Uptake time constant toward the applied dose, in hours.
    pub uptake_tau_h: f64,
    /// Half-life of the residual burden after washout, in hours.
    pub clearance_half_life_h: f64,
    /// Whether the compound kills through mitotic catastrophe.
    pub antimitotic: bool,
}

/// Per-cohort, per-exposure commitment state.
///
/// A cohort commits to an exposure once its sampled delay has elapsed
/// while the compound was still present. A washout before the delay
/// elapses suppresses the cohort's future hazard for that exposure: the
/// commitment clock never completes and only the decaying residual burden
/// remains.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Commitment {
    delay_h: f64,
}

impl Commitment {
    /// Creates a commitment with the sampled per-cohort delay.
    #[must_use]
    pub const fn new(delay_h: f64) -> Self {
        Self { delay_h }
    }

    /// The sampled delay, in hours.
    #[must_use]
    pub const fn delay_h(&self) -> f64 {
        self.delay_h
    }

    /// Whether the cohort is committed as of `elapsed_h` hours after the
    /// exposure started, given when (if ever) the compound was washed out.
    #[must_use]
    pub fn is_committed(&self, elapsed_h: f64, washed_out_after_h: Option<f64>) -> bool {
        if elapsed_h < self.delay_h {
            return false;
        }
        match washed_out_after_h {
            Some(washed_after) => washed_after >= self.delay_h,
            None => true,
        }
    }
}

/// Timing view of one exposure used to resolve residual burden.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BurdenInputs {
    /// Dose applied to the medium, in micromolar.
    pub dose_um: f64,
    /// Uptake time constant toward the applied dose, in hours.
    pub uptake_tau_h: f64,
    /// Half-life of the residual burden after washout, in hours.
    pub clearance_half_life_h: f64,
    /// Hours since the exposure started.
    pub exposed_for_h: f64,
    /// Hours the exposure ran before washout, if it was washed out.
    pub washed_out_after_h: Option<f64>,
}

/// Residual intracellular burden for one exposure.
///
/// While the compound is present the burden relaxes toward the applied
/// dose with the uptake time constant; after washout it decays
/// exponentially with the clearance half-life. Hazards derive from this
/// burden, not from the instantaneous spine concentration, which is what
/// makes washout causality hold: the spine concentration drops to zero
/// immediately while the hazard decays to zero on the clearance scale.
#[must_use]
pub fn residual_burden(inputs: &BurdenInputs) -> f64 {
    if inputs.exposed_for_h < 0.0 || inputs.dose_um <= 0.0 {
        return 0.0;
    }
    let uptake = |hours: f64| -> f64 {
        if inputs.uptake_tau_h <= 0.0 {
            inputs.dose_um
        } else {
            inputs.dose_um * (1.0 - (-hours / inputs.uptake_tau_h).exp())
        }
    };
    match inputs.washed_out_after_h {
        None => uptake(inputs.exposed_for_h),
        Some(washed_after) if inputs.exposed_for_h <= washed_after => {
            uptake(inputs.exposed_for_h)
        }
        Some(washed_after) => {
            let at_washout = uptake(washed_after);
            let decaying_for = inputs.exposed_for_h - washed_after;
            let half_life = inputs.clearance_half_life_h.max(f64::EPSILON);
            at_washout * (-std::f64::consts::LN_2 * decaying_for / half_life).exp()
        }
    }
}

/// One cohort of a vessel's subpopulation mixture.
#[derive(Clone, Debug, PartialEq)]
pub struct Cohort {
    name: String,
    fraction: f64,
    ic50_shift: f64,
    stress_threshold_shift: f64,
    viability: f64,
    stress: StressLevels,
    commitments: BTreeMap<CompoundId, Commitment>,
    last_hazard_per_h: f64,
}

impl Cohort {
    /// Creates a cohort from its specification with the provided starting
    /// viability.
    #[must_use]
    pub fn from_spec(spec: &CohortSpec, viability: f64) -> Self {
        Self {
            name: spec.name.clone(),
            fraction: spec.fraction,
            ic50_shift: spec.ic50_shift,
            stress_threshold_shift: spec.stress_threshold_shift,
            viability,
            stress: StressLevels::default(),
            commitments: BTreeMap::new(),
            last_hazard_per_h: 0.0,
        }
    }

    /// Cohort name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fraction of the population belonging to this cohort.
    #[must_use]
    pub const fn fraction(&self) -> f64 {
        self.fraction
    }

    /// IC50 multiplier for this cohort.
    #[must_use]
    pub const fn ic50_shift(&self) -> f64 {
        self.ic50_shift
    }

    /// Stress-threshold multiplier for this cohort; the shifted threshold
    /// is capped below one so a saturated axis always clears it.
    #[must_use]
    pub fn shifted_stress_threshold(&self, base_threshold: f64) -> f64 {
        (base_threshold * self.stress_threshold_shift).min(0.95)
    }

    /// Cohort viability.
    #[must_use]
    pub const fn viability(&self) -> f64 {
        self.viability
    }

    /// Cohort latent stress.
    #[must_use]
    pub const fn stress(&self) -> StressLevels {
        self.stress
    }

    /// Mutable access to the cohort's latent stress.
    pub fn stress_mut(&mut self) -> &mut StressLevels {
        &mut self.stress
    }

    /// Total hazard the cohort saw in the most recent interval, per hour.
    #[must_use]
    pub const fn last_hazard_per_h(&self) -> f64 {
        self.last_hazard_per_h
    }

    /// Records the hazard the cohort saw over an interval.
    pub fn record_hazard(&mut self, rate_per_h: f64) {
        self.last_hazard_per_h = rate_per_h;
    }

    /// Registers the sampled commitment delay for a new exposure,
    /// replacing any previous commitment for the same compound.
    pub fn register_commitment(&mut self, compound: CompoundId, delay_h: f64) {
        let _ = self.commitments.insert(compound, Commitment::new(delay_h));
    }

    /// Commitment state for a compound, if the cohort was ever exposed.
    #[must_use]
    pub fn commitment(&self, compound: &CompoundId) -> Option<&Commitment> {
        self.commitments.get(compound)
    }

    /// Resolves an exposure into the cohort-shifted term the death
    /// mechanisms consume.
    ///
    /// The hazard derives from the residual intracellular burden, never
    /// from the instantaneous spine concentration, and is gated on this
    /// cohort's own commitment state.
    #[must_use]
    pub fn exposure_term(&self, context: &ExposureContext) -> ExposureTerm {
        let burden_um = residual_burden(&BurdenInputs {
            dose_um: context.dose_um,
            uptake_tau_h: context.uptake_tau_h,
            clearance_half_life_h: context.clearance_half_life_h,
            exposed_for_h: context.exposed_for_h,
            washed_out_after_h: context.washed_out_after_h,
        });
        let committed = self.commitment(&context.compound).is_some_and(|commitment| {
            commitment.is_committed(context.exposed_for_h, context.washed_out_after_h)
        });
        ExposureTerm {
            burden_um,
            ic50_um: context.ic50_um * self.ic50_shift,
            hill_slope: context.hill_slope,
            attrition_hazard_per_h: context.attrition_hazard_per_h * context.potency,
            committed,
            antimitotic: context.antimitotic,
        }
    }

    /// Scales the cohort's viability by a survival factor in `[0, 1]`.
    pub fn apply_survival(&mut self, survival: f64) {
        self.viability *= survival;
    }

    /// Restores the cohort to full viability, clearing exposure state;
    /// only passaging may do this.
    pub fn reset_after_passage(&mut self) {
        self.viability = 1.0;
        self.stress = StressLevels::default();
        self.commitments.clear();
        self.last_hazard_per_h = 0.0;
    }
}

/// Fraction-weighted mean viability over a mixture.
///
/// The vessel-level value is always derived from the cohorts this way;
/// cohorts are never re-synced from the vessel after diverging.
#[must_use]
pub fn blended_viability(cohorts: &[Cohort]) -> f64 {
    cohorts
        .iter()
        .map(|cohort| cohort.fraction() * cohort.viability())
        .sum()
}

/// Fraction-weighted mean stress over a mixture.
#[must_use]
pub fn blended_stress(cohorts: &[Cohort]) -> StressLevels {
    let mut blended = StressLevels::default();
    for cohort in cohorts {
        blended.er += cohort.fraction() * cohort.stress().er;
        blended.mito += cohort.fraction() * cohort.stress().mito;
        blended.transport += cohort.fraction() * cohort.stress().transport;
    }
    blended
}

#[cfg(test)]
mod tests {
    use super::{
        blended_stress, blended_viability, residual_burden, BurdenInputs, Cohort, Commitment,
        ExposureContext,
    };
    use vitro_core::{CohortSpec, CompoundId, StressAxis};

    fn burden(exposed_for_h: f64, washed_out_after_h: Option<f64>) -> f64 {
        residual_burden(&BurdenInputs {
            dose_um: 1.0,
            uptake_tau_h: 2.0,
            clearance_half_life_h: 5.0,
            exposed_for_h,
            washed_out_after_h,
        })
    }

    #[test]
    fn burden_rises_toward_the_dose_during_exposure() {
        assert_eq!(burden(0.0, None), 0.0);
        let early = burden(1.0, None);
        let late = burden(12.0, None);
        assert!(early > 0.0 && early < late);
        assert!((late - 1.0).abs() < 0.01, "burden saturates near the dose");
    }

    #[test]
    fn burden_decays_on_the_clearance_half_life_after_washout() {
        let at_washout = burden(12.0, None);
        let one_half_life = burden(17.0, Some(12.0));
        assert!((one_half_life - at_washout / 2.0).abs() < 1e-9);
        let long_after = burden(80.0, Some(12.0));
        assert!(long_after < 1e-3, "burden trends to zero, got {long_after}");
    }

    #[test]
    fn commitment_requires_the_delay_to_elapse_under_exposure() {
        let commitment = Commitment::new(8.0);
        assert!(!commitment.is_committed(4.0, None));
        assert!(commitment.is_committed(8.0, None));
        // Washed out after commitment: stays committed.
        assert!(commitment.is_committed(20.0, Some(10.0)));
        // Washed out before the delay elapsed: never commits.
        assert!(!commitment.is_committed(20.0, Some(5.0)));
    }

    #[test]
    fn shifted_threshold_is_capped_below_saturation() {
        let spec = CohortSpec {
            name: "persister".to_owned(),
            fraction: 0.1,
            ic50_shift: 6.0,
            stress_threshold_shift: 3.0,
        };
        let cohort = Cohort::from_spec(&spec, 1.0);
        assert!((cohort.shifted_stress_threshold(0.55) - 0.95).abs() < 1e-12);
        assert!((cohort.shifted_stress_threshold(0.2) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn blending_is_fraction_weighted() {
        let mut bulk = Cohort::from_spec(
            &CohortSpec {
                name: "bulk".to_owned(),
                fraction: 0.9,
                ic50_shift: 1.0,
                stress_threshold_shift: 1.0,
            },
            1.0,
        );
        let persister = Cohort::from_spec(
            &CohortSpec {
                name: "persister".to_owned(),
                fraction: 0.1,
                ic50_shift: 6.0,
                stress_threshold_shift: 1.4,
            },
            1.0,
        );

        bulk.apply_survival(0.5);
        bulk.stress_mut().set_axis(StressAxis::Er, 0.8);

        let cohorts = vec![bulk, persister];
        let viability = blended_viability(&cohorts);
        assert!((viability - (0.9 * 0.5 + 0.1 * 1.0)).abs() < 1e-12);
        let stress = blended_stress(&cohorts);
        assert!((stress.er - 0.9 * 0.8).abs() < 1e-12);
    }

    #[test]
    fn redosing_replaces_the_commitment() {
        let spec = CohortSpec::bulk();
        let mut cohort = Cohort::from_spec(&spec, 1.0);
        let compound = CompoundId::new("staurosporine");
        cohort.register_commitment(compound.clone(), 8.0);
        cohort.register_commitment(compound.clone(), 3.0);
        let commitment = cohort.commitment(&compound).expect("registered");
        assert_eq!(commitment.delay_h(), 3.0);
    }

    fn context(exposed_for_h: f64, washed_out_after_h: Option<f64>) -> ExposureContext {
        ExposureContext {
            compound: CompoundId::new("staurosporine"),
            dose_um: 0.5,
            potency: 1.0,
            exposed_for_h,
            washed_out_after_h,
            ic50_um: 0.05,
            hill_slope: 1.5,
            attrition_hazard_per_h: 0.10,
            uptake_tau_h: 2.0,
            clearance_half_life_h: 5.0,
            antimitotic: false,
        }
    }

    #[test]
    fn exposure_term_applies_the_cohort_ic50_shift() {
        let resistant = Cohort::from_spec(
            &CohortSpec {
                name: "persister".to_owned(),
                fraction: 0.1,
                ic50_shift: 6.0,
                stress_threshold_shift: 1.4,
            },
            1.0,
        );
        let term = resistant.exposure_term(&context(12.0, None));
        assert!((term.ic50_um - 0.3).abs() < 1e-12);
        assert!(!term.committed, "no commitment was registered");
    }

    #[test]
    fn washout_before_commitment_suppresses_future_hazard() {
        let mut cohort = Cohort::from_spec(&CohortSpec::bulk(), 1.0);
        cohort.register_commitment(CompoundId::new("staurosporine"), 8.0);

        // Washed out at 5 h, before the 8 h delay: never committed, and the
        // burden the hazard would act on decays toward zero.
        let shortly_after = cohort.exposure_term(&context(6.0, Some(5.0)));
        assert!(!shortly_after.committed);
        let much_later = cohort.exposure_term(&context(60.0, Some(5.0)));
        assert!(!much_later.committed);
        assert!(much_later.burden_um < shortly_after.burden_um);
        assert!(much_later.burden_um < 1e-3);

        // Washed out at 12 h, after the delay: the commitment survives.
        let committed = cohort.exposure_term(&context(20.0, Some(12.0)));
        assert!(committed.committed);
    }

    #[test]
    fn passage_reset_clears_divergence() {
        let spec = CohortSpec::bulk();
        let mut cohort = Cohort::from_spec(&spec, 1.0);
        cohort.apply_survival(0.3);
        cohort.register_commitment(CompoundId::new("paclitaxel"), 12.0);
        cohort.record_hazard(0.2);
        cohort.reset_after_passage();
        assert_eq!(cohort.viability(), 1.0);
        assert_eq!(cohort.last_hazard_per_h(), 0.0);
        assert!(cohort.commitment(&CompoundId::new("paclitaxel")).is_none());
    }
}
