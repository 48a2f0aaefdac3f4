#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure death-hazard mechanisms.
//!
//! Each active mechanism proposes a non-negative hazard rate tagged to
//! exactly one ledger field; proposals never touch viability. The bench
//! combines proposals into a single survival factor and allocates the
//! realized kill back to the ledger, so mechanisms here stay free of any
//! accounting concern.

use vitro_core::{LedgerField, StressAxis, StressLevels};

/// A hazard rate proposed by one mechanism, tagged to one ledger field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NamedHazard {
    field: LedgerField,
    rate_per_h: f64,
}

impl NamedHazard {
    /// Creates a proposal; the rate must already be non-negative.
    #[must_use]
    pub fn new(field: LedgerField, rate_per_h: f64) -> Self {
        Self { field, rate_per_h }
    }

    /// Ledger field the proposal is tagged to.
    #[must_use]
    pub const fn field(&self) -> LedgerField {
        self.field
    }

    /// Proposed instantaneous death rate, per hour.
    #[must_use]
    pub const fn rate_per_h(&self) -> f64 {
        self.rate_per_h
    }
}

/// One exposure reduced to the terms the attrition mechanisms need.
///
/// The bench resolves residual intracellular burden and commitment before
/// building this view, so the mechanisms see per-cohort values.
#[derive(Clone, Debug, PartialEq)]
pub struct ExposureTerm {
    /// Residual intracellular burden, in micromolar equivalents.
    pub burden_um: f64,
    /// Cohort-shifted IC50, in micromolar.
    pub ic50_um: f64,
    /// Hill coefficient of the dose-response curve.
    pub hill_slope: f64,
    /// Attrition hazard at saturating burden, per hour, including the
    /// treatment's potency scalar.
    pub attrition_hazard_per_h: f64,
    /// Whether the cohort's commitment delay has elapsed.
    pub committed: bool,
    /// Whether the compound kills through mitotic catastrophe.
    pub antimitotic: bool,
}

impl ExposureTerm {
    /// Fractional receptor occupancy of the residual burden.
    #[must_use]
    pub fn occupancy(&self) -> f64 {
        hill(self.burden_um, self.ic50_um, self.hill_slope)
    }
}

/// Everything the mechanisms read for one cohort over one interval.
#[derive(Clone, Debug, PartialEq)]
pub struct MechanismInputs {
    /// Glucose in the medium at the interval start, in millimolar.
    pub glucose_mm: f64,
    /// Glutamine in the medium at the interval start, in millimolar.
    pub glutamine_mm: f64,
    /// Glucose level below which starvation ramps in, in millimolar.
    pub glucose_starvation_mm: f64,
    /// Glutamine level below which starvation ramps in, in millimolar.
    pub glutamine_starvation_mm: f64,
    /// Starvation hazard at full depletion, per hour.
    pub starvation_hazard_per_h: f64,
    /// Cohort latent stress at the interval start.
    pub stress: StressLevels,
    /// Cohort-shifted stress threshold.
    pub stress_threshold: f64,
    /// Stress hazard at a saturated axis, per hour.
    pub stress_hazard_per_h: f64,
    /// Confluence at the interval start.
    pub confluence: f64,
    /// Hazard at full over-confluence, per hour.
    pub confluence_hazard_per_h: f64,
    /// Coupling between growth attempts and antimitotic killing.
    pub mitotic_fragility: f64,
    /// Realized growth rate over the interval, per hour.
    pub growth_rate_per_h: f64,
    /// Exposure terms resolved for this cohort.
    pub exposures: Vec<ExposureTerm>,
}

/// Death-hazard proposal engine.
#[derive(Clone, Copy, Debug, Default)]
pub struct Mechanisms;

impl Mechanisms {
    /// Proposes hazards for one cohort; entries with zero rate are omitted.
    #[must_use]
    pub fn propose(&self, inputs: &MechanismInputs) -> Vec<NamedHazard> {
        let mut proposals = Vec::new();

        let starvation = starvation_hazard(inputs);
        if starvation > 0.0 {
            proposals.push(NamedHazard::new(LedgerField::Starvation, starvation));
        }

        for axis in StressAxis::ALL {
            let rate = stress_hazard(
                inputs.stress.axis(axis),
                inputs.stress_threshold,
                inputs.stress_hazard_per_h,
            );
            if rate > 0.0 {
                proposals.push(NamedHazard::new(stress_field(axis), rate));
            }
        }

        let mut attrition = 0.0;
        let mut mitotic = 0.0;
        for exposure in &inputs.exposures {
            if !exposure.committed {
                continue;
            }
            let occupancy = exposure.occupancy();
            if exposure.antimitotic {
                // Antimitotic killing requires an attempted division: the
                // hazard scales with the realized growth rate.
                mitotic += inputs.mitotic_fragility
                    * inputs.growth_rate_per_h.max(0.0)
                    * occupancy
                    * exposure.attrition_hazard_per_h
                    / BASE_ATTRITION_SCALE;
            } else {
                attrition += exposure.attrition_hazard_per_h * occupancy;
            }
        }
        if attrition > 0.0 {
            proposals.push(NamedHazard::new(LedgerField::Compound, attrition));
        }
        if mitotic > 0.0 {
            proposals.push(NamedHazard::new(LedgerField::Mitotic, mitotic));
        }

        let over = (inputs.confluence - 1.0).max(0.0);
        if over > 0.0 {
            proposals.push(NamedHazard::new(
                LedgerField::Confluence,
                inputs.confluence_hazard_per_h * over,
            ));
        }

        proposals
    }
}

/// Normalization for the mitotic coupling so that fragility is expressed
/// relative to a nominal attrition hazard.
const BASE_ATTRITION_SCALE: f64 = 0.05;

/// Ledger field a stress axis credits into.
#[must_use]
pub fn stress_field(axis: StressAxis) -> LedgerField {
    match axis {
        StressAxis::Er => LedgerField::ErStress,
        StressAxis::Mito => LedgerField::MitoStress,
        StressAxis::Transport => LedgerField::TransportStress,
    }
}

/// Classic Hill occupancy of `value` against a half-maximal point.
#[must_use]
pub fn hill(value: f64, half_max: f64, slope: f64) -> f64 {
    if value <= 0.0 || half_max <= 0.0 {
        return 0.0;
    }
    let powered = (value / half_max).powf(slope);
    powered / (1.0 + powered)
}

fn starvation_hazard(inputs: &MechanismInputs) -> f64 {
    let glucose_deficit = shortfall(inputs.glucose_mm, inputs.glucose_starvation_mm);
    let glutamine_deficit = shortfall(inputs.glutamine_mm, inputs.glutamine_starvation_mm);
    inputs.starvation_hazard_per_h * glucose_deficit.max(glutamine_deficit)
}

/// Fractional shortfall of a nutrient below its starvation threshold.
fn shortfall(level: f64, threshold: f64) -> f64 {
    if threshold <= 0.0 || level >= threshold {
        return 0.0;
    }
    ((threshold - level.max(0.0)) / threshold).clamp(0.0, 1.0)
}

fn stress_hazard(level: f64, threshold: f64, hazard_per_h: f64) -> f64 {
    if level <= threshold {
        return 0.0;
    }
    let headroom = (1.0 - threshold).max(f64::EPSILON);
    hazard_per_h * ((level - threshold) / headroom).clamp(0.0, 1.0)
}
