//! Parameter tables describing cell lines, compounds, and run-level physics.
//!
//! Tables are serde-backed so adapters can load overrides from disk; the
//! defaults carry a small built-in library sufficient for the scripted
//! scenarios and the test suite. Lookups against these tables never fall
//! back to defaults: an unknown name is a [`crate::SimError::MissingParameter`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Latent stress axes tracked per vessel and per cohort.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StressAxis {
    /// Endoplasmic-reticulum stress (unfolded protein response).
    Er,
    /// Mitochondrial stress (respiration poisoning).
    Mito,
    /// Transport stress (secretory pathway disruption).
    Transport,
}

impl StressAxis {
    /// Every stress axis, in canonical order.
    pub const ALL: [StressAxis; 3] = [StressAxis::Er, StressAxis::Mito, StressAxis::Transport];
}

/// One scalar per stress axis, each in `[0, 1]` for latent levels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StressLevels {
    /// Endoplasmic-reticulum axis value.
    pub er: f64,
    /// Mitochondrial axis value.
    pub mito: f64,
    /// Transport axis value.
    pub transport: f64,
}

impl StressLevels {
    /// Value on the provided axis.
    #[must_use]
    pub fn axis(&self, axis: StressAxis) -> f64 {
        match axis {
            StressAxis::Er => self.er,
            StressAxis::Mito => self.mito,
            StressAxis::Transport => self.transport,
        }
    }

    /// Sets the value on the provided axis.
    pub fn set_axis(&mut self, axis: StressAxis, value: f64) {
        match axis {
            StressAxis::Er => self.er = value,
            StressAxis::Mito => self.mito = value,
            StressAxis::Transport => self.transport = value,
        }
    }
}

/// Nutrient concentrations in the medium, in millimolar.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Nutrients {
    /// Glucose concentration.
    pub glucose_mm: f64,
    /// Glutamine concentration.
    pub glutamine_mm: f64,
}

/// A named subpopulation within a cell line.
///
/// Fractions across a line's cohorts must sum to one; the shifts multiply
/// the vessel-level hazard parameters when the cohort's own hazard is
/// computed, so cohorts diverge after dosing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CohortSpec {
    /// Cohort name, unique within the cell line.
    pub name: String,
    /// Fraction of the seeded population belonging to this cohort.
    pub fraction: f64,
    /// Multiplier applied to compound IC50 values for this cohort.
    pub ic50_shift: f64,
    /// Multiplier applied to the stress-hazard threshold for this cohort.
    pub stress_threshold_shift: f64,
}

impl CohortSpec {
    /// A single bulk cohort covering the whole population.
    #[must_use]
    pub fn bulk() -> Self {
        Self {
            name: "bulk".to_owned(),
            fraction: 1.0,
            ic50_shift: 1.0,
            stress_threshold_shift: 1.0,
        }
    }
}

/// Biology parameters for one cell line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellLineParams {
    /// Population doubling time under ideal conditions, in hours.
    pub doubling_time_h: f64,
    /// Duration of the post-seed lag phase, in hours.
    pub lag_duration_h: f64,
    /// Viability below which growth is gated to zero.
    pub viability_growth_floor: f64,
    /// Glucose level below which starvation hazard ramps in, in millimolar.
    pub glucose_starvation_mm: f64,
    /// Glutamine level below which starvation hazard ramps in, in millimolar.
    pub glutamine_starvation_mm: f64,
    /// Starvation hazard at full nutrient depletion, per hour.
    pub starvation_hazard_per_h: f64,
    /// Latent stress level above which stress hazards ramp in.
    pub stress_threshold: f64,
    /// Stress hazard at a fully saturated axis, per hour.
    pub stress_hazard_per_h: f64,
    /// Hazard at full over-confluence, per hour.
    pub confluence_hazard_per_h: f64,
    /// Coupling between growth attempts and antimitotic killing.
    pub mitotic_fragility: f64,
    /// Subpopulation mixture seeded into every vessel of this line.
    pub cohorts: Vec<CohortSpec>,
}

/// Pharmacology parameters for one compound.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompoundParams {
    /// Half-maximal concentration, in micromolar.
    pub ic50_um: f64,
    /// Hill coefficient of the dose-response curve.
    pub hill_slope: f64,
    /// Stress axis the compound drives, if any.
    pub stress_axis: Option<StressAxis>,
    /// Attrition hazard at saturating intracellular burden, per hour.
    pub attrition_hazard_per_h: f64,
    /// Time constant of intracellular uptake toward the applied dose, hours.
    pub uptake_tau_h: f64,
    /// Half-life of residual intracellular burden after washout, hours.
    pub clearance_half_life_h: f64,
    /// Whether the compound kills through mitotic catastrophe.
    pub antimitotic: bool,
    /// Mean of the per-cohort commitment delay, in hours.
    pub commitment_delay_mean_h: f64,
    /// Log-space sigma of the commitment delay distribution.
    pub commitment_delay_sigma: f64,
}

/// Run-level configuration: parameter tables plus bench physics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Cell-line parameter table keyed by line name.
    pub cell_lines: BTreeMap<String, CellLineParams>,
    /// Compound library keyed by compound name.
    pub compounds: BTreeMap<String, CompoundParams>,
    /// Run-level growth multiplier applied to every vessel.
    pub growth_multiplier: f64,
    /// Standard deviation of the per-vessel growth jitter drawn at seeding.
    pub growth_jitter_sd: f64,
    /// Growth multiplier applied to edge wells, below one.
    pub edge_growth_penalty: f64,
    /// Glucose target restored by a default feed, in millimolar.
    pub feed_glucose_mm: f64,
    /// Glutamine target restored by a default feed, in millimolar.
    pub feed_glutamine_mm: f64,
    /// Glucose present in fresh seeding medium, in millimolar.
    pub seed_glucose_mm: f64,
    /// Glutamine present in fresh seeding medium, in millimolar.
    pub seed_glutamine_mm: f64,
    /// Working volume a vessel starts with, in milliliters.
    pub initial_volume_ml: f64,
    /// Fractional volume lost to evaporation per hour, interior wells.
    pub evaporation_per_h: f64,
    /// Fractional volume lost to evaporation per hour, edge wells.
    pub edge_evaporation_per_h: f64,
    /// Time constant of the lagged contact-pressure signal, in hours.
    pub contact_tau_h: f64,
    /// Confluence at which the contact-pressure sigmoid is half-maximal.
    pub contact_midpoint: f64,
    /// Steepness of the contact-pressure sigmoid.
    pub contact_steepness: f64,
    /// Probability that one feed or washout introduces contamination.
    pub contamination_risk: f64,
    /// Tolerance applied when asserting ledger conservation.
    pub conservation_epsilon: f64,
    /// Coefficient of variation of assay measurement noise.
    pub assay_cv: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            cell_lines: default_cell_lines(),
            compounds: default_compounds(),
            growth_multiplier: 1.0,
            growth_jitter_sd: 0.03,
            edge_growth_penalty: 0.92,
            feed_glucose_mm: 25.0,
            feed_glutamine_mm: 4.0,
            seed_glucose_mm: 25.0,
            seed_glutamine_mm: 4.0,
            initial_volume_ml: 0.2,
            evaporation_per_h: 0.0008,
            edge_evaporation_per_h: 0.0028,
            contact_tau_h: 6.0,
            contact_midpoint: 0.85,
            contact_steepness: 10.0,
            contamination_risk: 0.002,
            conservation_epsilon: 1e-9,
            assay_cv: 0.04,
        }
    }
}

impl SimConfig {
    /// Looks up a cell line, failing fast on unknown names.
    pub fn cell_line(&self, name: &str) -> Result<&CellLineParams, crate::SimError> {
        self.cell_lines
            .get(name)
            .ok_or_else(|| crate::SimError::MissingParameter {
                kind: crate::ParameterKind::CellLine,
                name: name.to_owned(),
            })
    }

    /// Looks up a compound, failing fast on unknown names.
    pub fn compound(&self, id: &crate::CompoundId) -> Result<&CompoundParams, crate::SimError> {
        self.compounds
            .get(id.as_str())
            .ok_or_else(|| crate::SimError::MissingParameter {
                kind: crate::ParameterKind::Compound,
                name: id.as_str().to_owned(),
            })
    }
}

fn line(
    doubling_time_h: f64,
    lag_duration_h: f64,
    cohorts: Vec<CohortSpec>,
) -> CellLineParams {
    CellLineParams {
        doubling_time_h,
        lag_duration_h,
        viability_growth_floor: 0.05,
        glucose_starvation_mm: 2.5,
        glutamine_starvation_mm: 0.4,
        starvation_hazard_per_h: 0.04,
        stress_threshold: 0.55,
        stress_hazard_per_h: 0.06,
        confluence_hazard_per_h: 0.03,
        mitotic_fragility: 1.4,
        cohorts,
    }
}

fn default_cell_lines() -> BTreeMap<String, CellLineParams> {
    let mut lines = BTreeMap::new();
    let _ = lines.insert("a549".to_owned(), line(22.0, 18.0, vec![CohortSpec::bulk()]));
    let _ = lines.insert("hela".to_owned(), line(24.0, 16.0, vec![CohortSpec::bulk()]));
    let _ = lines.insert(
        "hct116-persister".to_owned(),
        line(
            21.0,
            18.0,
            vec![
                CohortSpec {
                    name: "bulk".to_owned(),
                    fraction: 0.9,
                    ic50_shift: 1.0,
                    stress_threshold_shift: 1.0,
                },
                CohortSpec {
                    name: "persister".to_owned(),
                    fraction: 0.1,
                    ic50_shift: 6.0,
                    stress_threshold_shift: 1.4,
                },
            ],
        ),
    );
    lines
}

fn default_compounds() -> BTreeMap<String, CompoundParams> {
    let mut compounds = BTreeMap::new();
    let _ = compounds.insert(
        "staurosporine".to_owned(),
        CompoundParams {
            ic50_um: 0.05,
            hill_slope: 1.5,
            stress_axis: None,
            attrition_hazard_per_h: 0.10,
            uptake_tau_h: 2.0,
            clearance_half_life_h: 5.0,
            antimitotic: false,
            commitment_delay_mean_h: 8.0,
            commitment_delay_sigma: 0.4,
        },
    );
    let _ = compounds.insert(
        "tunicamycin".to_owned(),
        CompoundParams {
            ic50_um: 1.2,
            hill_slope: 1.0,
            stress_axis: Some(StressAxis::Er),
            attrition_hazard_per_h: 0.035,
            uptake_tau_h: 3.0,
            clearance_half_life_h: 8.0,
            antimitotic: false,
            commitment_delay_mean_h: 14.0,
            commitment_delay_sigma: 0.35,
        },
    );
    let _ = compounds.insert(
        "oligomycin".to_owned(),
        CompoundParams {
            ic50_um: 0.8,
            hill_slope: 1.2,
            stress_axis: Some(StressAxis::Mito),
            attrition_hazard_per_h: 0.04,
            uptake_tau_h: 1.5,
            clearance_half_life_h: 6.0,
            antimitotic: false,
            commitment_delay_mean_h: 12.0,
            commitment_delay_sigma: 0.35,
        },
    );
    let _ = compounds.insert(
        "brefeldin-a".to_owned(),
        CompoundParams {
            ic50_um: 0.6,
            hill_slope: 1.1,
            stress_axis: Some(StressAxis::Transport),
            attrition_hazard_per_h: 0.045,
            uptake_tau_h: 2.5,
            clearance_half_life_h: 4.0,
            antimitotic: false,
            commitment_delay_mean_h: 10.0,
            commitment_delay_sigma: 0.4,
        },
    );
    let _ = compounds.insert(
        "paclitaxel".to_owned(),
        CompoundParams {
            ic50_um: 0.01,
            hill_slope: 2.0,
            stress_axis: None,
            attrition_hazard_per_h: 0.05,
            uptake_tau_h: 4.0,
            clearance_half_life_h: 20.0,
            antimitotic: true,
            commitment_delay_mean_h: 18.0,
            commitment_delay_sigma: 0.5,
        },
    );
    compounds
}
