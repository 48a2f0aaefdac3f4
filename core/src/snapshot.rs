//! Read-only snapshot and report types returned to callers.
//!
//! Snapshots are ground truth: they bypass measurement noise and copying
//! one never perturbs the simulation. Reports summarize the realized effect
//! of a single orchestrator operation.

use serde::{Deserialize, Serialize};

use crate::{
    CompoundId, DeathLedger, DeathMode, Hours, Nutrients, StressAxis, StressLevels, VesselId,
};

/// Ground-truth view of one compound exposure on a vessel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExposureSnapshot {
    /// Compound the vessel was exposed to.
    pub compound: CompoundId,
    /// Dose applied to the medium, in micromolar.
    pub dose_um: f64,
    /// Time the exposure started.
    pub started_at: Hours,
    /// Time the compound was washed out, if it was.
    pub washed_out_at: Option<Hours>,
}

/// Ground-truth view of one subpopulation cohort.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CohortSnapshot {
    /// Cohort name within the cell line.
    pub name: String,
    /// Fraction of the population belonging to the cohort.
    pub fraction: f64,
    /// Cohort viability in `[0, 1]`.
    pub viability: f64,
    /// Total death hazard the cohort saw in the most recent interval,
    /// per hour.
    pub hazard_per_h: f64,
}

/// Ground-truth view of a vessel, bypassing measurement noise.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VesselSnapshot {
    /// Vessel identifier.
    pub id: VesselId,
    /// Cell line occupying the vessel.
    pub cell_line: String,
    /// Cell count, non-negative.
    pub population: f64,
    /// Live fraction in `[0, 1]`, fraction-weighted over cohorts.
    pub viability: f64,
    /// Carrying capacity in cells.
    pub capacity: f64,
    /// Population divided by capacity.
    pub confluence: f64,
    /// Number of passages performed on the vessel.
    pub passage: u32,
    /// Lagged contact-pressure signal in `[0, 1]`.
    pub contact_pressure: f64,
    /// Latent stress levels, fraction-weighted over cohorts.
    pub stress: StressLevels,
    /// Cumulative stress damage integrals per axis.
    pub stress_cumulative: StressLevels,
    /// Nutrient concentrations mirrored from the spine.
    pub nutrients: Nutrients,
    /// Death ledger partitioning the dead fraction by cause.
    pub ledger: DeathLedger,
    /// Coarse death-mode label derived from the ledger.
    pub death_mode: DeathMode,
    /// Active and washed-out exposures.
    pub exposures: Vec<ExposureSnapshot>,
    /// Subpopulation mixture.
    pub cohorts: Vec<CohortSnapshot>,
}

/// Result of a treatment operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreatmentReport {
    /// Immediate kill fraction applied by the dose.
    pub viability_effect: f64,
    /// Vessel viability after the immediate effect.
    pub current_viability: f64,
    /// IC50 of the applied compound, in micromolar.
    pub ic50_um: f64,
    /// Hill slope of the applied compound.
    pub hill_slope: f64,
    /// Stress axis the compound drives, if any.
    pub stress_axis: Option<StressAxis>,
}

/// A contamination incident introduced by bench work.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContaminationEvent {
    /// Fraction of the population killed by the incident.
    pub severity: f64,
}

/// Result of a feed operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedReport {
    /// Glucose level after the feed, in millimolar.
    pub realized_glucose_mm: f64,
    /// Glutamine level after the feed, in millimolar.
    pub realized_glutamine_mm: f64,
    /// Contamination introduced by the operation, if any.
    pub contamination: Option<ContaminationEvent>,
}

/// Result of a washout operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WashoutReport {
    /// Compounds whose spine concentration was zeroed.
    pub removed_compounds: Vec<CompoundId>,
    /// Contamination introduced by the operation, if any.
    pub contamination: Option<ContaminationEvent>,
}

/// Result of a passage operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PassageReport {
    /// Live cells reseeded after the split.
    pub surviving_population: f64,
    /// Passage number after the operation.
    pub passage: u32,
    /// Whether the vessel was consumed because too few cells survived.
    pub vessel_consumed: bool,
}

/// Quantity an assay measurement reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadoutKind {
    /// Live fraction of the population.
    Viability,
    /// Total cell count.
    CellCount,
    /// Population divided by capacity.
    Confluence,
}

/// A noisy assay measurement; ground truth is available via snapshots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Readout {
    /// Quantity that was measured.
    pub kind: ReadoutKind,
    /// Measured value, including assay noise.
    pub value: f64,
    /// Simulated time of the measurement.
    pub measured_at: Hours,
}
