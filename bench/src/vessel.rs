//! Authoritative per-vessel state.
//!
//! Vessel-level viability is always the fraction-weighted blend of the
//! cohorts; the bench writes it back after every accounting commit and never
//! edits it directly anywhere else.

use std::collections::BTreeMap;

use vitro_core::{
    CohortSnapshot, CompoundId, DeathLedger, ExposureSnapshot, Hours, Nutrients, StressLevels,
    VesselId, VesselSnapshot,
};
use vitro_system_subpopulation::{blended_stress, blended_viability, Cohort};

/// Where the vessel stands in the propose/commit cycle.
///
/// The cycle is structural: hazards are proposed, combined into one survival
/// factor, and committed in a single step. Instant kills are legal only in
/// [`HazardPhase::Idle`], so no code path can fold an extra kill into an
/// interval whose survival factor has already been computed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum HazardPhase {
    Idle,
    Proposing,
    Committing,
}

/// One compound exposure as the vessel experiences it.
#[derive(Clone, Debug)]
pub(crate) struct Exposure {
    pub(crate) dose_um: f64,
    pub(crate) potency: f64,
    pub(crate) started_at: Hours,
    pub(crate) washed_out_at: Option<Hours>,
}

/// One culture vessel owned by the bench.
#[derive(Clone, Debug)]
pub(crate) struct Vessel {
    pub(crate) id: VesselId,
    pub(crate) cell_line: String,
    pub(crate) population: f64,
    pub(crate) viability: f64,
    pub(crate) capacity: f64,
    pub(crate) passage: u32,
    /// Reference instant for the lag ramp: seeding, or the last passage.
    pub(crate) lag_reference: Hours,
    pub(crate) contact_pressure: f64,
    /// Per-vessel growth multiplier: seeding jitter times the edge penalty.
    pub(crate) rate_multiplier: f64,
    pub(crate) stress_cumulative: StressLevels,
    pub(crate) ledger: DeathLedger,
    pub(crate) exposures: BTreeMap<CompoundId, Exposure>,
    pub(crate) cohorts: Vec<Cohort>,
    pub(crate) phase: HazardPhase,
}

impl Vessel {
    pub(crate) fn new(
        id: VesselId,
        cell_line: String,
        count: f64,
        capacity: f64,
        rate_multiplier: f64,
        cohorts: Vec<Cohort>,
        seeded_at: Hours,
    ) -> Self {
        let viability = blended_viability(&cohorts);
        Self {
            id,
            cell_line,
            population: count,
            viability,
            capacity,
            passage: 0,
            lag_reference: seeded_at,
            contact_pressure: 0.0,
            rate_multiplier,
            stress_cumulative: StressLevels::default(),
            ledger: DeathLedger::new(),
            exposures: BTreeMap::new(),
            cohorts,
            phase: HazardPhase::Idle,
        }
    }

    pub(crate) fn confluence(&self) -> f64 {
        if self.capacity > 0.0 {
            self.population / self.capacity
        } else {
            0.0
        }
    }

    /// Ground-truth snapshot; `nutrients` is mirrored in from the spine.
    pub(crate) fn snapshot(&self, nutrients: Nutrients) -> VesselSnapshot {
        let exposures = self
            .exposures
            .iter()
            .map(|(compound, exposure)| ExposureSnapshot {
                compound: compound.clone(),
                dose_um: exposure.dose_um,
                started_at: exposure.started_at,
                washed_out_at: exposure.washed_out_at,
            })
            .collect();
        let cohorts = self
            .cohorts
            .iter()
            .map(|cohort| CohortSnapshot {
                name: cohort.name().to_owned(),
                fraction: cohort.fraction(),
                viability: cohort.viability(),
                hazard_per_h: cohort.last_hazard_per_h(),
            })
            .collect();
        VesselSnapshot {
            id: self.id.clone(),
            cell_line: self.cell_line.clone(),
            population: self.population,
            viability: self.viability,
            capacity: self.capacity,
            confluence: self.confluence(),
            passage: self.passage,
            contact_pressure: self.contact_pressure,
            stress: blended_stress(&self.cohorts),
            stress_cumulative: self.stress_cumulative,
            nutrients,
            ledger: self.ledger.clone(),
            death_mode: self.ledger.death_mode(),
            exposures,
            cohorts,
        }
    }
}
