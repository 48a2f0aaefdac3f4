#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative cell-culture bench.
//!
//! The bench owns the clock, the event scheduler, the concentration spine,
//! the vessels, and the partitioned run randomness. Every mutation flows
//! through the operations defined here; the biology systems are pure and
//! receive value views of the interval start. Advancing time is
//! deterministic for a fixed seed and event set, and the spine's delivery
//! log replays any run's medium history from the seed alone.

mod accounting;
mod rng;
mod scheduler;
mod spine;
mod vessel;

use std::collections::BTreeMap;

use vitro_core::{
    CompoundId, ContaminationEvent, EventId, EventPayload, EventPriority, FeedReport, Hours,
    InvalidOperationKind, LedgerField, Nutrients, PassageReport, Readout, ReadoutKind,
    ScheduledEvent, SimConfig, SimError, SpineLogEntry, StressAxis, StressLevels, TreatmentReport,
    VesselId, VesselSnapshot, WashoutReport,
};
use vitro_system_death::{hill, ExposureTerm, MechanismInputs, Mechanisms};
use vitro_system_growth::{Growth, GrowthInputs};
use vitro_system_subpopulation::{
    blended_stress, residual_burden, BurdenInputs, Cohort, ExposureContext,
};

use rng::RngPartition;
use scheduler::Scheduler;
use spine::{ConcentrationSpine, SpinePhysics};
use vessel::{Exposure, Vessel};

/// Relaxation time constant of the latent stress axes, in hours.
const STRESS_TAU_H: f64 = 8.0;

/// The authoritative simulation state.
pub struct Bench {
    config: SimConfig,
    clock: Hours,
    scheduler: Scheduler,
    spine: ConcentrationSpine,
    vessels: BTreeMap<VesselId, Vessel>,
    rng: RngPartition,
}

impl Bench {
    /// Creates an empty bench from a run configuration and seed.
    #[must_use]
    pub fn new(config: SimConfig, seed: u64) -> Self {
        let spine = ConcentrationSpine::new(SpinePhysics::from_config(&config));
        Self {
            config,
            clock: Hours::ZERO,
            scheduler: Scheduler::default(),
            spine,
            vessels: BTreeMap::new(),
            rng: RngPartition::from_seed(seed),
        }
    }

    /// Reconstructs a bench by re-delivering a spine log against the same
    /// configuration and seed.
    ///
    /// Medium and biology are reproduced exactly: both runs segment their
    /// advances at the same delivery and commitment boundaries, and logged
    /// contamination incidents are re-applied as ordinary entries without
    /// rolling the operations stream. The log carries no terminal
    /// timestamp, so a run whose last operation was followed by a trailing
    /// advance ends here at the clock of the final entry; advance the
    /// returned bench by the remainder to recover the rest.
    pub fn replay(config: SimConfig, seed: u64, log: &[SpineLogEntry]) -> Result<Self, SimError> {
        let mut bench = Bench::new(config, seed);
        for entry in log {
            let gap = entry.time().since(bench.clock);
            if gap > 0.0 {
                bench.advance_time(gap)?;
            }
            let _ = bench.submit(
                entry.vessel().clone(),
                entry.payload().clone(),
                entry.time(),
                Hours::ZERO,
            );
            bench.flush_due(entry.time())?;
        }
        Ok(bench)
    }

    /// Enqueues an operation with its payload's default priority.
    pub fn submit(
        &mut self,
        vessel: VesselId,
        payload: EventPayload,
        time: Hours,
        duration: Hours,
    ) -> EventId {
        let priority = EventPriority::default_for(&payload);
        self.scheduler.submit(vessel, payload, time, duration, priority)
    }

    /// Enqueues an operation with an explicit delivery priority.
    pub fn submit_with_priority(
        &mut self,
        vessel: VesselId,
        payload: EventPayload,
        time: Hours,
        duration: Hours,
        priority: EventPriority,
    ) -> EventId {
        self.scheduler.submit(vessel, payload, time, duration, priority)
    }

    /// Seeds a new vessel at the current clock and returns its state.
    pub fn seed_vessel(
        &mut self,
        id: VesselId,
        cell_line: &str,
        count: f64,
        capacity: f64,
        initial_viability: f64,
    ) -> Result<VesselSnapshot, SimError> {
        let _ = self.submit(
            id.clone(),
            EventPayload::Seed {
                cell_line: cell_line.to_owned(),
                count,
                capacity,
                initial_viability,
            },
            self.clock,
            Hours::ZERO,
        );
        self.flush_due(self.clock)?;
        self.vessel_state(&id)
    }

    /// Adds a compound to a vessel's medium at the current clock.
    ///
    /// `potency` scales the compound's ongoing attrition hazard and
    /// `toxicity` scales its immediate kill; both are one for a plain dose.
    pub fn treat_with_compound(
        &mut self,
        id: &VesselId,
        compound: &CompoundId,
        dose_um: f64,
        potency: f64,
        toxicity: f64,
    ) -> Result<TreatmentReport, SimError> {
        let params = self.config.compound(compound)?.clone();
        if !self.vessels.contains_key(id) {
            return Err(SimError::vessel_not_found(id));
        }
        if dose_um <= 0.0 {
            return Err(SimError::invalid(InvalidOperationKind::NonPositiveDose {
                dose_um,
            }));
        }
        let _ = self.submit(
            id.clone(),
            EventPayload::Treat {
                compound: compound.clone(),
                dose_um,
                potency,
                toxicity,
            },
            self.clock,
            Hours::ZERO,
        );
        self.flush_due(self.clock)?;
        let vessel = self
            .vessels
            .get(id)
            .ok_or_else(|| SimError::vessel_not_found(id))?;
        Ok(TreatmentReport {
            viability_effect: instant_kill_fraction(toxicity, dose_um, &params),
            current_viability: vessel.viability,
            ic50_um: params.ic50_um,
            hill_slope: params.hill_slope,
            stress_axis: params.stress_axis,
        })
    }

    /// Replaces a vessel's nutrients at the current clock; `None` targets
    /// fall back to the configured feed medium.
    pub fn feed_vessel(
        &mut self,
        id: &VesselId,
        glucose_mm: Option<f64>,
        glutamine_mm: Option<f64>,
    ) -> Result<FeedReport, SimError> {
        if !self.vessels.contains_key(id) {
            return Err(SimError::vessel_not_found(id));
        }
        let _ = self.submit(
            id.clone(),
            EventPayload::Feed {
                glucose_mm: glucose_mm.unwrap_or(self.config.feed_glucose_mm),
                glutamine_mm: glutamine_mm.unwrap_or(self.config.feed_glutamine_mm),
            },
            self.clock,
            Hours::ZERO,
        );
        self.flush_due(self.clock)?;
        let contamination = self.roll_contamination(id)?;
        let nutrients = self
            .spine
            .record(id)
            .ok_or_else(|| SimError::vessel_not_found(id))?
            .nutrients();
        Ok(FeedReport {
            realized_glucose_mm: nutrients.glucose_mm,
            realized_glutamine_mm: nutrients.glutamine_mm,
            contamination,
        })
    }

    /// Removes one compound, or all compounds, from a vessel's medium at
    /// the current clock.
    pub fn washout_compound(
        &mut self,
        id: &VesselId,
        compound: Option<&CompoundId>,
    ) -> Result<WashoutReport, SimError> {
        let removed_compounds = {
            let record = self
                .spine
                .record(id)
                .ok_or_else(|| SimError::vessel_not_found(id))?;
            match compound {
                Some(compound) if record.concentration_um(compound) > 0.0 => {
                    vec![compound.clone()]
                }
                Some(_) => Vec::new(),
                None => record.compound_ids(),
            }
        };
        let _ = self.submit(
            id.clone(),
            EventPayload::Washout {
                compound: compound.cloned(),
            },
            self.clock,
            Hours::ZERO,
        );
        self.flush_due(self.clock)?;
        let contamination = self.roll_contamination(id)?;
        Ok(WashoutReport {
            removed_compounds,
            contamination,
        })
    }

    /// Splits a vessel's culture into fresh medium at the current clock.
    ///
    /// The surviving live cells continue at passage `n + 1` with cleared
    /// exposure history; a split that leaves less than one live cell
    /// consumes the vessel.
    pub fn passage_vessel(
        &mut self,
        id: &VesselId,
        split_ratio: f64,
    ) -> Result<PassageReport, SimError> {
        let prior_passage = self
            .vessels
            .get(id)
            .ok_or_else(|| SimError::vessel_not_found(id))?
            .passage;
        if split_ratio < 1.0 {
            return Err(SimError::invalid(
                InvalidOperationKind::SplitRatioBelowOne { ratio: split_ratio },
            ));
        }
        let _ = self.submit(
            id.clone(),
            EventPayload::Passage { split_ratio },
            self.clock,
            Hours::ZERO,
        );
        self.flush_due(self.clock)?;
        match self.vessels.get(id) {
            Some(vessel) => Ok(PassageReport {
                surviving_population: vessel.population,
                passage: vessel.passage,
                vessel_consumed: false,
            }),
            None => Ok(PassageReport {
                surviving_population: 0.0,
                passage: prior_passage + 1,
                vessel_consumed: true,
            }),
        }
    }

    /// Discards a vessel and its concentration record.
    pub fn remove_vessel(&mut self, id: &VesselId) -> Result<(), SimError> {
        if self.vessels.remove(id).is_none() {
            return Err(SimError::vessel_not_found(id));
        }
        self.spine.remove(id);
        Ok(())
    }

    /// Advances simulated time by `hours`.
    ///
    /// Events due at the current clock are delivered first; a non-positive
    /// duration performs only that delivery. The advance then segments at
    /// every pending delivery time inside the span, so scheduled events
    /// take effect at their own timestamps. Each segment integrates from
    /// start-of-interval state, and splitting an advance into finer steps
    /// converges to the same biology.
    pub fn advance_time(&mut self, hours: f64) -> Result<(), SimError> {
        self.flush_due(self.clock)?;
        if hours <= 0.0 {
            return Ok(());
        }

        let target = self.clock.plus(hours);
        while let Some(stop) = self.next_stop_before(target) {
            let dt = stop.since(self.clock);
            if dt > 0.0 {
                self.step(dt)?;
            }
            self.flush_due(self.clock)?;
        }
        let dt = target.since(self.clock);
        if dt > 0.0 {
            self.step(dt)?;
        }
        Ok(())
    }

    /// Next instant inside `(clock, target]` at which piecewise-constant
    /// inputs change: a scheduled delivery or a commitment delay elapsing.
    ///
    /// Segmenting at these instants is what makes the advance dt-invariant:
    /// a coarse step and a pile of fine steps cross them at exactly the
    /// same times.
    fn next_stop_before(&self, target: Hours) -> Option<Hours> {
        let scheduled = self.scheduler.earliest_between(self.clock, target);
        let commitment = self.earliest_commitment_between(self.clock, target);
        match (scheduled, commitment) {
            (Some(event), Some(boundary)) => {
                if event.total_cmp(&boundary).is_le() {
                    Some(event)
                } else {
                    Some(boundary)
                }
            }
            (next, None) => next,
            (None, next) => next,
        }
    }

    fn earliest_commitment_between(&self, after: Hours, upto: Hours) -> Option<Hours> {
        let mut earliest: Option<Hours> = None;
        for vessel in self.vessels.values() {
            for (compound, exposure) in &vessel.exposures {
                for cohort in &vessel.cohorts {
                    let Some(commitment) = cohort.commitment(compound) else {
                        continue;
                    };
                    // A washout before the delay elapsed cancels the
                    // commitment, and its boundary with it.
                    let cancelled = exposure
                        .washed_out_at
                        .is_some_and(|at| at.since(exposure.started_at) < commitment.delay_h());
                    if cancelled {
                        continue;
                    }
                    let boundary = exposure.started_at.plus(commitment.delay_h());
                    let in_window = boundary.total_cmp(&after).is_gt()
                        && boundary.total_cmp(&upto).is_le();
                    if !in_window {
                        continue;
                    }
                    let closer = earliest
                        .map_or(true, |current| boundary.total_cmp(&current).is_lt());
                    if closer {
                        earliest = Some(boundary);
                    }
                }
            }
        }
        earliest
    }

    /// Integrates one event-free segment of `dt_h` hours.
    fn step(&mut self, dt_h: f64) -> Result<(), SimError> {
        let t0 = self.clock;
        // Nutrient views are captured before medium physics move, so every
        // vessel integrates against the segment start.
        let nutrient_views: BTreeMap<VesselId, Nutrients> = self
            .vessels
            .keys()
            .map(|id| {
                let nutrients = self
                    .spine
                    .record(id)
                    .map(spine_nutrients)
                    .unwrap_or(EMPTY_MEDIUM);
                (id.clone(), nutrients)
            })
            .collect();
        self.spine.update(dt_h);

        for (id, nutrients) in &nutrient_views {
            self.integrate_vessel(id, t0, dt_h, *nutrients)?;
        }
        self.clock = t0.plus(dt_h);
        Ok(())
    }

    /// Measures a vessel's live fraction with assay noise.
    pub fn measure_viability(&mut self, id: &VesselId) -> Result<Readout, SimError> {
        let truth = self
            .vessels
            .get(id)
            .ok_or_else(|| SimError::vessel_not_found(id))?
            .viability;
        let value = self
            .rng
            .assay
            .noisy(truth, self.config.assay_cv)
            .clamp(0.0, 1.0);
        Ok(self.readout(ReadoutKind::Viability, value))
    }

    /// Measures a vessel's total cell count with assay noise.
    pub fn measure_cell_count(&mut self, id: &VesselId) -> Result<Readout, SimError> {
        let truth = self
            .vessels
            .get(id)
            .ok_or_else(|| SimError::vessel_not_found(id))?
            .population;
        let value = self.rng.assay.noisy(truth, self.config.assay_cv).max(0.0);
        Ok(self.readout(ReadoutKind::CellCount, value))
    }

    /// Measures a vessel's confluence with assay noise.
    pub fn measure_confluence(&mut self, id: &VesselId) -> Result<Readout, SimError> {
        let truth = self
            .vessels
            .get(id)
            .ok_or_else(|| SimError::vessel_not_found(id))?
            .confluence();
        let value = self.rng.assay.noisy(truth, self.config.assay_cv).max(0.0);
        Ok(self.readout(ReadoutKind::Confluence, value))
    }

    /// Ground-truth view of a vessel, bypassing assay noise.
    pub fn vessel_state(&self, id: &VesselId) -> Result<VesselSnapshot, SimError> {
        let vessel = self
            .vessels
            .get(id)
            .ok_or_else(|| SimError::vessel_not_found(id))?;
        let nutrients = self
            .spine
            .record(id)
            .map(spine_nutrients)
            .unwrap_or(EMPTY_MEDIUM);
        Ok(vessel.snapshot(nutrients))
    }

    fn readout(&self, kind: ReadoutKind, value: f64) -> Readout {
        Readout {
            kind,
            value,
            measured_at: self.clock,
        }
    }

    fn flush_due(&mut self, now: Hours) -> Result<(), SimError> {
        // One event per pop: a failed delivery consumes only its own event,
        // and everything behind it stays queued for the next flush.
        while let Some(event) = self.scheduler.pop_due(now) {
            self.deliver(&event)?;
        }
        Ok(())
    }

    fn deliver(&mut self, event: &ScheduledEvent) -> Result<(), SimError> {
        match event.payload().clone() {
            EventPayload::Seed {
                cell_line,
                count,
                capacity,
                initial_viability,
            } => self.deliver_seed(event, &cell_line, count, capacity, initial_viability),
            EventPayload::Treat {
                compound,
                dose_um,
                potency,
                toxicity,
            } => self.deliver_treat(event, &compound, dose_um, potency, toxicity),
            EventPayload::Feed { .. } => self.spine.apply(event),
            EventPayload::Washout { compound } => self.deliver_washout(event, compound.as_ref()),
            EventPayload::Passage { split_ratio } => self.deliver_passage(event, split_ratio),
            EventPayload::Contaminate { severity } => self.deliver_contaminate(event, severity),
        }
    }

    fn deliver_seed(
        &mut self,
        event: &ScheduledEvent,
        cell_line: &str,
        count: f64,
        capacity: f64,
        initial_viability: f64,
    ) -> Result<(), SimError> {
        if self.vessels.contains_key(event.vessel()) {
            return Err(SimError::invalid(InvalidOperationKind::DuplicateVessel {
                id: event.vessel().as_str().to_owned(),
            }));
        }
        if count <= 0.0 || !count.is_finite() {
            return Err(SimError::invalid(
                InvalidOperationKind::NonPositiveSeedCount { count },
            ));
        }
        if !initial_viability.is_finite() || !(0.0..=1.0).contains(&initial_viability) {
            return Err(SimError::invalid(
                InvalidOperationKind::FractionOutOfRange {
                    value: initial_viability,
                },
            ));
        }
        let line = self.config.cell_line(cell_line)?.clone();
        self.spine.apply(event)?;

        let jitter = self.rng.growth.jitter_multiplier(self.config.growth_jitter_sd);
        let edge_penalty = if event.vessel().is_edge_well() {
            self.config.edge_growth_penalty
        } else {
            1.0
        };
        let cohorts: Vec<Cohort> = line
            .cohorts
            .iter()
            .map(|spec| Cohort::from_spec(spec, initial_viability))
            .collect();
        let mut vessel = Vessel::new(
            event.vessel().clone(),
            cell_line.to_owned(),
            count,
            capacity,
            jitter * edge_penalty,
            cohorts,
            event.time(),
        );
        // Cells dead on arrival are known unknowns: dead at seeding, cause
        // outside the modeled mechanisms.
        if initial_viability < 1.0 {
            vessel
                .ledger
                .credit(LedgerField::KnownUnknown, 1.0 - initial_viability)?;
        }
        vessel
            .ledger
            .assert_conserved(&vessel.id, initial_viability, self.config.conservation_epsilon)?;
        let _ = self.vessels.insert(vessel.id.clone(), vessel);
        Ok(())
    }

    fn deliver_treat(
        &mut self,
        event: &ScheduledEvent,
        compound: &CompoundId,
        dose_um: f64,
        potency: f64,
        toxicity: f64,
    ) -> Result<(), SimError> {
        if dose_um <= 0.0 {
            return Err(SimError::invalid(InvalidOperationKind::NonPositiveDose {
                dose_um,
            }));
        }
        let params = self.config.compound(compound)?.clone();
        if !self.vessels.contains_key(event.vessel()) {
            return Err(SimError::vessel_not_found(event.vessel()));
        }
        self.spine.apply(event)?;

        let vessel = self
            .vessels
            .get_mut(event.vessel())
            .ok_or_else(|| SimError::vessel_not_found(event.vessel()))?;
        let _ = vessel.exposures.insert(
            compound.clone(),
            Exposure {
                dose_um,
                potency,
                started_at: event.time(),
                washed_out_at: None,
            },
        );
        // Each cohort draws its own commitment delay; resistant cohorts
        // diverge later through their shifted parameters, not here.
        for cohort in vessel.cohorts.iter_mut() {
            let delay = self
                .rng
                .treatment
                .commitment_delay_h(params.commitment_delay_mean_h, params.commitment_delay_sigma);
            cohort.register_commitment(compound.clone(), delay);
        }

        // Resistant cohorts shrug off part of the immediate effect through
        // their shifted IC50.
        let fractions: Vec<f64> = vessel
            .cohorts
            .iter()
            .map(|cohort| {
                (toxicity * hill(dose_um, params.ic50_um * cohort.ic50_shift(), params.hill_slope))
                    .clamp(0.0, 1.0)
            })
            .collect();
        if fractions.iter().any(|fraction| *fraction > 0.0) {
            let _ = accounting::instant_kill(
                vessel,
                &fractions,
                LedgerField::Compound,
                self.config.conservation_epsilon,
            )?;
        }

        // A positive envelope duration bounds the exposure: the washout is
        // scheduled now so the protocol needs no follow-up call.
        if event.duration().get() > 0.0 {
            let _ = self.submit(
                event.vessel().clone(),
                EventPayload::Washout {
                    compound: Some(compound.clone()),
                },
                event.time().plus(event.duration().get()),
                Hours::ZERO,
            );
        }
        Ok(())
    }

    fn deliver_washout(
        &mut self,
        event: &ScheduledEvent,
        compound: Option<&CompoundId>,
    ) -> Result<(), SimError> {
        self.spine.apply(event)?;
        let vessel = self
            .vessels
            .get_mut(event.vessel())
            .ok_or_else(|| SimError::vessel_not_found(event.vessel()))?;
        match compound {
            Some(compound) => {
                if let Some(exposure) = vessel.exposures.get_mut(compound) {
                    if exposure.washed_out_at.is_none() {
                        exposure.washed_out_at = Some(event.time());
                    }
                }
            }
            None => {
                for exposure in vessel.exposures.values_mut() {
                    if exposure.washed_out_at.is_none() {
                        exposure.washed_out_at = Some(event.time());
                    }
                }
            }
        }
        Ok(())
    }

    fn deliver_passage(&mut self, event: &ScheduledEvent, split_ratio: f64) -> Result<(), SimError> {
        if split_ratio < 1.0 || !split_ratio.is_finite() {
            return Err(SimError::invalid(
                InvalidOperationKind::SplitRatioBelowOne { ratio: split_ratio },
            ));
        }
        if !self.vessels.contains_key(event.vessel()) {
            return Err(SimError::vessel_not_found(event.vessel()));
        }
        self.spine.apply(event)?;

        let vessel = self
            .vessels
            .get_mut(event.vessel())
            .ok_or_else(|| SimError::vessel_not_found(event.vessel()))?;
        let survivors = vessel.population * vessel.viability / split_ratio;
        if survivors < 1.0 {
            let id = vessel.id.clone();
            let _ = self.vessels.remove(&id);
            self.spine.remove(&id);
            return Ok(());
        }
        vessel.population = survivors;
        vessel.viability = 1.0;
        vessel.passage += 1;
        vessel.lag_reference = event.time();
        vessel.contact_pressure = 0.0;
        vessel.stress_cumulative = StressLevels::default();
        vessel.ledger.reset();
        vessel.exposures.clear();
        for cohort in vessel.cohorts.iter_mut() {
            cohort.reset_after_passage();
        }
        Ok(())
    }

    fn deliver_contaminate(
        &mut self,
        event: &ScheduledEvent,
        severity: f64,
    ) -> Result<(), SimError> {
        if !severity.is_finite() || !(0.0..=1.0).contains(&severity) {
            return Err(SimError::invalid(
                InvalidOperationKind::FractionOutOfRange { value: severity },
            ));
        }
        if !self.vessels.contains_key(event.vessel()) {
            return Err(SimError::vessel_not_found(event.vessel()));
        }
        self.spine.apply(event)?;
        let epsilon = self.config.conservation_epsilon;
        let vessel = self
            .vessels
            .get_mut(event.vessel())
            .ok_or_else(|| SimError::vessel_not_found(event.vessel()))?;
        // Contamination does not discriminate between cohorts.
        let fractions = vec![severity; vessel.cohorts.len()];
        let _ =
            accounting::instant_kill(vessel, &fractions, LedgerField::KnownUnknown, epsilon)?;
        Ok(())
    }

    /// Rolls one feed or washout for contamination. An incident is delivered
    /// as its own logged event, so replay re-applies it from the log without
    /// rolling the operations stream.
    fn roll_contamination(
        &mut self,
        id: &VesselId,
    ) -> Result<Option<ContaminationEvent>, SimError> {
        match self.rng.operations.contamination(self.config.contamination_risk) {
            Some(severity) => {
                let _ = self.submit(
                    id.clone(),
                    EventPayload::Contaminate { severity },
                    self.clock,
                    Hours::ZERO,
                );
                self.flush_due(self.clock)?;
                Ok(Some(ContaminationEvent { severity }))
            }
            None => Ok(None),
        }
    }

    fn integrate_vessel(
        &mut self,
        id: &VesselId,
        t0: Hours,
        dt_h: f64,
        nutrients: Nutrients,
    ) -> Result<(), SimError> {
        let line = {
            let vessel = self
                .vessels
                .get(id)
                .ok_or_else(|| SimError::vessel_not_found(id))?;
            self.config.cell_line(&vessel.cell_line)?.clone()
        };
        let contexts = self.exposure_contexts(id, t0)?;
        let drive = self.stress_drive(&contexts)?;

        let epsilon = self.config.conservation_epsilon;
        let growth_multiplier = self.config.growth_multiplier;
        let contact_tau_h = self.config.contact_tau_h;
        let contact_midpoint = self.config.contact_midpoint;
        let contact_steepness = self.config.contact_steepness;

        let vessel = self
            .vessels
            .get_mut(id)
            .ok_or_else(|| SimError::vessel_not_found(id))?;

        let confluence_start = vessel.confluence();
        let outcome = Growth.integrate(
            &GrowthInputs {
                population: vessel.population,
                viability: vessel.viability,
                capacity: vessel.capacity,
                doubling_time_h: line.doubling_time_h,
                lag_elapsed_h: t0.since(vessel.lag_reference),
                lag_duration_h: line.lag_duration_h,
                viability_floor: line.viability_growth_floor,
                rate_multiplier: vessel.rate_multiplier * growth_multiplier,
                contact_pressure: vessel.contact_pressure,
                contact_tau_h,
                contact_midpoint,
                contact_steepness,
            },
            dt_h,
        );

        // Proposals read start-of-interval state throughout.
        let mut proposals = Vec::with_capacity(vessel.cohorts.len());
        for cohort in &vessel.cohorts {
            let exposures: Vec<ExposureTerm> = contexts
                .iter()
                .map(|context| cohort.exposure_term(context))
                .collect();
            proposals.push(Mechanisms.propose(&MechanismInputs {
                glucose_mm: nutrients.glucose_mm,
                glutamine_mm: nutrients.glutamine_mm,
                glucose_starvation_mm: line.glucose_starvation_mm,
                glutamine_starvation_mm: line.glutamine_starvation_mm,
                starvation_hazard_per_h: line.starvation_hazard_per_h,
                stress: cohort.stress(),
                stress_threshold: cohort.shifted_stress_threshold(line.stress_threshold),
                stress_hazard_per_h: line.stress_hazard_per_h,
                confluence: confluence_start,
                confluence_hazard_per_h: line.confluence_hazard_per_h,
                mitotic_fragility: line.mitotic_fragility,
                growth_rate_per_h: outcome.realized_rate_per_h,
                exposures,
            }));
        }

        // Latent stress relaxes toward the drive; the closed form keeps the
        // update dt-invariant. Cumulative damage integrates the blended
        // trajectory trapezoidally.
        let decay = (-dt_h / STRESS_TAU_H).exp();
        let stress_before = blended_stress(&vessel.cohorts);
        for cohort in vessel.cohorts.iter_mut() {
            for axis in StressAxis::ALL {
                let level = cohort.stress().axis(axis);
                let target = drive.axis(axis);
                let relaxed = (target + (level - target) * decay).clamp(0.0, 1.0);
                cohort.stress_mut().set_axis(axis, relaxed);
            }
        }
        let stress_after = blended_stress(&vessel.cohorts);
        for axis in StressAxis::ALL {
            let mean = 0.5 * (stress_before.axis(axis) + stress_after.axis(axis));
            let cumulative = vessel.stress_cumulative.axis(axis) + mean * dt_h;
            vessel.stress_cumulative.set_axis(axis, cumulative);
        }

        vessel.population = outcome.population;
        vessel.contact_pressure = outcome.contact_pressure;
        accounting::commit_interval(vessel, &proposals, dt_h, epsilon)
    }

    fn exposure_contexts(
        &self,
        id: &VesselId,
        t0: Hours,
    ) -> Result<Vec<ExposureContext>, SimError> {
        let vessel = self
            .vessels
            .get(id)
            .ok_or_else(|| SimError::vessel_not_found(id))?;
        let mut contexts = Vec::with_capacity(vessel.exposures.len());
        for (compound, exposure) in &vessel.exposures {
            let params = self.config.compound(compound)?;
            contexts.push(ExposureContext {
                compound: compound.clone(),
                dose_um: exposure.dose_um,
                potency: exposure.potency,
                exposed_for_h: t0.since(exposure.started_at),
                washed_out_after_h: exposure
                    .washed_out_at
                    .map(|at| at.since(exposure.started_at)),
                ic50_um: params.ic50_um,
                hill_slope: params.hill_slope,
                attrition_hazard_per_h: params.attrition_hazard_per_h,
                uptake_tau_h: params.uptake_tau_h,
                clearance_half_life_h: params.clearance_half_life_h,
                antimitotic: params.antimitotic,
            });
        }
        Ok(contexts)
    }

    /// Per-axis stress target from the residual burden of stressor
    /// exposures; the strongest exposure on an axis drives it.
    fn stress_drive(&self, contexts: &[ExposureContext]) -> Result<StressLevels, SimError> {
        let mut drive = StressLevels::default();
        for context in contexts {
            let params = self.config.compound(&context.compound)?;
            if let Some(axis) = params.stress_axis {
                let burden = residual_burden(&BurdenInputs {
                    dose_um: context.dose_um,
                    uptake_tau_h: context.uptake_tau_h,
                    clearance_half_life_h: context.clearance_half_life_h,
                    exposed_for_h: context.exposed_for_h,
                    washed_out_after_h: context.washed_out_after_h,
                });
                let occupancy = hill(burden, context.ic50_um, context.hill_slope);
                if occupancy > drive.axis(axis) {
                    drive.set_axis(axis, occupancy);
                }
            }
        }
        Ok(drive)
    }
}

/// Immediate kill fraction of one dose: toxicity times Hill occupancy.
fn instant_kill_fraction(
    toxicity: f64,
    dose_um: f64,
    params: &vitro_core::CompoundParams,
) -> f64 {
    (toxicity * hill(dose_um, params.ic50_um, params.hill_slope)).clamp(0.0, 1.0)
}

fn spine_nutrients(record: &spine::ConcentrationRecord) -> Nutrients {
    record.nutrients()
}

/// Medium of a vessel with no concentration record.
const EMPTY_MEDIUM: Nutrients = Nutrients {
    glucose_mm: 0.0,
    glutamine_mm: 0.0,
};

/// Read-only views over a bench.
pub mod query {
    use super::Bench;
    use vitro_core::{
        CompoundId, Hours, Nutrients, SimError, SpineLogEntry, VesselId, VesselSnapshot,
    };

    /// Current simulated time.
    #[must_use]
    pub fn clock(bench: &Bench) -> Hours {
        bench.clock
    }

    /// Every live vessel identifier, in order.
    #[must_use]
    pub fn vessel_ids(bench: &Bench) -> Vec<VesselId> {
        bench.vessels.keys().cloned().collect()
    }

    /// Ground-truth state of one vessel.
    pub fn vessel_state(bench: &Bench, id: &VesselId) -> Result<VesselSnapshot, SimError> {
        bench.vessel_state(id)
    }

    /// The spine's append-only delivery log.
    #[must_use]
    pub fn spine_log(bench: &Bench) -> &[SpineLogEntry] {
        bench.spine.log()
    }

    /// Number of events waiting for delivery.
    #[must_use]
    pub fn pending_events(bench: &Bench) -> usize {
        bench.scheduler.pending_len()
    }

    /// Spine concentration of one compound in one vessel's medium.
    pub fn concentration_um(
        bench: &Bench,
        id: &VesselId,
        compound: &CompoundId,
    ) -> Result<f64, SimError> {
        bench
            .spine
            .record(id)
            .map(|record| record.concentration_um(compound))
            .ok_or_else(|| SimError::vessel_not_found(id))
    }

    /// Nutrient levels in one vessel's medium.
    pub fn nutrients(bench: &Bench, id: &VesselId) -> Result<Nutrients, SimError> {
        bench
            .spine
            .record(id)
            .map(super::spine_nutrients)
            .ok_or_else(|| SimError::vessel_not_found(id))
    }

    /// Remaining medium volume in one vessel.
    pub fn volume_ml(bench: &Bench, id: &VesselId) -> Result<f64, SimError> {
        bench
            .spine
            .record(id)
            .map(|record| record.volume_ml())
            .ok_or_else(|| SimError::vessel_not_found(id))
    }
}
