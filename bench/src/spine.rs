//! Concentration spine: the sole authority over what is dissolved where.
//!
//! Every medium change flows through [`ConcentrationSpine::apply`] as a
//! delivered event, and every successful delivery is appended to a
//! sequence-numbered log. Nothing else in the engine may mutate a
//! concentration, which is what makes the log a faithful transcript: the
//! medium state of any run is a pure function of the seed configuration and
//! the log.

use std::collections::BTreeMap;

use vitro_core::{
    CompoundId, EventPayload, Hours, InvalidOperationKind, Nutrients, ScheduledEvent, SimConfig,
    SimError, SpineLogEntry, VesselId,
};

/// Volume below which evaporation stops concentrating the medium.
const MIN_VOLUME_ML: f64 = 0.02;

/// Medium physics shared by every record, copied out of the run config.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SpinePhysics {
    initial_volume_ml: f64,
    evaporation_per_h: f64,
    edge_evaporation_per_h: f64,
    seed_glucose_mm: f64,
    seed_glutamine_mm: f64,
}

impl SpinePhysics {
    pub(crate) fn from_config(config: &SimConfig) -> Self {
        Self {
            initial_volume_ml: config.initial_volume_ml,
            evaporation_per_h: config.evaporation_per_h,
            edge_evaporation_per_h: config.edge_evaporation_per_h,
            seed_glucose_mm: config.seed_glucose_mm,
            seed_glutamine_mm: config.seed_glutamine_mm,
        }
    }

    fn fresh_record(&self, vessel: &VesselId) -> ConcentrationRecord {
        let evaporation_per_h = if vessel.is_edge_well() {
            self.edge_evaporation_per_h
        } else {
            self.evaporation_per_h
        };
        ConcentrationRecord {
            volume_ml: self.initial_volume_ml,
            evaporation_per_h,
            compounds: BTreeMap::new(),
            nutrients: Nutrients {
                glucose_mm: self.seed_glucose_mm,
                glutamine_mm: self.seed_glutamine_mm,
            },
        }
    }
}

/// What one vessel's medium currently holds.
#[derive(Clone, Debug)]
pub(crate) struct ConcentrationRecord {
    volume_ml: f64,
    evaporation_per_h: f64,
    compounds: BTreeMap<CompoundId, f64>,
    nutrients: Nutrients,
}

impl ConcentrationRecord {
    pub(crate) fn volume_ml(&self) -> f64 {
        self.volume_ml
    }

    pub(crate) fn nutrients(&self) -> Nutrients {
        self.nutrients
    }

    /// Concentration of one compound; zero when it was never added or has
    /// been washed out.
    pub(crate) fn concentration_um(&self, compound: &CompoundId) -> f64 {
        self.compounds.get(compound).copied().unwrap_or(0.0)
    }

    /// Every compound currently present, in identifier order.
    pub(crate) fn compound_ids(&self) -> Vec<CompoundId> {
        self.compounds.keys().cloned().collect()
    }
}

/// Authoritative map of vessel media plus the append-only delivery log.
#[derive(Debug)]
pub(crate) struct ConcentrationSpine {
    physics: SpinePhysics,
    records: BTreeMap<VesselId, ConcentrationRecord>,
    log: Vec<SpineLogEntry>,
    next_sequence: u64,
}

impl ConcentrationSpine {
    pub(crate) fn new(physics: SpinePhysics) -> Self {
        Self {
            physics,
            records: BTreeMap::new(),
            log: Vec::new(),
            next_sequence: 0,
        }
    }

    /// Applies one delivered event to the records and logs it.
    ///
    /// The log records only successful deliveries: a rejected event leaves
    /// both the records and the log untouched.
    pub(crate) fn apply(&mut self, event: &ScheduledEvent) -> Result<(), SimError> {
        let vessel = event.vessel();
        match event.payload() {
            EventPayload::Seed { .. } => {
                if self.records.contains_key(vessel) {
                    return Err(SimError::invalid(InvalidOperationKind::DuplicateVessel {
                        id: vessel.as_str().to_owned(),
                    }));
                }
                let _ = self
                    .records
                    .insert(vessel.clone(), self.physics.fresh_record(vessel));
            }
            EventPayload::Treat {
                compound, dose_um, ..
            } => {
                let record = self.record_mut(vessel)?;
                *record.compounds.entry(compound.clone()).or_insert(0.0) += dose_um;
            }
            EventPayload::Feed {
                glucose_mm,
                glutamine_mm,
            } => {
                // A feed replenishes nutrients in place; compounds are
                // neither diluted nor removed.
                let record = self.record_mut(vessel)?;
                record.nutrients = Nutrients {
                    glucose_mm: *glucose_mm,
                    glutamine_mm: *glutamine_mm,
                };
            }
            EventPayload::Washout { compound } => {
                let record = self.record_mut(vessel)?;
                match compound {
                    Some(compound) => {
                        let _ = record.compounds.remove(compound);
                    }
                    None => record.compounds.clear(),
                }
            }
            EventPayload::Passage { .. } => {
                // The culture moves into fresh medium: compounds gone,
                // nutrients and volume restored to seeding levels.
                let fresh = self.physics.fresh_record(vessel);
                let record = self.record_mut(vessel)?;
                *record = fresh;
            }
            EventPayload::Contaminate { .. } => {
                // Kills cells, not medium chemistry; the log entry is what
                // lets replay re-apply the incident.
                let _ = self.record_mut(vessel)?;
            }
        }

        self.log.push(SpineLogEntry::new(
            self.next_sequence,
            vessel.clone(),
            event.payload().clone(),
            event.time(),
        ));
        self.next_sequence += 1;
        Ok(())
    }

    /// Advances medium physics by `dt_h` hours: evaporation shrinks the
    /// volume and concentrates everything dissolved in it.
    pub(crate) fn update(&mut self, dt_h: f64) {
        if dt_h <= 0.0 {
            return;
        }
        for record in self.records.values_mut() {
            let before = record.volume_ml;
            if before <= MIN_VOLUME_ML {
                continue;
            }
            let after = (before * (-record.evaporation_per_h * dt_h).exp()).max(MIN_VOLUME_ML);
            let factor = before / after;
            record.volume_ml = after;
            for concentration in record.compounds.values_mut() {
                *concentration *= factor;
            }
            record.nutrients.glucose_mm *= factor;
            record.nutrients.glutamine_mm *= factor;
        }
    }

    pub(crate) fn record(&self, vessel: &VesselId) -> Option<&ConcentrationRecord> {
        self.records.get(vessel)
    }

    pub(crate) fn remove(&mut self, vessel: &VesselId) {
        let _ = self.records.remove(vessel);
    }

    /// The append-only delivery log, in sequence order.
    pub(crate) fn log(&self) -> &[SpineLogEntry] {
        &self.log
    }

    fn record_mut(&mut self, vessel: &VesselId) -> Result<&mut ConcentrationRecord, SimError> {
        self.records
            .get_mut(vessel)
            .ok_or_else(|| SimError::vessel_not_found(vessel))
    }
}
