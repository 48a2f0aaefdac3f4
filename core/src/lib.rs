#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the vitro cell-culture engine.
//!
//! This crate defines the vocabulary that connects the authoritative bench,
//! the pure biology systems, and the adapters: vessel and compound
//! identifiers, the scheduled-event envelope delivered through the
//! concentration spine, the death-accounting ledger, the parameter tables
//! that describe cell lines and compounds, the error taxonomy, and the
//! read-only snapshot types callers receive. Nothing in this crate mutates
//! simulation state.

mod error;
mod ledger;
mod params;
mod snapshot;

pub use error::{InvalidOperationKind, ParameterKind, SimError};
pub use ledger::{DeathLedger, DeathMode, LedgerField};
pub use params::{
    CellLineParams, CohortSpec, CompoundParams, Nutrients, SimConfig, StressAxis, StressLevels,
};
pub use snapshot::{
    CohortSnapshot, ContaminationEvent, ExposureSnapshot, FeedReport, PassageReport, Readout,
    ReadoutKind, TreatmentReport, VesselSnapshot, WashoutReport,
};

use serde::{Deserialize, Serialize};

/// Columns on a standard 96-well plate.
const PLATE_COLUMNS: u32 = 12;
/// Rows on a standard 96-well plate, labelled `A` through `H`.
const PLATE_ROWS: u32 = 8;

/// Simulated time expressed in hours since the start of the run.
///
/// The engine treats time as a continuous quantity; callers choose their own
/// discretization when advancing, and the integration contract guarantees
/// that finer discretizations converge to the same biology.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Hours(f64);

impl Hours {
    /// The start of the run.
    pub const ZERO: Hours = Hours(0.0);

    /// Wraps a raw hour count.
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    /// Retrieves the raw hour count.
    #[must_use]
    pub const fn get(&self) -> f64 {
        self.0
    }

    /// Returns the instant `dt` hours after this one.
    #[must_use]
    pub fn plus(self, dt: f64) -> Self {
        Self(self.0 + dt)
    }

    /// Hours elapsed since `earlier`, negative if `earlier` is in the future.
    #[must_use]
    pub fn since(self, earlier: Hours) -> f64 {
        self.0 - earlier.0
    }

    /// Total ordering over timestamps, suitable for sorting event envelopes.
    #[must_use]
    pub fn total_cmp(&self, other: &Hours) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Identifier of a simulated culture vessel.
///
/// Identifiers are caller-chosen strings. Identifiers that parse as 96-well
/// plate coordinates (a row letter `A`–`H` followed by a column number
/// `1`–`12`, e.g. `B7`) additionally classify the vessel as an edge or
/// interior well, which feeds the growth edge penalty and the evaporation
/// rate. Any other identifier is treated as an interior vessel.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VesselId(String);

impl VesselId {
    /// Creates a vessel identifier from the provided name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrows the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reports whether the identifier names an edge well of a 96-well plate.
    #[must_use]
    pub fn is_edge_well(&self) -> bool {
        let mut chars = self.0.chars();
        let Some(row_char) = chars.next() else {
            return false;
        };
        let row = match row_char.to_ascii_uppercase() {
            letter @ 'A'..='H' => letter as u32 - 'A' as u32,
            _ => return false,
        };
        let column: u32 = match chars.as_str().parse() {
            Ok(value) => value,
            Err(_) => return false,
        };
        if column < 1 || column > PLATE_COLUMNS {
            return false;
        }
        row == 0 || row == PLATE_ROWS - 1 || column == 1 || column == PLATE_COLUMNS
    }
}

impl std::fmt::Display for VesselId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Identifier of a compound known to the compound library.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompoundId(String);

impl CompoundId {
    /// Creates a compound identifier from the provided name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrows the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CompoundId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Monotonic identifier assigned to a scheduled event at submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(u64);

impl EventId {
    /// Creates an event identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Delivery priority of a scheduled event; lower values deliver first.
///
/// Defaults enforce the bench-work ordering "remove, then replenish, then
/// add": seeding before washout, washout before feeding, feeding before
/// treatment, and everything else last.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventPriority(u32);

impl EventPriority {
    /// Priority applied to seed events.
    pub const SEED: EventPriority = EventPriority(0);
    /// Priority applied to washout events.
    pub const WASHOUT: EventPriority = EventPriority(10);
    /// Priority applied to feed events.
    pub const FEED: EventPriority = EventPriority(20);
    /// Priority applied to treatment events.
    pub const TREAT: EventPriority = EventPriority(30);
    /// Priority applied to events with no dedicated slot.
    pub const OTHER: EventPriority = EventPriority(50);

    /// Creates a priority with an explicit numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric priority value.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Default priority for the provided payload.
    #[must_use]
    pub fn default_for(payload: &EventPayload) -> Self {
        match payload {
            EventPayload::Seed { .. } => Self::SEED,
            EventPayload::Washout { .. } => Self::WASHOUT,
            EventPayload::Feed { .. } => Self::FEED,
            EventPayload::Treat { .. } => Self::TREAT,
            EventPayload::Passage { .. } | EventPayload::Contaminate { .. } => Self::OTHER,
        }
    }
}

/// Operation carried by a scheduled event and delivered into the spine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    /// Initializes a vessel and its concentration record.
    Seed {
        /// Name of the cell line occupying the vessel.
        cell_line: String,
        /// Number of cells deposited at seeding.
        count: f64,
        /// Carrying capacity of the vessel in cells.
        capacity: f64,
        /// Fraction of the seeded cells that are alive, in `[0, 1]`.
        initial_viability: f64,
    },
    /// Adds a compound to the vessel's medium at the requested dose.
    Treat {
        /// Compound being applied.
        compound: CompoundId,
        /// Dose added to the medium, in micromolar.
        dose_um: f64,
        /// Scalar applied to the compound's ongoing attrition hazard.
        potency: f64,
        /// Scalar applied to the compound's immediate kill effect.
        toxicity: f64,
    },
    /// Resets nutrients to the provided targets; compounds are unchanged and
    /// no dilution is credited.
    Feed {
        /// Glucose target after the feed, in millimolar.
        glucose_mm: f64,
        /// Glutamine target after the feed, in millimolar.
        glutamine_mm: f64,
    },
    /// Zeroes the named compound, or every compound when none is named.
    Washout {
        /// Compound to remove; `None` removes all compounds.
        compound: Option<CompoundId>,
    },
    /// Splits the culture into fresh medium: nutrients and volume reset,
    /// compounds cleared.
    Passage {
        /// Ratio the population is divided by; at least one.
        split_ratio: f64,
    },
    /// A contamination incident: an immediate kill across every cohort,
    /// booked as a known unknown. Logged like any other delivery so replay
    /// re-applies it without rolling the operations stream.
    Contaminate {
        /// Fraction of every cohort killed by the incident, in `[0, 1]`.
        severity: f64,
    },
}

/// Envelope describing one pending operation, immutable once created.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduledEvent {
    id: EventId,
    vessel: VesselId,
    payload: EventPayload,
    time: Hours,
    duration: Hours,
    priority: EventPriority,
}

impl ScheduledEvent {
    /// Creates a new event envelope.
    #[must_use]
    pub fn new(
        id: EventId,
        vessel: VesselId,
        payload: EventPayload,
        time: Hours,
        duration: Hours,
        priority: EventPriority,
    ) -> Self {
        Self {
            id,
            vessel,
            payload,
            time,
            duration,
            priority,
        }
    }

    /// Identifier assigned at submission.
    #[must_use]
    pub const fn id(&self) -> EventId {
        self.id
    }

    /// Vessel the event targets.
    #[must_use]
    pub fn vessel(&self) -> &VesselId {
        &self.vessel
    }

    /// Operation carried by the event.
    #[must_use]
    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    /// Requested delivery time.
    #[must_use]
    pub const fn time(&self) -> Hours {
        self.time
    }

    /// Duration of the operation; zero for instantaneous operations.
    #[must_use]
    pub const fn duration(&self) -> Hours {
        self.duration
    }

    /// Delivery priority.
    #[must_use]
    pub const fn priority(&self) -> EventPriority {
        self.priority
    }

    /// Delivery-order key: events deliver sorted by (time, priority, id).
    #[must_use]
    pub fn order_key(&self) -> (Hours, EventPriority, EventId) {
        (self.time, self.priority, self.id)
    }
}

/// One entry of the spine's append-only, replayable event log.
///
/// Entries deliberately omit the submission-order [`EventId`]: two runs that
/// submit the same operations for the same timestamps in different orders
/// must produce byte-identical logs, because delivery order is governed by
/// (time, priority) alone when ids differ only by submission order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpineLogEntry {
    sequence: u64,
    vessel: VesselId,
    payload: EventPayload,
    time: Hours,
}

impl SpineLogEntry {
    /// Creates a log entry with the provided delivery sequence number.
    #[must_use]
    pub fn new(sequence: u64, vessel: VesselId, payload: EventPayload, time: Hours) -> Self {
        Self {
            sequence,
            vessel,
            payload,
            time,
        }
    }

    /// Position of the entry in the delivery order.
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Vessel the delivered operation targeted.
    #[must_use]
    pub fn vessel(&self) -> &VesselId {
        &self.vessel
    }

    /// Operation that was delivered.
    #[must_use]
    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    /// Simulated time at which the operation was delivered.
    #[must_use]
    pub const fn time(&self) -> Hours {
        self.time
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CompoundId, EventId, EventPayload, EventPriority, Hours, SpineLogEntry, VesselId,
    };
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn payload_round_trips_through_bincode() {
        assert_round_trip(&EventPayload::Treat {
            compound: CompoundId::new("staurosporine"),
            dose_um: 0.5,
            potency: 1.0,
            toxicity: 1.0,
        });
        assert_round_trip(&EventPayload::Washout { compound: None });
    }

    #[test]
    fn log_entry_round_trips_through_bincode() {
        let entry = SpineLogEntry::new(
            3,
            VesselId::new("B7"),
            EventPayload::Feed {
                glucose_mm: 25.0,
                glutamine_mm: 4.0,
            },
            Hours::new(24.0),
        );
        assert_round_trip(&entry);
    }

    #[test]
    fn plate_coordinates_classify_edge_wells() {
        for edge in ["A1", "A12", "H1", "H12", "A6", "H6", "D1", "D12", "b1"] {
            assert!(VesselId::new(edge).is_edge_well(), "{edge} should be edge");
        }
        for interior in ["B2", "D7", "G11", "flask-1", "", "Z4", "B13", "B0"] {
            assert!(
                !VesselId::new(interior).is_edge_well(),
                "{interior} should be interior"
            );
        }
    }

    #[test]
    fn default_priorities_enforce_remove_replenish_add() {
        let washout = EventPriority::default_for(&EventPayload::Washout { compound: None });
        let feed = EventPriority::default_for(&EventPayload::Feed {
            glucose_mm: 25.0,
            glutamine_mm: 4.0,
        });
        let treat = EventPriority::default_for(&EventPayload::Treat {
            compound: CompoundId::new("paclitaxel"),
            dose_um: 0.1,
            potency: 1.0,
            toxicity: 1.0,
        });
        let passage = EventPriority::default_for(&EventPayload::Passage { split_ratio: 4.0 });
        let contaminate =
            EventPriority::default_for(&EventPayload::Contaminate { severity: 0.1 });
        assert!(EventPriority::SEED < washout);
        assert!(washout < feed);
        assert!(feed < treat);
        assert!(treat < EventPriority::OTHER);
        assert_eq!(passage, EventPriority::OTHER);
        assert_eq!(contaminate, EventPriority::OTHER);
    }

    #[test]
    fn event_ids_order_monotonically() {
        assert!(EventId::new(1) < EventId::new(2));
        assert_eq!(EventId::new(7).get(), 7);
    }

    #[test]
    fn hours_total_order_handles_equal_timestamps() {
        let a = Hours::new(12.0);
        let b = Hours::new(12.0);
        assert_eq!(a.total_cmp(&b), std::cmp::Ordering::Equal);
        assert!(a.plus(0.5).since(b) > 0.0);
    }
}
