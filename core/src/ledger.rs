//! Death-accounting ledger: a named partition of the dead fraction by cause.
//!
//! The ledger invariant is the engine's conservation law: the sum of all
//! fields tracks `1 - viability` and may never exceed it. Violations are
//! reported as [`SimError::ConservationViolation`] and are never repaired
//! here; a ledger that breaks conservation is evidence of a modeling bug
//! upstream, not a rounding problem to paper over.

use serde::{Deserialize, Serialize};

use crate::{SimError, VesselId};

/// Dead fraction below which no cause attribution is attempted.
const MODE_FLOOR: f64 = 0.01;
/// Share of the dead fraction a single cause must hold to dominate.
const MODE_DOMINANCE: f64 = 0.6;

/// Named causes tracked by the death ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedgerField {
    /// Killing attributed to compound exposure.
    Compound,
    /// Killing attributed to nutrient depletion.
    Starvation,
    /// Killing attributed to mitotic catastrophe.
    Mitotic,
    /// Killing attributed to endoplasmic-reticulum stress.
    ErStress,
    /// Killing attributed to mitochondrial stress.
    MitoStress,
    /// Killing attributed to transport (secretory) stress.
    TransportStress,
    /// Killing attributed to over-confluence.
    Confluence,
    /// Death present at seeding or caused outside the modeled mechanisms
    /// (for example contamination).
    KnownUnknown,
    /// Bookkeeping residual between the realized kill and the tracked
    /// causes; never credited as a cause in its own right.
    Unattributed,
}

impl LedgerField {
    /// Every ledger field, in canonical order.
    pub const ALL: [LedgerField; 9] = [
        LedgerField::Compound,
        LedgerField::Starvation,
        LedgerField::Mitotic,
        LedgerField::ErStress,
        LedgerField::MitoStress,
        LedgerField::TransportStress,
        LedgerField::Confluence,
        LedgerField::KnownUnknown,
        LedgerField::Unattributed,
    ];

    /// Stable short label for reports and tables.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Compound => "compound",
            Self::Starvation => "starvation",
            Self::Mitotic => "mitotic",
            Self::ErStress => "er",
            Self::MitoStress => "mito",
            Self::TransportStress => "transport",
            Self::Confluence => "confluence",
            Self::KnownUnknown => "known-unknown",
            Self::Unattributed => "unattributed",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Compound => 0,
            Self::Starvation => 1,
            Self::Mitotic => 2,
            Self::ErStress => 3,
            Self::MitoStress => 4,
            Self::TransportStress => 5,
            Self::Confluence => 6,
            Self::KnownUnknown => 7,
            Self::Unattributed => 8,
        }
    }
}

/// Coarse label summarizing what a vessel's population died of.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum DeathMode {
    /// One tracked cause dominates the dead fraction.
    Single(LedgerField),
    /// Several tracked causes contribute without a dominant one.
    Mixed,
    /// Too little death to attribute, or the dead fraction is dominated by
    /// untracked bookkeeping fields.
    Unknown,
}

/// Per-vessel partition of the dead fraction by cause.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeathLedger {
    fractions: [f64; 9],
}

impl Default for DeathLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl DeathLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fractions: [0.0; 9],
        }
    }

    /// Fraction currently credited to the provided field.
    #[must_use]
    pub fn fraction(&self, field: LedgerField) -> f64 {
        self.fractions[field.index()]
    }

    /// Sum of every ledger field.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.fractions.iter().sum()
    }

    /// Credits a realized dead fraction to the named field.
    ///
    /// Negative and non-finite amounts are rejected: callers compute
    /// realized kills from survival factors, so a bad amount means the
    /// caller's accounting is broken.
    pub fn credit(&mut self, field: LedgerField, amount: f64) -> Result<(), SimError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(SimError::invalid(
                crate::InvalidOperationKind::FractionOutOfRange { value: amount },
            ));
        }
        self.fractions[field.index()] += amount;
        Ok(())
    }

    /// Clears every field; only passaging may do this.
    pub fn reset(&mut self) {
        self.fractions = [0.0; 9];
    }

    /// Asserts the conservation law `total() <= 1 - viability + epsilon`.
    ///
    /// On violation the ledger is left untouched and a fatal
    /// [`SimError::ConservationViolation`] is returned; nothing is clamped
    /// or renormalized.
    pub fn assert_conserved(
        &self,
        vessel: &VesselId,
        viability: f64,
        epsilon: f64,
    ) -> Result<(), SimError> {
        let dead_fraction = 1.0 - viability;
        let ledger_sum = self.total();
        if ledger_sum > dead_fraction + epsilon {
            return Err(SimError::ConservationViolation {
                vessel: vessel.as_str().to_owned(),
                ledger_sum,
                dead_fraction,
                epsilon,
            });
        }
        Ok(())
    }

    /// Derives the coarse death-mode label from the current partition.
    #[must_use]
    pub fn death_mode(&self) -> DeathMode {
        let total = self.total();
        if total < MODE_FLOOR {
            return DeathMode::Unknown;
        }

        let mut dominant = LedgerField::Unattributed;
        let mut dominant_fraction = 0.0;
        for field in LedgerField::ALL {
            let fraction = self.fraction(field);
            if fraction > dominant_fraction {
                dominant = field;
                dominant_fraction = fraction;
            }
        }

        if matches!(
            dominant,
            LedgerField::KnownUnknown | LedgerField::Unattributed
        ) {
            return DeathMode::Unknown;
        }
        if dominant_fraction / total >= MODE_DOMINANCE {
            DeathMode::Single(dominant)
        } else {
            DeathMode::Mixed
        }
    }
}
