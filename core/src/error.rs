//! Error taxonomy for the vitro engine.
//!
//! Accounting and physics violations indicate a broken invariant and are
//! never recovered locally; configuration and lookup failures fail fast at
//! the call site; operations against unknown vessels are ordinary caller
//! mistakes reported as structured failures.

use thiserror::Error;

/// Kind of configuration table a lookup failed against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParameterKind {
    /// The cell-line parameter table.
    CellLine,
    /// The compound library.
    Compound,
}

impl std::fmt::Display for ParameterKind {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::CellLine => "cell line",
            Self::Compound => "compound",
        };
        formatter.write_str(label)
    }
}

/// Operations rejected before they can take effect.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum InvalidOperationKind {
    /// An instant kill was requested while a hazard commit was in flight.
    #[error("instant kill requested during hazard accounting")]
    InstantKillDuringAccounting,
    /// A passage split ratio below one was requested.
    #[error("split ratio {ratio} is below one")]
    SplitRatioBelowOne {
        /// Ratio that was requested.
        ratio: f64,
    },
    /// A seed was requested with a non-positive cell count.
    #[error("seed count {count} is not positive")]
    NonPositiveSeedCount {
        /// Count that was requested.
        count: f64,
    },
    /// A viability or kill fraction outside `[0, 1]` was supplied.
    #[error("fraction {value} is outside [0, 1]")]
    FractionOutOfRange {
        /// Value that was supplied.
        value: f64,
    },
    /// A treatment was requested with a non-positive dose.
    #[error("dose {dose_um} µM is not positive")]
    NonPositiveDose {
        /// Dose that was requested, in micromolar.
        dose_um: f64,
    },
    /// A seed was requested for a vessel identifier already in use.
    #[error("vessel \"{id}\" already exists")]
    DuplicateVessel {
        /// Identifier that collided.
        id: String,
    },
    /// A negative hazard rate was proposed to the accounting engine.
    #[error("negative hazard rate {rate_per_h}/h proposed")]
    NegativeHazard {
        /// Rate that was proposed.
        rate_per_h: f64,
    },
}

/// Failures surfaced by the vitro engine.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum SimError {
    /// The death ledger exceeded the dead fraction. Always fatal: silently
    /// renormalizing would hide the modeling bug that produced it.
    #[error(
        "conservation violated for vessel \"{vessel}\": ledger sum {ledger_sum} \
         exceeds dead fraction {dead_fraction} by more than {epsilon}"
    )]
    ConservationViolation {
        /// Vessel whose ledger broke conservation.
        vessel: String,
        /// Sum of all ledger fields.
        ledger_sum: f64,
        /// Dead fraction `1 - viability` at the time of the check.
        dead_fraction: f64,
        /// Tolerance the check allowed.
        epsilon: f64,
    },
    /// An operation was rejected before taking any effect.
    #[error("invalid operation: {0}")]
    InvalidOperation(InvalidOperationKind),
    /// A lookup against a configuration table failed; no default is
    /// substituted.
    #[error("unknown {kind} \"{name}\"")]
    MissingParameter {
        /// Table the lookup ran against.
        kind: ParameterKind,
        /// Name that was not found.
        name: String,
    },
    /// An operation targeted a vessel that does not exist.
    #[error("vessel \"{id}\" not found")]
    VesselNotFound {
        /// Identifier that was not found.
        id: String,
    },
}

impl SimError {
    /// Convenience constructor for [`SimError::InvalidOperation`].
    #[must_use]
    pub fn invalid(kind: InvalidOperationKind) -> Self {
        Self::InvalidOperation(kind)
    }

    /// Convenience constructor for [`SimError::VesselNotFound`].
    #[must_use]
    pub fn vessel_not_found(id: &crate::VesselId) -> Self {
        Self::VesselNotFound {
            id: id.as_str().to_owned(),
        }
    }
}
