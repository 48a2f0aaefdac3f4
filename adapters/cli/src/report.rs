//! Plain-text rendering of vessel snapshots for terminal output.

use vitro_core::{DeathMode, LedgerField, VesselSnapshot};

/// Header line for the per-interval culture table.
pub(crate) fn table_header() -> String {
    format!(
        "{:>8}  {:>12}  {:>6}  {:>6}  {:>18}",
        "time", "cells", "viab", "confl", "stress er/mito/tr"
    )
}

/// One culture-table row for the vessel at the given simulated time.
pub(crate) fn table_row(hours: f64, state: &VesselSnapshot) -> String {
    format!(
        "{:>6.1} h  {:>12.4e}  {:>6.3}  {:>6.3}  {:>8.2}/{:.2}/{:.2}",
        hours,
        state.population,
        state.viability,
        state.confluence,
        state.stress.er,
        state.stress.mito,
        state.stress.transport
    )
}

/// Multi-line summary of a vessel: biology, medium, death ledger,
/// exposures, and the cohort mixture.
pub(crate) fn summary(state: &VesselSnapshot) -> String {
    let mut lines = vec![
        format!(
            "vessel {} ({}, passage {})",
            state.id, state.cell_line, state.passage
        ),
        format!(
            "  {:.4e} cells, viability {:.4}, confluence {:.3}",
            state.population, state.viability, state.confluence
        ),
        format!(
            "  glucose {:.2} mM, glutamine {:.2} mM",
            state.nutrients.glucose_mm, state.nutrients.glutamine_mm
        ),
        format!("  death mode: {}", death_mode_label(&state.death_mode)),
    ];
    for field in LedgerField::ALL {
        let fraction = state.ledger.fraction(field);
        if fraction > 0.0 {
            lines.push(format!("    {:<14} {fraction:.6}", field.label()));
        }
    }
    for exposure in &state.exposures {
        let status = match exposure.washed_out_at {
            Some(at) => format!("washed out at {:.1} h", at.get()),
            None => "active".to_owned(),
        };
        lines.push(format!(
            "  exposure {} {:.3} uM since {:.1} h, {status}",
            exposure.compound,
            exposure.dose_um,
            exposure.started_at.get()
        ));
    }
    for cohort in &state.cohorts {
        lines.push(format!(
            "  cohort {} ({:.0}%): viability {:.4}, hazard {:.5}/h",
            cohort.name,
            cohort.fraction * 100.0,
            cohort.viability,
            cohort.hazard_per_h
        ));
    }
    lines.join("\n")
}

fn death_mode_label(mode: &DeathMode) -> String {
    match mode {
        DeathMode::Single(field) => format!("single ({})", field.label()),
        DeathMode::Mixed => "mixed".to_owned(),
        DeathMode::Unknown => "unknown".to_owned(),
    }
}
