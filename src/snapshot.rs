/// Dashboard snapshot assembly.
///
/// Gathers everything the presentation layer consumes (session warnings,
/// the filtered/total counts, filter-control vocabularies, map markers,
/// and the trends series) into one serializable payload, with a console
/// summary for running the pipeline standalone.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::path::Path;

use crate::analysis::trends;
use crate::dataset::ObservationSet;
use crate::filter::{self, FilterSummary, ResolvedFilter};
use crate::logging;
use crate::markers::{self, MapMarker};
use crate::model::{PipelineError, TrendPoint};

// ---------------------------------------------------------------------------
// Snapshot payload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub generated_at: String,
    /// Non-fatal problems for the inline warning banner.
    pub warnings: Vec<String>,
    pub summary: FilterSummary,
    /// Sorted vocabularies for the filter controls, under the snapshot's
    /// inclusion flag.
    pub species_vocabulary: Vec<String>,
    pub site_vocabulary: Vec<String>,
    /// The selection this snapshot was computed with.
    pub selected_species: Vec<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub include_community: bool,
    pub markers: Vec<MapMarker>,
    /// South-west / north-east corners for the map's fit-to-bounds call.
    pub bounds: Option<((f64, f64), (f64, f64))>,
    pub trends: Vec<TrendPoint>,
}

/// Runs the filter and aggregation engines over the view and assembles the
/// snapshot. The view itself is untouched; everything here is a fresh
/// allocation.
pub fn build_snapshot(view: &ObservationSet, resolved: &ResolvedFilter) -> DashboardSnapshot {
    let filtered = resolved.apply(view);
    let plotted = markers::markers(&filtered);
    let bounds = markers::map_bounds(&plotted);
    let series = trends::aggregate(&filtered);

    DashboardSnapshot {
        generated_at: Utc::now().to_rfc3339(),
        warnings: logging::session_warnings(),
        summary: filter::summarize(filtered.len(), view),
        species_vocabulary: view.distinct_species(resolved.include_community),
        site_vocabulary: view.distinct_sites(resolved.include_community),
        selected_species: resolved.species.iter().cloned().collect(),
        date_from: resolved.date_from,
        date_to: resolved.date_to,
        include_community: resolved.include_community,
        markers: plotted,
        bounds,
        trends: series,
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

pub fn print_summary(snapshot: &DashboardSnapshot) {
    println!("\n═══════════════════════════════════════════════════════════");
    println!("BLOOM MONITORING SNAPSHOT");
    println!("═══════════════════════════════════════════════════════════");
    println!();
    println!(
        "Records:   {}/{} matched for the current selection",
        snapshot.summary.matched, snapshot.summary.total
    );
    println!(
        "Species:   {} selected of {} available",
        snapshot.selected_species.len(),
        snapshot.species_vocabulary.len()
    );
    match (snapshot.date_from, snapshot.date_to) {
        (Some(from), Some(to)) => println!("Dates:     {} to {}", from, to),
        _ => println!("Dates:     no dated records loaded"),
    }
    println!("Sources:   primary{}", if snapshot.include_community { " + community" } else { "" });
    println!("Markers:   {} plottable", snapshot.markers.len());
    println!("Trends:    {} series points", snapshot.trends.len());

    if !snapshot.warnings.is_empty() {
        println!("\nWarnings ({}):", snapshot.warnings.len());
        for warning in &snapshot.warnings {
            println!("  - {}", warning);
        }
    }
    println!("═══════════════════════════════════════════════════════════");
}

/// Writes the snapshot as pretty-printed JSON for the presentation layer.
pub fn write_snapshot(snapshot: &DashboardSnapshot, path: &Path) -> Result<(), PipelineError> {
    let payload = serde_json::to_string_pretty(snapshot).map_err(|e| PipelineError::Io {
        path: path.display().to_string(),
        detail: e.to_string(),
    })?;
    std::fs::write(path, payload).map_err(|e| PipelineError::Io {
        path: path.display().to_string(),
        detail: e.to_string(),
    })
}
