/// Map-marker projection over filtered observations.
///
/// A pure per-record mapping, kept free of any rendering concern so it can
/// be tested in isolation: the map library consumes the result, this module
/// never touches the map. Only records with both coordinates (and a dated,
/// non-null measurement to label) become markers.

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::Observation;

// ---------------------------------------------------------------------------
// Marker type
// ---------------------------------------------------------------------------

/// Everything the map layer needs to plot and label one point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub site_id: String,
    pub observed_at: NaiveDate,
    pub species_name: String,
    pub value: f64,
    pub unit: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Popup text: site, date, species, formatted value + unit.
    pub label: String,
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

/// Projects filtered observations to markers. Records without coordinates
/// stay off the map but remain in the filtered set and its counts.
pub fn markers(observations: &[Observation]) -> Vec<MapMarker> {
    observations
        .iter()
        .filter_map(|obs| {
            let (Some(lat), Some(lon)) = (obs.latitude, obs.longitude) else {
                return None;
            };
            let (Some(date), Some(value)) = (obs.observed_at, obs.value) else {
                return None;
            };
            let label = format!(
                "{}\n{}\n{}\n{} {}",
                obs.site_id,
                date,
                obs.species_name,
                format_thousands(value),
                obs.unit
            );
            Some(MapMarker {
                site_id: obs.site_id.clone(),
                observed_at: date,
                species_name: obs.species_name.clone(),
                value,
                unit: obs.unit.clone(),
                latitude: lat,
                longitude: lon,
                label,
            })
        })
        .collect()
}

/// South-west / north-east corner pair enclosing every marker, for the
/// map's fit-to-bounds call. `None` when nothing is plotted.
pub fn map_bounds(markers: &[MapMarker]) -> Option<((f64, f64), (f64, f64))> {
    let first = markers.first()?;
    let mut south = first.latitude;
    let mut north = first.latitude;
    let mut west = first.longitude;
    let mut east = first.longitude;

    for m in &markers[1..] {
        south = south.min(m.latitude);
        north = north.max(m.latitude);
        west = west.min(m.longitude);
        east = east.max(m.longitude);
    }
    Some(((south, west), (north, east)))
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Formats a concentration for label text: rounded to a whole number with
/// thousands separators ("200000" → "200,000").
pub fn format_thousands(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();

    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if rounded < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
