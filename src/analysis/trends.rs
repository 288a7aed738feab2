/// Time-series aggregation for the trends chart.
///
/// Groups filtered observations by (date, species) and reduces each group
/// by arithmetic mean. The mean matters when several sites are selected
/// for the same date and species: the chart shows a cross-site average,
/// not a sum. With a single site the mean degenerates to that site's
/// value.

use std::collections::BTreeMap;

use crate::model::{Observation, TrendPoint};

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Aggregates observations into one point per (date, species), averaging
/// values across sites within each group.
///
/// Output is sorted ascending by date, ties broken by species name, so
/// rendering is deterministic. Input order never affects the result.
/// Records without a date or value carry nothing aggregable and are
/// skipped; empty input yields an empty series, not an error.
pub fn aggregate(observations: &[Observation]) -> Vec<TrendPoint> {
    let mut groups: BTreeMap<(chrono::NaiveDate, &str), (f64, usize)> = BTreeMap::new();

    for obs in observations {
        let (Some(date), Some(value)) = (obs.observed_at, obs.value) else {
            continue;
        };
        let entry = groups.entry((date, obs.species_name.as_str())).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|((date, species), (sum, count))| TrendPoint {
            date,
            species: species.to_string(),
            mean_value: sum / count as f64,
        })
        .collect()
}

/// Restricts observations to a single site, for the trends view's
/// all-sites / one-site toggle. Pure projection; the caller aggregates the
/// result.
pub fn restrict_to_site(observations: &[Observation], site_id: &str) -> Vec<Observation> {
    observations
        .iter()
        .filter(|o| o.site_id == site_id)
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
