/// The unified observation view: both normalized feeds concatenated into a
/// single schema, plus the derived vocabularies the filter controls are
/// populated from.
///
/// Union is pure concatenation, no deduplication. A primary and a
/// community reading of the "same" event are distinct records by design,
/// since provenance is part of identity. The view is immutable once built;
/// every filtered subset is a fresh allocation derived from it.

use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::path::Path;

use crate::config::AppConfig;
use crate::ingest::{community, primary};
use crate::logging::{self, DataSource};
use crate::model::{Observation, PipelineError, Source};
use crate::sites::SiteRegistry;

// ---------------------------------------------------------------------------
// Unified view
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ObservationSet {
    observations: Vec<Observation>,
}

impl ObservationSet {
    /// Concatenates both normalized streams. Primary records first, then
    /// community, in their source order.
    pub fn union(primary: Vec<Observation>, community: Vec<Observation>) -> ObservationSet {
        let mut observations = primary;
        observations.extend(community);
        ObservationSet { observations }
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Records visible under the current source-inclusion flag.
    pub fn included(&self, include_community: bool) -> impl Iterator<Item = &Observation> {
        self.observations
            .iter()
            .filter(move |o| include_community || o.source == Source::Primary)
    }

    /// Sorted species vocabulary under the inclusion flag. Derived, not
    /// stored: recomputed deterministically so the filter controls
    /// repopulate consistently when the flag changes.
    pub fn distinct_species(&self, include_community: bool) -> Vec<String> {
        let set: BTreeSet<&String> = self
            .included(include_community)
            .map(|o| &o.species_name)
            .filter(|s| !s.is_empty())
            .collect();
        set.into_iter().cloned().collect()
    }

    /// Sorted site vocabulary under the inclusion flag.
    pub fn distinct_sites(&self, include_community: bool) -> Vec<String> {
        let set: BTreeSet<&String> = self
            .included(include_community)
            .map(|o| &o.site_id)
            .filter(|s| !s.is_empty())
            .collect();
        set.into_iter().cloned().collect()
    }

    /// Earliest and latest observation dates under the inclusion flag, or
    /// `None` when no record has a usable date.
    pub fn date_bounds(&self, include_community: bool) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.included(include_community).filter_map(|o| o.observed_at);
        let first = dates.next()?;
        let (min, max) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
        Some((min, max))
    }

    /// Record count across both sources, for the status display's
    /// denominator.
    pub fn total_records(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Session load
// ---------------------------------------------------------------------------

/// Builds the unified view from the configured input files.
///
/// The coordinate registry must load (fatal otherwise); either feed may be
/// absent, degrading to an empty contribution with a warning.
pub fn build_dataset(cfg: &AppConfig) -> Result<ObservationSet, PipelineError> {
    let registry = SiteRegistry::load(Path::new(&cfg.paths.site_coordinates))?;

    let primary = primary::load_primary(Path::new(&cfg.paths.primary_feed), &registry, cfg)?;
    let community =
        community::load_community(Path::new(&cfg.paths.community_feed), &registry, cfg)?;

    logging::info(
        DataSource::System,
        None,
        &format!(
            "loaded {} primary + {} community observations",
            primary.len(),
            community.len()
        ),
    );

    Ok(ObservationSet::union(primary, community))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CANONICAL_UNIT, Source};

    fn obs(site: &str, date: Option<&str>, species: &str, value: Option<f64>, source: Source) -> Observation {
        Observation {
            site_id: site.to_string(),
            observed_at: date.map(|d| d.parse().expect("test date")),
            species_name: species.to_string(),
            value,
            unit: CANONICAL_UNIT.to_string(),
            source,
            latitude: None,
            longitude: None,
        }
    }

    fn sample_set() -> ObservationSet {
        ObservationSet::union(
            vec![
                obs("A", Some("2024-01-03"), "Karenia mikimotoi", Some(1.0), Source::Primary),
                obs("B", Some("2024-01-01"), "Alexandrium sp.", Some(2.0), Source::Primary),
            ],
            vec![
                obs("C", Some("2024-01-05"), "Karenia mikimotoi *", Some(3.0), Source::Community),
            ],
        )
    }

    #[test]
    fn test_union_is_pure_concatenation() {
        let set = sample_set();
        assert_eq!(set.total_records(), 3);
        assert_eq!(set.observations()[0].site_id, "A");
        assert_eq!(set.observations()[2].source, Source::Community);
    }

    #[test]
    fn test_distinct_species_is_sorted_and_respects_inclusion_flag() {
        let set = sample_set();
        assert_eq!(
            set.distinct_species(true),
            vec!["Alexandrium sp.", "Karenia mikimotoi", "Karenia mikimotoi *"]
        );
        assert_eq!(
            set.distinct_species(false),
            vec!["Alexandrium sp.", "Karenia mikimotoi"]
        );
    }

    #[test]
    fn test_community_names_never_collide_with_primary_names() {
        let set = sample_set();
        let combined = set.distinct_species(true);
        // The suffixed community entry and the agency entry coexist as
        // distinct vocabulary items.
        assert!(combined.contains(&"Karenia mikimotoi".to_string()));
        assert!(combined.contains(&"Karenia mikimotoi *".to_string()));
    }

    #[test]
    fn test_date_bounds_span_included_sources() {
        let set = sample_set();
        let (min, max) = set.date_bounds(true).expect("bounds exist");
        assert_eq!(min.to_string(), "2024-01-01");
        assert_eq!(max.to_string(), "2024-01-05");

        let (_, max_primary) = set.date_bounds(false).expect("bounds exist");
        assert_eq!(max_primary.to_string(), "2024-01-03");
    }

    #[test]
    fn test_empty_view_has_no_bounds_and_empty_vocabulary() {
        let set = ObservationSet::union(Vec::new(), Vec::new());
        assert!(set.is_empty());
        assert_eq!(set.date_bounds(true), None);
        assert!(set.distinct_species(true).is_empty());
        assert!(set.distinct_sites(true).is_empty());
    }

    #[test]
    fn test_records_without_dates_are_skipped_by_bounds() {
        let set = ObservationSet::union(
            vec![obs("A", None, "Karenia mikimotoi", None, Source::Primary)],
            Vec::new(),
        );
        assert_eq!(set.date_bounds(true), None);
        // The record still counts toward the total.
        assert_eq!(set.total_records(), 1);
    }
}
