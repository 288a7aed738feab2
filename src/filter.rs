/// Filter engine for the unified observation view.
///
/// The engine itself is a pure predicate over immutable input: species
/// membership AND an inclusive date interval AND a non-null value. All
/// three are required; a record failing any one is excluded from both the
/// map and the count.
///
/// Selection state is explicit, not ambient: the caller passes a
/// [`FilterState`] in and gets the resolved selection back, so reruns
/// carry prior choices as data. Prior species selections are intersected
/// with the currently available vocabulary; only when the intersection is
/// empty does the keyword-based default policy apply. The engine never
/// widens an empty selector to "all" on its own.

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::config::AppConfig;
use crate::dataset::ObservationSet;
use crate::model::Observation;

// ---------------------------------------------------------------------------
// Engine predicate
// ---------------------------------------------------------------------------

fn matches(
    obs: &Observation,
    species: &BTreeSet<String>,
    date_from: NaiveDate,
    date_to: NaiveDate,
) -> bool {
    let Some(date) = obs.observed_at else {
        return false;
    };
    obs.value.is_some()
        && species.contains(&obs.species_name)
        && date_from <= date
        && date <= date_to
}

/// Returns the observations matching the predicate, as a fresh allocation.
/// Both interval ends are inclusive. Idempotent: filtering an
/// already-filtered result with the same predicate returns the same set.
pub fn filter_observations(
    observations: &[Observation],
    species: &BTreeSet<String>,
    date_from: NaiveDate,
    date_to: NaiveDate,
) -> Vec<Observation> {
    observations
        .iter()
        .filter(|o| matches(o, species, date_from, date_to))
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Default selection policy
// ---------------------------------------------------------------------------

/// The default species selection: every vocabulary entry containing the
/// keyword, falling back to the first entry when nothing matches. An empty
/// vocabulary yields an empty selection.
pub fn default_species(vocabulary: &[String], keyword: &str) -> Vec<String> {
    let keyword_matches: Vec<String> = vocabulary
        .iter()
        .filter(|s| s.contains(keyword))
        .cloned()
        .collect();
    if !keyword_matches.is_empty() {
        return keyword_matches;
    }
    vocabulary.first().cloned().into_iter().collect()
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Filter selections as they survive across reruns. Unset fields mean "use
/// the defaults against the current dataset".
#[derive(Debug, Clone, Default)]
pub struct FilterState {
    pub species: Vec<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub include_community: bool,
}

/// A [`FilterState`] resolved against a concrete view: species validated
/// against the vocabulary, dates concrete (or absent when the view holds no
/// dated records at all).
#[derive(Debug, Clone)]
pub struct ResolvedFilter {
    pub species: BTreeSet<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub include_community: bool,
}

impl FilterState {
    /// Resolves this state against the view's current vocabulary and date
    /// bounds, applying the default policies where selections are missing
    /// or no longer available.
    pub fn resolve(&self, view: &ObservationSet, cfg: &AppConfig) -> ResolvedFilter {
        let vocabulary = view.distinct_species(self.include_community);

        let mut species: Vec<String> = self
            .species
            .iter()
            .filter(|s| vocabulary.binary_search(*s).is_ok())
            .cloned()
            .collect();
        if species.is_empty() {
            species = default_species(&vocabulary, &cfg.filter.default_species_keyword);
        }

        let (date_from, date_to) = match (self.date_from, self.date_to) {
            (Some(from), Some(to)) => (Some(from), Some(to)),
            // Incomplete range: default to the trailing window over
            // whatever the included sources actually cover.
            _ => match view.date_bounds(self.include_community) {
                Some((min, max)) => {
                    let window_start = max - Duration::days(cfg.filter.default_window_days as i64);
                    (Some(window_start.max(min)), Some(max))
                }
                None => (None, None),
            },
        };

        ResolvedFilter {
            species: species.into_iter().collect(),
            date_from,
            date_to,
            include_community: self.include_community,
        }
    }
}

impl ResolvedFilter {
    /// Runs the engine over the records visible under the inclusion flag.
    pub fn apply(&self, view: &ObservationSet) -> Vec<Observation> {
        let (Some(from), Some(to)) = (self.date_from, self.date_to) else {
            return Vec::new();
        };
        view.included(self.include_community)
            .filter(|o| matches(o, &self.species, from, to))
            .cloned()
            .collect()
    }

    /// The state to carry into the next rerun, so resolution is stable
    /// until the user or the data changes something.
    pub fn to_state(&self) -> FilterState {
        FilterState {
            species: self.species.iter().cloned().collect(),
            date_from: self.date_from,
            date_to: self.date_to,
            include_community: self.include_community,
        }
    }
}

// ---------------------------------------------------------------------------
// Status counts
// ---------------------------------------------------------------------------

/// Matched-versus-total record counts for the status display. The total
/// spans both sources regardless of the inclusion flag, matching the
/// record counter the dashboard shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FilterSummary {
    pub matched: usize,
    pub total: usize,
}

pub fn summarize(matched: usize, view: &ObservationSet) -> FilterSummary {
    FilterSummary {
        matched,
        total: view.total_records(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
