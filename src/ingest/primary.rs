/// Normalizer for the official agency feed.
///
/// The agency export is already long-format: one row per (site, date,
/// species) observation. Normalization here is cleanup, not reshaping:
/// tolerant date coercion, whitespace canonicalization of the species and
/// site fields, and the coordinate join.

use std::path::Path;

use crate::config::AppConfig;
use crate::logging::{self, DataSource};
use crate::model::{CANONICAL_UNIT, Observation, PipelineError, Source};
use crate::sites::SiteRegistry;

use super::{clean_whitespace, coerce_date, parse_numeric, require_column, split_record};

/// Accepted header spellings: canonical names first, then the agency
/// export's own headers.
const SITE_ALIASES: &[&str] = &["site_id", "Site_Description", "Site", "Location"];
const DATE_ALIASES: &[&str] = &["observed_at", "Date_Sample_Collected", "Date"];
const SPECIES_ALIASES: &[&str] = &["species_name", "Result_Name", "Species"];
const VALUE_ALIASES: &[&str] = &["value", "Result_Value_Numeric"];

/// Loads and normalizes the agency feed.
///
/// A missing file degrades to an empty dataset with a warning; downstream
/// components tolerate empty input. A file that exists but lacks a required
/// column fails fast instead.
pub fn load_primary(
    path: &Path,
    registry: &SiteRegistry,
    _cfg: &AppConfig,
) -> Result<Vec<Observation>, PipelineError> {
    if !path.exists() {
        logging::warn(
            DataSource::Primary,
            None,
            &format!("feed file '{}' not found, using empty dataset", path.display()),
        );
        return Ok(Vec::new());
    }

    super::read_cached(path, |raw| parse_primary(raw, path, registry))
}

fn parse_primary(
    raw: &str,
    path: &Path,
    registry: &SiteRegistry,
) -> Result<Vec<Observation>, PipelineError> {
    let mut lines = raw.lines();
    let header: Vec<String> = match lines.next() {
        Some(line) => split_record(line).iter().map(|c| clean_whitespace(c)).collect(),
        None => return Ok(Vec::new()),
    };

    let site_col = require_column(&header, SITE_ALIASES, path)?;
    let date_col = require_column(&header, DATE_ALIASES, path)?;
    let species_col = require_column(&header, SPECIES_ALIASES, path)?;
    let value_col = require_column(&header, VALUE_ALIASES, path)?;

    let mut observations = Vec::new();

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_record(line);
        let field = |idx: usize| fields.get(idx).map(String::as_str).unwrap_or("");

        let site_id = clean_whitespace(field(site_col));
        let observed_at = coerce_date(field(date_col));
        let species_name = clean_whitespace(field(species_col));
        let mut value = parse_numeric(field(value_col));

        // A measurement needs a species and a date to mean anything; rows
        // missing either keep their slot in the dataset with no value.
        if observed_at.is_none() || species_name.is_empty() {
            value = None;
        }

        let (latitude, longitude) = match registry.lookup(&site_id) {
            Some((lat, lon)) => (Some(lat), Some(lon)),
            None => (None, None),
        };

        observations.push(Observation {
            site_id,
            observed_at,
            species_name,
            value,
            unit: CANONICAL_UNIT.to_string(),
            source: Source::Primary,
            latitude,
            longitude,
        });
    }

    Ok(observations)
}
