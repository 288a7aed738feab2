/// Normalizer for the community-science feed.
///
/// The community sheet is wide: one row per sample, one column per species.
/// The species block is the contiguous span of columns bounded by two named
/// anchor columns: everything strictly after the start anchor through the
/// end anchor, inclusive. Anchors are config values, and a missing anchor is
/// a schema-contract violation: reshaping a shifted column span would
/// silently mis-map which columns are treated as species.
///
/// Each sample row unpivots into one observation per species column,
/// inheriting the sample's site, date, and coordinates. Values are rescaled
/// by the declared source-to-target factor, and species names receive the
/// provenance suffix unless an explicit synonym mapping carries them into
/// the agency vocabulary.

use std::ops::RangeInclusive;
use std::path::Path;

use crate::config::AppConfig;
use crate::logging::{self, DataSource};
use crate::model::{CANONICAL_UNIT, Observation, PipelineError, Source};
use crate::sites::SiteRegistry;

use super::{clean_whitespace, coerce_sheet_date, parse_numeric, require_column, split_record};

const SITE_ALIASES: &[&str] = &["Location", "site_id", "Site_Description"];
const DATE_ALIASES: &[&str] = &["Date", "observed_at"];
const LAT_ALIASES: &[&str] = &["Lat", "Latitude", "latitude"];
const LON_ALIASES: &[&str] = &["Long", "Lon", "Longitude", "longitude"];

/// Loads and normalizes the community feed. Missing file → empty dataset
/// plus a warning, same policy as the agency feed.
pub fn load_community(
    path: &Path,
    registry: &SiteRegistry,
    cfg: &AppConfig,
) -> Result<Vec<Observation>, PipelineError> {
    if !path.exists() {
        logging::warn(
            DataSource::Community,
            None,
            &format!("feed file '{}' not found, using empty dataset", path.display()),
        );
        return Ok(Vec::new());
    }

    super::read_cached(path, |raw| parse_community(raw, path, registry, cfg))
}

/// Resolves the anchor-bounded species span: the columns strictly after
/// `start_anchor` through `end_anchor`, end inclusive. Fails fast, naming
/// the missing boundary, rather than guessing at the span.
pub fn species_span(
    header: &[String],
    start_anchor: &str,
    end_anchor: &str,
    path: &Path,
) -> Result<RangeInclusive<usize>, PipelineError> {
    let violation = |detail: String| PipelineError::SchemaViolation {
        path: path.display().to_string(),
        detail,
    };

    let start = header
        .iter()
        .position(|h| h == start_anchor)
        .ok_or_else(|| violation(format!("start anchor column '{}' not found", start_anchor)))?;
    let end = header
        .iter()
        .position(|h| h == end_anchor)
        .ok_or_else(|| violation(format!("end anchor column '{}' not found", end_anchor)))?;

    if end <= start {
        return Err(violation(format!(
            "end anchor '{}' does not follow start anchor '{}'",
            end_anchor, start_anchor
        )));
    }

    Ok(start + 1..=end)
}

fn parse_community(
    raw: &str,
    path: &Path,
    registry: &SiteRegistry,
    cfg: &AppConfig,
) -> Result<Vec<Observation>, PipelineError> {
    let community = &cfg.community;

    let mut lines = raw.lines();
    let header: Vec<String> = match lines.next() {
        Some(line) => split_record(line).iter().map(|c| clean_whitespace(c)).collect(),
        None => return Ok(Vec::new()),
    };

    let site_col = require_column(&header, SITE_ALIASES, path)?;
    let date_col = require_column(&header, DATE_ALIASES, path)?;
    let lat_col = super::find_column(&header, LAT_ALIASES);
    let lon_col = super::find_column(&header, LON_ALIASES);

    let span = species_span(&header, &community.start_anchor, &community.end_anchor, path)?;

    let mut observations = Vec::new();

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_record(line);
        let field = |idx: usize| fields.get(idx).map(String::as_str).unwrap_or("");

        let reported_site = clean_whitespace(field(site_col));
        let site_id = community
            .site_aliases
            .get(&reported_site)
            .map(|canonical| clean_whitespace(canonical))
            .unwrap_or(reported_site);

        let observed_at = coerce_sheet_date(field(date_col));

        // Registry coordinates win; the sheet's own Lat/Long only stand in
        // for sites the registry has never heard of.
        let sheet_lat = lat_col.and_then(|idx| parse_numeric(field(idx)));
        let sheet_lon = lon_col.and_then(|idx| parse_numeric(field(idx)));
        let (latitude, longitude) = match registry.lookup(&site_id) {
            Some((lat, lon)) => (Some(lat), Some(lon)),
            None => (sheet_lat, sheet_lon),
        };

        for idx in span.clone() {
            let reported_name = &header[idx];
            if reported_name.is_empty() {
                continue;
            }

            let species_name = match community.species_synonyms.get(reported_name) {
                // The one auditable path across provenance: a declared
                // equivalence joins the agency vocabulary as-is.
                Some(agency_name) => clean_whitespace(agency_name),
                None => format!("{}{}", reported_name, community.provenance_suffix),
            };

            let mut value =
                parse_numeric(field(idx)).map(|v| v * community.scale_factor);
            if observed_at.is_none() {
                value = None;
            }

            observations.push(Observation {
                site_id: site_id.clone(),
                observed_at,
                species_name,
                value,
                unit: CANONICAL_UNIT.to_string(),
                source: Source::Community,
                latitude,
                longitude,
            });
        }
    }

    Ok(observations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn registry() -> SiteRegistry {
        SiteRegistry::from_entries(vec![("B".to_string(), -35.5, 138.7)])
    }

    fn parse(raw: &str, cfg: &AppConfig) -> Vec<Observation> {
        parse_community(raw, Path::new("community_algae.csv"), &registry(), cfg)
            .expect("sheet should parse")
    }

    const WIDE_HEADER: &str =
        "Location,Date,Time,Temp,Salinity (ppt),Karenia mikimotoi,Alexandrium sp.,Total plankton,Notes";

    #[test]
    fn test_reshape_produces_one_row_per_species_column() {
        let cfg = AppConfig::default();
        let raw = format!("{}\nB,01/02/2024,09:30,18.2,36.1,5,2,7,calm water\n", WIDE_HEADER);
        let rows = parse(&raw, &cfg);

        // Three columns sit in the anchor-bounded span (end anchor counts),
        // so one sample row becomes exactly three observations.
        assert_eq!(rows.len(), 3);
        let names: Vec<&str> = rows.iter().map(|o| o.species_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Karenia mikimotoi *", "Alexandrium sp. *", "Total plankton *"]
        );
        for obs in &rows {
            assert_eq!(obs.site_id, "B");
            assert_eq!(obs.observed_at, NaiveDate::from_ymd_opt(2024, 2, 1));
            assert_eq!(obs.source, Source::Community);
            assert_eq!(obs.unit, CANONICAL_UNIT);
            assert_eq!(obs.latitude, Some(-35.5));
        }
    }

    #[test]
    fn test_values_are_rescaled_by_declared_factor() {
        let cfg = AppConfig::default();
        let raw = format!("{}\nB,01/02/2024,,,36.1,5,,7,\n", WIDE_HEADER);
        let rows = parse(&raw, &cfg);
        assert_eq!(rows[0].value, Some(5000.0));
        assert_eq!(rows[1].value, None, "blank cell stays null, not zero");
        assert_eq!(rows[2].value, Some(7000.0));
    }

    #[test]
    fn test_missing_end_anchor_fails_fast() {
        let cfg = AppConfig::default();
        let raw = "Location,Date,Salinity (ppt),Karenia mikimotoi,Notes\nB,01/02/2024,36.1,5,\n";
        let err = parse_community(raw, Path::new("community_algae.csv"), &registry(), &cfg)
            .expect_err("absent end anchor must not silently reshape");
        assert!(matches!(err, PipelineError::SchemaViolation { .. }), "got {:?}", err);
        assert!(err.to_string().contains("Total plankton"));
    }

    #[test]
    fn test_missing_start_anchor_fails_fast() {
        let cfg = AppConfig::default();
        let raw = "Location,Date,Karenia mikimotoi,Total plankton\nB,01/02/2024,5,7\n";
        let err = parse_community(raw, Path::new("community_algae.csv"), &registry(), &cfg)
            .expect_err("absent start anchor must not silently reshape");
        assert!(matches!(err, PipelineError::SchemaViolation { .. }), "got {:?}", err);
    }

    #[test]
    fn test_synonym_mapping_crosses_provenance_without_suffix() {
        let mut cfg = AppConfig::default();
        cfg.community
            .species_synonyms
            .insert("Karenia mikimotoi".to_string(), "Karenia mikimotoi".to_string());
        let raw = format!("{}\nB,01/02/2024,,,36.1,5,2,7,\n", WIDE_HEADER);
        let rows = parse(&raw, &cfg);

        assert_eq!(rows[0].species_name, "Karenia mikimotoi");
        // Unmapped names still carry the marker.
        assert_eq!(rows[1].species_name, "Alexandrium sp. *");
    }

    #[test]
    fn test_site_alias_applied_before_coordinate_join() {
        let mut cfg = AppConfig::default();
        cfg.community
            .site_aliases
            .insert("B reef".to_string(), "B".to_string());
        let raw = format!("{}\nB reef,01/02/2024,,,36.1,5,2,7,\n", WIDE_HEADER);
        let rows = parse(&raw, &cfg);
        assert_eq!(rows[0].site_id, "B");
        assert_eq!(rows[0].latitude, Some(-35.5));
    }

    #[test]
    fn test_sheet_coordinates_used_for_unregistered_sites_only() {
        let cfg = AppConfig::default();
        let header = "Location,Date,Lat,Long,Salinity (ppt),Karenia mikimotoi,Total plankton";
        let raw = format!(
            "{}\nB,01/02/2024,-30.0,130.0,36.1,5,7\nNew Jetty,01/02/2024,-33.1,137.8,36.0,4,6\n",
            header
        );
        let rows = parse(&raw, &cfg);

        // Registered site: the registry's coordinates win over the sheet's.
        assert_eq!(rows[0].latitude, Some(-35.5));
        assert_eq!(rows[0].longitude, Some(138.7));
        // Unregistered site: fall back to the sheet's own columns.
        assert_eq!(rows[2].latitude, Some(-33.1));
        assert_eq!(rows[2].longitude, Some(137.8));
    }

    #[test]
    fn test_spreadsheet_serial_dates_are_coerced() {
        let cfg = AppConfig::default();
        let raw = format!("{}\nB,45292,,,36.1,5,2,7,\n", WIDE_HEADER);
        let rows = parse(&raw, &cfg);
        assert_eq!(rows[0].observed_at, NaiveDate::from_ymd_opt(2024, 1, 1));
    }

    #[test]
    fn test_unparseable_date_nulls_values_but_keeps_rows() {
        let cfg = AppConfig::default();
        let raw = format!("{}\nB,whenever,,,36.1,5,2,7,\n", WIDE_HEADER);
        let rows = parse(&raw, &cfg);
        assert_eq!(rows.len(), 3, "bad date must not abort the sample row");
        assert!(rows.iter().all(|o| o.observed_at.is_none() && o.value.is_none()));
    }

    #[test]
    fn test_missing_file_degrades_to_empty_dataset() {
        let cfg = AppConfig::default();
        let rows = load_community(Path::new("/nonexistent/community.csv"), &registry(), &cfg)
            .expect("missing community file must not be fatal");
        assert!(rows.is_empty());
    }
}
