/// Site coordinate registry for the bloom monitoring pipeline.
///
/// Maps a site identifier to its (latitude, longitude) pair, loaded once
/// from the coordinate file and read-only thereafter. This is the single
/// source of truth for site positions: both normalizers join against it
/// rather than trusting feed-supplied coordinates.
///
/// The registry file is the one input the pipeline cannot degrade around:
/// without it no observation can ever be mapped, so a missing file is fatal
/// rather than an empty registry.

use std::collections::HashMap;
use std::path::Path;

use crate::ingest::{clean_whitespace, find_column, parse_numeric, split_record};
use crate::logging::{self, DataSource};
use crate::model::PipelineError;

const SITE_ALIASES: &[&str] = &["site_id", "Site_Description", "Site"];
const LAT_ALIASES: &[&str] = &["latitude", "Latitude", "Lat"];
const LON_ALIASES: &[&str] = &["longitude", "Longitude", "Long", "Lon"];

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Immutable site → coordinate mapping. Keys are whitespace-normalized at
/// load; lookups normalize their argument the same way, so a join can never
/// miss over an invisible character.
#[derive(Debug)]
pub struct SiteRegistry {
    coordinates: HashMap<String, (f64, f64)>,
}

impl SiteRegistry {
    /// Loads the registry from the coordinate file.
    ///
    /// Fails with [`PipelineError::RegistryMissing`] if the file is absent;
    /// this is the pipeline's one unrecoverable input. Rows whose
    /// coordinates do not parse register no position: the site simply joins
    /// to null coordinates downstream.
    pub fn load(path: &Path) -> Result<SiteRegistry, PipelineError> {
        if !path.exists() {
            return Err(PipelineError::RegistryMissing(path.display().to_string()));
        }

        let raw = std::fs::read_to_string(path).map_err(|e| PipelineError::Io {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;

        let mut lines = raw.lines();
        let header: Vec<String> = match lines.next() {
            Some(line) => split_record(line).iter().map(|c| clean_whitespace(c)).collect(),
            None => Vec::new(),
        };

        let missing = |name: &str| PipelineError::SchemaViolation {
            path: path.display().to_string(),
            detail: format!("required column '{}' not found", name),
        };
        let site_col = find_column(&header, SITE_ALIASES).ok_or_else(|| missing("site_id"))?;
        let lat_col = find_column(&header, LAT_ALIASES).ok_or_else(|| missing("latitude"))?;
        let lon_col = find_column(&header, LON_ALIASES).ok_or_else(|| missing("longitude"))?;

        let mut coordinates = HashMap::new();
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let fields = split_record(line);
            let field = |idx: usize| fields.get(idx).map(String::as_str).unwrap_or("");

            let site_id = clean_whitespace(field(site_col));
            if site_id.is_empty() {
                continue;
            }

            match (parse_numeric(field(lat_col)), parse_numeric(field(lon_col))) {
                (Some(lat), Some(lon)) => {
                    coordinates.insert(site_id, (lat, lon));
                }
                _ => {
                    logging::debug(
                        DataSource::Registry,
                        Some(&site_id),
                        "unparseable coordinates, site registered without a position",
                    );
                }
            }
        }

        logging::info(
            DataSource::Registry,
            None,
            &format!("loaded {} site coordinates from '{}'", coordinates.len(), path.display()),
        );

        Ok(SiteRegistry { coordinates })
    }

    /// Builds a registry directly from entries. Used by tests and by
    /// callers that already hold coordinates in memory.
    pub fn from_entries(entries: Vec<(String, f64, f64)>) -> SiteRegistry {
        let coordinates = entries
            .into_iter()
            .map(|(site, lat, lon)| (clean_whitespace(&site), (lat, lon)))
            .collect();
        SiteRegistry { coordinates }
    }

    /// Looks up a site's coordinates. Returns `None` for unregistered
    /// sites: an unmatched site yields null coordinates, never a failure.
    pub fn lookup(&self, site_id: &str) -> Option<(f64, f64)> {
        self.coordinates.get(&clean_whitespace(site_id)).copied()
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_registry(dir: &tempfile::TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("site_coordinates.csv");
        let mut file = std::fs::File::create(&path).expect("create registry file");
        file.write_all(contents.as_bytes()).expect("write registry file");
        path
    }

    #[test]
    fn test_missing_registry_file_is_fatal() {
        let err = SiteRegistry::load(Path::new("/nonexistent/site_coordinates.csv"))
            .expect_err("missing registry must be an error");
        assert!(matches!(err, PipelineError::RegistryMissing(_)), "got {:?}", err);
    }

    #[test]
    fn test_lookup_returns_registered_coordinates() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_registry(
            &dir,
            "Site_Description,Latitude,Longitude\n\
             A,-34.9,138.6\n\
             West Lakes,-34.87,138.49\n",
        );
        let registry = SiteRegistry::load(&path).expect("registry should load");
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.lookup("A"), Some((-34.9, 138.6)));
        assert_eq!(registry.lookup("West Lakes"), Some((-34.87, 138.49)));
    }

    #[test]
    fn test_lookup_returns_none_for_unknown_site() {
        let registry = SiteRegistry::from_entries(vec![("A".to_string(), -34.9, 138.6)]);
        assert_eq!(registry.lookup("Somewhere Else"), None);
    }

    #[test]
    fn test_lookup_normalizes_whitespace_on_both_sides() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_registry(
            &dir,
            "site_id,latitude,longitude\nWest\u{a0}Lakes ,-34.87,138.49\n",
        );
        let registry = SiteRegistry::load(&path).expect("registry should load");
        assert_eq!(
            registry.lookup("  West   Lakes"),
            Some((-34.87, 138.49)),
            "joins must not miss over invisible characters"
        );
    }

    #[test]
    fn test_unparseable_coordinates_register_no_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_registry(
            &dir,
            "site_id,latitude,longitude\nA,-34.9,138.6\nB,pending,138.7\n",
        );
        let registry = SiteRegistry::load(&path).expect("one bad row must not abort the load");
        assert_eq!(registry.lookup("A"), Some((-34.9, 138.6)));
        assert_eq!(registry.lookup("B"), None);
    }

    #[test]
    fn test_registry_missing_columns_is_schema_violation() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_registry(&dir, "site_id,latitude\nA,-34.9\n");
        let err = SiteRegistry::load(&path).expect_err("missing longitude column");
        assert!(matches!(err, PipelineError::SchemaViolation { .. }), "got {:?}", err);
    }
}
