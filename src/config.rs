/// Runtime configuration for the bloom monitoring pipeline.
///
/// Loaded from a TOML file (default `habmon.toml`, overridable via CLI
/// argument or the `HABMON_CONFIG` environment variable). Every field has a
/// default matching the reference deployment, so a missing config file is
/// not an error; the defaults describe the South Australian feeds this
/// service was built around.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::logging::{self, DataSource};
use crate::model::PipelineError;

// ---------------------------------------------------------------------------
// Config tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub community: CommunityConfig,
    pub filter: FilterConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Official agency feed (delimited export, one row per observation).
    pub primary_feed: String,
    /// Community-science sheet (one row per sample, wide species columns).
    pub community_feed: String,
    /// Site coordinate file. The one input the pipeline cannot run without.
    pub site_coordinates: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CommunityConfig {
    /// Declared source-to-target unit multiplier. The community sheet
    /// records thousands of cells per litre; this is a documented property
    /// of the feed, never inferred from its units text.
    pub scale_factor: f64,
    /// Marker appended to community species names so they never collide
    /// with agency names for the same nominal species.
    pub provenance_suffix: String,
    /// Column immediately before the species block.
    pub start_anchor: String,
    /// Last column of the species block (inclusive).
    pub end_anchor: String,
    /// Explicit community-name → agency-name equivalences. A mapped name
    /// joins the agency vocabulary without the provenance suffix; this
    /// table is the only way a name crosses provenance.
    pub species_synonyms: HashMap<String, String>,
    /// Community site-name standardization applied before the coordinate
    /// join, e.g. "Wright Is/ Yilki Bay/reef" → "Wright Island Yilki Bay".
    pub site_aliases: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Keyword for the default species selection: every vocabulary entry
    /// containing it is selected when no prior selection survives.
    pub default_species_keyword: String,
    /// Default date window length, ending at the dataset's newest date.
    pub default_window_days: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Optional log file; console output is always on.
    pub file: Option<String>,
    /// Minimum level: "debug", "info", "warn" or "error".
    pub level: String,
}

// ---------------------------------------------------------------------------
// Defaults (reference deployment)
// ---------------------------------------------------------------------------

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            paths: PathsConfig::default(),
            community: CommunityConfig::default(),
            filter: FilterConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            primary_feed: "hab_monitoring_sites.csv".to_string(),
            community_feed: "community_algae.csv".to_string(),
            site_coordinates: "site_coordinates.csv".to_string(),
        }
    }
}

impl Default for CommunityConfig {
    fn default() -> Self {
        CommunityConfig {
            scale_factor: 1000.0,
            provenance_suffix: " *".to_string(),
            start_anchor: "Salinity (ppt)".to_string(),
            end_anchor: "Total plankton".to_string(),
            species_synonyms: HashMap::new(),
            site_aliases: HashMap::new(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            default_species_keyword: "Karenia".to_string(),
            default_window_days: 7,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            file: None,
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load configuration from `path`. A missing file yields the defaults
    /// with a warning; a file that exists but fails to parse is an error,
    /// since running with silently ignored configuration is worse than
    /// stopping.
    pub fn load(path: &Path) -> Result<AppConfig, PipelineError> {
        if !path.exists() {
            logging::warn(
                DataSource::System,
                None,
                &format!("config file '{}' not found, using defaults", path.display()),
            );
            return Ok(AppConfig::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|e| PipelineError::Io {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;

        toml::from_str(&raw).map_err(|e| PipelineError::SchemaViolation {
            path: path.display().to_string(),
            detail: e.to_string(),
        })
    }
}
