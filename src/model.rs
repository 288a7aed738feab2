/// Core data types for the algal bloom monitoring pipeline.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no logic and no I/O, only types.

use chrono::NaiveDate;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// The single unit every observation carries after normalization,
/// regardless of which feed it came from.
pub const CANONICAL_UNIT: &str = "cells/L";

// ---------------------------------------------------------------------------
// Observation types
// ---------------------------------------------------------------------------

/// Which feed an observation originated from. Provenance is part of record
/// identity: it is always carried explicitly, never inferred from values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Source {
    Primary,
    Community,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Primary => write!(f, "primary"),
            Source::Community => write!(f, "community"),
        }
    }
}

/// One species measurement at one site on one date, the unified record
/// both normalizers produce.
///
/// Fields that failed tolerant coercion at parse time are `None` rather than
/// aborting the batch; such rows are retained but excluded by any filter or
/// join that requires the missing field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    /// Whitespace-normalized site identifier; join key into the registry.
    pub site_id: String,
    /// Calendar date of sample collection, timezone-naive.
    pub observed_at: Option<NaiveDate>,
    /// Canonicalized taxon/result label. Community names carry a provenance
    /// suffix unless an explicit synonym mapping says otherwise.
    pub species_name: String,
    /// Concentration in cells/L after unit normalization.
    pub value: Option<f64>,
    /// Always [`CANONICAL_UNIT`] post-normalization.
    pub unit: String,
    pub source: Source,
    /// Joined from the coordinate registry; `None` if the site is
    /// unregistered and the feed carried no usable coordinates of its own.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

// ---------------------------------------------------------------------------
// Trend types
// ---------------------------------------------------------------------------

/// One point of the per-date, per-species time series produced by the
/// aggregation engine. When several sites are included, `mean_value` is the
/// cross-site average for that date and species.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub species: String,
    pub mean_value: f64,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when loading or normalizing the input files.
///
/// Only two conditions are fatal for the pipeline: a missing coordinate
/// registry (nothing can ever be mapped without it) and a schema-contract
/// violation in a feed that is present but not shaped as documented. Missing
/// feed files degrade to empty datasets and are reported as warnings, not
/// through this type.
#[derive(Debug, PartialEq)]
pub enum PipelineError {
    /// The coordinate registry file does not exist.
    RegistryMissing(String),
    /// A present input file is missing a column the schema requires
    /// (a feed's required column, or the community sheet's anchor columns).
    SchemaViolation { path: String, detail: String },
    /// The file exists but could not be read.
    Io { path: String, detail: String },
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::RegistryMissing(path) => {
                write!(f, "coordinate registry file not found: {}", path)
            }
            PipelineError::SchemaViolation { path, detail } => {
                write!(f, "schema violation in {}: {}", path, detail)
            }
            PipelineError::Io { path, detail } => {
                write!(f, "failed to read {}: {}", path, detail)
            }
        }
    }
}

impl std::error::Error for PipelineError {}
