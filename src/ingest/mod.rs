/// Feed ingestion for the bloom monitoring pipeline.
///
/// One submodule per source feed, plus the parsing helpers they share.
/// Both feeds are delimited exports read once at session start; parses are
/// memoized per canonical file path so repeated loads within a session are
/// free. A cache hit returns exactly what a fresh parse of the same file
/// would.
///
/// Parsing is tolerant at row level: unparseable dates, values, and
/// coordinates become `None` and the row is retained. Only structural
/// problems (a required column missing from a file that exists) abort a
/// load.

pub mod community;
pub mod primary;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::model::{Observation, PipelineError};

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// Normalizes whitespace in an identifier or label: non-breaking spaces
/// become regular spaces, runs of whitespace collapse to one, ends trimmed.
/// Applied to site ids and species names before any join or comparison, so
/// entries differing only by invisible characters cannot split into
/// duplicates.
pub fn clean_whitespace(raw: &str) -> String {
    raw.replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits one delimited record into fields, honoring double-quoted fields
/// (species labels and site names in both exports contain commas). A doubled
/// quote inside a quoted field is an escaped quote.
pub fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

/// Coerces a numeric field, `None` on anything unparseable. Accepts the
/// blank/sentinel spellings the exports actually contain, and strips
/// thousands separators ("1,200").
pub fn parse_numeric(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "null" | "na" | "n/a" | "nan" | "-" => return None,
        _ => {}
    }
    trimmed.replace(',', "").parse().ok()
}

/// Looks up the index of a header column by any of its accepted spellings.
/// Header cells are whitespace-normalized before comparison.
pub fn find_column(header: &[String], aliases: &[&str]) -> Option<usize> {
    header
        .iter()
        .position(|h| aliases.iter().any(|a| a.eq_ignore_ascii_case(h)))
}

/// As [`find_column`], but a missing column is a schema-contract violation:
/// the file is present yet not shaped as documented, and parsing on anyway
/// would silently mis-map fields.
pub(crate) fn require_column(
    header: &[String],
    aliases: &[&str],
    path: &Path,
) -> Result<usize, PipelineError> {
    find_column(header, aliases).ok_or_else(|| PipelineError::SchemaViolation {
        path: path.display().to_string(),
        detail: format!("required column '{}' not found", aliases[0]),
    })
}

// ---------------------------------------------------------------------------
// Date coercion
// ---------------------------------------------------------------------------

/// Tolerant date coercion for the agency feed: ISO date or datetime first,
/// then day-first. `None` rather than an error: a bad date keeps its row.
pub fn coerce_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(d);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.date());
        }
    }
    None
}

/// Spreadsheet serial-number day 1 corresponds to 1900-01-01; the epoch is
/// offset to 1899-12-30 to absorb the format's phantom 1900 leap day.
const SHEET_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Serial values outside this window are treated as something other than a
/// date (sample counts, stray numerics), not coerced.
const SHEET_SERIAL_MIN: i64 = 1;
const SHEET_SERIAL_MAX: i64 = 73_050; // 2099-12-31

/// Tolerant date coercion for the community sheet. The sheet's date column
/// is sometimes exported as raw spreadsheet serial numbers, otherwise as
/// day-first strings; try the serial interpretation first, then fall back
/// to string formats.
pub fn coerce_sheet_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(serial) = trimmed.parse::<f64>() {
        let days = serial.trunc() as i64;
        if (SHEET_SERIAL_MIN..=SHEET_SERIAL_MAX).contains(&days) {
            let (y, m, d) = SHEET_EPOCH;
            return NaiveDate::from_ymd_opt(y, m, d).map(|epoch| epoch + Duration::days(days));
        }
        return None;
    }

    coerce_date(trimmed)
}

// ---------------------------------------------------------------------------
// Per-path parse cache
// ---------------------------------------------------------------------------

/// Memoized feed parses, keyed by canonical path. Input files are read once
/// per session; the unified view is rebuilt from these on every load.
static FEED_CACHE: Mutex<Option<HashMap<PathBuf, Vec<Observation>>>> = Mutex::new(None);

/// Reads and parses `path` through the cache. Only successful parses of
/// existing files are cached; a missing file is the caller's policy
/// decision, not a cacheable result.
pub(crate) fn read_cached(
    path: &Path,
    parse: impl FnOnce(&str) -> Result<Vec<Observation>, PipelineError>,
) -> Result<Vec<Observation>, PipelineError> {
    let key = path.canonicalize().map_err(|e| PipelineError::Io {
        path: path.display().to_string(),
        detail: e.to_string(),
    })?;

    {
        let guard = FEED_CACHE.lock().unwrap();
        if let Some(cached) = guard.as_ref().and_then(|m| m.get(&key)) {
            return Ok(cached.clone());
        }
    }

    let raw = std::fs::read_to_string(&key).map_err(|e| PipelineError::Io {
        path: path.display().to_string(),
        detail: e.to_string(),
    })?;
    let parsed = parse(&raw)?;

    FEED_CACHE
        .lock()
        .unwrap()
        .get_or_insert_with(HashMap::new)
        .insert(key, parsed.clone());

    Ok(parsed)
}
