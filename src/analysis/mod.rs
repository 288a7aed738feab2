/// Data organization utilities for the bloom monitoring pipeline.
///
/// This module provides the grouping and reduction helpers behind the
/// trends view. Statistical modeling of bloom risk is out of scope; the
/// chart consumes these series as-is.
///
/// Submodules:
/// - `trends` — per-date, per-species time series from filtered output.

pub mod trends;
