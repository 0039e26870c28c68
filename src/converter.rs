// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Civil time → astronomical time scales.
//!
//! [`TimeScaleConverter`] turns a civil date/time plus a UTC offset into
//! the full set of scales an ephemeris lookup needs: UTC, TAI, TT, UT1
//! and the Julian Day on each of the TT/UT1/UTC axes.
//!
//! ΔT (TT − UT1) comes from a historical reference table when the epoch
//! is covered (linear interpolation between the two nearest rows, exact
//! matches returned verbatim), and from the era polynomials in
//! [`crate::delta_t`] otherwise.  Leap seconds come from the stepwise
//! table in [`crate::leap_seconds`].
//!
//! Conversions are cached by `(civil ISO string, offset string)` with a
//! configurable TTL.  The cache is invalidated only by explicit
//! [`clear_cache`](TimeScaleConverter::clear_cache) or expiry, never by
//! writes.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar;
use crate::delta_t::{self, Confidence};
use crate::error::{Result, VerichronError};
use crate::instant::Time;
use crate::leap_seconds;
use crate::scales::{TAI, TT, UT1};

const SECONDS_PER_DAY: f64 = 86_400.0;
const TT_MINUS_TAI_SECONDS: f64 = 32.184;

/// Bundled historical ΔT table (decadal 1620–1950, then denser to 2024).
const BUNDLED_DELTA_T_JSON: &str = include_str!("../data/delta_t.json");

// ---------------------------------------------------------------------------
// ΔT historical table
// ---------------------------------------------------------------------------

/// One row of the historical ΔT reference table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaTRecord {
    pub year: i32,
    pub month: u32,
    #[serde(rename = "deltaT")]
    pub delta_t: f64,
    pub source: String,
}

impl DeltaTRecord {
    /// Decimal-year coordinate of this row (mid-month).
    fn decimal_year(&self) -> f64 {
        self.year as f64 + (self.month as f64 - 0.5) / 12.0
    }
}

#[derive(Debug, Deserialize)]
struct DeltaTTableFile {
    data: Vec<DeltaTRecord>,
}

/// Where a ΔT value came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DeltaTProvenance {
    /// Interpolated from (or matched in) the historical table.
    Table { source: String },
    /// Computed from an era polynomial.
    Estimate {
        confidence: Confidence,
        uncertainty_seconds: f64,
    },
}

/// A resolved ΔT value with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeltaT {
    /// TT − UT1 in seconds.
    pub seconds: f64,
    pub provenance: DeltaTProvenance,
}

/// Historical ΔT reference table, loaded once and kept sorted.
#[derive(Debug, Clone)]
pub struct DeltaTTable {
    records: Vec<DeltaTRecord>,
}

impl DeltaTTable {
    /// Parse a `{ "data": [...] }` JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: DeltaTTableFile =
            serde_json::from_str(json).map_err(|e| VerichronError::MalformedDeltaTTable {
                path: "<inline>".into(),
                reason: e.to_string(),
            })?;
        Self::from_records(file.data, Path::new("<inline>"))
    }

    /// Read and parse a table file from disk.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json =
            std::fs::read_to_string(path).map_err(|e| VerichronError::MalformedDeltaTTable {
                path: path.to_path_buf(),
                reason: format!("unreadable: {e}"),
            })?;
        let file: DeltaTTableFile =
            serde_json::from_str(&json).map_err(|e| VerichronError::MalformedDeltaTTable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Self::from_records(file.data, path)
    }

    /// The table bundled with the crate.
    pub fn bundled() -> Result<Self> {
        Self::from_json_str(BUNDLED_DELTA_T_JSON)
    }

    fn from_records(mut records: Vec<DeltaTRecord>, path: &Path) -> Result<Self> {
        if records.is_empty() {
            return Err(VerichronError::MalformedDeltaTTable {
                path: path.to_path_buf(),
                reason: "table contains no rows".to_string(),
            });
        }
        for record in &records {
            if !(1..=12).contains(&record.month) {
                return Err(VerichronError::MalformedDeltaTTable {
                    path: path.to_path_buf(),
                    reason: format!("row {}-{} has invalid month", record.year, record.month),
                });
            }
        }
        records.sort_by(|a, b| {
            a.decimal_year()
                .partial_cmp(&b.decimal_year())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// ΔT for a (year, month), if the epoch falls inside the covered range.
    ///
    /// An exact row match returns that row verbatim; otherwise the two
    /// bracketing rows are interpolated linearly.  Epochs outside the
    /// table return `None` so the caller can fall back to the estimate
    /// polynomials.
    pub fn lookup(&self, year: i32, month: u32) -> Option<DeltaT> {
        if let Some(exact) = self
            .records
            .iter()
            .find(|r| r.year == year && r.month == month)
        {
            return Some(DeltaT {
                seconds: exact.delta_t,
                provenance: DeltaTProvenance::Table {
                    source: exact.source.clone(),
                },
            });
        }

        let t = year as f64 + (month as f64 - 0.5) / 12.0;
        let first = self.records.first()?;
        let last = self.records.last()?;
        if t < first.decimal_year() || t > last.decimal_year() {
            return None;
        }

        let upper_idx = self
            .records
            .iter()
            .position(|r| r.decimal_year() >= t)?;
        let upper = &self.records[upper_idx];
        if upper_idx == 0 {
            // Single-sided: only the boundary row is available.
            return Some(DeltaT {
                seconds: upper.delta_t,
                provenance: DeltaTProvenance::Table {
                    source: upper.source.clone(),
                },
            });
        }
        let lower = &self.records[upper_idx - 1];
        let span = upper.decimal_year() - lower.decimal_year();
        let fraction = if span > 0.0 {
            (t - lower.decimal_year()) / span
        } else {
            0.0
        };
        Some(DeltaT {
            seconds: lower.delta_t + fraction * (upper.delta_t - lower.delta_t),
            provenance: DeltaTProvenance::Table {
                source: lower.source.clone(),
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Conversion result
// ---------------------------------------------------------------------------

/// The full time-scale picture of one civil instant.  Immutable.
#[derive(Debug, Clone, Serialize)]
pub struct TimeScaleConversion {
    /// The civil input string, as given.
    pub civil: String,
    /// The source offset string, as given.
    pub offset: String,
    /// The instant normalised to UTC.
    pub utc: DateTime<Utc>,
    pub tai: Time<TAI>,
    pub tt: Time<TT>,
    pub ut1: Time<UT1>,
    pub julian_day_utc: f64,
    pub julian_day_tt: f64,
    pub julian_day_ut1: f64,
    pub delta_t: DeltaT,
    /// Accumulated TAI − UTC at the instant, seconds.
    pub leap_seconds: f64,
}

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

/// Configuration for [`TimeScaleConverter`].
#[derive(Debug, Clone)]
pub struct ConverterConfig {
    /// How long cached conversions stay valid.
    pub cache_ttl: Duration,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(3_600),
        }
    }
}

struct CachedConversion {
    conversion: TimeScaleConversion,
    inserted: Instant,
}

/// Converts civil date/times into the astronomical time scales.
///
/// Holds the historical ΔT table (read once at construction) and a
/// TTL-bounded conversion cache.
pub struct TimeScaleConverter {
    table: DeltaTTable,
    cache: Mutex<HashMap<(String, String), CachedConversion>>,
    cache_ttl: Duration,
}

impl TimeScaleConverter {
    /// Converter backed by the bundled ΔT table and default TTL.
    pub fn new() -> Result<Self> {
        Ok(Self::with_table(
            DeltaTTable::bundled()?,
            ConverterConfig::default(),
        ))
    }

    /// Converter with an explicit table and configuration.
    pub fn with_table(table: DeltaTTable, config: ConverterConfig) -> Self {
        Self {
            table,
            cache: Mutex::new(HashMap::new()),
            cache_ttl: config.cache_ttl,
        }
    }

    /// Converter loading its ΔT table from a file.
    pub fn from_table_file(path: &Path, config: ConverterConfig) -> Result<Self> {
        Ok(Self::with_table(DeltaTTable::from_file(path)?, config))
    }

    /// Convert a civil date/time in the given UTC offset into all scales.
    ///
    /// `civil` is an ISO-8601-ish string (`"1991-07-11T19:04:33"`);
    /// `offset` is `"Z"`, `"UTC"` or `"±HH:MM"`.
    pub fn convert(&self, civil: &str, offset: &str) -> Result<TimeScaleConversion> {
        let key = (civil.to_string(), offset.to_string());
        if let Ok(cache) = self.cache.lock() {
            if let Some(entry) = cache.get(&key) {
                if entry.inserted.elapsed() < self.cache_ttl {
                    log::debug!("time-scale cache hit for {civil} {offset}");
                    return Ok(entry.conversion.clone());
                }
            }
        }

        let conversion = self.convert_uncached(civil, offset)?;

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(
                key,
                CachedConversion {
                    conversion: conversion.clone(),
                    inserted: Instant::now(),
                },
            );
        }
        Ok(conversion)
    }

    fn convert_uncached(&self, civil: &str, offset: &str) -> Result<TimeScaleConversion> {
        let parsed = calendar::parse_civil(civil)?;
        let fixed = calendar::parse_offset(offset)?;
        let utc = calendar::civil_to_utc(&parsed, &fixed)?;

        let julian_day_utc = calendar::jd_utc_from_datetime(&utc);
        let leap = leap_seconds::leap_seconds_for(utc.year(), utc.month());
        let julian_day_tai = julian_day_utc + leap / SECONDS_PER_DAY;
        let julian_day_tt = julian_day_tai + TT_MINUS_TAI_SECONDS / SECONDS_PER_DAY;

        let delta_t = self.delta_t_for(utc.year(), utc.month());
        let julian_day_ut1 = julian_day_tt - delta_t.seconds / SECONDS_PER_DAY;

        Ok(TimeScaleConversion {
            civil: civil.to_string(),
            offset: offset.to_string(),
            utc,
            tai: Time::<TAI>::new(julian_day_tai),
            tt: Time::<TT>::new(julian_day_tt),
            ut1: Time::<UT1>::new(julian_day_ut1),
            julian_day_utc,
            julian_day_tt,
            julian_day_ut1,
            delta_t,
            leap_seconds: leap,
        })
    }

    /// ΔT for a (year, month): table when covered, estimate otherwise.
    pub fn delta_t_for(&self, year: i32, month: u32) -> DeltaT {
        if let Some(from_table) = self.table.lookup(year, month) {
            return from_table;
        }
        let estimate = delta_t::estimate_for_year(year as f64 + (month as f64 - 0.5) / 12.0);
        DeltaT {
            seconds: estimate.seconds,
            provenance: DeltaTProvenance::Estimate {
                confidence: estimate.confidence,
                uncertainty_seconds: estimate.uncertainty_seconds,
            },
        }
    }

    /// Drop every cached conversion.
    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    /// Number of live cache entries (expired ones included until reaped).
    pub fn cache_len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn converter() -> TimeScaleConverter {
        TimeScaleConverter::new().expect("bundled table")
    }

    #[test]
    fn j2000_epoch_scenario() {
        // TT noon on 2000-01-01 is UTC 11:58:55.816 (32 leap + 32.184 s).
        let c = converter()
            .convert("2000-01-01T11:58:55.816", "Z")
            .unwrap();
        assert_relative_eq!(c.julian_day_tt, 2_451_545.0, epsilon = 1e-4);
        assert_eq!(c.leap_seconds, 32.0);
        assert!((c.delta_t.seconds - 64.0).abs() < 1.0, "ΔT = {}", c.delta_t.seconds);
        assert!(matches!(
            c.delta_t.provenance,
            DeltaTProvenance::Table { .. }
        ));
        // UT1 sits ΔT below TT.
        assert_relative_eq!(
            (c.julian_day_tt - c.julian_day_ut1) * 86_400.0,
            c.delta_t.seconds,
            epsilon = 1e-6
        );
    }

    #[test]
    fn offset_is_normalised_to_utc() {
        let a = converter().convert("2000-01-01T17:28:55.816", "+05:30").unwrap();
        let b = converter().convert("2000-01-01T11:58:55.816", "Z").unwrap();
        assert_relative_eq!(a.julian_day_tt, b.julian_day_tt, epsilon = 1e-9);
    }

    #[test]
    fn unparseable_civil_time_is_an_error() {
        let err = converter().convert("eleven-ish", "Z").unwrap_err();
        assert!(matches!(err, VerichronError::InvalidDate { .. }));
    }

    #[test]
    fn exact_table_row_is_returned_verbatim() {
        let c = converter();
        let dt = c.delta_t_for(2000, 1);
        assert_eq!(dt.seconds, 63.83);
        match dt.provenance {
            DeltaTProvenance::Table { ref source } => assert_eq!(source, "IERS"),
            ref other => panic!("expected table provenance, got {other:?}"),
        }
    }

    #[test]
    fn interpolation_between_rows() {
        let c = converter();
        // Between the 2000 (63.83) and 2005 (64.69) rows.
        let dt = c.delta_t_for(2002, 7);
        assert!(dt.seconds > 63.83 && dt.seconds < 64.69, "ΔT = {}", dt.seconds);
        assert!(matches!(dt.provenance, DeltaTProvenance::Table { .. }));
    }

    #[test]
    fn outside_table_falls_back_to_estimate() {
        let c = converter();
        let dt = c.delta_t_for(2045, 6);
        assert!(matches!(
            dt.provenance,
            DeltaTProvenance::Estimate {
                confidence: Confidence::High,
                ..
            }
        ));
        let ancient = c.delta_t_for(900, 1);
        assert!(matches!(
            ancient.provenance,
            DeltaTProvenance::Estimate { .. }
        ));
        assert!(ancient.seconds > 100.0);
    }

    #[test]
    fn roundtrip_civil_to_jd_and_back() {
        let c = converter().convert("1991-07-11T19:04:33", "Z").unwrap();
        let civil = calendar::jd_to_civil(c.julian_day_utc);
        assert_eq!((civil.year, civil.month, civil.day), (1991, 7, 11));
        assert_eq!((civil.hour, civil.minute), (19, 4));
        assert!((civil.second - 33.0).abs() < 1.0);
    }

    #[test]
    fn conversions_are_cached_until_cleared() {
        let c = converter();
        let _ = c.convert("2000-01-01T12:00:00", "Z").unwrap();
        assert_eq!(c.cache_len(), 1);
        let _ = c.convert("2000-01-01T12:00:00", "Z").unwrap();
        assert_eq!(c.cache_len(), 1);
        c.clear_cache();
        assert_eq!(c.cache_len(), 0);
    }

    #[test]
    fn zero_ttl_expires_immediately() {
        let table = DeltaTTable::bundled().unwrap();
        let c = TimeScaleConverter::with_table(
            table,
            ConverterConfig {
                cache_ttl: Duration::from_secs(0),
            },
        );
        let first = c.convert("2000-01-01T12:00:00", "Z").unwrap();
        let second = c.convert("2000-01-01T12:00:00", "Z").unwrap();
        assert_relative_eq!(first.julian_day_tt, second.julian_day_tt, epsilon = 1e-12);
    }

    #[test]
    fn malformed_table_is_rejected() {
        assert!(DeltaTTable::from_json_str("{\"data\": []}").is_err());
        assert!(DeltaTTable::from_json_str("not json").is_err());
        assert!(DeltaTTable::from_json_str(
            "{\"data\": [{\"year\": 2000, \"month\": 13, \"deltaT\": 1.0, \"source\": \"x\"}]}"
        )
        .is_err());
    }

    #[test]
    fn table_rows_are_sorted_on_load() {
        let table = DeltaTTable::from_json_str(
            r#"{"data": [
                {"year": 2010, "month": 1, "deltaT": 66.07, "source": "IERS"},
                {"year": 2000, "month": 1, "deltaT": 63.83, "source": "IERS"}
            ]}"#,
        )
        .unwrap();
        let dt = table.lookup(2005, 1).unwrap();
        assert!(dt.seconds > 63.83 && dt.seconds < 66.07);
    }
}
