// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Accuracy validation for birth-time rectification.
//!
//! This crate checks a rectification pipeline's astronomical outputs
//! against an independent reference oracle and tests the internal
//! consistency of its sub-methods.  It computes positions for nothing
//! and rectifies nothing itself; it judges.
//!
//! # Components
//!
//! | Component | Entry point |
//! |-----------|-------------|
//! | Time-scale converter | [`TimeScaleConverter`] |
//! | Ephemeris record/replay oracle | [`HorizonsClient`](oracle::HorizonsClient) |
//! | Geocoding precision analyzer | [`geocoding`] |
//! | Accuracy metrics engine | [`BtrMetrics`](metrics::BtrMetrics) |
//!
//! # Time scales
//!
//! The typed-instant layer carries a [`Time<S>`] generic over a
//! [`TimeScale`] marker, routed through canonical JD(TT):
//!
//! | Marker | Scale |
//! |--------|-------|
//! | [`JD`] | Julian Date (TT axis) |
//! | [`TT`] | Terrestrial Time |
//! | [`TAI`] | International Atomic Time |
//! | [`UTC`] | Coordinated Universal Time |
//! | [`UT1`] | Universal Time (Earth rotation) |
//!
//! # Determinism
//!
//! The oracle defaults to **replay** mode: every reference position
//! comes from a fixture file named deterministically from the query, and
//! a missing fixture is a hard error.  **Record** mode (explicit opt-in
//! at construction) performs live lookups and persists new fixtures with
//! full provenance.  Automated test runs never touch the network.
//!
//! # Quick example
//!
//! ```no_run
//! use verichron::{TimeScaleConverter, metrics::BtrMetrics, MetricsConfig};
//! use verichron::oracle::{HorizonsClient, OracleConfig};
//!
//! # fn main() -> Result<(), verichron::VerichronError> {
//! let converter = TimeScaleConverter::new()?;
//! let conversion = converter.convert("2000-01-01T11:58:55.816", "Z")?;
//! println!("JD(TT) = {}", conversion.julian_day_tt);
//!
//! let oracle = HorizonsClient::new(OracleConfig::default())?;
//! let engine = BtrMetrics::new(MetricsConfig::default(), converter, oracle);
//! # let _ = engine;
//! # Ok(()) }
//! ```

pub mod calendar;
mod config;
mod converter;
pub mod dasha;
mod delta_t;
mod error;
pub mod geocoding;
pub(crate) mod instant;
mod julian_date_ext;
pub(crate) mod leap_seconds;
pub mod metrics;
pub mod oracle;
pub(crate) mod scales;

// ── Re-exports ────────────────────────────────────────────────────────────

pub use config::{EphemerisThresholds, MetricsConfig};
pub use converter::{
    ConverterConfig, DeltaT, DeltaTProvenance, DeltaTRecord, DeltaTTable, TimeScaleConversion,
    TimeScaleConverter,
};
pub use delta_t::{estimate_for_year, Confidence, DeltaTEstimate};
pub use error::{Result, VerichronError};
pub use instant::{Time, TimeScale};
pub use leap_seconds::{leap_seconds_at_jd_utc, leap_seconds_for};
pub use scales::{JD, TAI, TT, UT1, UTC};

/// Julian Date — continuous count of days since the Julian Period.
///
/// This is a type alias for [`Time<JD>`].
pub type JulianDate = Time<JD>;
