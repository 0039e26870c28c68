// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Canonical ephemeris request shape.
//!
//! An [`EphemerisQuery`] is used both to call the oracle and — via its
//! normalised [`cache_key`](EphemerisQuery::cache_key) — as the cache
//! and fixture key.  Only the semantically relevant fields participate
//! in the key, in a fixed order, lower-cased and trimmed, so that field
//! order and cosmetic differences never split the cache.

use serde::{Deserialize, Serialize};

/// Geocentric observer in JPL Horizons site notation.
pub const GEOCENTRIC_OBSERVER: &str = "500@399";

/// Observer-ecliptic longitude/latitude quantity code.
pub const DEFAULT_QUANTITIES: &str = "31";

/// Default output frame.
pub const DEFAULT_COORDINATE_FRAME: &str = "ecliptic";

/// The canonical request shape for one reference position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EphemerisQuery {
    /// Body name, e.g. `"Sun"`.
    pub target_body: String,
    /// Observer site code; geocentric by default.
    pub observer_code: String,
    /// Epoch of the lookup, Julian Day (TT).
    pub julian_day: f64,
    /// Horizons quantity selection.
    pub quantities: String,
    /// Output coordinate frame.
    pub coordinate_frame: String,
}

impl EphemerisQuery {
    /// Query for a body at an epoch with default observer/quantities.
    pub fn new(target_body: &str, julian_day: f64) -> Self {
        Self {
            target_body: target_body.to_string(),
            observer_code: GEOCENTRIC_OBSERVER.to_string(),
            julian_day,
            quantities: DEFAULT_QUANTITIES.to_string(),
            coordinate_frame: DEFAULT_COORDINATE_FRAME.to_string(),
        }
    }

    /// Normalised cache key over the semantically relevant fields.
    ///
    /// Field order is fixed here, so two queries that differ only in
    /// construction order or case produce the same key.
    pub fn cache_key(&self) -> String {
        format!(
            "target={}|observer={}|jd={}|quantities={}|frame={}",
            self.target_body.trim().to_ascii_lowercase(),
            self.observer_code.trim().to_ascii_lowercase(),
            format_julian_day(self.julian_day),
            self.quantities.trim(),
            self.coordinate_frame.trim().to_ascii_lowercase(),
        )
    }

    /// Deterministic fixture filename for this query:
    /// `<lowercased-body>_<jd-with-forced-decimal>.json`.
    pub fn fixture_filename(&self) -> String {
        format!(
            "{}_{}.json",
            self.target_body.trim().to_ascii_lowercase(),
            format_julian_day(self.julian_day)
        )
    }
}

/// Render a Julian Day preserving full decimal precision.
///
/// An integer JD still renders a fractional marker (`2451545.0`, not
/// `2451545`), so derived filenames are byte-stable across calls.
pub fn format_julian_day(jd: f64) -> String {
    if jd.fract() == 0.0 {
        format!("{jd:.1}")
    } else {
        format!("{jd}")
    }
}
