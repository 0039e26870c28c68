// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! # ΔT (Delta T) — UT1↔TT estimate layer
//!
//! Polynomial estimates of **ΔT = TT − UT1** for epochs outside the
//! historical reference table carried by
//! [`DeltaTTable`](crate::converter::DeltaTTable).  Six era-specific
//! expressions cover the useful range; each carries a `confidence` tag
//! and an `uncertainty` in seconds that callers may report.
//!
//! The correction is also applied **automatically** by the
//! [`UT1`](crate::scales::UT1) time-scale marker: converting `Time<UT1>`
//! to any TT-based scale adds ΔT, and the inverse uses a three-iteration
//! fixed-point solver.
//!
//! ## Scientific References
//! * Espenak & Meeus (2006): *Five Millennium Canon of Solar Eclipses*,
//!   polynomial expressions for ΔT (2005–2050 and 1986–2005 bands).
//! * Morrison & Stephenson (2004): "Historical values of the Earth's
//!   clock error" (−500–500 and 500–1800 bands, long-term parabola).
//!
//! ## Valid Time Range
//! Useful from deep antiquity through ≈2050; the fallback parabola keeps
//! the function total beyond that, at `low` confidence.

use qtty::{Days, Seconds};
use serde::{Deserialize, Serialize};

use crate::instant::Time;
use crate::scales::UT1;
use crate::JulianDate;

/// Qualitative reliability of a ΔT estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::High => write!(f, "high"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::Low => write!(f, "low"),
        }
    }
}

/// A ΔT value obtained from the era polynomials.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DeltaTEstimate {
    /// TT − UT1 in seconds.
    pub seconds: f64,
    pub confidence: Confidence,
    /// One-sigma-ish uncertainty in seconds.
    pub uncertainty_seconds: f64,
}

// ------------------------------------------------------------------------------------
// ΔT approximation sections by time interval
// ------------------------------------------------------------------------------------

/// **2005–2050** — Espenak & Meeus extrapolation, `t = y − 2000`.
#[inline]
fn delta_t_modern(year: f64) -> f64 {
    let t = year - 2000.0;
    62.92 + 0.32217 * t + 0.005589 * t * t
}

/// **1986–2005** — Espenak & Meeus quintic, `t = y − 2000`.
#[inline]
fn delta_t_recent(year: f64) -> f64 {
    let t = year - 2000.0;
    63.86 + 0.3345 * t - 0.060374 * t.powi(2)
        + 0.0017275 * t.powi(3)
        + 0.000651814 * t.powi(4)
        + 0.00002373599 * t.powi(5)
}

/// **1800–1986** — long-term parabola centred on 1820, `u = (y − 1820)/100`.
#[inline]
fn delta_t_industrial(year: f64) -> f64 {
    let u = (year - 1820.0) / 100.0;
    -20.0 + 32.0 * u * u
}

/// **500–1800** — Morrison & Stephenson (2004), `u = (y − 1000)/100`.
#[inline]
fn delta_t_medieval(year: f64) -> f64 {
    let u = (year - 1000.0) / 100.0;
    1574.2 - 556.01 * u + 71.23472 * u.powi(2) + 0.319781 * u.powi(3)
        - 0.8503463 * u.powi(4)
        - 0.005050998 * u.powi(5)
        + 0.0083572073 * u.powi(6)
}

/// **−500–500** — Morrison & Stephenson (2004), `u = y/100`.
#[inline]
fn delta_t_ancient(year: f64) -> f64 {
    let u = year / 100.0;
    10583.6 - 1014.41 * u + 33.78311 * u.powi(2) - 5.952053 * u.powi(3)
        - 0.1798452 * u.powi(4)
        + 0.022174192 * u.powi(5)
        + 0.0090316521 * u.powi(6)
}

/// **Outside all bands** — the 1820-centred parabola, unbounded.
#[inline]
fn delta_t_fallback(year: f64) -> f64 {
    let u = (year - 1820.0) / 100.0;
    -20.0 + 32.0 * u * u
}

/// ΔT estimate for a decimal calendar year, with provenance metadata.
pub fn estimate_for_year(year: f64) -> DeltaTEstimate {
    let (seconds, confidence, uncertainty_seconds) = if (2005.0..2050.0).contains(&year) {
        (delta_t_modern(year), Confidence::High, 1.0)
    } else if (1986.0..2005.0).contains(&year) {
        (delta_t_recent(year), Confidence::High, 0.5)
    } else if (1800.0..1986.0).contains(&year) {
        (delta_t_industrial(year), Confidence::Medium, 5.0)
    } else if (500.0..1800.0).contains(&year) {
        (delta_t_medieval(year), Confidence::Medium, 20.0)
    } else if (-500.0..500.0).contains(&year) {
        (delta_t_ancient(year), Confidence::Low, 60.0)
    } else {
        (delta_t_fallback(year), Confidence::Low, 120.0)
    };
    DeltaTEstimate {
        seconds,
        confidence,
        uncertainty_seconds,
    }
}

/// Decimal calendar year for a Julian Day (any smooth axis).
#[inline]
pub(crate) fn year_from_jd(jd: Days) -> f64 {
    2000.0 + (jd - JulianDate::J2000.quantity()).value() / JulianDate::JULIAN_YEAR.value()
}

/// Returns **ΔT** in seconds for a Julian Day on the **UT1** axis.
#[inline]
pub(crate) fn delta_t_seconds_from_ut1(jd_ut1: JulianDate) -> Seconds {
    Seconds::new(estimate_for_year(year_from_jd(jd_ut1.quantity())).seconds)
}

// ── Time<UT1> convenience method ──────────────────────────────────────────

impl Time<UT1> {
    /// Returns **ΔT = TT − UT1** in seconds for this UT1 epoch.
    ///
    /// This is a convenience accessor; the same correction is applied
    /// automatically when converting to any TT-based scale (`.to::<JD>()`).
    #[inline]
    pub fn delta_t(&self) -> Seconds {
        delta_t_seconds_from_ut1(JulianDate::from_days(self.quantity()))
    }
}
