// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Vimshotari dasha periods.
//!
//! The Vimshotari system divides life into nine planetary major periods
//! (mahadashas) totalling 120 years, entered according to the natal
//! Moon's nakshatra.  The fraction of the nakshatra already traversed at
//! birth shortens the first period proportionally (the "balance of
//! dasha").  Each mahadasha subdivides into nine antardashas whose
//! lengths are proportional to the sub-lords' full-period years.
//!
//! Used by the metrics engine to judge whether reported life events fall
//! in periods ruled by planets that signify them.

use serde::{Deserialize, Serialize};

/// Days per dasha year (Julian years).
const YEAR_DAYS: f64 = 365.25;

/// Full Vimshotari cycle, years.
const CYCLE_YEARS: f64 = 120.0;

/// One nakshatra, degrees (13°20′).
pub const NAKSHATRA_SPAN_DEGREES: f64 = 360.0 / 27.0;

/// The nine Vimshotari lords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Graha {
    Ketu,
    Venus,
    Sun,
    Moon,
    Mars,
    Rahu,
    Jupiter,
    Saturn,
    Mercury,
}

impl std::fmt::Display for Graha {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Graha::Ketu => "Ketu",
            Graha::Venus => "Venus",
            Graha::Sun => "Sun",
            Graha::Moon => "Moon",
            Graha::Mars => "Mars",
            Graha::Rahu => "Rahu",
            Graha::Jupiter => "Jupiter",
            Graha::Saturn => "Saturn",
            Graha::Mercury => "Mercury",
        };
        write!(f, "{name}")
    }
}

/// Mahadasha order, starting from Ashwini's lord.
pub const DASHA_SEQUENCE: [Graha; 9] = [
    Graha::Ketu,
    Graha::Venus,
    Graha::Sun,
    Graha::Moon,
    Graha::Mars,
    Graha::Rahu,
    Graha::Jupiter,
    Graha::Saturn,
    Graha::Mercury,
];

/// Full mahadasha length in years for a lord.
pub fn dasha_years(graha: Graha) -> f64 {
    match graha {
        Graha::Ketu => 7.0,
        Graha::Venus => 20.0,
        Graha::Sun => 6.0,
        Graha::Moon => 10.0,
        Graha::Mars => 7.0,
        Graha::Rahu => 18.0,
        Graha::Jupiter => 16.0,
        Graha::Saturn => 19.0,
        Graha::Mercury => 17.0,
    }
}

/// Nakshatra index (0–26) for a sidereal longitude in degrees.
pub fn nakshatra_index(longitude_degrees: f64) -> usize {
    let normalized = longitude_degrees.rem_euclid(360.0);
    ((normalized / NAKSHATRA_SPAN_DEGREES) as usize).min(26)
}

/// Vimshotari lord of a nakshatra.
pub fn nakshatra_lord(index: usize) -> Graha {
    DASHA_SEQUENCE[index % 9]
}

/// One planetary period on the JD axis (half-open: `[start, end)`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DashaPeriod {
    pub lord: Graha,
    pub start_jd: f64,
    pub end_jd: f64,
}

impl DashaPeriod {
    pub fn contains(&self, jd: f64) -> bool {
        jd >= self.start_jd && jd < self.end_jd
    }
}

/// The mahadasha timeline derived from a natal Moon position.
#[derive(Debug, Clone)]
pub struct VimshottariDasha {
    mahadashas: Vec<DashaPeriod>,
}

impl VimshottariDasha {
    /// Build the timeline from the natal Moon's sidereal longitude.
    ///
    /// The generated periods cover one full 120-year cycle from birth.
    pub fn from_natal_moon(moon_longitude_degrees: f64, birth_jd: f64) -> Self {
        let index = nakshatra_index(moon_longitude_degrees);
        let lord = nakshatra_lord(index);
        let traversed = (moon_longitude_degrees.rem_euclid(360.0) % NAKSHATRA_SPAN_DEGREES)
            / NAKSHATRA_SPAN_DEGREES;

        // The running mahadasha began before birth, by the traversed
        // fraction of its full length.
        let first_len_days = dasha_years(lord) * YEAR_DAYS;
        let mut start = birth_jd - traversed * first_len_days;
        let horizon = birth_jd + CYCLE_YEARS * YEAR_DAYS;

        let offset = DASHA_SEQUENCE
            .iter()
            .position(|g| *g == lord)
            .unwrap_or(0);
        let mut mahadashas = Vec::new();
        let mut i = 0;
        while start < horizon {
            let graha = DASHA_SEQUENCE[(offset + i) % 9];
            let end = start + dasha_years(graha) * YEAR_DAYS;
            mahadashas.push(DashaPeriod {
                lord: graha,
                start_jd: start,
                end_jd: end,
            });
            start = end;
            i += 1;
        }

        Self { mahadashas }
    }

    pub fn mahadashas(&self) -> &[DashaPeriod] {
        &self.mahadashas
    }

    /// The mahadasha running at a Julian Day, if within the timeline.
    pub fn mahadasha_at(&self, jd: f64) -> Option<&DashaPeriod> {
        self.mahadashas.iter().find(|p| p.contains(jd))
    }

    /// The antardasha lord at a Julian Day.
    ///
    /// Antardashas subdivide the mahadasha proportionally to each
    /// sub-lord's full-period years, starting from the mahadasha lord.
    pub fn antardasha_at(&self, jd: f64) -> Option<Graha> {
        let maha = self.mahadasha_at(jd)?;
        let maha_len = maha.end_jd - maha.start_jd;
        let offset = DASHA_SEQUENCE.iter().position(|g| *g == maha.lord)?;

        let mut sub_start = maha.start_jd;
        for i in 0..9 {
            let sub = DASHA_SEQUENCE[(offset + i) % 9];
            let sub_len = maha_len * dasha_years(sub) / CYCLE_YEARS;
            if jd < sub_start + sub_len {
                return Some(sub);
            }
            sub_start += sub_len;
        }
        // Float residue at the very end of the mahadasha.
        Some(DASHA_SEQUENCE[(offset + 8) % 9])
    }

    /// `(mahadasha lord, antardasha lord)` at a Julian Day.
    pub fn lords_at(&self, jd: f64) -> Option<(Graha, Graha)> {
        let maha = self.mahadasha_at(jd)?.lord;
        let antar = self.antardasha_at(jd)?;
        Some((maha, antar))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const BIRTH_JD: f64 = 2_451_545.0;

    #[test]
    fn nakshatra_indexing() {
        assert_eq!(nakshatra_index(0.0), 0);
        assert_eq!(nakshatra_index(13.0), 0);
        assert_eq!(nakshatra_index(13.4), 1);
        assert_eq!(nakshatra_index(359.9), 26);
        assert_eq!(nakshatra_index(370.0), 0); // wraps
    }

    #[test]
    fn nakshatra_lords_cycle() {
        assert_eq!(nakshatra_lord(0), Graha::Ketu);
        assert_eq!(nakshatra_lord(8), Graha::Mercury);
        assert_eq!(nakshatra_lord(9), Graha::Ketu);
        assert_eq!(nakshatra_lord(16), Graha::Saturn);
    }

    #[test]
    fn cycle_years_total_120() {
        let total: f64 = DASHA_SEQUENCE.iter().map(|g| dasha_years(*g)).sum();
        assert_eq!(total, 120.0);
    }

    #[test]
    fn zero_traversal_starts_at_birth() {
        // Moon exactly at 0° Ashwini: Ketu mahadasha starts at birth.
        let dasha = VimshottariDasha::from_natal_moon(0.0, BIRTH_JD);
        let first = &dasha.mahadashas()[0];
        assert_eq!(first.lord, Graha::Ketu);
        assert_relative_eq!(first.start_jd, BIRTH_JD, epsilon = 1e-6);
        assert_relative_eq!(
            first.end_jd - first.start_jd,
            7.0 * 365.25,
            epsilon = 1e-6
        );
    }

    #[test]
    fn half_traversed_nakshatra_halves_the_balance() {
        // Moon at the midpoint of Ashwini: half of Ketu's 7 years remain.
        let dasha =
            VimshottariDasha::from_natal_moon(NAKSHATRA_SPAN_DEGREES / 2.0, BIRTH_JD);
        let first = &dasha.mahadashas()[0];
        assert_eq!(first.lord, Graha::Ketu);
        assert_relative_eq!(
            first.end_jd - BIRTH_JD,
            3.5 * 365.25,
            epsilon = 1e-6
        );
    }

    #[test]
    fn sequence_follows_vimshottari_order() {
        let dasha = VimshottariDasha::from_natal_moon(0.0, BIRTH_JD);
        let lords: Vec<Graha> = dasha.mahadashas().iter().take(4).map(|p| p.lord).collect();
        assert_eq!(
            lords,
            vec![Graha::Ketu, Graha::Venus, Graha::Sun, Graha::Moon]
        );
    }

    #[test]
    fn mahadasha_lookup() {
        let dasha = VimshottariDasha::from_natal_moon(0.0, BIRTH_JD);
        // 10 years in: Ketu (7y) has ended, Venus (20y) is running.
        let jd = BIRTH_JD + 10.0 * 365.25;
        assert_eq!(dasha.mahadasha_at(jd).unwrap().lord, Graha::Venus);
        // Before the timeline.
        assert!(dasha.mahadasha_at(BIRTH_JD - 1.0).is_none());
    }

    #[test]
    fn antardasha_starts_with_own_lord() {
        let dasha = VimshottariDasha::from_natal_moon(0.0, BIRTH_JD);
        // At the start of Ketu mahadasha, the antardasha is Ketu/Ketu.
        assert_eq!(dasha.antardasha_at(BIRTH_JD + 1.0).unwrap(), Graha::Ketu);
        // Ketu/Ketu lasts 7×7/120 years ≈ 0.408 y; shortly after comes Venus.
        let jd = BIRTH_JD + 0.5 * 365.25;
        assert_eq!(dasha.antardasha_at(jd).unwrap(), Graha::Venus);
    }

    #[test]
    fn lords_at_returns_both_levels() {
        let dasha = VimshottariDasha::from_natal_moon(0.0, BIRTH_JD);
        let (maha, antar) = dasha.lords_at(BIRTH_JD + 1.0).unwrap();
        assert_eq!(maha, Graha::Ketu);
        assert_eq!(antar, Graha::Ketu);
    }

    #[test]
    fn timeline_is_contiguous() {
        let dasha = VimshottariDasha::from_natal_moon(100.0, BIRTH_JD);
        for pair in dasha.mahadashas().windows(2) {
            assert_relative_eq!(pair[0].end_jd, pair[1].start_jd, epsilon = 1e-9);
        }
    }
}
