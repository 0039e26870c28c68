// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Proleptic-Gregorian calendar ↔ Julian Day conversions and civil-time
//! parsing.
//!
//! The calendar algorithms are the standard ones (Jan/Feb counted as
//! months 13/14 of the previous year, century correction term, fractional
//! day carried separately).  They are calendar-only: time-scale semantics
//! (UTC vs TT vs UT1) are decided by the caller — the same formulas apply
//! on every axis.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::{Result, VerichronError};

/// JD of the Unix epoch (1970-01-01T00:00:00).
pub const UNIX_EPOCH_JD: f64 = 2_440_587.5;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// A broken-down civil date/time with fractional seconds.
///
/// Carries no timezone: it is whatever axis the producer put it on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CivilDateTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: f64,
}

impl std::fmt::Display for CivilDateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:06.3}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

// ---------------------------------------------------------------------------
// Calendar ↔ Julian Day
// ---------------------------------------------------------------------------

/// Julian Day for a proleptic-Gregorian date with a fractional day.
///
/// `day_fraction` is the day-of-month plus time-of-day/24 (e.g. `1.5` for
/// the 1st at 12:00).
pub fn gregorian_to_jd(year: i32, month: u32, day_fraction: f64) -> f64 {
    let (y, m) = if month <= 2 {
        (year - 1, month + 12)
    } else {
        (year, month)
    };
    let a = (y as f64 / 100.0).floor();
    let b = 2.0 - a + (a / 4.0).floor();
    (365.25 * (y as f64 + 4716.0)).floor() + (30.6001 * (m as f64 + 1.0)).floor()
        + day_fraction
        + b
        - 1524.5
}

/// Julian Day for a broken-down civil instant.
pub fn civil_to_jd(civil: &CivilDateTime) -> f64 {
    let tod = (civil.hour as f64 * 3_600.0 + civil.minute as f64 * 60.0 + civil.second)
        / SECONDS_PER_DAY;
    gregorian_to_jd(civil.year, civil.month, civil.day as f64 + tod)
}

/// Inverse of [`gregorian_to_jd`]: Julian Day back to a civil instant.
///
/// Always uses the Gregorian century correction, so the pair is a clean
/// proleptic-Gregorian round trip.
pub fn jd_to_civil(jd: f64) -> CivilDateTime {
    let z = (jd + 0.5).floor();
    let f = jd + 0.5 - z;

    let alpha = ((z - 1_867_216.25) / 36_524.25).floor();
    let a = z + 1.0 + alpha - (alpha / 4.0).floor();
    let b = a + 1524.0;
    let c = ((b - 122.1) / 365.25).floor();
    let d = (365.25 * c).floor();
    let e = ((b - d) / 30.6001).floor();

    let day_with_fraction = b - d - (30.6001 * e).floor() + f;
    let day = day_with_fraction.floor();
    let month = if e < 14.0 { e - 1.0 } else { e - 13.0 };
    let year = if month > 2.0 { c - 4716.0 } else { c - 4715.0 };

    let mut total_seconds = (day_with_fraction - day) * SECONDS_PER_DAY;
    // Clamp float residue so 23:59:59.999… never rolls into hour 24.
    if total_seconds >= SECONDS_PER_DAY {
        total_seconds = SECONDS_PER_DAY - 1e-6;
    }
    let hour = (total_seconds / 3_600.0).floor();
    let minute = ((total_seconds - hour * 3_600.0) / 60.0).floor();
    let second = total_seconds - hour * 3_600.0 - minute * 60.0;

    CivilDateTime {
        year: year as i32,
        month: month as u32,
        day: day as u32,
        hour: hour as u32,
        minute: minute as u32,
        second,
    }
}

// ---------------------------------------------------------------------------
// Civil-time parsing
// ---------------------------------------------------------------------------

const CIVIL_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse a civil date/time string (ISO-8601-ish, optional fractional
/// seconds, optional trailing `Z`).
pub fn parse_civil(input: &str) -> Result<CivilDateTime> {
    let trimmed = input.trim().trim_end_matches(['Z', 'z']);
    for format in CIVIL_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(civil_from_naive(&naive));
        }
    }
    // A bare date is accepted as midnight.
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(civil_from_naive(&naive));
        }
    }
    Err(VerichronError::InvalidDate {
        input: input.to_string(),
        reason: "not a recognised ISO-8601 civil date/time".to_string(),
    })
}

fn civil_from_naive(naive: &NaiveDateTime) -> CivilDateTime {
    use chrono::{Datelike, Timelike};
    CivilDateTime {
        year: naive.year(),
        month: naive.month(),
        day: naive.day(),
        hour: naive.hour(),
        minute: naive.minute(),
        second: naive.second() as f64 + naive.nanosecond() as f64 / 1e9,
    }
}

/// Parse a UTC-offset string: `"Z"`, `"UTC"`, `"+05:30"`, `"-0700"`, `"+05"`.
pub fn parse_offset(offset: &str) -> Result<FixedOffset> {
    let trimmed = offset.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc")
    {
        return FixedOffset::east_opt(0).ok_or_else(|| VerichronError::InvalidOffset(offset.into()));
    }

    let bytes = trimmed.as_bytes();
    let sign = match bytes[0] {
        b'+' => 1,
        b'-' => -1,
        _ => return Err(VerichronError::InvalidOffset(offset.to_string())),
    };
    let digits: String = trimmed[1..].chars().filter(|c| *c != ':').collect();
    let (hours, minutes): (i32, i32) = match digits.len() {
        2 => (parse_component(&digits, offset)?, 0),
        4 => (
            parse_component(&digits[..2], offset)?,
            parse_component(&digits[2..], offset)?,
        ),
        _ => return Err(VerichronError::InvalidOffset(offset.to_string())),
    };
    if hours > 14 || minutes > 59 {
        return Err(VerichronError::InvalidOffset(offset.to_string()));
    }
    FixedOffset::east_opt(sign * (hours * 3_600 + minutes * 60))
        .ok_or_else(|| VerichronError::InvalidOffset(offset.to_string()))
}

fn parse_component(s: &str, original: &str) -> Result<i32> {
    s.parse::<i32>()
        .map_err(|_| VerichronError::InvalidOffset(original.to_string()))
}

/// Interpret a civil instant in the given offset and normalise to UTC.
pub fn civil_to_utc(civil: &CivilDateTime, offset: &FixedOffset) -> Result<DateTime<Utc>> {
    let whole = civil.second.floor();
    let nanos = ((civil.second - whole) * 1e9).round() as u32;
    let naive = NaiveDate::from_ymd_opt(civil.year, civil.month, civil.day)
        .and_then(|d| d.and_hms_nano_opt(civil.hour, civil.minute, whole as u32, nanos))
        .ok_or_else(|| VerichronError::InvalidDate {
            input: civil.to_string(),
            reason: "out-of-range calendar components".to_string(),
        })?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| VerichronError::InvalidDate {
            input: civil.to_string(),
            reason: "ambiguous local time".to_string(),
        })
}

/// Break a `chrono` UTC timestamp into civil components.
pub fn civil_from_datetime(datetime: &DateTime<Utc>) -> CivilDateTime {
    use chrono::{Datelike, Timelike};
    CivilDateTime {
        year: datetime.year(),
        month: datetime.month(),
        day: datetime.day(),
        hour: datetime.hour(),
        minute: datetime.minute(),
        second: datetime.second() as f64 + datetime.timestamp_subsec_nanos() as f64 / 1e9,
    }
}

/// Julian Day on the UTC axis for a `chrono` UTC timestamp.
pub fn jd_utc_from_datetime(datetime: &DateTime<Utc>) -> f64 {
    civil_to_jd(&civil_from_datetime(datetime))
}

/// Inverse of [`jd_utc_from_datetime`].
pub fn datetime_from_jd_utc(jd_utc: f64) -> Option<DateTime<Utc>> {
    let seconds = (jd_utc - UNIX_EPOCH_JD) * SECONDS_PER_DAY;
    let secs = seconds.floor() as i64;
    let nanos = ((seconds - secs as f64) * 1e9) as u32;
    DateTime::<Utc>::from_timestamp(secs, nanos)
}
