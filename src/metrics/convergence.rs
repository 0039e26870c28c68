// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Cross-method time convergence.
//!
//! Each rectification method proposes a birth time; agreement between
//! them is evidence the rectification is stable.  Times are compared as
//! minutes from midnight: median, per-method offset from the median,
//! maximum pairwise spread, and median absolute deviation.

use serde::Serialize;

use crate::error::{Result, VerichronError};

/// One method's proposal expressed on the minutes-from-midnight axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodOffset {
    pub method: String,
    pub minutes_from_midnight: f64,
    /// Absolute offset from the cross-method median, minutes.
    pub offset_from_median: f64,
}

/// The convergence verdict across all available methods.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvergenceMetric {
    pub methods: Vec<MethodOffset>,
    pub median_minutes: f64,
    /// Maximum pairwise spread (max − min), minutes.
    pub max_spread_minutes: f64,
    pub median_absolute_deviation: f64,
    pub threshold_minutes: f64,
    pub within_threshold: bool,
}

/// Parse `"HH:MM"` or `"HH:MM:SS[.fff]"` into minutes from midnight.
pub fn minutes_from_midnight(time: &str) -> Result<f64> {
    let parts: Vec<&str> = time.trim().split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return Err(invalid_time(time));
    }
    let hours: u32 = parts[0].parse().map_err(|_| invalid_time(time))?;
    let minutes: u32 = parts[1].parse().map_err(|_| invalid_time(time))?;
    let seconds: f64 = if parts.len() == 3 {
        parts[2].parse().map_err(|_| invalid_time(time))?
    } else {
        0.0
    };
    if hours > 23 || minutes > 59 || !(0.0..60.0).contains(&seconds) {
        return Err(invalid_time(time));
    }
    Ok(hours as f64 * 60.0 + minutes as f64 + seconds / 60.0)
}

fn invalid_time(time: &str) -> VerichronError {
    VerichronError::InvalidDate {
        input: time.to_string(),
        reason: "expected HH:MM[:SS] time of day".to_string(),
    }
}

fn median(sorted: &[f64]) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Convergence statistics for named `(method, minutes)` proposals.
///
/// With fewer than two methods there is nothing to disagree: spread and
/// deviations are zero and the metric passes vacuously.
pub fn analyze_convergence(
    proposals: &[(String, f64)],
    threshold_minutes: f64,
) -> ConvergenceMetric {
    let mut values: Vec<f64> = proposals.iter().map(|(_, m)| *m).collect();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median_minutes = median(&values);

    let methods: Vec<MethodOffset> = proposals
        .iter()
        .map(|(method, minutes)| MethodOffset {
            method: method.clone(),
            minutes_from_midnight: *minutes,
            offset_from_median: (minutes - median_minutes).abs(),
        })
        .collect();

    let max_spread_minutes = match (values.first(), values.last()) {
        (Some(min), Some(max)) => max - min,
        _ => 0.0,
    };

    let mut deviations: Vec<f64> = methods.iter().map(|m| m.offset_from_median).collect();
    deviations.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median_absolute_deviation = median(&deviations);

    ConvergenceMetric {
        methods,
        median_minutes,
        max_spread_minutes,
        median_absolute_deviation,
        threshold_minutes,
        within_threshold: max_spread_minutes <= threshold_minutes,
    }
}
