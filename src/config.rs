// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Explicit configuration for the metrics engine and its collaborators.
//!
//! Everything here is plain data handed to constructors.  There is no
//! process-wide mutable default: callers that want to tweak a threshold
//! clone [`MetricsConfig::default()`] and pass the modified copy, either
//! at engine construction or per call.
//!
//! ## Default value table
//!
//! | Setting | Default |
//! |---------|---------|
//! | Sun ephemeris threshold | 0.01° |
//! | Moon ephemeris threshold | 0.05° |
//! | Other-body ephemeris threshold | 0.10° |
//! | Method convergence threshold | 3.0 min |
//! | Ensemble confidence threshold | 0.70 |
//! | Event-fit threshold | 80 % |
//! | Geocoding precision threshold | 1000 m |
//! | Method weights | praanapada 2.0, moon 1.5, gulika 1.0, events 1.0 |
//! | Unknown-method weight | 1.0 |

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Per-body angular tolerances for ephemeris validation, in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EphemerisThresholds {
    pub sun_degrees: f64,
    pub moon_degrees: f64,
    pub default_degrees: f64,
}

impl EphemerisThresholds {
    /// Tolerance for a body by (case-insensitive) name.
    pub fn for_body(&self, body: &str) -> f64 {
        match body.to_ascii_lowercase().as_str() {
            "sun" => self.sun_degrees,
            "moon" => self.moon_degrees,
            _ => self.default_degrees,
        }
    }
}

impl Default for EphemerisThresholds {
    fn default() -> Self {
        Self {
            sun_degrees: 0.01,
            moon_degrees: 0.05,
            default_degrees: 0.10,
        }
    }
}

/// Thresholds and weights for the five accuracy metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub ephemeris: EphemerisThresholds,
    /// Maximum acceptable spread between rectification methods, minutes.
    pub convergence_threshold_minutes: f64,
    /// Minimum acceptable weighted ensemble confidence, 0–1.
    pub ensemble_threshold: f64,
    /// Minimum acceptable event-alignment percentage, 0–100.
    pub event_fit_threshold_percentage: f64,
    /// Maximum acceptable geocoding bbox diagonal, meters.
    pub geocoding_threshold_meters: f64,
    /// Fixed ensemble weight per method name.  Need not sum to anything:
    /// scores are normalised by the weights actually present.
    pub method_weights: HashMap<String, f64>,
    /// Weight applied to methods not listed in `method_weights`.
    pub default_method_weight: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        let mut method_weights = HashMap::new();
        method_weights.insert("praanapada".to_string(), 2.0);
        method_weights.insert("moon".to_string(), 1.5);
        method_weights.insert("gulika".to_string(), 1.0);
        method_weights.insert("events".to_string(), 1.0);
        Self {
            ephemeris: EphemerisThresholds::default(),
            convergence_threshold_minutes: 3.0,
            ensemble_threshold: 0.7,
            event_fit_threshold_percentage: 80.0,
            geocoding_threshold_meters: 1_000.0,
            method_weights,
            default_method_weight: 1.0,
        }
    }
}

impl MetricsConfig {
    /// Ensemble weight for a method by name.
    pub fn weight_for(&self, method: &str) -> f64 {
        self.method_weights
            .get(method)
            .copied()
            .unwrap_or(self.default_method_weight)
    }
}
