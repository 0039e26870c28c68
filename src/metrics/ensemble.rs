// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Weighted ensemble confidence.
//!
//! Each rectification method reports its own confidence in `[0, 1]`.
//! A fixed per-method weighting (configured, need not sum to anything)
//! combines them into one score, normalised by the weights actually
//! present so that missing methods reduce coverage without biasing the
//! scale.

use serde::Serialize;

use crate::config::MetricsConfig;

/// One method's contribution to the ensemble score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnsembleContribution {
    pub method: String,
    pub weight: f64,
    pub confidence: f64,
}

/// The combined confidence verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnsembleMetric {
    pub contributions: Vec<EnsembleContribution>,
    /// Σ(wᵢ·cᵢ) / Σ(wᵢ) over the methods present.
    pub weighted_confidence: f64,
    pub threshold: f64,
    pub within_threshold: bool,
}

/// Weighted ensemble score for `(method, confidence)` pairs.
///
/// Confidences are clamped into `[0, 1]` defensively; an empty input
/// passes vacuously with a zero score.
pub fn analyze_ensemble(confidences: &[(String, f64)], config: &MetricsConfig) -> EnsembleMetric {
    let contributions: Vec<EnsembleContribution> = confidences
        .iter()
        .map(|(method, confidence)| EnsembleContribution {
            method: method.clone(),
            weight: config.weight_for(method),
            confidence: confidence.clamp(0.0, 1.0),
        })
        .collect();

    let weight_sum: f64 = contributions.iter().map(|c| c.weight).sum();
    let weighted_confidence = if weight_sum > 0.0 {
        contributions
            .iter()
            .map(|c| c.weight * c.confidence)
            .sum::<f64>()
            / weight_sum
    } else {
        0.0
    };

    let within_threshold =
        contributions.is_empty() || weighted_confidence >= config.ensemble_threshold;

    EnsembleMetric {
        contributions,
        weighted_confidence,
        threshold: config.ensemble_threshold,
        within_threshold,
    }
}
