// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! The accuracy metrics engine.
//!
//! [`BtrMetrics`] combines the time-scale converter, the ephemeris
//! oracle and the geocoding analyzer into five named accuracy metrics
//! for one birth-time-rectification run:
//!
//! 1. **Ephemeris accuracy** — per-body angular agreement between the
//!    computed chart and the reference oracle.
//! 2. **Method convergence** — spread between the rectified times the
//!    sub-methods propose.
//! 3. **Ensemble confidence** — weighted combination of the methods'
//!    self-reported confidences.
//! 4. **Event fit** — agreement between reported life events and the
//!    Vimshotari dasha timeline.
//! 5. **Geocoding precision** — spatial tightness of the birthplace
//!    lookup.
//!
//! Partial data never hard-fails a run: a body absent from the chart or
//! the oracle, a missing method, zero events, or no geocoding input all
//! reduce coverage instead.  Threshold misses are collected into
//! `failed_criteria` and decide `overall_passed`.

mod convergence;
mod ensemble;
mod event_fit;

pub use convergence::{
    analyze_convergence, minutes_from_midnight, ConvergenceMetric, MethodOffset,
};
pub use ensemble::{analyze_ensemble, EnsembleContribution, EnsembleMetric};
pub use event_fit::{
    analyze_event_fit, significators, EventAlignment, EventFitMetric, EventKind, LifeEvent,
};

use std::collections::HashMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::MetricsConfig;
use crate::converter::TimeScaleConverter;
use crate::dasha::VimshottariDasha;
use crate::error::Result;
use crate::geocoding::{self, BoundingBox, GeocodingPrecision};
use crate::oracle::HorizonsClient;

/// The bodies validated against the oracle.
///
/// Directly observable bodies only: the lunar nodes are derived points,
/// not independently observed, so they are excluded.
pub const VALIDATED_BODIES: [&str; 7] = [
    "Sun", "Moon", "Mars", "Mercury", "Jupiter", "Venus", "Saturn",
];

// ---------------------------------------------------------------------------
// Engine inputs
// ---------------------------------------------------------------------------

/// Civil birth data as supplied by the host application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BirthData {
    /// `"YYYY-MM-DD"`.
    pub date: String,
    /// `"HH:MM[:SS[.fff]]"`.
    pub time: String,
    /// UTC offset of the birth place, `"Z"` or `"±HH:MM"`.
    pub offset: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
}

impl BirthData {
    fn civil(&self) -> String {
        format!("{}T{}", self.date, self.time)
    }
}

/// One placed point of a computed chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanetPosition {
    /// Ecliptic longitude, degrees in `[0, 360)`.
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sign: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub house: Option<u8>,
}

/// The chart the generation engine produced for the rectified time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedChart {
    pub ascendant: PlanetPosition,
    /// Body name → position; bodies may be absent.
    pub planets: HashMap<String, PlanetPosition>,
    /// Epoch of the chart, JD(TT).  Derived from the birth data when
    /// absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub julian_day_tt: Option<f64>,
}

/// One rectification sub-method's proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodResult {
    /// Method identifier, e.g. `"praanapada"`; opaque to the engine.
    pub method: String,
    /// Proposed birth time, `"HH:MM[:SS]"`.
    pub rectified_time: String,
    /// Self-reported confidence, 0–1.
    pub confidence: f64,
}

/// Everything a rectification run hands to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectificationOutcome {
    pub chart: ComputedChart,
    pub methods: Vec<MethodResult>,
    #[serde(default)]
    pub life_events: Vec<LifeEvent>,
}

// ---------------------------------------------------------------------------
// Engine outputs
// ---------------------------------------------------------------------------

/// Per-body ephemeris agreement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EphemerisAccuracy {
    pub body: String,
    pub chart_longitude: f64,
    pub reference_longitude: f64,
    /// Minimal angular separation, wrap-aware, degrees.
    pub delta_longitude: f64,
    pub threshold_degrees: f64,
    pub within_threshold: bool,
}

/// Calculation metadata attached to every result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationMeta {
    pub duration_ms: u64,
    pub oracle_mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_id: Option<String>,
    pub calculated_at: DateTime<Utc>,
}

/// The terminal artifact: one immutable verdict per rectification run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BtrMetricsResult {
    pub ephemeris: Vec<EphemerisAccuracy>,
    pub convergence: ConvergenceMetric,
    pub ensemble: EnsembleMetric,
    pub event_fit: EventFitMetric,
    pub geocoding: GeocodingPrecision,
    pub overall_passed: bool,
    /// One short human-readable string per failing body/metric.
    pub failed_criteria: Vec<String>,
    pub meta: CalculationMeta,
}

/// Structural sanity report from [`BtrMetrics::validate_metrics`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Minimal angular separation of two longitudes, accounting for the
/// 0°/360° wrap.  Always in `[0, 180]`, symmetric in its arguments.
pub fn angular_delta(a: f64, b: f64) -> f64 {
    let raw = (a - b).abs() % 360.0;
    raw.min(360.0 - raw)
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The accuracy/validation engine.
pub struct BtrMetrics {
    config: MetricsConfig,
    converter: TimeScaleConverter,
    oracle: HorizonsClient,
}

impl BtrMetrics {
    pub fn new(config: MetricsConfig, converter: TimeScaleConverter, oracle: HorizonsClient) -> Self {
        Self {
            config,
            converter,
            oracle,
        }
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    /// Compute all five metrics and the overall verdict.
    pub async fn calculate_metrics(
        &self,
        outcome: &RectificationOutcome,
        birth: &BirthData,
        geocoding_result: Option<&serde_json::Value>,
        chart_id: Option<&str>,
    ) -> Result<BtrMetricsResult> {
        self.calculate_metrics_with(&self.config, outcome, birth, geocoding_result, chart_id)
            .await
    }

    /// As [`calculate_metrics`](Self::calculate_metrics) with a per-call
    /// configuration override.
    pub async fn calculate_metrics_with(
        &self,
        config: &MetricsConfig,
        outcome: &RectificationOutcome,
        birth: &BirthData,
        geocoding_result: Option<&serde_json::Value>,
        chart_id: Option<&str>,
    ) -> Result<BtrMetricsResult> {
        let started = Instant::now();

        let chart_jd = match outcome.chart.julian_day_tt {
            Some(jd) => jd,
            None => {
                self.converter
                    .convert(&birth.civil(), &birth.offset)?
                    .julian_day_tt
            }
        };

        let ephemeris = self.ephemeris_accuracy(config, &outcome.chart, chart_jd).await;
        let convergence = self.method_convergence(config, &outcome.methods)?;
        let ensemble = self.ensemble_confidence(config, &outcome.methods);
        let event_fit = self.event_fit(config, outcome, chart_jd)?;
        let geocoding = self.geocoding_precision(config, geocoding_result);

        let mut failed_criteria = Vec::new();
        for entry in &ephemeris {
            if !entry.within_threshold {
                failed_criteria.push(format!(
                    "ephemeris accuracy: {} Δλ {:.4}° exceeds {:.4}°",
                    entry.body, entry.delta_longitude, entry.threshold_degrees
                ));
            }
        }
        if !convergence.within_threshold {
            failed_criteria.push(format!(
                "method convergence: spread {:.1} min exceeds {:.1} min",
                convergence.max_spread_minutes, convergence.threshold_minutes
            ));
        }
        if !ensemble.within_threshold {
            failed_criteria.push(format!(
                "ensemble confidence: {:.3} below {:.2}",
                ensemble.weighted_confidence, ensemble.threshold
            ));
        }
        if !event_fit.within_threshold {
            failed_criteria.push(format!(
                "event fit: {:.1}% below {:.1}%",
                event_fit.percentage, event_fit.threshold_percentage
            ));
        }
        if !geocoding.within_threshold {
            failed_criteria.push(format!(
                "geocoding precision: diagonal {:.0} m exceeds {:.0} m",
                geocoding.diagonal_meters, geocoding.threshold_meters
            ));
        }

        let overall_passed = failed_criteria.is_empty();
        Ok(BtrMetricsResult {
            ephemeris,
            convergence,
            ensemble,
            event_fit,
            geocoding,
            overall_passed,
            failed_criteria,
            meta: CalculationMeta {
                duration_ms: started.elapsed().as_millis() as u64,
                oracle_mode: self.oracle.mode().to_string(),
                chart_id: chart_id.map(str::to_string),
                calculated_at: Utc::now(),
            },
        })
    }

    /// Per-body oracle comparison, sequential, failure-isolated.
    async fn ephemeris_accuracy(
        &self,
        config: &MetricsConfig,
        chart: &ComputedChart,
        chart_jd: f64,
    ) -> Vec<EphemerisAccuracy> {
        let mut entries = Vec::new();
        for body in VALIDATED_BODIES {
            let Some(position) = chart.planets.get(body) else {
                log::debug!("{body} absent from chart; skipping");
                continue;
            };
            let response = match self.oracle.get_position(body, chart_jd).await {
                Ok(response) => response,
                Err(e) => {
                    // One failed lookup must not abort the others.
                    log::warn!("oracle lookup failed for {body}: {e}");
                    continue;
                }
            };
            let Some(reference_longitude) = response.primary_longitude() else {
                log::warn!("oracle response for {body} carries no results");
                continue;
            };
            let delta_longitude = angular_delta(position.longitude, reference_longitude);
            let threshold_degrees = config.ephemeris.for_body(body);
            entries.push(EphemerisAccuracy {
                body: body.to_string(),
                chart_longitude: position.longitude,
                reference_longitude,
                delta_longitude,
                threshold_degrees,
                within_threshold: delta_longitude <= threshold_degrees,
            });
        }
        entries
    }

    fn method_convergence(
        &self,
        config: &MetricsConfig,
        methods: &[MethodResult],
    ) -> Result<ConvergenceMetric> {
        let mut proposals = Vec::with_capacity(methods.len());
        for method in methods {
            let minutes = minutes_from_midnight(&method.rectified_time)?;
            proposals.push((method.method.clone(), minutes));
        }
        Ok(analyze_convergence(
            &proposals,
            config.convergence_threshold_minutes,
        ))
    }

    fn ensemble_confidence(
        &self,
        config: &MetricsConfig,
        methods: &[MethodResult],
    ) -> EnsembleMetric {
        let confidences: Vec<(String, f64)> = methods
            .iter()
            .map(|m| (m.method.clone(), m.confidence))
            .collect();
        analyze_ensemble(&confidences, config)
    }

    fn event_fit(
        &self,
        config: &MetricsConfig,
        outcome: &RectificationOutcome,
        chart_jd: f64,
    ) -> Result<EventFitMetric> {
        let Some(moon) = outcome.chart.planets.get("Moon") else {
            // Without the natal Moon no dasha timeline exists; reduced
            // coverage, not failure.
            log::warn!("Moon absent from chart; event fit judged vacuously");
            return Ok(EventFitMetric {
                total_events: outcome.life_events.len(),
                aligned_events: 0,
                percentage: 100.0,
                threshold_percentage: config.event_fit_threshold_percentage,
                within_threshold: true,
                details: Vec::new(),
            });
        };
        let dasha = VimshottariDasha::from_natal_moon(moon.longitude, chart_jd);
        analyze_event_fit(
            &outcome.life_events,
            &dasha,
            config.event_fit_threshold_percentage,
        )
    }

    fn geocoding_precision(
        &self,
        config: &MetricsConfig,
        geocoding_result: Option<&serde_json::Value>,
    ) -> GeocodingPrecision {
        let analyzed = geocoding_result
            .and_then(|raw| geocoding::analyze_geocoding_result(raw, config.geocoding_threshold_meters));
        match analyzed {
            Some(precision) => precision,
            None => {
                // Absent input yields a zeroed, passing result with an
                // explicit warning rather than failing the run.
                log::warn!("no geocoding result supplied; precision not assessed");
                GeocodingPrecision {
                    bbox: BoundingBox::from_point(0.0, 0.0),
                    diagonal_meters: 0.0,
                    confidence: 0.0,
                    within_threshold: true,
                    threshold_meters: config.geocoding_threshold_meters,
                    warning: Some("no geocoding result supplied".to_string()),
                }
            }
        }
    }

    /// Structural sanity checks, independent of the threshold verdicts.
    pub fn validate_metrics(result: &BtrMetricsResult) -> ValidationReport {
        let mut report = ValidationReport::default();

        if result.ephemeris.is_empty() {
            report
                .warnings
                .push("no bodies were validated against the oracle".to_string());
        }
        for entry in &result.ephemeris {
            if !(0.0..=180.0).contains(&entry.delta_longitude) {
                report.errors.push(format!(
                    "{} delta {} outside [0, 180]",
                    entry.body, entry.delta_longitude
                ));
            }
        }
        if !(0.0..=1.0).contains(&result.ensemble.weighted_confidence) {
            report.errors.push(format!(
                "ensemble confidence {} outside [0, 1]",
                result.ensemble.weighted_confidence
            ));
        }
        if result.event_fit.aligned_events > result.event_fit.total_events {
            report.errors.push(format!(
                "aligned events {} exceed total {}",
                result.event_fit.aligned_events, result.event_fit.total_events
            ));
        }
        if result.geocoding.diagonal_meters < 0.0 {
            report.errors.push(format!(
                "geocoding diagonal {} is negative",
                result.geocoding.diagonal_meters
            ));
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{sample_fixture, FixtureOracle, OracleConfig};
    use approx::assert_relative_eq;

    const J2000: f64 = 2_451_545.0;

    /// J2000 geocentric ecliptic longitudes used by the test fixtures.
    const FIXTURE_LONGITUDES: [(&str, f64); 7] = [
        ("Sun", 280.16),
        ("Moon", 222.58),
        ("Mars", 327.97),
        ("Mercury", 271.89),
        ("Jupiter", 25.24),
        ("Venus", 241.06),
        ("Saturn", 40.39),
    ];

    fn write_fixtures(dir: &std::path::Path) {
        let store = FixtureOracle::new(dir);
        for (body, longitude) in FIXTURE_LONGITUDES {
            store.store(&sample_fixture(body, J2000, longitude)).unwrap();
        }
    }

    fn engine(dir: &std::path::Path) -> BtrMetrics {
        BtrMetrics::new(
            MetricsConfig::default(),
            TimeScaleConverter::new().unwrap(),
            HorizonsClient::new(OracleConfig {
                fixture_dir: dir.to_path_buf(),
                ..OracleConfig::default()
            })
            .unwrap(),
        )
    }

    fn birth() -> BirthData {
        BirthData {
            date: "2000-01-01".to_string(),
            time: "11:58:55.816".to_string(),
            offset: "Z".to_string(),
            latitude: 12.9716,
            longitude: 77.5946,
            place: Some("Bangalore".to_string()),
        }
    }

    fn outcome() -> RectificationOutcome {
        let mut planets = HashMap::new();
        for (body, longitude) in FIXTURE_LONGITUDES {
            planets.insert(
                body.to_string(),
                PlanetPosition {
                    longitude,
                    sign: None,
                    house: None,
                },
            );
        }
        RectificationOutcome {
            chart: ComputedChart {
                ascendant: PlanetPosition {
                    longitude: 123.4,
                    sign: None,
                    house: Some(1),
                },
                planets,
                julian_day_tt: Some(J2000),
            },
            methods: vec![
                MethodResult {
                    method: "praanapada".to_string(),
                    rectified_time: "11:58:00".to_string(),
                    confidence: 0.85,
                },
                MethodResult {
                    method: "gulika".to_string(),
                    rectified_time: "11:59:00".to_string(),
                    confidence: 0.75,
                },
                MethodResult {
                    method: "moon".to_string(),
                    rectified_time: "11:59:30".to_string(),
                    confidence: 0.8,
                },
                MethodResult {
                    method: "events".to_string(),
                    rectified_time: "12:00:00".to_string(),
                    confidence: 0.7,
                },
            ],
            life_events: Vec::new(),
        }
    }

    fn geocoding_json() -> serde_json::Value {
        serde_json::json!({
            "bounds": {
                "southwest": { "lat": 12.9695, "lng": 77.5925 },
                "northeast": { "lat": 12.9725, "lng": 77.5955 }
            }
        })
    }

    #[test]
    fn wrap_delta_properties() {
        // Crossing 0°/360° takes the short way round.
        assert_relative_eq!(angular_delta(0.0, 359.95), 0.05, epsilon = 1e-9);
        assert_relative_eq!(angular_delta(359.95, 0.0), 0.05, epsilon = 1e-9);
        assert_relative_eq!(angular_delta(10.0, 359.95), 10.05, epsilon = 1e-9);
        assert_relative_eq!(angular_delta(0.0, 180.0), 180.0);
        assert!(angular_delta(350.0, 20.0) <= 180.0);
        assert_eq!(angular_delta(42.0, 42.0), 0.0);
    }

    #[tokio::test]
    async fn clean_run_passes_every_metric() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path());
        let engine = engine(dir.path());

        let result = engine
            .calculate_metrics(&outcome(), &birth(), Some(&geocoding_json()), Some("chart-1"))
            .await
            .unwrap();

        assert!(result.overall_passed, "failed: {:?}", result.failed_criteria);
        assert!(result.failed_criteria.is_empty());
        assert_eq!(result.ephemeris.len(), 7);
        assert!(result.convergence.within_threshold);
        assert!(result.ensemble.within_threshold);
        assert_eq!(result.event_fit.percentage, 100.0);
        assert!(result.geocoding.within_threshold);
        assert_eq!(result.meta.oracle_mode, "replay");
        assert_eq!(result.meta.chart_id.as_deref(), Some("chart-1"));

        let report = BtrMetrics::validate_metrics(&result);
        assert!(report.is_ok());
        assert!(report.warnings.is_empty());
    }

    #[tokio::test]
    async fn drifted_body_fails_and_is_named() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path());
        let engine = engine(dir.path());

        let mut run = outcome();
        run.chart.planets.insert(
            "Mars".to_string(),
            PlanetPosition {
                longitude: 328.47, // 0.5° off the reference
                sign: None,
                house: None,
            },
        );
        let result = engine
            .calculate_metrics(&run, &birth(), Some(&geocoding_json()), None)
            .await
            .unwrap();

        assert!(!result.overall_passed);
        assert_eq!(result.failed_criteria.len(), 1);
        assert!(result.failed_criteria[0].contains("Mars"));
    }

    #[tokio::test]
    async fn wrap_around_delta_is_minimal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FixtureOracle::new(dir.path());
        store.store(&sample_fixture("Sun", J2000, 359.95)).unwrap();
        let engine = engine(dir.path());

        let mut run = outcome();
        run.chart.planets.clear();
        run.chart.planets.insert(
            "Sun".to_string(),
            PlanetPosition {
                longitude: 0.0,
                sign: None,
                house: None,
            },
        );
        let result = engine
            .calculate_metrics(&run, &birth(), None, None)
            .await
            .unwrap();

        assert_eq!(result.ephemeris.len(), 1);
        let sun = &result.ephemeris[0];
        // 0.05° the short way round, not 359.95°.
        assert_relative_eq!(sun.delta_longitude, 0.05, epsilon = 1e-9);
        assert!(!sun.within_threshold);
    }

    #[tokio::test]
    async fn absent_bodies_and_failed_lookups_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path());
        // Saturn's fixture vanishes: its lookup fails, the rest proceed.
        std::fs::remove_file(dir.path().join("saturn_2451545.0.json")).unwrap();
        let engine = engine(dir.path());

        let mut run = outcome();
        run.chart.planets.remove("Venus"); // absent from chart

        let result = engine
            .calculate_metrics(&run, &birth(), Some(&geocoding_json()), None)
            .await
            .unwrap();

        let validated: Vec<&str> = result.ephemeris.iter().map(|e| e.body.as_str()).collect();
        assert_eq!(result.ephemeris.len(), 5);
        assert!(!validated.contains(&"Venus"));
        assert!(!validated.contains(&"Saturn"));
        assert!(result.overall_passed);
    }

    #[tokio::test]
    async fn chart_jd_falls_back_to_birth_data() {
        let dir = tempfile::tempdir().unwrap();
        // Record fixtures at the exact JD the converter derives for the
        // birth data, the same way record mode would have captured them.
        let derived_jd = TimeScaleConverter::new()
            .unwrap()
            .convert("2000-01-01T11:58:55.816", "Z")
            .unwrap()
            .julian_day_tt;
        assert_relative_eq!(derived_jd, J2000, epsilon = 1e-4);
        let store = FixtureOracle::new(dir.path());
        for (body, longitude) in FIXTURE_LONGITUDES {
            store
                .store(&sample_fixture(body, derived_jd, longitude))
                .unwrap();
        }
        let engine = engine(dir.path());

        let mut run = outcome();
        run.chart.julian_day_tt = None;

        let result = engine
            .calculate_metrics(&run, &birth(), None, None)
            .await
            .unwrap();
        assert_eq!(result.ephemeris.len(), 7);
    }

    #[tokio::test]
    async fn divergent_methods_fail_convergence() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path());
        let engine = engine(dir.path());

        let mut run = outcome();
        run.methods[0].rectified_time = "11:40:00".to_string();
        let result = engine
            .calculate_metrics(&run, &birth(), Some(&geocoding_json()), None)
            .await
            .unwrap();

        assert!(!result.overall_passed);
        assert!(result
            .failed_criteria
            .iter()
            .any(|c| c.contains("method convergence")));
    }

    #[tokio::test]
    async fn missing_geocoding_passes_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path());
        let engine = engine(dir.path());

        let result = engine
            .calculate_metrics(&outcome(), &birth(), None, None)
            .await
            .unwrap();

        assert!(result.geocoding.within_threshold);
        assert_eq!(result.geocoding.diagonal_meters, 0.0);
        assert!(result.geocoding.warning.is_some());
        assert!(result.overall_passed);
    }

    #[tokio::test]
    async fn life_events_are_judged_against_the_dasha() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path());
        let engine = engine(dir.path());

        let mut run = outcome();
        // Natal Moon 222.58° → Anuradha (index 16), lord Saturn.  What
        // matters here: the timeline exists and every event is judged.
        run.life_events = vec![
            LifeEvent {
                date: "2010-06-15".to_string(),
                kind: EventKind::Marriage,
                description: None,
            },
            LifeEvent {
                date: "2018-03-01".to_string(),
                kind: EventKind::Career,
                description: Some("promotion".to_string()),
            },
        ];
        let result = engine
            .calculate_metrics(&run, &birth(), Some(&geocoding_json()), None)
            .await
            .unwrap();

        assert_eq!(result.event_fit.total_events, 2);
        assert_eq!(result.event_fit.details.len(), 2);
        for detail in &result.event_fit.details {
            assert!(detail.mahadasha_lord.is_some());
        }
    }

    #[test]
    fn validation_catches_structural_breakage() {
        let broken = BtrMetricsResult {
            ephemeris: vec![EphemerisAccuracy {
                body: "Sun".to_string(),
                chart_longitude: 10.0,
                reference_longitude: 350.0,
                delta_longitude: 340.0, // wrap not applied
                threshold_degrees: 0.01,
                within_threshold: false,
            }],
            convergence: analyze_convergence(&[], 3.0),
            ensemble: EnsembleMetric {
                contributions: Vec::new(),
                weighted_confidence: 1.4,
                threshold: 0.7,
                within_threshold: true,
            },
            event_fit: EventFitMetric {
                total_events: 1,
                aligned_events: 2,
                percentage: 200.0,
                threshold_percentage: 80.0,
                within_threshold: true,
                details: Vec::new(),
            },
            geocoding: GeocodingPrecision {
                bbox: BoundingBox::from_point(0.0, 0.0),
                diagonal_meters: -5.0,
                confidence: 0.0,
                within_threshold: true,
                threshold_meters: 1_000.0,
                warning: None,
            },
            overall_passed: false,
            failed_criteria: Vec::new(),
            meta: CalculationMeta {
                duration_ms: 0,
                oracle_mode: "replay".to_string(),
                chart_id: None,
                calculated_at: Utc::now(),
            },
        };
        let report = BtrMetrics::validate_metrics(&broken);
        assert_eq!(report.errors.len(), 4);
        assert!(!report.is_ok());
    }

    #[test]
    fn empty_ephemeris_list_is_a_warning_not_an_error() {
        let result = BtrMetricsResult {
            ephemeris: Vec::new(),
            convergence: analyze_convergence(&[], 3.0),
            ensemble: EnsembleMetric {
                contributions: Vec::new(),
                weighted_confidence: 0.0,
                threshold: 0.7,
                within_threshold: true,
            },
            event_fit: EventFitMetric {
                total_events: 0,
                aligned_events: 0,
                percentage: 100.0,
                threshold_percentage: 80.0,
                within_threshold: true,
                details: Vec::new(),
            },
            geocoding: GeocodingPrecision {
                bbox: BoundingBox::from_point(0.0, 0.0),
                diagonal_meters: 0.0,
                confidence: 0.0,
                within_threshold: true,
                threshold_meters: 1_000.0,
                warning: Some("no geocoding result supplied".to_string()),
            },
            overall_passed: true,
            failed_criteria: Vec::new(),
            meta: CalculationMeta {
                duration_ms: 0,
                oracle_mode: "replay".to_string(),
                chart_id: None,
                calculated_at: Utc::now(),
            },
        };
        let report = BtrMetrics::validate_metrics(&result);
        assert!(report.is_ok());
        assert_eq!(report.warnings.len(), 1);
    }
}
