// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Geocoding spatial-precision analysis.
//!
//! Pure functions: a geocoded place lookup (coordinates plus an optional
//! bounding box) becomes a precision metric by measuring the bbox
//! diagonal on a spherical Earth.  External services encode bounding
//! boxes in several shapes; [`extract_bounding_box`] is the single
//! adapter that normalises them all into the canonical
//! `[min_lat, min_lon, max_lat, max_lon]` form, so the distance
//! functions stay shape-agnostic.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Mean Earth radius, meters (spherical model).
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Default acceptable bbox diagonal, meters.
pub const DEFAULT_PRECISION_THRESHOLD_METERS: f64 = 1_000.0;

// ---------------------------------------------------------------------------
// Distances
// ---------------------------------------------------------------------------

/// Great-circle distance between two points, in meters.
///
/// Standard haversine on a spherical Earth.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_METERS * c
}

// ---------------------------------------------------------------------------
// Canonical bounding box
// ---------------------------------------------------------------------------

/// Canonical bounding box: `[min_lat, min_lon, max_lat, max_lon]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// Zero-size box around a single point.
    pub fn from_point(lat: f64, lon: f64) -> Self {
        Self::new(lat, lon, lat, lon)
    }

    /// `[min_lat, min_lon, max_lat, max_lon]`.
    pub fn as_array(&self) -> [f64; 4] {
        [self.min_lat, self.min_lon, self.max_lat, self.max_lon]
    }
}

/// Great-circle distance from the SW to the NE corner, meters.
pub fn bbox_diagonal_meters(bbox: &BoundingBox) -> f64 {
    haversine_distance(bbox.min_lat, bbox.min_lon, bbox.max_lat, bbox.max_lon)
}

/// Approximate area as width × height, square meters.
///
/// Width is measured along the southern edge, height along the western
/// edge; both are independent haversine distances.
pub fn bbox_area_square_meters(bbox: &BoundingBox) -> f64 {
    let width = haversine_distance(bbox.min_lat, bbox.min_lon, bbox.min_lat, bbox.max_lon);
    let height = haversine_distance(bbox.min_lat, bbox.min_lon, bbox.max_lat, bbox.min_lon);
    width * height
}

// ---------------------------------------------------------------------------
// External-shape adapter
// ---------------------------------------------------------------------------

/// Normalise a geocoder response into the canonical bounding box.
///
/// Recognised shapes, tried in order:
/// 1. Nested corners: `{"bounds": {"southwest": {"lat", "lng"},
///    "northeast": {"lat", "lng"}}}`
/// 2. Flat GeoJSON-style array: `{"bbox": [min_lon, min_lat, max_lon,
///    max_lat]}` (also accepted under `"boundingbox"`)
/// 3. Point-only: `{"lat", "lon"}` (or `"lng"`) → zero-size box
pub fn extract_bounding_box(value: &Value) -> Option<BoundingBox> {
    if let Some(bounds) = value.get("bounds") {
        let sw = bounds.get("southwest")?;
        let ne = bounds.get("northeast")?;
        return Some(BoundingBox::new(
            number(sw, "lat")?,
            number(sw, "lng").or_else(|| number(sw, "lon"))?,
            number(ne, "lat")?,
            number(ne, "lng").or_else(|| number(ne, "lon"))?,
        ));
    }

    for key in ["bbox", "boundingbox"] {
        if let Some(Value::Array(values)) = value.get(key) {
            if values.len() == 4 {
                let mut nums = [0.0f64; 4];
                for (slot, raw) in nums.iter_mut().zip(values) {
                    *slot = raw.as_f64().or_else(|| {
                        raw.as_str().and_then(|s| s.parse::<f64>().ok())
                    })?;
                }
                // Flat arrays are [min_lon, min_lat, max_lon, max_lat].
                return Some(BoundingBox::new(nums[1], nums[0], nums[3], nums[2]));
            }
        }
    }

    let lat = number(value, "lat")?;
    let lon = number(value, "lon").or_else(|| number(value, "lng"))?;
    Some(BoundingBox::from_point(lat, lon))
}

fn number(value: &Value, key: &str) -> Option<f64> {
    value.get(key).and_then(Value::as_f64)
}

// ---------------------------------------------------------------------------
// Precision analysis
// ---------------------------------------------------------------------------

/// Ordinal precision category for human-facing reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrecisionCategory {
    /// ≤ 100 m
    Excellent,
    /// ≤ 500 m
    Good,
    /// ≤ 1 km
    Moderate,
    /// ≤ 5 km
    Poor,
    /// > 5 km
    VeryPoor,
}

impl std::fmt::Display for PrecisionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrecisionCategory::Excellent => write!(f, "excellent"),
            PrecisionCategory::Good => write!(f, "good"),
            PrecisionCategory::Moderate => write!(f, "moderate"),
            PrecisionCategory::Poor => write!(f, "poor"),
            PrecisionCategory::VeryPoor => write!(f, "very-poor"),
        }
    }
}

/// Map a bbox diagonal to its ordinal category.
pub fn categorize_precision(diagonal_meters: f64) -> PrecisionCategory {
    if diagonal_meters <= 100.0 {
        PrecisionCategory::Excellent
    } else if diagonal_meters <= 500.0 {
        PrecisionCategory::Good
    } else if diagonal_meters <= 1_000.0 {
        PrecisionCategory::Moderate
    } else if diagonal_meters <= 5_000.0 {
        PrecisionCategory::Poor
    } else {
        PrecisionCategory::VeryPoor
    }
}

/// Graded warning for a bbox diagonal; `None` at ≤ 1 km.
pub fn precision_warning(diagonal_meters: f64) -> Option<String> {
    if diagonal_meters > 10_000.0 {
        Some(format!(
            "very low precision: bounding box spans {:.1} km",
            diagonal_meters / 1_000.0
        ))
    } else if diagonal_meters > 5_000.0 {
        Some(format!(
            "low precision: bounding box spans {:.1} km",
            diagonal_meters / 1_000.0
        ))
    } else if diagonal_meters > 1_000.0 {
        Some(format!(
            "moderate precision: bounding box spans {:.0} m",
            diagonal_meters
        ))
    } else {
        None
    }
}

/// Derived precision metric for one geocoded lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeocodingPrecision {
    pub bbox: BoundingBox,
    pub diagonal_meters: f64,
    /// 0–1, higher is tighter.
    pub confidence: f64,
    pub within_threshold: bool,
    pub threshold_meters: f64,
    pub warning: Option<String>,
}

/// Precision metric for an already-normalised bounding box.
pub fn extract_geocoding_precision(bbox: BoundingBox, threshold_meters: f64) -> GeocodingPrecision {
    let diagonal_meters = bbox_diagonal_meters(&bbox);
    // Full confidence at ≤100 m, linear falloff to zero at 10 km.
    let confidence = ((10_000.0 - diagonal_meters) / 9_900.0).clamp(0.0, 1.0);
    GeocodingPrecision {
        bbox,
        diagonal_meters,
        confidence,
        within_threshold: diagonal_meters <= threshold_meters,
        threshold_meters,
        warning: precision_warning(diagonal_meters),
    }
}

/// Normalise a raw geocoder response and analyse its precision.
///
/// Returns `None` when no coordinates of any recognised shape are
/// present.
pub fn analyze_geocoding_result(value: &Value, threshold_meters: f64) -> Option<GeocodingPrecision> {
    let bbox = extract_bounding_box(value)?;
    Some(extract_geocoding_precision(bbox, threshold_meters))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    #[test]
    fn haversine_identity_and_symmetry() {
        assert_eq!(haversine_distance(12.97, 77.59, 12.97, 77.59), 0.0);
        let ab = haversine_distance(12.97, 77.59, 28.61, 77.21);
        let ba = haversine_distance(28.61, 77.21, 12.97, 77.59);
        assert_relative_eq!(ab, ba, epsilon = 1e-9);
    }

    #[test]
    fn haversine_known_distance() {
        // Bangalore → Delhi is roughly 1740 km.
        let d = haversine_distance(12.9716, 77.5946, 28.6139, 77.2090);
        assert!((1_700_000.0..1_800_000.0).contains(&d), "d = {d}");
    }

    #[test]
    fn degenerate_bbox_has_zero_diagonal() {
        let bbox = BoundingBox::from_point(12.97, 77.59);
        assert_eq!(bbox_diagonal_meters(&bbox), 0.0);
        assert_eq!(bbox_area_square_meters(&bbox), 0.0);
    }

    #[test]
    fn diagonal_is_non_negative_and_exceeds_edges() {
        let bbox = BoundingBox::new(12.96, 77.58, 12.98, 77.60);
        let diagonal = bbox_diagonal_meters(&bbox);
        assert!(diagonal > 0.0);
        let width = haversine_distance(12.96, 77.58, 12.96, 77.60);
        assert!(diagonal >= width);
    }

    #[test]
    fn extract_nested_bounds() {
        let raw = json!({
            "bounds": {
                "southwest": { "lat": 12.96, "lng": 77.58 },
                "northeast": { "lat": 12.98, "lng": 77.60 }
            }
        });
        let bbox = extract_bounding_box(&raw).unwrap();
        assert_eq!(bbox.as_array(), [12.96, 77.58, 12.98, 77.60]);
    }

    #[test]
    fn extract_flat_array() {
        // Flat arrays carry [min_lon, min_lat, max_lon, max_lat].
        let raw = json!({ "bbox": [77.58, 12.96, 77.60, 12.98] });
        let bbox = extract_bounding_box(&raw).unwrap();
        assert_eq!(bbox.as_array(), [12.96, 77.58, 12.98, 77.60]);

        let stringly = json!({ "boundingbox": ["77.58", "12.96", "77.60", "12.98"] });
        let bbox = extract_bounding_box(&stringly).unwrap();
        assert_eq!(bbox.as_array(), [12.96, 77.58, 12.98, 77.60]);
    }

    #[test]
    fn extract_point_only() {
        let raw = json!({ "lat": 12.97, "lon": 77.59 });
        let bbox = extract_bounding_box(&raw).unwrap();
        assert_eq!(bbox_diagonal_meters(&bbox), 0.0);
    }

    #[test]
    fn extract_rejects_shapeless_input() {
        assert!(extract_bounding_box(&json!({ "name": "nowhere" })).is_none());
        assert!(extract_bounding_box(&json!({ "bbox": [1.0, 2.0] })).is_none());
    }

    #[test]
    fn warning_bands() {
        assert!(precision_warning(800.0).is_none());
        assert!(precision_warning(1_200.0).unwrap().contains("moderate"));
        assert!(precision_warning(6_000.0).unwrap().starts_with("low"));
        assert!(precision_warning(12_000.0).unwrap().starts_with("very low"));
    }

    #[test]
    fn categories_are_monotone_with_warnings() {
        assert_eq!(categorize_precision(50.0), PrecisionCategory::Excellent);
        assert_eq!(categorize_precision(400.0), PrecisionCategory::Good);
        assert_eq!(categorize_precision(900.0), PrecisionCategory::Moderate);
        assert_eq!(categorize_precision(1_200.0), PrecisionCategory::Poor);
        assert_eq!(categorize_precision(9_000.0), PrecisionCategory::VeryPoor);
    }

    #[test]
    fn moderate_warning_above_default_threshold() {
        // A ~1.2 km diagonal misses the default 1 km threshold with a
        // moderate-precision warning.
        let half = 1_200.0 / (2.0f64).sqrt() / 2.0;
        let d_lat = half / 111_320.0;
        let d_lon = half / (111_320.0 * (12.97f64).to_radians().cos());
        let bbox = BoundingBox::new(12.97 - d_lat, 77.59 - d_lon, 12.97 + d_lat, 77.59 + d_lon);
        let precision =
            extract_geocoding_precision(bbox, DEFAULT_PRECISION_THRESHOLD_METERS);
        assert!((1_050.0..1_400.0).contains(&precision.diagonal_meters));
        assert!(!precision.within_threshold);
        assert!(precision.warning.as_deref().unwrap().contains("moderate"));
    }

    #[test]
    fn analyze_full_result() {
        let raw = json!({
            "bounds": {
                "southwest": { "lat": 12.9695, "lng": 77.5925 },
                "northeast": { "lat": 12.9725, "lng": 77.5955 }
            }
        });
        let precision = analyze_geocoding_result(&raw, 1_000.0).unwrap();
        assert!(precision.within_threshold);
        assert!(precision.warning.is_none());
        assert!(precision.confidence > 0.9);
    }
}
