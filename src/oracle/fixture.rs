// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Fixture persistence and replay.
//!
//! A fixture is one previously captured oracle response, stored as a
//! JSON file whose name is derived deterministically from the query (see
//! [`EphemerisQuery::fixture_filename`]).  Replay mode loads fixtures;
//! record mode writes them.  Fixtures are append-only by filename: an
//! existing file is never rewritten in place.
//!
//! Every loaded fixture is structurally validated.  Range violations and
//! missing required data are errors; missing optional metadata and an
//! expired `validUntil` are warnings attached to the result.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VerichronError};
use crate::oracle::query::EphemerisQuery;

/// Provenance of a recorded response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    /// Service name, e.g. `"JPL Horizons"`.
    pub source: String,
    /// The exact query URL that produced the response.
    pub url: String,
    /// When the live call was made.
    pub timestamp: DateTime<Utc>,
}

/// One reference position row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EphemerisResult {
    pub julian_day: f64,
    /// Calendar rendering of the epoch, as the service printed it.
    pub calendar: String,
    /// Ecliptic longitude, degrees in `[0, 360)`.
    pub longitude: f64,
    /// Ecliptic latitude, degrees in `[−90, 90]`.
    pub latitude: f64,
    /// Distance from the observer, au.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

/// Descriptive metadata echoed alongside the results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub target_name: String,
    pub observer_location: String,
    pub time_system: String,
    pub coordinate_system: String,
    pub reference_frame: String,
}

/// A complete oracle answer for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EphemerisResponse {
    pub query: EphemerisQuery,
    pub api_version: String,
    pub provenance: Provenance,
    pub results: Vec<EphemerisResult>,
    pub metadata: ResponseMetadata,
}

impl EphemerisResponse {
    /// Longitude of the first result row, if any.
    pub fn primary_longitude(&self) -> Option<f64> {
        self.results.first().map(|r| r.longitude)
    }
}

/// The persisted unit of replay data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EphemerisFixture {
    pub filename: String,
    pub query: EphemerisQuery,
    pub response: EphemerisResponse,
    pub recorded_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Structural validation: errors for broken data, warnings for gaps.
pub fn validate_fixture(fixture: &EphemerisFixture) -> Result<Vec<String>> {
    if fixture.response.results.is_empty() {
        return Err(VerichronError::InvalidFixture {
            filename: fixture.filename.clone(),
            reason: "response carries no results".to_string(),
        });
    }
    for (i, row) in fixture.response.results.iter().enumerate() {
        if !(0.0..360.0).contains(&row.longitude) {
            return Err(VerichronError::InvalidFixture {
                filename: fixture.filename.clone(),
                reason: format!("result {i} longitude {} out of [0, 360)", row.longitude),
            });
        }
        if !(-90.0..=90.0).contains(&row.latitude) {
            return Err(VerichronError::InvalidFixture {
                filename: fixture.filename.clone(),
                reason: format!("result {i} latitude {} out of [−90, 90]", row.latitude),
            });
        }
    }

    let mut warnings = Vec::new();
    if fixture.response.metadata.target_name.is_empty() {
        warnings.push(format!("{}: metadata.targetName is empty", fixture.filename));
    }
    if fixture.response.provenance.url.is_empty() {
        warnings.push(format!("{}: provenance.url is empty", fixture.filename));
    }
    if let Some(valid_until) = fixture.valid_until {
        if valid_until < Utc::now() {
            warnings.push(format!(
                "{}: fixture expired at {}",
                fixture.filename,
                valid_until.to_rfc3339()
            ));
        }
    }
    Ok(warnings)
}

/// Replay-side store: loads and (in record mode) persists fixtures.
#[derive(Debug, Clone)]
pub struct FixtureOracle {
    dir: PathBuf,
}

impl FixtureOracle {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a query's fixture lives at.
    pub fn path_for(&self, query: &EphemerisQuery) -> PathBuf {
        self.dir.join(query.fixture_filename())
    }

    /// Whether a fixture exists for the query.
    pub fn exists(&self, query: &EphemerisQuery) -> bool {
        self.path_for(query).is_file()
    }

    /// Load, validate, and return the response plus any warnings.
    ///
    /// A missing file is fatal: replay must never fall back to a default
    /// position.
    pub fn load(&self, query: &EphemerisQuery) -> Result<(EphemerisResponse, Vec<String>)> {
        let filename = query.fixture_filename();
        let path = self.dir.join(&filename);
        let json = std::fs::read_to_string(&path).map_err(|_| VerichronError::FixtureNotFound {
            body: query.target_body.clone(),
            julian_day: crate::oracle::query::format_julian_day(query.julian_day),
            filename: filename.clone(),
            dir: self.dir.clone(),
        })?;
        let fixture: EphemerisFixture =
            serde_json::from_str(&json).map_err(|e| VerichronError::InvalidFixture {
                filename: filename.clone(),
                reason: e.to_string(),
            })?;
        let warnings = validate_fixture(&fixture)?;
        Ok((fixture.response, warnings))
    }

    /// Persist a newly recorded fixture.
    ///
    /// Append-only: if the file already exists it is left untouched and
    /// the existing path is returned with a warning log.
    pub fn store(&self, fixture: &EphemerisFixture) -> Result<PathBuf> {
        validate_fixture(fixture)?;
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&fixture.filename);
        if path.exists() {
            log::warn!(
                "fixture {} already exists; keeping the original",
                path.display()
            );
            return Ok(path);
        }
        let json = serde_json::to_string_pretty(fixture)?;
        std::fs::write(&path, json)?;
        log::debug!("recorded fixture {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
pub(crate) fn sample_fixture(body: &str, jd: f64, longitude: f64) -> EphemerisFixture {
    let query = EphemerisQuery::new(body, jd);
    let filename = query.fixture_filename();
    EphemerisFixture {
        filename,
        query: query.clone(),
        response: EphemerisResponse {
            query: query.clone(),
            api_version: "1.2".to_string(),
            provenance: Provenance {
                source: "JPL Horizons".to_string(),
                url: format!("https://ssd.jpl.nasa.gov/api/horizons.api?jd={jd}"),
                timestamp: Utc::now(),
            },
            results: vec![EphemerisResult {
                julian_day: jd,
                calendar: "A.D. 2000-Jan-01 12:00:00.0000".to_string(),
                longitude,
                latitude: 0.0,
                distance: Some(1.0),
            }],
            metadata: ResponseMetadata {
                target_name: query.target_body.clone(),
                observer_location: query.observer_code.clone(),
                time_system: "TT".to_string(),
                coordinate_system: "ecliptic".to_string(),
                reference_frame: "J2000".to_string(),
            },
        },
        recorded_at: Utc::now(),
        valid_until: None,
        notes: None,
    }
}
