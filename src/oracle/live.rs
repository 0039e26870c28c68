// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Live JPL-Horizons client (record mode only).
//!
//! Builds an observer-table request for one epoch, fetches it, and
//! parses the `$$SOE`/`$$EOE` CSV block into an
//! [`EphemerisResponse`].  Unavailability is fatal by design: a failed
//! live call must never be papered over with a stale or synthetic
//! position.

use chrono::Utc;
use std::time::Duration;

use crate::error::{Result, VerichronError};
use crate::oracle::fixture::{EphemerisResponse, EphemerisResult, Provenance, ResponseMetadata};
use crate::oracle::query::{format_julian_day, EphemerisQuery};

/// Horizons COMMAND identifier for a supported body.
pub fn horizons_command(body: &str) -> Option<&'static str> {
    match body.to_ascii_lowercase().as_str() {
        "sun" => Some("10"),
        "moon" => Some("301"),
        "mercury" => Some("199"),
        "venus" => Some("299"),
        "mars" => Some("499"),
        "jupiter" => Some("599"),
        "saturn" => Some("699"),
        _ => None,
    }
}

/// Async HTTP client for the Horizons API.
pub struct LiveOracle {
    client: reqwest::Client,
    base_url: String,
}

impl LiveOracle {
    /// Build the client with an explicit timeout and user agent.
    pub fn new(base_url: &str, timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    /// The exact request URL for a query.
    ///
    /// The Julian Day is rendered with full decimal precision (see
    /// [`format_julian_day`]) so recorded provenance and fixture names
    /// stay byte-stable.
    pub fn query_url(&self, query: &EphemerisQuery) -> Result<String> {
        let command = horizons_command(&query.target_body)
            .ok_or_else(|| VerichronError::UnknownBody(query.target_body.clone()))?;
        Ok(format!(
            "{}?format=text&MAKE_EPHEM='YES'&EPHEM_TYPE='OBSERVER'&OBJ_DATA='NO'\
             &COMMAND='{}'&CENTER='{}'&TLIST='{}'&QUANTITIES='{}'\
             &CSV_FORMAT='YES'&ANGLE_FORMAT='DEG'",
            self.base_url,
            command,
            query.observer_code,
            format_julian_day(query.julian_day),
            query.quantities,
        ))
    }

    /// Perform the live lookup.
    pub async fn fetch(&self, query: &EphemerisQuery) -> Result<EphemerisResponse> {
        let url = self.query_url(query)?;
        log::debug!("live oracle request: {url}");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(VerichronError::OracleResponse(format!(
                "HTTP {} from {url}",
                response.status()
            )));
        }
        let body = response.text().await?;
        let results = parse_observer_table(&body, query.julian_day)?;

        Ok(EphemerisResponse {
            query: query.clone(),
            api_version: "1.2".to_string(),
            provenance: Provenance {
                source: "JPL Horizons".to_string(),
                url,
                timestamp: Utc::now(),
            },
            results,
            metadata: ResponseMetadata {
                target_name: query.target_body.clone(),
                observer_location: query.observer_code.clone(),
                time_system: "TT".to_string(),
                coordinate_system: query.coordinate_frame.clone(),
                reference_frame: "J2000".to_string(),
            },
        })
    }
}

/// Parse the `$$SOE`/`$$EOE` CSV block of an observer-table answer.
///
/// Each data line carries the calendar date first; the last two numeric
/// fields are taken as ecliptic longitude and latitude in degrees.
fn parse_observer_table(body: &str, julian_day: f64) -> Result<Vec<EphemerisResult>> {
    let start = body.find("$$SOE").ok_or_else(|| {
        VerichronError::OracleResponse("missing $$SOE marker in response".to_string())
    })?;
    let end = body.find("$$EOE").ok_or_else(|| {
        VerichronError::OracleResponse("missing $$EOE marker in response".to_string())
    })?;
    if end <= start {
        return Err(VerichronError::OracleResponse(
            "malformed $$SOE/$$EOE block".to_string(),
        ));
    }

    let mut results = Vec::new();
    for line in body[start + 5..end].lines() {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < 3 {
            continue;
        }
        let numeric: Vec<f64> = fields
            .iter()
            .skip(1)
            .filter_map(|f| f.parse::<f64>().ok())
            .collect();
        if numeric.len() < 2 {
            continue;
        }
        let longitude = numeric[numeric.len() - 2].rem_euclid(360.0);
        let latitude = numeric[numeric.len() - 1];
        results.push(EphemerisResult {
            julian_day,
            calendar: fields[0].to_string(),
            longitude,
            latitude,
            distance: None,
        });
    }

    if results.is_empty() {
        return Err(VerichronError::OracleResponse(
            "no data rows between $$SOE and $$EOE".to_string(),
        ));
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_bodies_have_commands() {
        assert_eq!(horizons_command("Sun"), Some("10"));
        assert_eq!(horizons_command("moon"), Some("301"));
        assert_eq!(horizons_command("Pluto"), None);
    }

    #[test]
    fn url_renders_full_jd_precision() {
        let oracle = LiveOracle::new(
            "https://ssd.jpl.nasa.gov/api/horizons.api",
            Duration::from_secs(30),
            "verichron/0.2",
        )
        .unwrap();
        let url = oracle
            .query_url(&EphemerisQuery::new("Sun", 2_451_545.0))
            .unwrap();
        assert!(url.contains("COMMAND='10'"), "{url}");
        assert!(url.contains("TLIST='2451545.0'"), "{url}");
        assert!(url.contains("CENTER='500@399'"), "{url}");
    }

    #[test]
    fn unknown_body_is_an_error() {
        let oracle = LiveOracle::new(
            "https://ssd.jpl.nasa.gov/api/horizons.api",
            Duration::from_secs(30),
            "verichron/0.2",
        )
        .unwrap();
        let err = oracle
            .query_url(&EphemerisQuery::new("Vulcan", 2_451_545.0))
            .unwrap_err();
        assert!(matches!(err, VerichronError::UnknownBody(_)));
    }

    #[test]
    fn parses_observer_table_block() {
        let body = "\
garbage header
$$SOE
 2000-Jan-01 12:00, , 280.1582432, -0.0001234,
$$EOE
trailer";
        let rows = parse_observer_table(body, 2_451_545.0).unwrap();
        assert_eq!(rows.len(), 1);
        assert!((rows[0].longitude - 280.1582432).abs() < 1e-9);
        assert_eq!(rows[0].calendar, "2000-Jan-01 12:00");
    }

    #[test]
    fn negative_longitudes_are_wrapped() {
        let body = "$$SOE\n 2000-Jan-01 12:00, , -10.0, 1.5,\n$$EOE";
        let rows = parse_observer_table(body, 2_451_545.0).unwrap();
        assert!((rows[0].longitude - 350.0).abs() < 1e-9);
    }

    #[test]
    fn missing_markers_are_an_error() {
        assert!(parse_observer_table("no markers here", 0.0).is_err());
        assert!(parse_observer_table("$$SOE\n$$EOE", 0.0).is_err());
    }
}
