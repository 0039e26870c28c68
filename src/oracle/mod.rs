// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Record/replay adapter for the external ephemeris oracle.
//!
//! [`HorizonsClient`] fronts two concrete capabilities selected by
//! explicit configuration at construction — never by reading ambient
//! environment state inside business logic:
//!
//! - **replay** (default): answers come from fixture files on disk; a
//!   missing fixture is fatal.
//! - **record**: answers come from the live service and are persisted as
//!   new fixtures with full provenance.
//!
//! A TTL-bounded in-memory cache sits in front of both paths, keyed by
//! the normalised query key.  Concurrent callers of the same key are
//! deduplicated: a per-key gate makes the second caller await the first
//! caller's result instead of issuing duplicate work.

mod fixture;
mod live;
mod query;

pub use fixture::{
    validate_fixture, EphemerisFixture, EphemerisResponse, EphemerisResult, FixtureOracle,
    Provenance, ResponseMetadata,
};
#[cfg(test)]
pub(crate) use fixture::sample_fixture;
pub use live::{horizons_command, LiveOracle};
pub use query::{
    format_julian_day, EphemerisQuery, DEFAULT_COORDINATE_FRAME, DEFAULT_QUANTITIES,
    GEOCENTRIC_OBSERVER,
};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Mutex;

use crate::error::Result;

/// Which capability answers oracle queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OracleMode {
    /// Replay previously captured fixtures (offline, deterministic).
    #[default]
    Replay,
    /// Query the live service and persist new fixtures.
    Record,
}

impl OracleMode {
    /// Parse a mode flag (`"replay"` / `"record"`, case-insensitive).
    ///
    /// Hosts that expose the mode through an environment variable call
    /// this at their edge; the client itself never reads the
    /// environment.
    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag.trim().to_ascii_lowercase().as_str() {
            "replay" => Some(OracleMode::Replay),
            "record" => Some(OracleMode::Record),
            _ => None,
        }
    }
}

impl std::fmt::Display for OracleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OracleMode::Replay => write!(f, "replay"),
            OracleMode::Record => write!(f, "record"),
        }
    }
}

/// Construction-time configuration for [`HorizonsClient`].
#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub mode: OracleMode,
    pub fixture_dir: PathBuf,
    pub base_url: String,
    pub request_timeout: Duration,
    pub cache_ttl: Duration,
    pub user_agent: String,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            mode: OracleMode::Replay,
            fixture_dir: PathBuf::from("fixtures/ephemeris"),
            base_url: "https://ssd.jpl.nasa.gov/api/horizons.api".to_string(),
            request_timeout: Duration::from_secs(30),
            cache_ttl: Duration::from_secs(3_600),
            user_agent: format!("verichron/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

struct CachedResponse {
    response: EphemerisResponse,
    inserted: Instant,
}

/// The capability behind the client, fixed at construction.
enum OracleBackend {
    Replay,
    Record(LiveOracle),
}

/// The oracle adapter consumed by the metrics engine.
pub struct HorizonsClient {
    backend: OracleBackend,
    fixtures: FixtureOracle,
    cache: Mutex<HashMap<String, CachedResponse>>,
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    cache_ttl: Duration,
}

impl HorizonsClient {
    pub fn new(config: OracleConfig) -> Result<Self> {
        let backend = match config.mode {
            OracleMode::Replay => OracleBackend::Replay,
            OracleMode::Record => OracleBackend::Record(LiveOracle::new(
                &config.base_url,
                config.request_timeout,
                &config.user_agent,
            )?),
        };
        Ok(Self {
            backend,
            fixtures: FixtureOracle::new(config.fixture_dir),
            cache: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            cache_ttl: config.cache_ttl,
        })
    }

    pub fn mode(&self) -> OracleMode {
        match self.backend {
            OracleBackend::Replay => OracleMode::Replay,
            OracleBackend::Record(_) => OracleMode::Record,
        }
    }

    /// Reference position for a body at an epoch (geocentric observer).
    pub async fn get_position(&self, body: &str, julian_day: f64) -> Result<EphemerisResponse> {
        self.get_position_for(&EphemerisQuery::new(body, julian_day))
            .await
    }

    /// Reference position for an explicit query.
    pub async fn get_position_for(&self, query: &EphemerisQuery) -> Result<EphemerisResponse> {
        let key = query.cache_key();

        if let Some(hit) = self.cache_get(&key).await {
            log::debug!("oracle cache hit for {key}");
            return Ok(hit);
        }

        // Single-flight: one fetch per key, concurrent callers wait here.
        let gate = {
            let mut in_flight = self.in_flight.lock().await;
            in_flight
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _guard = gate.lock().await;

        // A waiter may find the leader's result already cached.
        if let Some(hit) = self.cache_get(&key).await {
            log::debug!("oracle cache hit after in-flight wait for {key}");
            return Ok(hit);
        }

        let result = self.fetch(query).await;

        if let Ok(response) = &result {
            let mut cache = self.cache.lock().await;
            cache.insert(
                key.clone(),
                CachedResponse {
                    response: response.clone(),
                    inserted: Instant::now(),
                },
            );
        }
        {
            let mut in_flight = self.in_flight.lock().await;
            in_flight.remove(&key);
        }
        result
    }

    async fn fetch(&self, query: &EphemerisQuery) -> Result<EphemerisResponse> {
        match &self.backend {
            OracleBackend::Replay => self.replay(query),
            OracleBackend::Record(live) => self.record(live, query).await,
        }
    }

    fn replay(&self, query: &EphemerisQuery) -> Result<EphemerisResponse> {
        let (response, warnings) = self.fixtures.load(query)?;
        for warning in warnings {
            log::warn!("{warning}");
        }
        Ok(response)
    }

    async fn record(&self, live: &LiveOracle, query: &EphemerisQuery) -> Result<EphemerisResponse> {
        if self.fixtures.exists(query) {
            // Append-only: an existing recording is never replaced.
            log::warn!(
                "fixture {} already recorded; replaying it",
                query.fixture_filename()
            );
            return self.replay(query);
        }

        let response = live.fetch(query).await?;
        let fixture = EphemerisFixture {
            filename: query.fixture_filename(),
            query: query.clone(),
            response: response.clone(),
            recorded_at: Utc::now(),
            valid_until: None,
            notes: None,
        };
        self.fixtures.store(&fixture)?;
        Ok(response)
    }

    async fn cache_get(&self, key: &str) -> Option<EphemerisResponse> {
        let cache = self.cache.lock().await;
        cache.get(key).and_then(|entry| {
            (entry.inserted.elapsed() < self.cache_ttl).then(|| entry.response.clone())
        })
    }

    /// Drop every cached response.
    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }

    /// Number of cached responses (expired ones included until reaped).
    pub async fn cache_len(&self) -> usize {
        self.cache.lock().await.len()
    }
}
