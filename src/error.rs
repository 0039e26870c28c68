// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Unified error type for the validation engine.
//!
//! Configuration and data errors (missing fixtures, malformed tables,
//! unparseable civil times) are fatal and carried here.  Threshold
//! failures are *not* errors: they are recorded in the metrics result
//! as failing criteria.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for all fallible operations in this crate.
#[derive(Error, Debug)]
pub enum VerichronError {
    /// The civil date/time string could not be parsed.
    #[error("invalid civil date/time {input:?}: {reason}")]
    InvalidDate { input: String, reason: String },

    /// The timezone offset string could not be parsed.
    #[error("invalid timezone offset {0:?} (expected \"Z\", \"UTC\" or \"±HH:MM\")")]
    InvalidOffset(String),

    /// The ΔT historical table file is unreadable or structurally invalid.
    #[error("malformed delta-T table {path:?}: {reason}")]
    MalformedDeltaTTable { path: PathBuf, reason: String },

    /// Replay mode found no fixture for the requested query.
    ///
    /// Deliberately fatal: a missing fixture must never resolve to a
    /// default position.
    #[error("ephemeris fixture not found for {body} at JD {julian_day}: expected {filename:?} in {dir:?}")]
    FixtureNotFound {
        body: String,
        julian_day: String,
        filename: String,
        dir: PathBuf,
    },

    /// A fixture file exists but fails structural validation.
    #[error("invalid ephemeris fixture {filename:?}: {reason}")]
    InvalidFixture { filename: String, reason: String },

    /// The requested body has no known oracle identifier.
    #[error("unknown ephemeris body {0:?}")]
    UnknownBody(String),

    /// Live oracle transport failure (record mode only).
    #[error("oracle request failed: {0}")]
    Oracle(#[from] reqwest::Error),

    /// The live oracle answered, but the payload was unusable.
    #[error("oracle response unusable: {0}")]
    OracleResponse(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, VerichronError>;
