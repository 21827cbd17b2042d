// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/camwatch

//! Library error type

use thiserror::Error;

/// Errors raised by camwatch components.
///
/// Probe failures never show up here: they are folded into
/// [`ProbeResult`](crate::probes::ProbeResult) values instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Camera make has no stream URI template
    #[error("unknown camera make '{make}' for camera {camera_id}")]
    UnknownMake { camera_id: String, make: String },

    /// Roster source could not be read or decoded
    #[error("roster error: {0}")]
    Roster(String),

    /// Health record store rejected a write
    #[error("sink error: {0}")]
    Sink(String),

    /// Audit log append failed
    #[error("audit log error: {0}")]
    Audit(String),

    /// Shutdown arrived while a worker was still starting
    #[error("shutdown requested before camera {0} started")]
    Cancelled(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// Background task failed to complete
    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, Error>;
