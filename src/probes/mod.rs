// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/camwatch

//! Probe adapters - reachability and authorization checks against cameras

mod ping;
mod stream;
mod simulator;

#[cfg(test)]
pub(crate) mod testing;

pub use ping::{parse_rtt, PingProbe};
pub use stream::StreamProbe;
pub use simulator::SimulatedProbe;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cameras::Camera;

/// Outcome of a single reachability check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProbeResult {
    /// Camera answered. Latency is absent when no reply line could be parsed.
    Success {
        latency_ms: Option<f64>,
        response: String,
    },
    /// Probe ran and reported the camera unreachable
    Failure { error: String },
    /// Probe did not finish within its time budget
    Timeout { error: String },
}

impl ProbeResult {
    pub fn success(latency_ms: Option<f64>) -> Self {
        Self::Success {
            latency_ms,
            response: String::new(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure { error: error.into() }
    }

    pub fn timeout(error: impl Into<String>) -> Self {
        Self::Timeout { error: error.into() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn latency_ms(&self) -> Option<f64> {
        match self {
            Self::Success { latency_ms, .. } => *latency_ms,
            _ => None,
        }
    }

    /// Short status label, as stored alongside each record
    pub fn status(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Failure { .. } => "failure",
            Self::Timeout { .. } => "timeout",
        }
    }
}

/// Result of the one-time stream authorization check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Authorization {
    Authorized,
    Unauthorized,
}

impl Authorization {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized)
    }
}

/// Per-interval reachability check.
///
/// Implementations fold every failure into the returned [`ProbeResult`].
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn check(&self, camera: &Camera) -> ProbeResult;
}

/// Stream authorization check, run once when a worker starts
#[async_trait]
pub trait AuthorizationProbe: Send + Sync {
    /// Try to open the live stream at `stream_uri` with the camera's credentials
    async fn authorize(&self, camera: &Camera, stream_uri: &str) -> Authorization;
}
