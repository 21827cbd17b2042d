// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/camwatch

//! Simulated probes for demo mode

use async_trait::async_trait;
use rand::Rng;

use super::{Authorization, AuthorizationProbe, ProbeResult, ReachabilityProbe};
use crate::cameras::Camera;

/// Stand-in for both probes when no real cameras are available
#[derive(Debug, Clone)]
pub struct SimulatedProbe {
    failure_rate: f64,
    unauthorized_rate: f64,
}

impl SimulatedProbe {
    /// Rates are probabilities in `0.0..=1.0`
    pub fn new(failure_rate: f64, unauthorized_rate: f64) -> Self {
        Self {
            failure_rate: failure_rate.clamp(0.0, 1.0),
            unauthorized_rate: unauthorized_rate.clamp(0.0, 1.0),
        }
    }
}

impl Default for SimulatedProbe {
    fn default() -> Self {
        Self::new(0.2, 0.05)
    }
}

#[async_trait]
impl ReachabilityProbe for SimulatedProbe {
    async fn check(&self, camera: &Camera) -> ProbeResult {
        let mut rng = rand::thread_rng();
        let roll: f64 = rng.gen();

        if roll < self.failure_rate / 2.0 {
            ProbeResult::timeout(format!("Ping to {} timed out.", camera.ip))
        } else if roll < self.failure_rate {
            ProbeResult::failure("Destination Host Unreachable")
        } else {
            let latency = rng.gen_range(0.3..25.0);
            ProbeResult::Success {
                latency_ms: Some(latency),
                response: format!("64 bytes from {}: icmp_seq=1 ttl=64 time={:.3} ms", camera.ip, latency),
            }
        }
    }
}

#[async_trait]
impl AuthorizationProbe for SimulatedProbe {
    async fn authorize(&self, _camera: &Camera, _stream_uri: &str) -> Authorization {
        if rand::thread_rng().gen_bool(self.unauthorized_rate) {
            Authorization::Unauthorized
        } else {
            Authorization::Authorized
        }
    }
}
