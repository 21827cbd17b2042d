// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/camwatch

//! Alert state machine - downtime accumulation and tier classification
//!
//! [`transition`] is pure: it takes the previous [`AlertState`] and one probe
//! outcome and returns the next state plus the [`AlertEvent`] to report.
//! Logging and persistence live in the worker, never here.
//!
//! Tiers are a stepwise function of accumulated downtime with no hysteresis,
//! so a camera flapping around a threshold moves between tiers every interval.

use serde::{Deserialize, Serialize};

use crate::probes::ProbeResult;

/// Downtime at which `AlertLevel1` starts, in seconds
pub const ALERT_LEVEL_1_THRESHOLD: u64 = 10;
/// Downtime at which `AlertLevel2` starts, in seconds
pub const ALERT_LEVEL_2_THRESHOLD: u64 = 60;
/// Downtime at which `AlertLevel3` starts, in seconds
pub const ALERT_LEVEL_3_THRESHOLD: u64 = 300;

/// Alert tier of a camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertTier {
    NoAlert,
    AlertLevel1,
    AlertLevel2,
    AlertLevel3,
    Unauthorized,
}

impl AlertTier {
    /// Tier for an authorized camera that has been down for `downtime_seconds`
    pub fn from_downtime(downtime_seconds: u64) -> Self {
        match downtime_seconds {
            d if d >= ALERT_LEVEL_3_THRESHOLD => Self::AlertLevel3,
            d if d >= ALERT_LEVEL_2_THRESHOLD => Self::AlertLevel2,
            d if d >= ALERT_LEVEL_1_THRESHOLD => Self::AlertLevel1,
            _ => Self::NoAlert,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoAlert => "NoAlert",
            Self::AlertLevel1 => "AlertLevel1",
            Self::AlertLevel2 => "AlertLevel2",
            Self::AlertLevel3 => "AlertLevel3",
            Self::Unauthorized => "Unauthorized",
        }
    }
}

impl std::fmt::Display for AlertTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-camera state, owned by exactly one worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertState {
    pub downtime_seconds: u64,
    pub current_tier: AlertTier,
    pub authorized: bool,
}

impl AlertState {
    /// Fresh state; authorization is fixed for the state's lifetime
    pub fn new(authorized: bool) -> Self {
        Self {
            downtime_seconds: 0,
            current_tier: if authorized {
                AlertTier::NoAlert
            } else {
                AlertTier::Unauthorized
            },
            authorized,
        }
    }
}

/// What a single transition reports.
///
/// Every variant is emitted each interval the condition holds; only
/// `Recovered` depends on the previous tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "tier")]
pub enum AlertEvent {
    /// Probe succeeded and the camera was already at `NoAlert`
    Healthy,
    /// Probe succeeded after the camera had reached an alert tier
    Recovered { from: AlertTier },
    /// Probe failed; carries the tier derived from the new downtime
    Down(AlertTier),
    /// Camera rejected its stream credentials
    Unauthorized,
}

impl AlertEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Healthy => "Healthy",
            Self::Recovered { .. } => "Recovered",
            Self::Down(tier) => tier.as_str(),
            Self::Unauthorized => "Unauthorized",
        }
    }
}

/// Apply one probe outcome to `state`
pub fn transition(
    state: &AlertState,
    probe: &ProbeResult,
    interval_seconds: u64,
) -> (AlertState, AlertEvent) {
    if !state.authorized {
        let next = AlertState {
            downtime_seconds: 0,
            current_tier: AlertTier::Unauthorized,
            authorized: false,
        };
        return (next, AlertEvent::Unauthorized);
    }

    if probe.is_success() {
        let event = match state.current_tier {
            AlertTier::NoAlert => AlertEvent::Healthy,
            from => AlertEvent::Recovered { from },
        };
        let next = AlertState {
            downtime_seconds: 0,
            current_tier: AlertTier::NoAlert,
            authorized: true,
        };
        return (next, event);
    }

    let downtime_seconds = state.downtime_seconds.saturating_add(interval_seconds);
    let tier = AlertTier::from_downtime(downtime_seconds);
    let next = AlertState {
        downtime_seconds,
        current_tier: tier,
        authorized: true,
    };
    (next, AlertEvent::Down(tier))
}
