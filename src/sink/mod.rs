// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/camwatch

//! Sinks - health timeline store and unauthorized-camera audit log

mod audit;

pub use audit::{CsvAuditLog, AUDIT_HEADER};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::alerts::{AlertEvent, AlertState, AlertTier};
use crate::cameras::Camera;
use crate::error::Result;
use crate::probes::ProbeResult;

/// One point on a camera's health timeline. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    pub id: Uuid,
    pub camera_id: String,
    pub timestamp: DateTime<Utc>,
    pub probe: ProbeResult,
    pub tier: AlertTier,
    pub event: AlertEvent,
    pub downtime_seconds: u64,
    /// `active` when the stream accepted the credentials, `unauthorized` otherwise
    pub stream_status: String,
    /// Roster entry as it was when the record was taken
    pub camera: Camera,
}

impl HealthRecord {
    pub fn new(
        camera: &Camera,
        timestamp: DateTime<Utc>,
        probe: ProbeResult,
        state: &AlertState,
        event: AlertEvent,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            camera_id: camera.id.clone(),
            timestamp,
            probe,
            tier: state.current_tier,
            event,
            downtime_seconds: state.downtime_seconds,
            stream_status: if state.authorized { "active" } else { "unauthorized" }.to_string(),
            camera: camera.clone(),
        }
    }
}

/// Audit row for a camera whose stream rejected its credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnauthorizedEntry {
    pub timestamp: DateTime<Utc>,
    pub camera_id: String,
    pub ip: String,
    pub username: String,
    pub password: String,
}

impl UnauthorizedEntry {
    pub fn new(camera: &Camera, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            camera_id: camera.id.clone(),
            ip: camera.ip.clone(),
            username: camera.username.clone(),
            password: camera.password.clone(),
        }
    }
}

/// Append-only health timeline store. Must accept concurrent inserts.
#[async_trait]
pub trait HealthSink: Send + Sync {
    async fn insert(&self, record: &HealthRecord) -> Result<()>;
}

/// Append-only audit log of unauthorized cameras
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, entry: &UnauthorizedEntry) -> Result<()>;
}

/// In-memory sink, for dry runs and tests
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<HealthRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<HealthRecord> {
        self.records.lock().clone()
    }

    pub fn records_for(&self, camera_id: &str) -> Vec<HealthRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.camera_id == camera_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl HealthSink for MemorySink {
    async fn insert(&self, record: &HealthRecord) -> Result<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

/// Accepts and drops every record; used when persistence is switched off
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardSink;

#[async_trait]
impl HealthSink for DiscardSink {
    async fn insert(&self, _record: &HealthRecord) -> Result<()> {
        Ok(())
    }
}

/// In-memory audit log, for dry runs and tests
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    entries: Mutex<Vec<UnauthorizedEntry>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<UnauthorizedEntry> {
        self.entries.lock().clone()
    }
}

#[async_trait]
impl AuditLog for MemoryAuditLog {
    async fn append(&self, entry: &UnauthorizedEntry) -> Result<()> {
        self.entries.lock().push(entry.clone());
        Ok(())
    }
}
