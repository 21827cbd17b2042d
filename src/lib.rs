// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/camwatch

//! CamWatch - Camera Fleet Health Monitor
//!
//! Continuously verifies that a fleet of IP cameras is reachable and accepts
//! its stream credentials, classifies every camera into an alert tier by how
//! long it has been down, and keeps a dense health timeline.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Fleet Scheduler                          │
//! │   roster reload → shard → one worker per camera → join       │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌─────────────┐   ┌────────────────────┐   │
//! │  │   Probes   │ → │ Alert State │ → │       Sinks        │   │
//! │  │ ping/rtsp  │   │   Machine   │   │ SQLite + CSV audit │   │
//! │  └────────────┘   └─────────────┘   └────────────────────┘   │
//! │                          ↓                                   │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │                       Event Bus                        │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod alerts;
pub mod cameras;
pub mod config;
pub mod core;
pub mod db;
pub mod error;
pub mod probes;
pub mod sink;

// Re-exports for convenience
pub use alerts::{transition, AlertEvent, AlertState, AlertTier};
pub use cameras::{Camera, CameraMake, JsonFileRoster, RosterSource};
pub use config::Config;
pub use core::{Engine, EventBus, FleetScheduler, CameraWorker, WorkerContext};
pub use db::Database;
pub use error::{Error, Result};
pub use probes::{Authorization, ProbeResult, PingProbe, StreamProbe};
pub use sink::{AuditLog, CsvAuditLog, HealthRecord, HealthSink, UnauthorizedEntry};

/// CamWatch version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// CamWatch name
pub const NAME: &str = "CamWatch";
