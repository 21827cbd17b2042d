// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/camwatch

//! Core engine module - camera workers, fleet scheduling and event fan-out

mod engine;
mod scheduler;
mod worker;
pub(crate) mod event_bus;

pub use engine::{CheckOutcome, Engine};
pub use scheduler::{partition, CycleReport, FleetScheduler, ShardReport};
pub use worker::{CameraWorker, WorkerContext};
pub use event_bus::{Event, EventBus, EventPayload, EventType};
