// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/camwatch

//! Fleet scheduler - shards the roster and supervises camera workers

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use super::worker::{CameraWorker, WorkerContext};
use crate::cameras::{Camera, RosterSource};
use crate::error::Error;

/// Split `items` into at most `num_shards` contiguous chunks.
///
/// Chunk sizes differ by at most one and never exceed
/// `ceil(len / num_shards)`. Empty chunks are not produced, so an empty
/// input yields no shards at all.
pub fn partition<T: Clone>(items: &[T], num_shards: usize) -> Vec<Vec<T>> {
    if items.is_empty() || num_shards == 0 {
        return Vec::new();
    }

    let shards = num_shards.min(items.len());
    let base = items.len() / shards;
    let extra = items.len() % shards;

    let mut result = Vec::with_capacity(shards);
    let mut start = 0;
    for i in 0..shards {
        let size = base + usize::from(i < extra);
        result.push(items[start..start + size].to_vec());
        start += size;
    }
    result
}

/// Outcome of one launch group
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardReport {
    pub shard: usize,
    pub cameras: usize,
    pub started: usize,
    pub skipped: usize,
    pub crashed: usize,
}

/// Outcome of one roster-reload + dispatch cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub cycle: u64,
    pub cameras: usize,
    pub shards: Vec<ShardReport>,
}

impl CycleReport {
    pub fn started(&self) -> usize {
        self.shards.iter().map(|s| s.started).sum()
    }

    pub fn skipped(&self) -> usize {
        self.shards.iter().map(|s| s.skipped).sum()
    }

    pub fn crashed(&self) -> usize {
        self.shards.iter().map(|s| s.crashed).sum()
    }
}

/// Reloads the roster, fans cameras out to workers and waits for them
pub struct FleetScheduler {
    roster: Arc<dyn RosterSource>,
    ctx: WorkerContext,
    num_shards: usize,
    reload_delay: Duration,
    cycle: u64,
}

impl FleetScheduler {
    pub fn new(
        roster: Arc<dyn RosterSource>,
        ctx: WorkerContext,
        num_shards: usize,
        reload_delay: Duration,
    ) -> Self {
        Self {
            roster,
            ctx,
            num_shards: num_shards.max(1),
            reload_delay,
            cycle: 0,
        }
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycle
    }

    /// Run cycles until `shutdown` flips to true or its sender is dropped
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            shards = self.num_shards,
            interval_secs = self.ctx.interval.as_secs(),
            "Starting fleet scheduler..."
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let report = self.run_cycle(shutdown.clone()).await;
            info!(
                cycle = report.cycle,
                cameras = report.cameras,
                workers = report.started(),
                skipped = report.skipped(),
                "Cycle {} complete. Waiting for the next cycle.",
                report.cycle
            );

            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.reload_delay) => {}
                _ = shutdown.changed() => break,
            }
        }

        info!("Fleet scheduler stopped after {} cycles", self.cycle);
    }

    /// One cycle: reload, shard, launch, and wait for every worker to end.
    ///
    /// Workers only end on shutdown or when they could not start, so with a
    /// non-empty roster this returns once `shutdown` fires.
    pub async fn run_cycle(&mut self, shutdown: watch::Receiver<bool>) -> CycleReport {
        self.cycle += 1;
        let cameras = self.roster.load();
        let shards = partition(&cameras, self.num_shards);

        debug!(
            cycle = self.cycle,
            cameras = cameras.len(),
            shards = shards.len(),
            "Dispatching roster"
        );

        let mut groups = JoinSet::new();
        for (index, shard) in shards.into_iter().enumerate() {
            groups.spawn(run_shard(index, shard, self.ctx.clone(), shutdown.clone()));
        }

        let mut report = CycleReport {
            cycle: self.cycle,
            cameras: cameras.len(),
            shards: Vec::new(),
        };
        while let Some(joined) = groups.join_next().await {
            match joined {
                Ok(shard) => report.shards.push(shard),
                Err(e) => error!(error = %e, "Shard supervisor failed"),
            }
        }
        report.shards.sort_by_key(|s| s.shard);

        self.ctx.events.publish_cycle_complete(self.cycle, report.cameras);
        report
    }
}

enum WorkerExit {
    Stopped,
    Skipped,
    Cancelled,
}

/// Launch one independent worker task per camera and supervise them
async fn run_shard(
    shard: usize,
    cameras: Vec<Camera>,
    ctx: WorkerContext,
    shutdown: watch::Receiver<bool>,
) -> ShardReport {
    let mut report = ShardReport {
        shard,
        cameras: cameras.len(),
        ..ShardReport::default()
    };

    info!(shard, cameras = cameras.len(), "Starting shard");

    let mut workers = JoinSet::new();
    for camera in cameras {
        let ctx = ctx.clone();
        let shutdown = shutdown.clone();
        workers.spawn(async move {
            let camera_id = camera.id.clone();
            match CameraWorker::start(camera, ctx.clone(), shutdown.clone()).await {
                Ok(worker) => {
                    worker.run(shutdown).await;
                    WorkerExit::Stopped
                }
                Err(Error::Cancelled(_)) => {
                    debug!(camera_id = %camera_id, "Shutdown before camera worker started");
                    WorkerExit::Cancelled
                }
                Err(e) => {
                    error!(camera_id = %camera_id, error = %e, "Skipping camera");
                    ctx.events.publish_worker_skipped(&camera_id, &e.to_string());
                    WorkerExit::Skipped
                }
            }
        });
    }

    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(WorkerExit::Stopped) => report.started += 1,
            Ok(WorkerExit::Skipped) => report.skipped += 1,
            Ok(WorkerExit::Cancelled) => {}
            Err(e) => {
                error!(shard, error = %e, "Camera worker crashed");
                report.crashed += 1;
            }
        }
    }

    debug!(shard, started = report.started, skipped = report.skipped, "Shard finished");
    report
}
