// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/camwatch

//! Engine - wires configuration, probes and sinks into the fleet scheduler

use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;
use futures::future::join_all;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use super::event_bus::{Event, EventBus, EventPayload};
use super::scheduler::FleetScheduler;
use super::worker::{CameraWorker, WorkerContext};
use crate::cameras::{Camera, JsonFileRoster, RosterSource};
use crate::config::Config;
use crate::db::Database;
use crate::probes::{PingProbe, SimulatedProbe, StreamProbe};
use crate::sink::{AuditLog, CsvAuditLog, DiscardSink, HealthRecord, HealthSink, MemoryAuditLog, MemorySink};

/// Result of a one-shot check of a single camera
#[derive(Debug, Clone)]
pub enum CheckOutcome {
    Checked(HealthRecord),
    Skipped { camera_id: String, reason: String },
}

/// Main CamWatch engine
pub struct Engine {
    pub config: Arc<Config>,
    roster: Arc<dyn RosterSource>,
    ctx: WorkerContext,
    database: Option<Arc<Database>>,
}

impl Engine {
    /// Build the engine from configuration.
    ///
    /// Failing to open the health database is fatal here; later write errors
    /// are only logged by the workers.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        let database = if config.database.enabled {
            Some(Arc::new(Database::open(&config.database)?))
        } else {
            warn!("Health database disabled, records will not be persisted");
            None
        };
        let sink: Arc<dyn HealthSink> = match &database {
            Some(db) => db.clone(),
            None => Arc::new(DiscardSink),
        };
        let audit: Arc<dyn AuditLog> = Arc::new(CsvAuditLog::new(&config.audit.path));

        let engine = Self::assemble(config, sink, audit, database);
        Ok(engine)
    }

    /// Engine that keeps everything in memory, for dry runs
    pub fn in_memory(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(
            Arc::new(config),
            Arc::new(MemorySink::new()),
            Arc::new(MemoryAuditLog::new()),
            None,
        ))
    }

    fn assemble(
        config: Arc<Config>,
        sink: Arc<dyn HealthSink>,
        audit: Arc<dyn AuditLog>,
        database: Option<Arc<Database>>,
    ) -> Self {
        let ctx = if config.demo_mode {
            let simulator = Arc::new(SimulatedProbe::new(
                config.probe.demo_failure_rate,
                config.probe.demo_unauthorized_rate,
            ));
            WorkerContext {
                reachability: simulator.clone(),
                authorization: simulator,
                sink,
                audit,
                events: Arc::new(EventBus::default()),
                interval: Duration::from_secs(config.monitor.interval_secs),
            }
        } else {
            WorkerContext {
                reachability: Arc::new(PingProbe::from_config(&config.probe)),
                authorization: Arc::new(StreamProbe::from_config(&config.probe)),
                sink,
                audit,
                events: Arc::new(EventBus::default()),
                interval: Duration::from_secs(config.monitor.interval_secs),
            }
        };

        Self {
            roster: Arc::new(JsonFileRoster::new(&config.roster.path)),
            config,
            ctx,
            database,
        }
    }

    /// Swap the roster source, e.g. for a fixed in-memory roster
    pub fn with_roster(mut self, roster: Arc<dyn RosterSource>) -> Self {
        self.roster = roster;
        self
    }

    /// Swap probes and sinks wholesale
    pub fn with_context(mut self, ctx: WorkerContext) -> Self {
        self.ctx = ctx;
        self
    }

    pub fn database(&self) -> Option<&Database> {
        self.database.as_deref()
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.ctx.events
    }

    pub fn roster(&self) -> Vec<Camera> {
        self.roster.load()
    }

    /// Monitor the fleet until `shutdown` fires
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<()> {
        info!("Starting CamWatch engine...");

        let logger = tokio::spawn(log_transitions(self.ctx.events.subscribe(), shutdown.clone()));

        let mut scheduler = FleetScheduler::new(
            self.roster.clone(),
            self.ctx.clone(),
            self.config.monitor.num_shards,
            Duration::from_secs(self.config.monitor.reload_delay_secs),
        );
        scheduler.run(shutdown).await;

        logger.await?;
        info!("CamWatch engine stopped");
        Ok(())
    }

    /// Probe every roster camera once, concurrently, and persist the results
    pub async fn check_once(&self) -> Vec<CheckOutcome> {
        let cameras = self.roster.load();
        info!("Checking {} cameras once", cameras.len());

        // Held open for the whole sweep; a one-shot check is never cancelled
        let (_shutdown_tx, shutdown) = watch::channel(false);
        let checks = cameras.into_iter().map(|camera| {
            let ctx = self.ctx.clone();
            let shutdown = shutdown.clone();
            async move {
                let camera_id = camera.id.clone();
                match CameraWorker::start(camera, ctx, shutdown).await {
                    Ok(mut worker) => CheckOutcome::Checked(worker.step().await),
                    Err(e) => CheckOutcome::Skipped {
                        camera_id,
                        reason: e.to_string(),
                    },
                }
            }
        });

        join_all(checks).await
    }
}

/// Edge-triggered summary of the dense health timeline
async fn log_transitions(
    mut events: broadcast::Receiver<Event>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = shutdown.changed() => break,
        };

        match event {
            Ok(event) => match event.payload {
                EventPayload::TierChanged {
                    camera_id,
                    from,
                    to,
                    downtime_seconds,
                } => {
                    info!(camera_id = %camera_id, %from, %to, downtime_seconds, "Alert tier changed");
                }
                EventPayload::WorkerSkipped { camera_id, reason } => {
                    warn!(camera_id = %camera_id, reason = %reason, "Camera not monitored this cycle");
                }
                EventPayload::CycleComplete { cycle, cameras } => {
                    debug!(cycle, cameras, "Cycle finished");
                }
                EventPayload::WorkerStarted { .. } | EventPayload::Health(_) => {}
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Transition logger lagged, {} events dropped", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
