// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/camwatch

//! Camera worker - drives one camera through probe, classify, persist cycles

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::EventBus;
use crate::alerts::{transition, AlertEvent, AlertState, AlertTier};
use crate::cameras::Camera;
use crate::error::{Error, Result};
use crate::probes::{Authorization, AuthorizationProbe, ProbeResult, ReachabilityProbe};
use crate::sink::{AuditLog, HealthRecord, HealthSink, UnauthorizedEntry};

/// Shared handles every worker needs. Cheap to clone.
#[derive(Clone)]
pub struct WorkerContext {
    pub reachability: Arc<dyn ReachabilityProbe>,
    pub authorization: Arc<dyn AuthorizationProbe>,
    pub sink: Arc<dyn HealthSink>,
    pub audit: Arc<dyn AuditLog>,
    pub events: Arc<EventBus>,
    pub interval: Duration,
}

impl WorkerContext {
    pub fn interval_seconds(&self) -> u64 {
        self.interval.as_secs()
    }
}

/// Owns the alert state of exactly one camera
pub struct CameraWorker {
    camera: Camera,
    state: AlertState,
    ctx: WorkerContext,
    iterations: u64,
    last_timestamp: Option<DateTime<Utc>>,
}

impl CameraWorker {
    /// Resolve the stream URI and run the one-time authorization check.
    ///
    /// Fails when the camera make has no stream template, or with
    /// [`Error::Cancelled`] when `shutdown` fires before the check finishes.
    pub async fn start(
        camera: Camera,
        ctx: WorkerContext,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<Self> {
        info!(camera_id = %camera.id, "Checking camera {}...", camera.id);

        let stream_uri = camera.stream_uri()?;
        if *shutdown.borrow() {
            return Err(Error::Cancelled(camera.id));
        }

        let check = AssertUnwindSafe(ctx.authorization.authorize(&camera, &stream_uri)).catch_unwind();
        let authorization = tokio::select! {
            outcome = check => match outcome {
                Ok(authorization) => authorization,
                Err(panic) => {
                    error!(
                        camera_id = %camera.id,
                        error = %panic_message(&*panic),
                        "Authorization probe panicked, treating camera as unauthorized"
                    );
                    Authorization::Unauthorized
                }
            },
            _ = shutdown.changed() => return Err(Error::Cancelled(camera.id.clone())),
        };

        if !authorization.is_authorized() {
            warn!(camera_id = %camera.id, "Camera rejected its stream credentials");
        }
        ctx.events
            .publish_worker_started(&camera.id, authorization.is_authorized());

        Ok(Self {
            camera,
            state: AlertState::new(authorization.is_authorized()),
            ctx,
            iterations: 0,
            last_timestamp: None,
        })
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// One full iteration: probe, classify, persist
    pub async fn step(&mut self) -> HealthRecord {
        let probe = self.probe().await;
        self.record(probe).await
    }

    /// Loop until `shutdown` flips to true or its sender goes away.
    ///
    /// Only the probe and the sleep are interruptible; a classified result is
    /// always persisted before the worker exits.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> AlertState {
        loop {
            if *shutdown.borrow() {
                break;
            }

            let probe = tokio::select! {
                probe = self.probe() => probe,
                _ = shutdown.changed() => break,
            };
            self.record(probe).await;

            tokio::select! {
                _ = tokio::time::sleep(self.ctx.interval) => {}
                _ = shutdown.changed() => break,
            }
        }

        debug!(
            camera_id = %self.camera.id,
            iterations = self.iterations,
            "Camera worker stopped"
        );
        self.state
    }

    /// Reachability check; a panicking probe counts as a failed probe
    async fn probe(&self) -> ProbeResult {
        match AssertUnwindSafe(self.ctx.reachability.check(&self.camera))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(&*panic);
                error!(camera_id = %self.camera.id, error = %message, "Reachability probe panicked");
                ProbeResult::failure(format!("probe panicked: {}", message))
            }
        }
    }

    async fn record(&mut self, probe: ProbeResult) -> HealthRecord {
        let previous = self.state.current_tier;
        let (state, event) = transition(&self.state, &probe, self.ctx.interval_seconds());
        self.state = state;
        self.iterations += 1;

        let timestamp = self.next_timestamp();
        let record = HealthRecord::new(&self.camera, timestamp, probe, &state, event);
        self.observe(&record, previous);

        if let Err(e) = self.ctx.sink.insert(&record).await {
            error!(camera_id = %self.camera.id, error = %e, "Failed to store health record");
        }

        if state.current_tier == AlertTier::Unauthorized {
            let entry = UnauthorizedEntry::new(&self.camera, record.timestamp);
            if let Err(e) = self.ctx.audit.append(&entry).await {
                error!(camera_id = %self.camera.id, error = %e, "Failed to append audit entry");
            }
        }

        record
    }

    /// Wall clock, clamped so one camera's timeline never goes backwards
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let timestamp = match self.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_timestamp = Some(timestamp);
        timestamp
    }

    fn observe(&self, record: &HealthRecord, previous: AlertTier) {
        let camera_id = &self.camera.id;
        let downtime_seconds = record.downtime_seconds;

        match record.event {
            AlertEvent::Healthy => {
                debug!(camera_id = %camera_id, latency_ms = ?record.probe.latency_ms(), "Camera is active");
            }
            AlertEvent::Recovered { from } => {
                info!(camera_id = %camera_id, from = %from, latency_ms = ?record.probe.latency_ms(), "Camera recovered");
            }
            AlertEvent::Down(AlertTier::NoAlert) => {
                info!(camera_id = %camera_id, downtime_seconds, probe = record.probe.status(), "Camera missed a probe");
            }
            AlertEvent::Down(AlertTier::AlertLevel1) => {
                warn!(camera_id = %camera_id, downtime_seconds, "Alert Level 1 - Downtime Duration: {} seconds", downtime_seconds);
            }
            AlertEvent::Down(tier) => {
                error!(camera_id = %camera_id, downtime_seconds, "{} - Downtime Duration: {} seconds", tier, downtime_seconds);
            }
            AlertEvent::Unauthorized => {
                warn!(camera_id = %camera_id, "Unauthorized access to the camera");
            }
        }

        self.ctx.events.publish_health(record);
        if previous != record.tier {
            self.ctx
                .events
                .publish_tier_change(camera_id, previous, record.tier, downtime_seconds);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::core::event_bus::EventPayload;
    use crate::probes::testing::{FaultyProbe, ScriptedProbe, StalledProbe};
    use crate::sink::{MemoryAuditLog, MemorySink};

    struct BrokenSink;

    #[async_trait]
    impl HealthSink for BrokenSink {
        async fn insert(&self, _record: &HealthRecord) -> Result<()> {
            Err(Error::Sink("connection refused".to_string()))
        }
    }

    #[async_trait]
    impl AuditLog for BrokenSink {
        async fn append(&self, _entry: &UnauthorizedEntry) -> Result<()> {
            Err(Error::Audit("disk full".to_string()))
        }
    }

    fn context(
        probe: Arc<ScriptedProbe>,
        sink: Arc<MemorySink>,
        audit: Arc<MemoryAuditLog>,
    ) -> WorkerContext {
        WorkerContext {
            reachability: probe.clone(),
            authorization: probe,
            sink,
            audit,
            events: Arc::new(EventBus::default()),
            interval: Duration::from_secs(10),
        }
    }

    async fn start_worker(camera: Camera, ctx: WorkerContext) -> Result<CameraWorker> {
        let (_tx, rx) = watch::channel(false);
        CameraWorker::start(camera, ctx, rx).await
    }

    fn camera(id: &str) -> Camera {
        Camera::new(id, "10.0.0.10", "admin", "pw", "hikvision")
    }

    #[tokio::test]
    async fn test_outage_scenario_records_every_iteration() {
        let ok = ProbeResult::success(Some(2.0));
        let down = ProbeResult::failure("unreachable");
        let script = vec![
            ok.clone(),
            down.clone(),
            down.clone(),
            down.clone(),
            down.clone(),
            down.clone(),
            down,
            ok,
        ];
        let probe = Arc::new(ScriptedProbe::new(script, Authorization::Authorized));
        let sink = Arc::new(MemorySink::new());
        let audit = Arc::new(MemoryAuditLog::new());

        let mut worker = start_worker(camera("lobby"), context(probe, sink.clone(), audit.clone()))
            .await
            .unwrap();
        for _ in 0..8 {
            worker.step().await;
        }

        let timeline: Vec<(AlertTier, u64)> = sink
            .records()
            .iter()
            .map(|r| (r.tier, r.downtime_seconds))
            .collect();
        assert_eq!(
            timeline,
            vec![
                (AlertTier::NoAlert, 0),
                (AlertTier::AlertLevel1, 10),
                (AlertTier::AlertLevel1, 20),
                (AlertTier::AlertLevel1, 30),
                (AlertTier::AlertLevel1, 40),
                (AlertTier::AlertLevel1, 50),
                (AlertTier::AlertLevel2, 60),
                (AlertTier::NoAlert, 0),
            ]
        );

        let records = sink.records();
        assert_eq!(records[7].event, AlertEvent::Recovered { from: AlertTier::AlertLevel2 });
        assert!(records.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert!(audit.entries().is_empty());
        assert_eq!(worker.iterations(), 8);
    }

    #[tokio::test]
    async fn test_unauthorized_camera_audits_every_iteration() {
        let probe = Arc::new(ScriptedProbe::new(
            vec![ProbeResult::success(Some(1.0)), ProbeResult::failure("down")],
            Authorization::Unauthorized,
        ));
        let sink = Arc::new(MemorySink::new());
        let audit = Arc::new(MemoryAuditLog::new());

        let mut worker = start_worker(camera("gate"), context(probe, sink.clone(), audit.clone()))
            .await
            .unwrap();
        for _ in 0..4 {
            worker.step().await;
        }

        let records = sink.records();
        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|r| r.tier == AlertTier::Unauthorized));
        assert!(records.iter().all(|r| r.downtime_seconds == 0));
        assert!(records.iter().all(|r| r.stream_status == "unauthorized"));

        let entries = audit.entries();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].camera_id, "gate");
        assert_eq!(entries[0].password, "pw");
    }

    #[tokio::test]
    async fn test_unknown_make_fails_start() {
        let probe = Arc::new(ScriptedProbe::always(ProbeResult::success(None)));
        let ctx = context(probe, Arc::new(MemorySink::new()), Arc::new(MemoryAuditLog::new()));
        let cam = Camera::new("odd", "10.0.0.11", "admin", "pw", "foobar");

        let result = start_worker(cam, ctx).await;
        assert!(matches!(result, Err(Error::UnknownMake { .. })));
    }

    #[tokio::test]
    async fn test_persistence_errors_do_not_stop_the_worker() {
        let probe = Arc::new(ScriptedProbe::new(vec![], Authorization::Unauthorized));
        let ctx = WorkerContext {
            reachability: probe.clone(),
            authorization: probe,
            sink: Arc::new(BrokenSink),
            audit: Arc::new(BrokenSink),
            events: Arc::new(EventBus::default()),
            interval: Duration::from_secs(10),
        };

        let mut worker = start_worker(camera("cellar"), ctx).await.unwrap();
        worker.step().await;
        let record = worker.step().await;
        assert_eq!(record.tier, AlertTier::Unauthorized);
        assert_eq!(worker.iterations(), 2);
    }

    #[tokio::test]
    async fn test_probe_panic_counts_as_failure() {
        let probe = Arc::new(FaultyProbe {
            broken_camera: "bad".to_string(),
        });
        let sink = Arc::new(MemorySink::new());
        let ctx = WorkerContext {
            reachability: probe.clone(),
            authorization: probe,
            sink: sink.clone(),
            audit: Arc::new(MemoryAuditLog::new()),
            events: Arc::new(EventBus::default()),
            interval: Duration::from_secs(10),
        };

        let mut worker = start_worker(camera("bad"), ctx).await.unwrap();
        let record = worker.step().await;

        assert_eq!(record.probe.status(), "failure");
        assert_eq!(record.tier, AlertTier::AlertLevel1);
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test]
    async fn test_tier_changes_are_published() {
        let probe = Arc::new(ScriptedProbe::new(
            vec![ProbeResult::failure("down"), ProbeResult::failure("down")],
            Authorization::Authorized,
        ));
        let ctx = context(probe, Arc::new(MemorySink::new()), Arc::new(MemoryAuditLog::new()));
        let mut rx = ctx.events.subscribe();

        let mut worker = start_worker(camera("hall"), ctx).await.unwrap();
        worker.step().await;
        worker.step().await;

        let mut changes = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let EventPayload::TierChanged { from, to, .. } = event.payload {
                changes.push((from, to));
            }
        }
        assert_eq!(changes, vec![(AlertTier::NoAlert, AlertTier::AlertLevel1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let probe = Arc::new(ScriptedProbe::always(ProbeResult::success(Some(1.0))));
        let sink = Arc::new(MemorySink::new());
        let ctx = context(probe, sink.clone(), Arc::new(MemoryAuditLog::new()));
        let (tx, rx) = watch::channel(false);

        let worker = start_worker(camera("roof"), ctx).await.unwrap();
        let handle = tokio::spawn(worker.run(rx));

        tokio::time::sleep(Duration::from_secs(35)).await;
        tx.send(true).unwrap();
        let state = handle.await.unwrap();

        assert_eq!(state.current_tier, AlertTier::NoAlert);
        // Probes at t=0, 10, 20, 30
        assert_eq!(sink.len(), 4);
    }

    fn stalled_context(probe: Arc<StalledProbe>, sink: Arc<MemorySink>) -> WorkerContext {
        WorkerContext {
            reachability: probe.clone(),
            authorization: probe,
            sink,
            audit: Arc::new(MemoryAuditLog::new()),
            events: Arc::new(EventBus::default()),
            interval: Duration::from_secs(10),
        }
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_running_check() {
        let probe = Arc::new(StalledProbe {
            stall_check: true,
            stall_authorize: false,
        });
        let sink = Arc::new(MemorySink::new());
        let (tx, rx) = watch::channel(false);

        let worker = start_worker(camera("attic"), stalled_context(probe, sink.clone()))
            .await
            .unwrap();
        let handle = tokio::spawn(worker.run(rx));

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        let state = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("worker should stop while its check is in flight")
            .unwrap();
        assert_eq!(state.downtime_seconds, 0);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_authorization() {
        let probe = Arc::new(StalledProbe {
            stall_check: false,
            stall_authorize: true,
        });
        let sink = Arc::new(MemorySink::new());
        let (tx, rx) = watch::channel(false);

        let starting = tokio::spawn(CameraWorker::start(
            camera("stairs"),
            stalled_context(probe, sink.clone()),
            rx,
        ));

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(1), starting)
            .await
            .expect("start should give up once shutdown fires")
            .unwrap();
        assert!(matches!(result, Err(Error::Cancelled(id)) if id == "stairs"));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_start_after_shutdown_is_cancelled() {
        let probe = Arc::new(ScriptedProbe::always(ProbeResult::success(None)));
        let ctx = context(probe, Arc::new(MemorySink::new()), Arc::new(MemoryAuditLog::new()));
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let result = CameraWorker::start(camera("porch"), ctx, rx).await;
        assert!(matches!(result, Err(Error::Cancelled(_))));
    }
}
