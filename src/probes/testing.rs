// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/camwatch

//! Probe doubles shared by unit tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

use super::{Authorization, AuthorizationProbe, ProbeResult, ReachabilityProbe};
use crate::cameras::Camera;

/// Replays a fixed sequence of results, then repeats the last one
pub struct ScriptedProbe {
    script: Mutex<VecDeque<ProbeResult>>,
    last: Mutex<ProbeResult>,
    authorization: Authorization,
}

impl ScriptedProbe {
    pub fn new(script: Vec<ProbeResult>, authorization: Authorization) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(ProbeResult::failure("script exhausted")),
            authorization,
        }
    }

    pub fn always(result: ProbeResult) -> Self {
        Self::new(vec![result], Authorization::Authorized)
    }
}

#[async_trait]
impl ReachabilityProbe for ScriptedProbe {
    async fn check(&self, _camera: &Camera) -> ProbeResult {
        match self.script.lock().pop_front() {
            Some(result) => {
                *self.last.lock() = result.clone();
                result
            }
            None => self.last.lock().clone(),
        }
    }
}

#[async_trait]
impl AuthorizationProbe for ScriptedProbe {
    async fn authorize(&self, _camera: &Camera, _stream_uri: &str) -> Authorization {
        self.authorization
    }
}

/// Panics for one camera id, succeeds for every other camera
pub struct FaultyProbe {
    pub broken_camera: String,
}

#[async_trait]
impl ReachabilityProbe for FaultyProbe {
    async fn check(&self, camera: &Camera) -> ProbeResult {
        if camera.id == self.broken_camera {
            panic!("probe blew up for {}", camera.id);
        }
        ProbeResult::success(Some(1.0))
    }
}

#[async_trait]
impl AuthorizationProbe for FaultyProbe {
    async fn authorize(&self, _camera: &Camera, _stream_uri: &str) -> Authorization {
        Authorization::Authorized
    }
}

/// Never finishes the stalled check; the other one answers immediately
pub struct StalledProbe {
    pub stall_check: bool,
    pub stall_authorize: bool,
}

#[async_trait]
impl ReachabilityProbe for StalledProbe {
    async fn check(&self, _camera: &Camera) -> ProbeResult {
        if self.stall_check {
            futures::future::pending::<()>().await;
        }
        ProbeResult::success(Some(1.0))
    }
}

#[async_trait]
impl AuthorizationProbe for StalledProbe {
    async fn authorize(&self, _camera: &Camera, _stream_uri: &str) -> Authorization {
        if self.stall_authorize {
            futures::future::pending::<()>().await;
        }
        Authorization::Authorized
    }
}
