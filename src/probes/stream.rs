// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/camwatch

//! Stream authorization via `ffprobe`

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::{Authorization, AuthorizationProbe};
use crate::cameras::Camera;
use crate::config::ProbeConfig;

/// Opens the camera's RTSP stream once; success means the credentials work
#[derive(Debug, Clone)]
pub struct StreamProbe {
    command: String,
    timeout: Duration,
}

impl StreamProbe {
    pub fn new(command: &str, timeout: Duration) -> Self {
        Self {
            command: command.to_string(),
            timeout,
        }
    }

    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new(
            &config.stream_command,
            Duration::from_secs(config.stream_timeout_secs),
        )
    }
}

impl Default for StreamProbe {
    fn default() -> Self {
        Self::new("ffprobe", Duration::from_secs(10))
    }
}

#[async_trait]
impl AuthorizationProbe for StreamProbe {
    async fn authorize(&self, camera: &Camera, stream_uri: &str) -> Authorization {
        let mut cmd = Command::new(&self.command);
        cmd.args(["-v", "error", "-rtsp_transport", "tcp", "-i"])
            .arg(stream_uri)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) if output.status.success() => Authorization::Authorized,
            Ok(Ok(output)) => {
                debug!(
                    camera_id = %camera.id,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "Stream open rejected"
                );
                Authorization::Unauthorized
            }
            Ok(Err(e)) => {
                warn!(camera_id = %camera.id, error = %e, "Failed to run {}", self.command);
                Authorization::Unauthorized
            }
            Err(_) => {
                debug!(camera_id = %camera.id, "Stream open timed out");
                Authorization::Unauthorized
            }
        }
    }
}
