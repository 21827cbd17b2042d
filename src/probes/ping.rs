// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/camwatch

//! ICMP reachability via the system `ping` utility

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use super::{ProbeResult, ReachabilityProbe};
use crate::cameras::Camera;
use crate::config::ProbeConfig;

/// Runs `ping -c <count> <ip>` under a hard timeout
#[derive(Debug, Clone)]
pub struct PingProbe {
    command: String,
    count: u32,
    timeout: Duration,
}

impl PingProbe {
    pub fn new(command: &str, count: u32, timeout: Duration) -> Self {
        Self {
            command: command.to_string(),
            count,
            timeout,
        }
    }

    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new(
            &config.ping_command,
            config.ping_count,
            Duration::from_secs(config.ping_timeout_secs),
        )
    }
}

impl Default for PingProbe {
    fn default() -> Self {
        Self::new("ping", 4, Duration::from_secs(5))
    }
}

#[async_trait]
impl ReachabilityProbe for PingProbe {
    async fn check(&self, camera: &Camera) -> ProbeResult {
        let mut cmd = Command::new(&self.command);
        cmd.arg("-c")
            .arg(self.count.to_string())
            .arg(&camera.ip)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match timeout(self.timeout, cmd.output()).await {
            Err(_) => return ProbeResult::timeout(format!("Ping to {} timed out.", camera.ip)),
            Ok(Err(e)) => {
                return ProbeResult::failure(format!("failed to run {}: {}", self.command, e))
            }
            Ok(Ok(output)) => output,
        };

        if output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let latency_ms = parse_rtt(&stdout);
            debug!(camera_id = %camera.id, ?latency_ms, "Ping succeeded");
            ProbeResult::Success {
                latency_ms,
                response: stdout.trim().to_string(),
            }
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            ProbeResult::failure(stderr.trim())
        }
    }
}

/// Round-trip time in ms from the first reply line carrying `time=`
pub fn parse_rtt(output: &str) -> Option<f64> {
    let line = output.lines().find(|line| line.contains("time="))?;
    let (_, rest) = line.rsplit_once("time=")?;
    rest.split_whitespace().next()?.trim_end_matches("ms").parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINUX_PING: &str = "PING 10.0.0.5 (10.0.0.5) 56(84) bytes of data.
64 bytes from 10.0.0.5: icmp_seq=1 ttl=64 time=0.412 ms
64 bytes from 10.0.0.5: icmp_seq=2 ttl=64 time=0.388 ms

--- 10.0.0.5 ping statistics ---
2 packets transmitted, 2 received, 0% packet loss, time 1001ms
rtt min/avg/max/mdev = 0.388/0.400/0.412/0.012 ms";

    #[test]
    fn test_parse_rtt_takes_first_reply() {
        assert_eq!(parse_rtt(LINUX_PING), Some(0.412));
    }

    #[test]
    fn test_parse_rtt_handles_missing_or_odd_values() {
        assert_eq!(parse_rtt("PING 10.0.0.5\n"), None);
        assert_eq!(parse_rtt("reply: time=12ms"), Some(12.0));
        assert_eq!(parse_rtt("reply: time=abc ms"), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_zero_exit_is_success_without_latency() {
        let probe = PingProbe::new("true", 4, Duration::from_secs(5));
        let camera = Camera::new("cam", "127.0.0.1", "u", "p", "hikvision");

        let result = probe.check(&camera).await;
        assert!(result.is_success());
        assert_eq!(result.latency_ms(), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_failure() {
        let probe = PingProbe::new("false", 4, Duration::from_secs(5));
        let camera = Camera::new("cam", "127.0.0.1", "u", "p", "hikvision");

        assert_eq!(probe.check(&camera).await.status(), "failure");
    }

    #[tokio::test]
    async fn test_missing_binary_is_failure() {
        let probe = PingProbe::new("camwatch-no-such-ping", 1, Duration::from_secs(5));
        let camera = Camera::new("cam", "127.0.0.1", "u", "p", "hikvision");

        match probe.check(&camera).await {
            ProbeResult::Failure { error } => assert!(error.contains("camwatch-no-such-ping")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_ping_times_out() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("slow-ping");
        std::fs::write(&script, "#!/bin/sh\nexec sleep 10\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let probe = PingProbe::new(script.to_str().unwrap(), 1, Duration::from_secs(1));
        let camera = Camera::new("cam", "10.0.0.99", "u", "p", "hikvision");

        let started = std::time::Instant::now();
        let result = probe.check(&camera).await;

        assert_eq!(result.status(), "timeout");
        assert_eq!(
            result,
            ProbeResult::timeout("Ping to 10.0.0.99 timed out.")
        );
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
