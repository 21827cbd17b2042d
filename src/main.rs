// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/camwatch

//! CamWatch - Camera Fleet Health Monitor
//!
//! Background process that pings every camera in the roster on a fixed
//! interval, checks its stream credentials once per worker, and records a
//! health timeline with tiered downtime alerts.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use std::path::PathBuf;

use camwatch::cameras::{CameraMake, JsonFileRoster, RosterSource};
use camwatch::core::{CheckOutcome, Engine};
use camwatch::db::Database;
use camwatch::{Config, VERSION};

/// CamWatch - Camera Fleet Health Monitor
#[derive(Parser, Debug)]
#[command(name = "camwatch")]
#[command(author = "CamWatch Project")]
#[command(version = VERSION)]
#[command(about = "Reachability, authorization and downtime alerting for IP camera fleets")]
struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long, global = true)]
    trace: bool,

    /// Camera roster (JSON array)
    #[arg(long, global = true)]
    roster: Option<PathBuf>,

    /// Seconds between probes of one camera
    #[arg(long, global = true)]
    interval: Option<u64>,

    /// Number of launch shards
    #[arg(long, global = true)]
    shards: Option<usize>,

    /// Health database path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Unauthorized camera audit log path
    #[arg(long, global = true)]
    audit_log: Option<PathBuf>,

    /// Demo mode with simulated probes
    #[arg(long, global = true)]
    demo: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Monitor the fleet until interrupted (default)
    Run,

    /// Probe every camera once and print a summary
    Check {
        /// Keep results in memory instead of writing the database and audit log
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate the roster and show each camera's stream template
    Roster,

    /// Show the latest stored health records for a camera
    History {
        /// Camera ID as written in the roster
        #[arg(long)]
        camera: String,

        /// Number of records to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Delete health records older than the configured retention
    Prune {
        /// Override retention in days
        #[arg(long)]
        days: Option<u32>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load or create configuration
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;

    // Initialize logging
    let directive = log_directive(
        args.trace,
        args.debug,
        std::env::var("RUST_LOG").ok(),
        &config.log_level,
    );
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(directive))
        .with_target(false)
        .with_thread_ids(true)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("CamWatch v{} - Camera Fleet Health Monitor", VERSION);

    // Override with command line args
    if args.demo {
        config.demo_mode = true;
    }
    if let Some(roster) = args.roster {
        config.roster.path = roster;
    }
    if let Some(interval) = args.interval {
        config.monitor.interval_secs = interval;
    }
    if let Some(shards) = args.shards {
        config.monitor.num_shards = shards;
    }
    if let Some(db) = args.db {
        config.database.path = db;
    }
    if let Some(audit_log) = args.audit_log {
        config.audit.path = audit_log;
    }
    config.validate()?;

    info!("Configuration loaded from {:?}", config_path);

    let rt = tokio::runtime::Runtime::new()?;
    match args.command.unwrap_or(Command::Run) {
        Command::Run => rt.block_on(run_monitor(config)),
        Command::Check { dry_run } => rt.block_on(run_check(config, dry_run)),
        Command::Roster => show_roster(&config),
        Command::History { camera, limit } => show_history(&config, &camera, limit),
        Command::Prune { days } => prune(&config, days),
    }
}

/// Tracing filter: `--trace`, then `--debug`, then `RUST_LOG`, then the config file
fn log_directive(trace: bool, debug: bool, env: Option<String>, configured: &str) -> String {
    if trace {
        "trace".to_string()
    } else if debug {
        "debug".to_string()
    } else {
        env.filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| configured.to_string())
    }
}

/// Run the monitor until Ctrl+C
async fn run_monitor(config: Config) -> Result<()> {
    info!(
        roster = ?config.roster.path,
        interval_secs = config.monitor.interval_secs,
        shards = config.monitor.num_shards,
        demo = config.demo_mode,
        "Initializing monitor..."
    );

    let engine = Engine::new(config)?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received, stopping workers..."),
            Err(e) => warn!("Failed to listen for Ctrl+C: {}", e),
        }
        let _ = shutdown_tx.send(true);
    });

    info!("CamWatch running, press Ctrl+C to shutdown");
    engine.run(shutdown_rx).await?;

    info!("CamWatch shutdown complete");
    Ok(())
}

async fn run_check(config: Config, dry_run: bool) -> Result<()> {
    let engine = if dry_run {
        Engine::in_memory(config)?
    } else {
        Engine::new(config)?
    };

    let outcomes = engine.check_once().await;

    println!("{:<24} {:<16} {:<8} {:<13} {:>10}", "CAMERA", "IP", "PROBE", "TIER", "RTT (ms)");
    for outcome in &outcomes {
        match outcome {
            CheckOutcome::Checked(record) => {
                let rtt = record
                    .probe
                    .latency_ms()
                    .map(|ms| format!("{:.3}", ms))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<24} {:<16} {:<8} {:<13} {:>10}",
                    record.camera_id,
                    record.camera.ip,
                    record.probe.status(),
                    record.tier.as_str(),
                    rtt
                );
            }
            CheckOutcome::Skipped { camera_id, reason } => {
                println!("{:<24} skipped: {}", camera_id, reason);
            }
        }
    }

    Ok(())
}

fn show_roster(config: &Config) -> Result<()> {
    let roster = JsonFileRoster::new(&config.roster.path);
    let cameras = roster.load();

    println!("{} cameras in {:?}", cameras.len(), roster.path());
    for camera in &cameras {
        match CameraMake::parse(&camera.make) {
            Some(make) => println!("  {:<24} {:<16} {:<10} {}", camera.id, camera.ip, make, make.template()),
            None => println!("  {:<24} {:<16} unknown make '{}'", camera.id, camera.ip, camera.make),
        }
    }

    Ok(())
}

fn show_history(config: &Config, camera_id: &str, limit: usize) -> Result<()> {
    let db = Database::open(&config.database)?;
    let records = db.latest_for_camera(camera_id, limit)?;

    if records.is_empty() {
        println!("No health records for {}", camera_id);
        return Ok(());
    }

    for record in records {
        println!(
            "{}  {:<13} {:<9} downtime={}s  {}",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.tier.as_str(),
            record.probe.status(),
            record.downtime_seconds,
            record.event.name()
        );
    }

    Ok(())
}

fn prune(config: &Config, days: Option<u32>) -> Result<()> {
    let db = Database::open(&config.database)?;
    let retention = days.unwrap_or(config.database.retention_days);
    let deleted = db.cleanup(retention)?;
    println!("Deleted {} records older than {} days", deleted, retention);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_directive_precedence() {
        assert_eq!(log_directive(true, true, Some("warn".into()), "info"), "trace");
        assert_eq!(log_directive(false, true, Some("warn".into()), "info"), "debug");
        assert_eq!(log_directive(false, false, Some("warn".into()), "info"), "warn");
        assert_eq!(log_directive(false, false, Some(" ".into()), "error"), "error");
        assert_eq!(log_directive(false, false, None, "camwatch=debug"), "camwatch=debug");
    }
}
