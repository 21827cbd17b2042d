// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/camwatch

//! Database module - SQLite-backed health timeline

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::sync::Arc;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::sink::{HealthRecord, HealthSink};

/// Health record store.
///
/// Each record is kept whole as a JSON document, with the fields operators
/// filter on copied into indexed columns.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&config.path)?;

        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
        "#,
        )?;

        let db = Self::with_connection(conn)?;
        info!("Database opened at {:?}", config.path);
        Ok(db)
    }

    /// Database that lives only as long as this value
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.create_tables()?;
        Ok(db)
    }

    fn create_tables(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS health_records (
                id TEXT PRIMARY KEY,
                camera_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                tier TEXT NOT NULL,
                event TEXT NOT NULL,
                downtime_seconds INTEGER NOT NULL,
                probe_status TEXT NOT NULL,
                latency_ms REAL,
                stream_status TEXT NOT NULL,
                document TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_health_camera_time
                ON health_records(camera_id, timestamp);
            CREATE INDEX IF NOT EXISTS idx_health_tier ON health_records(tier);
        "#,
        )?;

        Ok(())
    }

    fn insert_blocking(conn: &Connection, record: &HealthRecord) -> Result<()> {
        let document = serde_json::to_string(record)?;

        conn.execute(
            r#"INSERT INTO health_records
               (id, camera_id, timestamp, tier, event, downtime_seconds,
                probe_status, latency_ms, stream_status, document)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"#,
            params![
                record.id.to_string(),
                record.camera_id,
                record.timestamp.to_rfc3339(),
                record.tier.as_str(),
                record.event.name(),
                record.downtime_seconds as i64,
                record.probe.status(),
                record.probe.latency_ms(),
                record.stream_status,
                document
            ],
        )?;

        Ok(())
    }

    /// Most recent records for one camera, newest first
    pub fn latest_for_camera(&self, camera_id: &str, limit: usize) -> Result<Vec<HealthRecord>> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(
            "SELECT document FROM health_records
             WHERE camera_id = ?1
             ORDER BY timestamp DESC, rowid DESC LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![camera_id, limit as i64], |row| {
            row.get::<_, String>(0)
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(serde_json::from_str(&row?)?);
        }
        Ok(records)
    }

    /// Total number of stored records
    pub fn count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM health_records", [], |row| {
            row.get(0)
        })?;
        Ok(count as usize)
    }

    /// Drop records older than `retention_days`. Operator-triggered only.
    pub fn cleanup(&self, retention_days: u32) -> Result<usize> {
        let conn = self.conn.lock();

        let cutoff = Utc::now() - chrono::Duration::days(retention_days as i64);
        let deleted = conn.execute(
            "DELETE FROM health_records WHERE timestamp < ?1",
            params![cutoff.to_rfc3339()],
        )?;

        info!(
            "Cleaned up {} health records older than {} days",
            deleted, retention_days
        );
        Ok(deleted)
    }
}

#[async_trait]
impl HealthSink for Database {
    async fn insert(&self, record: &HealthRecord) -> Result<()> {
        let conn = self.conn.clone();
        let record = record.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            Database::insert_blocking(&conn, &record)
        })
        .await?
        .map_err(|e| Error::Sink(e.to_string()))
    }
}
