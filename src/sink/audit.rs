// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/camwatch

//! CSV audit log of unauthorized cameras

use async_trait::async_trait;
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{AuditLog, UnauthorizedEntry};
use crate::error::{Error, Result};

/// Column header, written once when the file is new or empty
pub const AUDIT_HEADER: [&str; 5] = [
    "Timestamp",
    "Camera Name",
    "Camera IP",
    "Camera Username",
    "Camera Password",
];

/// Appends one row per unauthorized observation.
///
/// All appends in the process go through one lock, so the header check and
/// the row write never interleave between workers.
#[derive(Debug, Clone)]
pub struct CsvAuditLog {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl CsvAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append_blocking(path: &Path, entry: &UnauthorizedEntry) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let is_empty = file.metadata()?.len() == 0;
        let mut writer = BufWriter::new(file);

        if is_empty {
            writeln!(writer, "{}", AUDIT_HEADER.join(","))?;
        }

        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string();
        let row = [
            timestamp.as_str(),
            entry.camera_id.as_str(),
            entry.ip.as_str(),
            entry.username.as_str(),
            entry.password.as_str(),
        ]
        .iter()
        .map(|field| escape_field(field))
        .collect::<Vec<_>>()
        .join(",");

        writeln!(writer, "{}", row)?;
        writer.flush()?;
        Ok(())
    }
}

#[async_trait]
impl AuditLog for CsvAuditLog {
    async fn append(&self, entry: &UnauthorizedEntry) -> Result<()> {
        let path = self.path.clone();
        let lock = self.lock.clone();
        let entry = entry.clone();

        tokio::task::spawn_blocking(move || {
            let _guard = lock.lock();
            Self::append_blocking(&path, &entry)
        })
        .await?
        .map_err(|e| Error::Audit(format!("{:?}: {}", self.path, e)))
    }
}

/// Quote a field when it contains a delimiter, quote or line break
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
