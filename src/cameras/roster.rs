// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/camwatch

//! Roster sources

use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

use super::Camera;
use crate::error::{Error, Result};

/// Supplies the camera roster at the start of every scheduling cycle
pub trait RosterSource: Send + Sync {
    /// Current roster. Never fails: unreadable sources yield an empty roster.
    fn load(&self) -> Vec<Camera>;
}

/// JSON file roster: an array of camera objects
#[derive(Debug, Clone)]
pub struct JsonFileRoster {
    path: PathBuf,
}

impl JsonFileRoster {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RosterSource for JsonFileRoster {
    fn load(&self) -> Vec<Camera> {
        match load_roster(&self.path) {
            Ok(cameras) => {
                debug!("Loaded {} cameras from {:?}", cameras.len(), self.path);
                cameras
            }
            Err(e) => {
                error!(path = ?self.path, error = %e, "Failed to load camera roster");
                Vec::new()
            }
        }
    }
}

/// Fixed in-memory roster
impl RosterSource for Vec<Camera> {
    fn load(&self) -> Vec<Camera> {
        self.clone()
    }
}

/// Read and decode a roster file
pub fn load_roster(path: &Path) -> Result<Vec<Camera>> {
    let content = std::fs::read_to_string(path)?;
    parse_roster(&content)
}

/// Decode roster JSON.
///
/// The document must be an array. Entries that are not camera objects are
/// skipped with an error log rather than failing the whole roster.
pub fn parse_roster(content: &str) -> Result<Vec<Camera>> {
    let value: serde_json::Value = serde_json::from_str(content)?;

    let entries = match value {
        serde_json::Value::Array(entries) => entries,
        other => {
            return Err(Error::Roster(format!(
                "expected an array of camera objects, found {}",
                json_kind(&other)
            )))
        }
    };

    let mut cameras = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<Camera>(entry) {
            Ok(camera) => cameras.push(camera),
            Err(e) => error!(index, error = %e, "Skipping malformed roster entry"),
        }
    }

    let mut seen = std::collections::HashSet::new();
    for camera in &cameras {
        if !seen.insert(camera.id.as_str()) {
            warn!(camera_id = %camera.id, "Duplicate camera id in roster");
        }
    }

    Ok(cameras)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
