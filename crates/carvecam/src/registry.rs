//! Registry of generated output files.
//!
//! Each finished conversion lands here as a record pointing at the file on
//! disk. The registry is bounded: once full, the oldest record is evicted
//! and its backing file removed, so an unattended service cannot fill the
//! disk with stale outputs.

use crate::types::OutputFormat;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::path::PathBuf;
use tracing::{debug, warn};
use ulid::Ulid;

pub const DEFAULT_MAX_ENTRIES: usize = 256;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRecord {
    pub id: Ulid,
    pub file_name: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub format: OutputFormat,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct OutputRegistry {
    max_entries: usize,
    records: VecDeque<OutputRecord>,
}

impl Default for OutputRegistry {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }
}

impl OutputRegistry {
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            records: VecDeque::new(),
        }
    }

    /// Register a freshly written output file and return its id.
    pub fn insert(&mut self, path: PathBuf, format: OutputFormat, size_bytes: u64) -> Ulid {
        while self.records.len() >= self.max_entries {
            self.evict_oldest();
        }

        let id = Ulid::new();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| id.to_string());
        debug!(%id, file = %file_name, "registering output");
        self.records.push_back(OutputRecord {
            id,
            file_name,
            path,
            format,
            size_bytes,
            created_at: Utc::now(),
        });
        id
    }

    pub fn get(&self, id: Ulid) -> Option<&OutputRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn list(&self) -> impl Iterator<Item = &OutputRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop a record by id, deleting its file. Returns whether it existed.
    pub fn remove(&mut self, id: Ulid) -> bool {
        let Some(index) = self.records.iter().position(|record| record.id == id) else {
            return false;
        };
        if let Some(record) = self.records.remove(index) {
            delete_file(&record);
        }
        true
    }

    fn evict_oldest(&mut self) {
        if let Some(record) = self.records.pop_front() {
            debug!(id = %record.id, "evicting oldest output");
            delete_file(&record);
        }
    }
}

fn delete_file(record: &OutputRecord) {
    if let Err(err) = std::fs::remove_file(&record.path) {
        // The file may already be gone; eviction stays best-effort.
        warn!(id = %record.id, %err, "could not remove output file");
    }
}
