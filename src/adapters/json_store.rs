//! File-backed store and heartbeat adapters.
//!
//! Implements [`StoreConnector`]/[`TableStore`] by appending each item as
//! one JSON line to `<dir>/<table>.jsonl`, and [`HeartbeatPort`] by
//! atomically replacing a small JSON file.
//!
//! - Connecting creates the directory; failure there is what trips the
//!   persistence circuit.
//! - Table names are restricted to `[A-Za-z0-9_.-]` and may not start
//!   with a dot, so a table can never escape the directory.
//! - Heartbeats are written to a sibling temp file and renamed into
//!   place, so readers never observe a half-written record.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::info;

use crate::app::ports::{HeartbeatPort, StoreConnector, TableStore};
use crate::error::StoreError;
use crate::persistence::{Heartbeat, Item};

fn valid_table(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Connector for a JSON-lines directory store.
#[derive(Debug, Clone)]
pub struct JsonlConnector {
    dir: PathBuf,
}

impl JsonlConnector {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl StoreConnector for JsonlConnector {
    type Store = JsonlStore;

    fn connect(&mut self) -> Result<JsonlStore, StoreError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| StoreError::Connect(format!("{}: {e}", self.dir.display())))?;
        info!("JsonlStore: writing to {}", self.dir.display());
        Ok(JsonlStore {
            dir: self.dir.clone(),
        })
    }
}

/// A connected JSON-lines store.
#[derive(Debug)]
pub struct JsonlStore {
    dir: PathBuf,
}

impl JsonlStore {
    pub fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.jsonl"))
    }
}

impl TableStore for JsonlStore {
    fn put(&mut self, table: &str, item: &Item) -> Result<(), StoreError> {
        if !valid_table(table) {
            return Err(StoreError::Write(format!("invalid table name {table:?}")));
        }
        let mut line =
            serde_json::to_vec(item).map_err(|e| StoreError::Write(e.to_string()))?;
        line.push(b'\n');
        let path = self.table_path(table);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StoreError::Write(format!("{}: {e}", path.display())))?;
        file.write_all(&line)
            .map_err(|e| StoreError::Write(format!("{}: {e}", path.display())))
    }
}

/// Heartbeat written to a JSON file.
#[derive(Debug, Clone)]
pub struct FileHeartbeat {
    path: PathBuf,
}

impl FileHeartbeat {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HeartbeatPort for FileHeartbeat {
    fn beat(&mut self, heartbeat: &Heartbeat) -> Result<(), StoreError> {
        let err = |e: std::io::Error| StoreError::Write(format!("{}: {e}", self.path.display()));
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(err)?;
        }
        let body = serde_json::to_vec(heartbeat).map_err(|e| StoreError::Write(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, body).map_err(err)?;
        fs::rename(&tmp, &self.path).map_err(err)
    }
}
