//! Cloud persistence status probe.
//!
//! Derives an `off | on | error` indicator from the heartbeat artifact the
//! persistence sidecar rewrites after every successful write.  Used by the
//! `status` subcommand and by anything polling the box's health.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use serde::Serialize;
use serde_json::{Value, json};

/// Provider name reported alongside the status.
pub const PROVIDER: &str = "dynamodb";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudStatus {
    /// Persistence disabled.
    Off,
    /// Heartbeat fresh.
    On,
    /// Enabled, but the heartbeat is missing or stale.
    Error,
}

/// Classify the heartbeat at `heartbeat` against `now`.
///
/// A modification time in the future (clock skew) counts as fresh.
pub fn cloud_status(enabled: bool, heartbeat: &Path, ttl: Duration, now: SystemTime) -> CloudStatus {
    if !enabled {
        return CloudStatus::Off;
    }
    let Ok(modified) = fs::metadata(heartbeat).and_then(|m| m.modified()) else {
        return CloudStatus::Error;
    };
    let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
    if age <= ttl { CloudStatus::On } else { CloudStatus::Error }
}

/// `{"cloud": {"provider": "dynamodb", "status": "<status>"}}`
pub fn status_report(status: CloudStatus) -> Value {
    json!({ "cloud": { "provider": PROVIDER, "status": status } })
}
