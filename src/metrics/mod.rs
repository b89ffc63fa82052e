//! Canonical metric model.
//!
//! Every inbound telemetry message, whatever its source shape, becomes a
//! [`MetricRecord`] through the [`normalize`] module.  Downstream logic
//! (alarms, sampling, persistence) only ever sees this canonical form.

pub mod normalize;

use core::fmt;

use serde::{Deserialize, Serialize};

/// The metric streams the data manager understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    /// People detected in frame by the DeepStream pipeline.
    PersonCount,
    /// Jetson GPU (or hottest) thermal zone, °C.
    Temperature,
    /// Jetson GPU load, percent.
    GpuUsage,
}

impl MetricType {
    pub const ALL: [Self; 3] = [Self::PersonCount, Self::Temperature, Self::GpuUsage];

    /// Wire name, used in payload `type` fields and topic suffixes.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PersonCount => "person_count",
            Self::Temperature => "temperature",
            Self::GpuUsage => "gpu_usage",
        }
    }

    /// Name of the value field in a forwarded metric payload.
    pub const fn value_field(self) -> &'static str {
        match self {
            Self::PersonCount => "count",
            Self::Temperature => "celsius",
            Self::GpuUsage => "percent",
        }
    }

    /// True for metrics that feed the alarm engine.
    pub const fn is_thresholded(self) -> bool {
        matches!(self, Self::Temperature | Self::GpuUsage)
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalised metric sample.  Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricRecord {
    metric: MetricType,
    value: f64,
    timestamp_ms: i64,
}

impl MetricRecord {
    pub fn new(metric: MetricType, value: f64, timestamp_ms: i64) -> Self {
        Self {
            metric,
            value,
            timestamp_ms,
        }
    }

    pub fn metric(&self) -> MetricType {
        self.metric
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Milliseconds since the Unix epoch.
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }
}
