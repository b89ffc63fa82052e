//! Hysteresis alarm engine.
//!
//! Each thresholded metric owns one [`AlarmLevel`].  Every sample
//! re-evaluates the level from scratch against two thresholds:
//!
//! ```text
//!   v >= alarm  → Alarm
//!   v >= warn   → Warning
//!   otherwise   → Normal
//! ```
//!
//! An [`AlarmEvent`] is produced only when the computed level differs from
//! the stored one, so a metric that stays inside one band stays silent.
//! There is no decay timer: the last sample is the basis for the level
//! until the next sample for that metric arrives.

use core::fmt;

use log::info;
use serde::{Deserialize, Serialize};

use crate::metrics::{MetricRecord, MetricType};

/// Severity band of a thresholded metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlarmLevel {
    #[default]
    Normal,
    Warning,
    Alarm,
}

impl AlarmLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Warning => "warning",
            Self::Alarm => "alarm",
        }
    }
}

impl fmt::Display for AlarmLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Warn/alarm boundary pair.  `warn < alarm` is enforced by config validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub warn: f64,
    pub alarm: f64,
}

impl Thresholds {
    pub const fn new(warn: f64, alarm: f64) -> Self {
        Self { warn, alarm }
    }

    /// Level for a single value, ignoring history.
    pub fn classify(&self, value: f64) -> AlarmLevel {
        if value >= self.alarm {
            AlarmLevel::Alarm
        } else if value >= self.warn {
            AlarmLevel::Warning
        } else {
            AlarmLevel::Normal
        }
    }

    /// The boundary reported alongside a transition into `level`.
    pub fn reported_for(&self, level: AlarmLevel) -> f64 {
        match level {
            AlarmLevel::Alarm => self.alarm,
            AlarmLevel::Warning | AlarmLevel::Normal => self.warn,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.warn.is_finite() && self.alarm.is_finite() && self.warn < self.alarm
    }
}

/// A level transition for one metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlarmEvent {
    pub metric: MetricType,
    pub level: AlarmLevel,
    pub value: f64,
    /// The boundary that was crossed (alarm threshold for `Alarm`,
    /// warn threshold otherwise).
    pub threshold: f64,
    pub timestamp_ms: i64,
}

/// Stored level plus thresholds for a single metric.
#[derive(Debug, Clone)]
pub struct HysteresisAlarm {
    thresholds: Thresholds,
    level: AlarmLevel,
}

impl HysteresisAlarm {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            level: AlarmLevel::Normal,
        }
    }

    pub fn level(&self) -> AlarmLevel {
        self.level
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Classify `value` and update the stored level.
    /// Returns the new level only if it changed.
    pub fn update(&mut self, value: f64) -> Option<AlarmLevel> {
        let next = self.thresholds.classify(value);
        if next == self.level {
            return None;
        }
        self.level = next;
        Some(next)
    }
}

/// Alarm state for every thresholded metric.
#[derive(Debug, Clone)]
pub struct AlarmEngine {
    temperature: HysteresisAlarm,
    gpu_usage: HysteresisAlarm,
}

impl AlarmEngine {
    pub fn new(temperature: Thresholds, gpu_usage: Thresholds) -> Self {
        Self {
            temperature: HysteresisAlarm::new(temperature),
            gpu_usage: HysteresisAlarm::new(gpu_usage),
        }
    }

    /// Evaluate a record.  Returns an event on a level change; `None` for
    /// steady levels and for metrics without thresholds.
    ///
    /// `now_ms` stamps the event (transition time, not sample time).
    pub fn evaluate(&mut self, record: &MetricRecord, now_ms: i64) -> Option<AlarmEvent> {
        let alarm = self.alarm_mut(record.metric())?;
        let level = alarm.update(record.value())?;
        let event = AlarmEvent {
            metric: record.metric(),
            level,
            value: record.value(),
            threshold: alarm.thresholds().reported_for(level),
            timestamp_ms: now_ms,
        };
        info!(
            "ALARM | {} -> {} (value={} threshold={})",
            event.metric, event.level, event.value, event.threshold
        );
        Some(event)
    }

    /// Current level of a metric; `Normal` for metrics without thresholds.
    pub fn level(&self, metric: MetricType) -> AlarmLevel {
        match metric {
            MetricType::Temperature => self.temperature.level(),
            MetricType::GpuUsage => self.gpu_usage.level(),
            MetricType::PersonCount => AlarmLevel::Normal,
        }
    }

    pub fn temperature_level(&self) -> AlarmLevel {
        self.temperature.level()
    }

    pub fn gpu_level(&self) -> AlarmLevel {
        self.gpu_usage.level()
    }

    fn alarm_mut(&mut self, metric: MetricType) -> Option<&mut HysteresisAlarm> {
        match metric {
            MetricType::Temperature => Some(&mut self.temperature),
            MetricType::GpuUsage => Some(&mut self.gpu_usage),
            MetricType::PersonCount => None,
        }
    }
}
