//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) turns each of these into
//! one publish on the [`BusPort`](super::ports::BusPort).  The topic and
//! JSON payload shape of every event is defined here and nowhere else.

use serde_json::{Value, json};

use crate::actuation::{LedState, RelayState};
use crate::alarm::AlarmEvent;
use crate::config::TopicConfig;
use crate::metrics::{MetricRecord, MetricType};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// A normalised temperature or GPU sample forwarded to the UI.
    Metric(MetricRecord),

    /// A flushed person-count average forwarded to the UI.
    PersonCount { count: i64, ts: i64 },

    /// An alarm level transition.
    Alarm(AlarmEvent),

    /// The relay must change state.
    Relay { state: RelayState, ts: i64 },

    /// LED decision, re-asserted on every person-count event.
    Led { state: LedState, ts: i64 },
}

impl AppEvent {
    /// Topic this event is published on.
    pub fn topic(&self, topics: &TopicConfig) -> String {
        match self {
            Self::Metric(r) => topics.forwarded(r.metric()),
            Self::PersonCount { .. } => topics.forwarded(MetricType::PersonCount),
            Self::Alarm(_) => topics.alarms.clone(),
            Self::Relay { .. } => topics.relay_command.clone(),
            Self::Led { .. } => topics.led_toggle.clone(),
        }
    }

    /// JSON payload.  `source` tags actuator commands.
    pub fn payload(&self, source: &str) -> Value {
        match self {
            Self::Metric(r) => {
                let mut doc = json!({ "type": r.metric().as_str(), "ts": r.timestamp_ms() });
                doc[r.metric().value_field()] = json!(r.value());
                doc
            }
            Self::PersonCount { count, ts } => json!({
                "type": MetricType::PersonCount.as_str(),
                "count": count,
                "ts": ts,
            }),
            Self::Alarm(ev) => json!({
                "type": ev.metric.as_str(),
                "level": ev.level.as_str(),
                "value": ev.value,
                "threshold": ev.threshold,
                "ts": ev.timestamp_ms,
            }),
            Self::Relay { state, ts } => json!({
                "state": state.as_str(),
                "source": source,
                "ts": ts,
            }),
            Self::Led { state, ts } => json!({
                "state": state.as_str(),
                "source": source,
                "ts": ts,
            }),
        }
    }
}
