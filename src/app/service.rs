//! Application service, the hexagonal core.
//!
//! [`AppService`] is the single mutable context for the process: it owns
//! the normaliser, alarm engine, person-count accumulator, actuation
//! decider and persistence sidecar.  The bus and clock are injected at
//! call sites, making the whole pipeline testable with mock adapters.
//!
//! ```text
//!   BusPort (inbound) ──▶ ┌──────────────────────────────┐ ──▶ BusPort (publish)
//!                         │          AppService           │
//!            ClockPort ──▶│ Normalise · Alarm · Sample ·  │ ──▶ PersistenceSidecar
//!                         │ Actuate                       │
//!                         └──────────────────────────────┘
//! ```
//!
//! Messages are handled one at a time and to completion; nothing here is
//! shared across threads, so there is no locking.

use log::{debug, warn};

use crate::actuation::ActuationDecider;
use crate::alarm::{AlarmEngine, AlarmLevel};
use crate::config::SystemConfig;
use crate::error::{BusError, PersistError};
use crate::metrics::normalize::Normalizer;
use crate::metrics::{MetricRecord, MetricType};
use crate::persistence::{Persisted, PersistenceSidecar};
use crate::sampling::SampleAccumulator;

use super::events::AppEvent;
use super::inbound::{Disposition, InboundMessage};
use super::ports::{BusPort, ClockPort, HeartbeatPort, StoreConnector};

/// Running counters, reported at shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceStats {
    pub processed: u64,
    pub dropped: u64,
    pub published: u64,
    pub publish_failures: u64,
}

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService<C: StoreConnector, H: HeartbeatPort> {
    config: SystemConfig,
    normalizer: Normalizer,
    alarms: AlarmEngine,
    people: SampleAccumulator,
    actuation: ActuationDecider,
    persistence: PersistenceSidecar<C, H>,
    stats: ServiceStats,
}

impl<C: StoreConnector, H: HeartbeatPort> AppService<C, H> {
    /// Construct the service.  `config` must already be validated.
    pub fn new(config: SystemConfig, persistence: PersistenceSidecar<C, H>) -> Self {
        let normalizer = Normalizer::new(config.candidates.clone());
        let alarms = AlarmEngine::new(config.thresholds.temperature, config.thresholds.gpu_usage);
        let actuation = ActuationDecider::new(config.relay_on_level);
        Self {
            config,
            normalizer,
            alarms,
            people: SampleAccumulator::new(),
            actuation,
            persistence,
            stats: ServiceStats::default(),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Subscribe to every inbound metric topic.
    pub fn subscribe_all(&self, bus: &mut impl BusPort) -> Result<(), BusError> {
        for metric in MetricType::ALL {
            bus.subscribe(self.config.topics.inbound(metric))?;
        }
        Ok(())
    }

    // ── Per-message orchestration ─────────────────────────────

    /// Process one delivery to completion.
    ///
    /// Never fails: malformed input is dropped, and publish or persistence
    /// failures are logged and swallowed.
    pub fn handle_message(
        &mut self,
        msg: &InboundMessage,
        bus: &mut impl BusPort,
        clock: &impl ClockPort,
    ) -> Disposition {
        let Some(metric) = self.config.topics.metric_for(&msg.topic) else {
            debug!("Ignoring message on unsubscribed topic {}", msg.topic);
            self.stats.dropped += 1;
            return Disposition::UnknownTopic;
        };

        let now = clock.now_ms();
        let Some(record) = self.normalizer.normalize(metric, &msg.payload, now) else {
            debug!("Dropping malformed {} payload ({} bytes)", metric, msg.payload.len());
            self.stats.dropped += 1;
            return Disposition::Malformed;
        };
        if metric == MetricType::PersonCount && record.value() < 0.0 {
            debug!("Dropping negative person_count {}", record.value());
            self.stats.dropped += 1;
            return Disposition::Malformed;
        }

        match metric {
            MetricType::PersonCount => self.on_person_count(&record, bus, now),
            MetricType::Temperature | MetricType::GpuUsage => {
                self.on_system_metric(&record, bus, now);
            }
        }
        self.stats.processed += 1;
        Disposition::Processed
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn alarm_level(&self, metric: MetricType) -> AlarmLevel {
        self.alarms.level(metric)
    }

    pub fn actuation(&self) -> &ActuationDecider {
        &self.actuation
    }

    /// Person-count samples waiting for the next flush.
    pub fn pending_samples(&self) -> &SampleAccumulator {
        &self.people
    }

    pub fn persistence(&self) -> &PersistenceSidecar<C, H> {
        &self.persistence
    }

    pub fn stats(&self) -> ServiceStats {
        self.stats
    }

    // ── Internal ──────────────────────────────────────────────

    /// Accumulate, and re-assert the LED from the raw count.
    fn on_person_count(&mut self, record: &MetricRecord, bus: &mut impl BusPort, now: i64) {
        self.people.add(record.value());
        let state = self.actuation.decide_led(record.value());
        self.publish(bus, &AppEvent::Led { state, ts: now });
    }

    /// Forward, persist, evaluate alarms, then flush the person-count window.
    fn on_system_metric(&mut self, record: &MetricRecord, bus: &mut impl BusPort, now: i64) {
        self.publish(bus, &AppEvent::Metric(*record));
        log_persist(record.metric().as_str(), self.persistence.persist_metric(record, now));

        if let Some(event) = self.alarms.evaluate(record, now) {
            self.publish(bus, &AppEvent::Alarm(event));
            log_persist("alarm", self.persistence.persist_alarm(&event, now));

            let (temperature, gpu) = (self.alarms.temperature_level(), self.alarms.gpu_level());
            if let Some(state) = self.actuation.decide_relay(temperature, gpu) {
                self.publish(bus, &AppEvent::Relay { state, ts: now });
            }
        }

        self.flush_people(bus, now);
    }

    /// Close the person-count window if anything was accumulated.
    fn flush_people(&mut self, bus: &mut impl BusPort, now: i64) {
        let Some(count) = self.people.flush() else {
            return;
        };
        debug!("Person-count window flushed: {count}");
        self.publish(bus, &AppEvent::PersonCount { count, ts: now });
        let averaged = MetricRecord::new(MetricType::PersonCount, count as f64, now);
        log_persist("person_count", self.persistence.persist_metric(&averaged, now));

        let state = self.actuation.decide_led(count as f64);
        self.publish(bus, &AppEvent::Led { state, ts: now });
    }

    fn publish(&mut self, bus: &mut impl BusPort, event: &AppEvent) {
        let topic = event.topic(&self.config.topics);
        let payload = event.payload(&self.config.source_tag).to_string();
        match bus.publish(&topic, payload.as_bytes(), self.config.qos, false) {
            Ok(()) => self.stats.published += 1,
            Err(e) => {
                self.stats.publish_failures += 1;
                warn!("Publish to {topic} failed: {e}");
            }
        }
    }
}

/// Persistence is best-effort: report the outcome and drop it.
fn log_persist(what: &str, outcome: Result<Persisted, PersistError>) {
    match outcome {
        Ok(_) => {}
        Err(PersistError::CircuitOpen) => debug!("Skipping {what} persistence: circuit open"),
        Err(e) => warn!("Persisting {what} failed: {e}"),
    }
}
