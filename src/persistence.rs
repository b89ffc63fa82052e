//! Persistence sidecar.
//!
//! Best-effort write-through of forwarded metrics and alarm transitions to
//! an external store.
//!
//! ## Circuit lifecycle
//!
//! 1. Disabled by config: every call returns [`Persisted::Disabled`] and
//!    the connector is never touched.
//! 2. The first record needing persistence triggers `connect()`.
//! 3. If that fails, the circuit latches open for the rest of the process:
//!    no further connection attempts, no further writes.
//! 4. Each successful write refreshes the heartbeat artifact.
//!
//! Nothing here ever fails the caller's message processing; every error
//! is returned for the caller to log and drop.

use std::collections::BTreeMap;
use std::str::FromStr;

use log::{error, info, warn};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};

use crate::alarm::AlarmEvent;
use crate::app::ports::{HeartbeatPort, StoreConnector, TableStore};
use crate::config::PersistenceConfig;
use crate::error::{PersistError, StoreError};
use crate::metrics::MetricRecord;

/// A typed item attribute: string or exact decimal number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    S(String),
    N(Decimal),
}

/// One store item, attribute name → value.
pub type Item = BTreeMap<String, AttributeValue>;

/// Liveness record: who wrote last, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub source: String,
    pub ts: i64,
}

/// Successful outcome of a persistence call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persisted {
    Written,
    Disabled,
}

/// Convert an `f64` to the decimal it prints as.
///
/// Uses the shortest round-trip representation so `72.1` is stored as
/// `72.1`, not `72.099999999999994315658113919198513031005859375`.
///
/// `Decimal` holds 28 fractional digits and magnitudes below ~7.9e28.
/// Smaller values are rounded to 28 places; larger ones are rejected
/// with [`StoreError::NotDecimal`] and the caller logs the skipped write.
pub fn to_decimal(value: f64) -> Result<Decimal, StoreError> {
    if !value.is_finite() {
        return Err(StoreError::NotDecimal(value.to_string()));
    }
    let repr = value.to_string();
    Decimal::from_str(&repr)
        .ok()
        .or_else(|| {
            (value.abs() < 1.0)
                .then(|| Decimal::from_str(&format!("{value:.28}")).ok())
                .flatten()
        })
        .or_else(|| Decimal::from_f64(value))
        .map(|d| d.normalize())
        .ok_or(StoreError::NotDecimal(repr))
}

fn number(value: f64) -> Result<AttributeValue, StoreError> {
    to_decimal(value).map(AttributeValue::N)
}

fn text(value: &str) -> AttributeValue {
    AttributeValue::S(value.to_string())
}

/// Item for a forwarded metric.
pub fn metric_item(record: &MetricRecord, source: &str) -> Result<Item, StoreError> {
    let mut item = Item::new();
    item.insert("metric".into(), text(record.metric().as_str()));
    item.insert("ts".into(), AttributeValue::N(Decimal::from(record.timestamp_ms())));
    item.insert("value".into(), number(record.value())?);
    item.insert("source".into(), text(source));
    Ok(item)
}

/// Item for an alarm transition.
pub fn alarm_item(event: &AlarmEvent, source: &str) -> Result<Item, StoreError> {
    let mut item = Item::new();
    item.insert("metric".into(), text(event.metric.as_str()));
    item.insert("ts".into(), AttributeValue::N(Decimal::from(event.timestamp_ms)));
    item.insert("level".into(), text(event.level.as_str()));
    item.insert("value".into(), number(event.value)?);
    item.insert("threshold".into(), number(event.threshold)?);
    item.insert("source".into(), text(source));
    Ok(item)
}

/// Lazily connected, one-shot-failure store writer.
pub struct PersistenceSidecar<C: StoreConnector, H: HeartbeatPort> {
    enabled: bool,
    connector: C,
    heartbeat: H,
    store: Option<C::Store>,
    /// Latched on the first connection failure; never cleared.
    tripped: bool,
    metrics_table: String,
    alarms_table: String,
    source: String,
}

impl<C: StoreConnector, H: HeartbeatPort> PersistenceSidecar<C, H> {
    pub fn new(config: &PersistenceConfig, source: &str, connector: C, heartbeat: H) -> Self {
        Self {
            enabled: config.enabled,
            connector,
            heartbeat,
            store: None,
            tripped: false,
            metrics_table: config.metrics_table.clone(),
            alarms_table: config.alarms_table.clone(),
            source: source.to_string(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// True once a connection attempt has failed.
    pub fn is_tripped(&self) -> bool {
        self.tripped
    }

    pub fn is_connected(&self) -> bool {
        self.store.is_some()
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn heartbeat(&self) -> &H {
        &self.heartbeat
    }

    pub fn persist_metric(
        &mut self,
        record: &MetricRecord,
        now_ms: i64,
    ) -> Result<Persisted, PersistError> {
        if !self.enabled {
            return Ok(Persisted::Disabled);
        }
        let item = metric_item(record, &self.source)?;
        let table = self.metrics_table.clone();
        self.write(&table, &item, now_ms)
    }

    pub fn persist_alarm(&mut self, event: &AlarmEvent, now_ms: i64) -> Result<Persisted, PersistError> {
        if !self.enabled {
            return Ok(Persisted::Disabled);
        }
        let item = alarm_item(event, &self.source)?;
        let table = self.alarms_table.clone();
        self.write(&table, &item, now_ms)
    }

    // ── Internal ──────────────────────────────────────────────────

    fn write(&mut self, table: &str, item: &Item, now_ms: i64) -> Result<Persisted, PersistError> {
        let store = self.store()?;
        store.put(table, item)?;

        let beat = Heartbeat {
            source: self.source.clone(),
            ts: now_ms,
        };
        if let Err(e) = self.heartbeat.beat(&beat) {
            warn!("Heartbeat update failed: {e}");
        }
        Ok(Persisted::Written)
    }

    fn store(&mut self) -> Result<&mut C::Store, PersistError> {
        if self.tripped {
            return Err(PersistError::CircuitOpen);
        }
        if self.store.is_none() {
            match self.connector.connect() {
                Ok(store) => {
                    info!("Persistence store connected");
                    self.store = Some(store);
                }
                Err(e) => {
                    error!("Persistence init failed, disabled until restart: {e}");
                    self.tripped = true;
                    return Err(PersistError::Connect(e));
                }
            }
        }
        self.store.as_mut().ok_or(PersistError::CircuitOpen)
    }
}
