//! Mock adapters for integration tests.
//!
//! Records every publish, store write and heartbeat so tests can assert on
//! the full history without a broker or a database.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use edgewatch::app::inbound::InboundMessage;
use edgewatch::app::ports::{BusPort, ClockPort, HeartbeatPort, StoreConnector, TableStore};
use edgewatch::app::service::AppService;
use edgewatch::config::SystemConfig;
use edgewatch::error::{BusError, StoreError};
use edgewatch::persistence::{Heartbeat, Item, PersistenceSidecar};
use serde_json::Value;

// ── MockBus ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MockBus {
    pub subscriptions: Vec<String>,
    pub published: Vec<(String, Value)>,
    /// Reject every publish when set.
    pub fail: bool,
}

#[allow(dead_code)]
impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payloads published on `topic`, oldest first.
    pub fn on(&self, topic: &str) -> Vec<&Value> {
        self.published
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, v)| v)
            .collect()
    }

    pub fn topics(&self) -> Vec<&str> {
        self.published.iter().map(|(t, _)| t.as_str()).collect()
    }

    pub fn clear(&mut self) {
        self.published.clear();
    }
}

impl BusPort for MockBus {
    fn subscribe(&mut self, topic: &str) -> Result<(), BusError> {
        self.subscriptions.push(topic.to_string());
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8], _qos: u8, _retain: bool) -> Result<(), BusError> {
        if self.fail {
            return Err(BusError::PublishFailed("broker down".into()));
        }
        let doc = serde_json::from_slice(payload).expect("service publishes JSON");
        self.published.push((topic.to_string(), doc));
        Ok(())
    }
}

// ── FixedClock ────────────────────────────────────────────────

pub struct FixedClock(Cell<i64>);

#[allow(dead_code)]
impl FixedClock {
    pub fn at(ms: i64) -> Self {
        Self(Cell::new(ms))
    }

    pub fn advance(&self, ms: i64) {
        self.0.set(self.0.get() + ms);
    }
}

impl ClockPort for FixedClock {
    fn now_ms(&self) -> i64 {
        self.0.get()
    }
}

// ── Store mocks ───────────────────────────────────────────────

pub type Writes = Rc<RefCell<Vec<(String, Item)>>>;

/// Connector whose stores share one write log with the test.
#[derive(Default)]
pub struct MockConnector {
    pub attempts: Rc<Cell<u32>>,
    pub writes: Writes,
    pub fail_connect: bool,
    pub fail_writes: bool,
}

pub struct MockStore {
    writes: Writes,
    fail: bool,
}

impl StoreConnector for MockConnector {
    type Store = MockStore;

    fn connect(&mut self) -> Result<MockStore, StoreError> {
        self.attempts.set(self.attempts.get() + 1);
        if self.fail_connect {
            return Err(StoreError::Connect("no credentials".into()));
        }
        Ok(MockStore {
            writes: Rc::clone(&self.writes),
            fail: self.fail_writes,
        })
    }
}

impl TableStore for MockStore {
    fn put(&mut self, table: &str, item: &Item) -> Result<(), StoreError> {
        if self.fail {
            return Err(StoreError::Write("throttled".into()));
        }
        self.writes.borrow_mut().push((table.to_string(), item.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct MockHeartbeat {
    pub beats: Vec<Heartbeat>,
}

impl HeartbeatPort for MockHeartbeat {
    fn beat(&mut self, heartbeat: &Heartbeat) -> Result<(), StoreError> {
        self.beats.push(heartbeat.clone());
        Ok(())
    }
}

// ── Helpers ───────────────────────────────────────────────────

pub type TestService = AppService<MockConnector, MockHeartbeat>;

/// Service over `config` with the given connector.
pub fn service_with(config: SystemConfig, connector: MockConnector) -> TestService {
    let persistence = PersistenceSidecar::new(
        &config.persistence,
        &config.source_tag,
        connector,
        MockHeartbeat::default(),
    );
    AppService::new(config, persistence)
}

/// Service with default config and persistence disabled.
#[allow(dead_code)]
pub fn service() -> TestService {
    service_with(SystemConfig::default(), MockConnector::default())
}

#[allow(dead_code)]
pub fn msg(topic: &str, payload: &str) -> InboundMessage {
    InboundMessage::new(topic, payload.as_bytes())
}

pub const PERSON: &str = "deepstream/person_count";
pub const TEMP: &str = "jetson/internal/temperature";
pub const GPU: &str = "jetson/internal/gpu_usage";
