//! Fuzz target: `AppService::handle_message`
//!
//! Splits the input into messages (first byte picks the topic, the rest up
//! to the next `0xFF` is the payload) and feeds them through the service.
//! Asserts the relay is never commanded to the state it already holds.
//!
//! cargo fuzz run fuzz_pipeline

#![no_main]

use edgewatch::app::inbound::InboundMessage;
use edgewatch::app::ports::{BusPort, ClockPort, HeartbeatPort, StoreConnector, TableStore};
use edgewatch::app::service::AppService;
use edgewatch::config::SystemConfig;
use edgewatch::error::{BusError, StoreError};
use edgewatch::persistence::{Heartbeat, Item, PersistenceSidecar};
use libfuzzer_sys::fuzz_target;

const TOPICS: [&str; 4] = [
    "deepstream/person_count",
    "jetson/internal/temperature",
    "jetson/internal/gpu_usage",
    "unrelated/topic",
];

#[derive(Default)]
struct RelayGuard {
    last: Option<Vec<u8>>,
}

impl BusPort for RelayGuard {
    fn subscribe(&mut self, _topic: &str) -> Result<(), BusError> {
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8], _qos: u8, _retain: bool) -> Result<(), BusError> {
        if topic == "actuator/relay" {
            let doc: serde_json::Value = serde_json::from_slice(payload).expect("relay payload is JSON");
            let state = doc["state"].as_str().expect("relay state is a string").as_bytes().to_vec();
            assert_ne!(self.last.as_ref(), Some(&state), "relay re-commanded to same state");
            self.last = Some(state);
        }
        Ok(())
    }
}

struct Zero;

impl ClockPort for Zero {
    fn now_ms(&self) -> i64 {
        0
    }
}

struct Discard;

impl StoreConnector for Discard {
    type Store = Discard;
    fn connect(&mut self) -> Result<Discard, StoreError> {
        Ok(Discard)
    }
}

impl TableStore for Discard {
    fn put(&mut self, _table: &str, _item: &Item) -> Result<(), StoreError> {
        Ok(())
    }
}

impl HeartbeatPort for Discard {
    fn beat(&mut self, _heartbeat: &Heartbeat) -> Result<(), StoreError> {
        Ok(())
    }
}

fuzz_target!(|data: &[u8]| {
    let mut config = SystemConfig::default();
    config.persistence.enabled = true;
    let persistence = PersistenceSidecar::new(&config.persistence, &config.source_tag, Discard, Discard);
    let mut svc = AppService::new(config, persistence);
    let mut bus = RelayGuard::default();

    for chunk in data.split(|b| *b == 0xFF) {
        let Some((selector, payload)) = chunk.split_first() else {
            continue;
        };
        let topic = TOPICS[usize::from(*selector) % TOPICS.len()];
        svc.handle_message(&InboundMessage::new(topic, payload), &mut bus, &Zero);
    }
});
