//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (message bus, clock, store, heartbeat) implement these
//! traits.  The [`AppService`](super::service::AppService) consumes them via
//! generics, so the domain core never touches a socket or a file directly.
//!
//! All port errors are typed, but the domain treats every one of them as
//! best-effort: it logs and carries on.

use crate::error::{BusError, StoreError};
use crate::persistence::{Heartbeat, Item};

// ───────────────────────────────────────────────────────────────
// Bus port (driven adapter: domain ↔ pub/sub transport)
// ───────────────────────────────────────────────────────────────

/// Publish/subscribe transport.
///
/// Delivery is at-most-once and in order per topic; nothing is assumed
/// about ordering across topics.  Publishing is fire-and-forget: an `Ok`
/// means the transport accepted the message, not that anyone received it.
pub trait BusPort {
    /// Register interest in `topic`.
    fn subscribe(&mut self, topic: &str) -> Result<(), BusError>;

    /// Hand a message to the transport.
    fn publish(&mut self, topic: &str, payload: &[u8], qos: u8, retain: bool)
    -> Result<(), BusError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Wall-clock source for receipt and event timestamps.
pub trait ClockPort {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;
}

// ───────────────────────────────────────────────────────────────
// Store ports (driven adapter: domain → time-series store)
// ───────────────────────────────────────────────────────────────

/// Opens a connection to the external store.
///
/// Called lazily by the persistence sidecar, at most once per process
/// unless the previous attempt succeeded.
pub trait StoreConnector {
    type Store: TableStore;

    fn connect(&mut self) -> Result<Self::Store, StoreError>;
}

/// A connected store that accepts items into named tables.
pub trait TableStore {
    fn put(&mut self, table: &str, item: &Item) -> Result<(), StoreError>;
}

/// Liveness artifact consumed by external health checks.
pub trait HeartbeatPort {
    fn beat(&mut self, heartbeat: &Heartbeat) -> Result<(), StoreError>;
}
