//! Ingress queue and single-consumer dispatch.
//!
//! Messages are produced by the transport reader thread and consumed by
//! the main loop, which hands them to the service one at a time in FIFO
//! order.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────────┐     ┌──────────────┐
//! │ Bus reader   │────▶│  Ingress queue   │────▶│  Main loop   │
//! │ (thread)     │     │  (bounded, FIFO) │     │  (consumer)  │
//! └──────────────┘     └──────────────────┘     └──────────────┘
//! ```
//!
//! The queue is bounded: a slow consumer blocks the reader instead of
//! growing memory without limit.

use std::sync::mpsc::{Receiver, SyncSender, sync_channel};

use crate::app::inbound::InboundMessage;

/// Create the ingress queue.  A zero capacity is raised to one.
pub fn ingress(capacity: usize) -> (SyncSender<InboundMessage>, Receiver<InboundMessage>) {
    sync_channel(capacity.max(1))
}

/// Drain the queue into `handler` until every sender has hung up.
/// Returns the number of messages dispatched.
pub fn drain(rx: &Receiver<InboundMessage>, mut handler: impl FnMut(InboundMessage)) -> u64 {
    let mut dispatched = 0;
    while let Ok(msg) = rx.recv() {
        handler(msg);
        dispatched += 1;
    }
    dispatched
}
