//! System clock adapter.
//!
//! Implements [`ClockPort`] from the host wall clock.  A clock set before
//! the Unix epoch reads as `0` rather than failing the message path.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::app::ports::ClockPort;

/// Wall-clock time source.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl ClockPort for SystemClock {
    fn now_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as i64)
    }
}
