//! Application core.
//!
//! This module contains the message pipeline for the data manager:
//! normalisation, alarm evaluation, person-count sampling, actuation and
//! best-effort persistence.  All interaction with the broker, the clock
//! and the store happens through **port traits** defined in [`ports`],
//! keeping this layer testable without a broker or a database.

pub mod events;
pub mod inbound;
pub mod ports;
pub mod service;
