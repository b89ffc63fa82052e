//! Edgewatch data manager library.
//!
//! Exposes the pipeline modules for the binary and for integration
//! testing.  Everything that touches the outside world sits behind the
//! port traits in [`app::ports`]; the [`adapters`] provide the host
//! implementations.

#![deny(unused_must_use)]

pub mod actuation;
pub mod adapters;
pub mod alarm;
pub mod app;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod metrics;
pub mod persistence;
pub mod relay_emulator;
pub mod sampling;
