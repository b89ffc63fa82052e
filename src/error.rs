//! Unified error types for the data manager.
//!
//! The message-processing path never propagates these: every variant is
//! logged and discarded at the boundary where it occurs.  They exist so
//! adapters and the binary can report failures with `?` and so tests can
//! assert on the exact failure.

use core::fmt;

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Configuration could not be loaded or failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed range validation.  The string names the field and why.
    ValidationFailed(&'static str),
    /// An environment override could not be parsed.
    InvalidEnv { var: &'static str, value: String },
    /// The JSON config file could not be read or parsed.
    File(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::InvalidEnv { var, value } => write!(f, "invalid value for {var}: {value:?}"),
            Self::File(msg) => write!(f, "config file: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

/// Errors reported by store and heartbeat adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached or initialised.
    Connect(String),
    /// A single write was rejected.
    Write(String),
    /// A numeric attribute has no exact decimal representation.
    NotDecimal(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect(msg) => write!(f, "connect failed: {msg}"),
            Self::Write(msg) => write!(f, "write failed: {msg}"),
            Self::NotDecimal(raw) => write!(f, "not representable as decimal: {raw}"),
        }
    }
}

impl std::error::Error for StoreError {}

// ---------------------------------------------------------------------------
// Persistence sidecar errors
// ---------------------------------------------------------------------------

/// Why the persistence sidecar did not write a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistError {
    /// A previous connection attempt failed; the circuit stays open.
    CircuitOpen,
    /// This call tried to connect and failed (the circuit is now open).
    Connect(StoreError),
    /// The item could not be built or the write failed.
    Write(StoreError),
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CircuitOpen => write!(f, "circuit open"),
            Self::Connect(e) => write!(f, "store init: {e}"),
            Self::Write(e) => write!(f, "store write: {e}"),
        }
    }
}

impl std::error::Error for PersistError {}

impl From<StoreError> for PersistError {
    fn from(e: StoreError) -> Self {
        Self::Write(e)
    }
}

// ---------------------------------------------------------------------------
// Bus errors
// ---------------------------------------------------------------------------

/// A publish could not be handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The transport rejected or failed to write the message.
    PublishFailed(String),
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PublishFailed(msg) => write!(f, "publish failed: {msg}"),
        }
    }
}

impl std::error::Error for BusError {}
