//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  No broker, store or real clock is required.

mod adapter_flow_tests;
mod mock_bus;
mod service_tests;
