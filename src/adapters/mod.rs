//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter      | Implements                  | Connects to                 |
//! |--------------|-----------------------------|-----------------------------|
//! | `line_bus`   | BusPort                     | `<topic> <payload>` lines   |
//! | `json_store` | StoreConnector, TableStore  | `<dir>/<table>.jsonl` files |
//! |              | HeartbeatPort               | heartbeat JSON file         |
//! | `time`       | ClockPort                   | host wall clock             |

pub mod json_store;
pub mod line_bus;
pub mod time;
