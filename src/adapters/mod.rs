//! Adapters: concrete implementations of the twin's port traits.
//!
//! | Adapter       | Implements          | Connects to              |
//! |---------------|---------------------|--------------------------|
//! | `log_uplink`  | Uplink              | Logger (JSON reports)    |
//! | `memory`      | ChunkSource         | In-memory receive buffer |
//! | `sim_pin`     | StatefulOutputPin   | Simulated board LED      |

pub mod log_uplink;
pub mod memory;
pub mod sim_pin;
