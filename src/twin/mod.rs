//! Device-twin core: hexagonal architecture.
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────┐
//!   │                     Adapters                         │
//!   │  LogUplink · SliceChunkSource · SimPin               │
//!   └───────────┬──────────────────────────┬───────────────┘
//!               │ implements               │ implements
//!   ┌───────────▼──────────┐   ┌───────────▼───────────────┐
//!   │  Uplink              │   │  ChunkSource              │
//!   │  StatusPublish       │   │  StatefulOutputPin        │
//!   └───────────┬──────────┘   └───────────┬───────────────┘
//!               │ consumed by              │ consumed by
//!   ┌───────────▼──────────────────────────▼───────────────┐
//!   │                   DeviceTwin                         │
//!   │  ParameterSynchronizer · CommandDispatcher           │
//!   │  ResourceTransferManager · Publisher                 │
//!   └──────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod handlers;
pub mod params;
pub mod ports;
pub mod publisher;
pub mod service;
pub mod transfer;
