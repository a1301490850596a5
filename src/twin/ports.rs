//! Port traits at the boundary between the twin core and the transport.
//!
//! ```text
//!   transport ──▶ DeviceTwin ──▶ ChunkSource / Uplink / StatusPublish
//! ```
//!
//! The core pulls resource bytes through [`ChunkSource`] and pushes
//! serialisable reports through [`Uplink`]. Encoding onto the wire is the
//! adapter's business; the core only hands over structured reports.

use super::publisher::{DataReport, StatusReport};

// ───────────────────────────────────────────────────────────────
// Chunk source (driven adapter: transport buffer → core)
// ───────────────────────────────────────────────────────────────

/// Low-level pull primitive over the transport's receive buffer.
pub trait ChunkSource {
    /// Copy up to `into.len()` pending bytes into `into`.
    ///
    /// Returns the number of bytes copied. `Ok(0)` means nothing is
    /// available yet. An `Err` aborts the active transfer.
    fn pull_chunk(&mut self, into: &mut [u8]) -> Result<usize, PullError>;
}

/// The transport could not read from its receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullError;

impl core::fmt::Display for PullError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "transport pull failed")
    }
}

// ───────────────────────────────────────────────────────────────
// Uplink (driven adapter: core → transport)
// ───────────────────────────────────────────────────────────────

/// Outbound path for status and telemetry reports.
pub trait Uplink {
    fn push_status(&mut self, report: &StatusReport);

    fn push_data(&mut self, report: &DataReport);
}

// ───────────────────────────────────────────────────────────────
// Status publish hook
// ───────────────────────────────────────────────────────────────

/// Invoked by the transfer manager after a committed resource.
///
/// Any [`Uplink`] paired with the publisher satisfies this through
/// [`PublishVia`](super::publisher::PublishVia).
pub trait StatusPublish {
    fn publish_status(&mut self);
}

/// No-op publish hook for callers that re-publish on their own schedule.
pub struct NoPublish;

impl StatusPublish for NoPublish {
    fn publish_status(&mut self) {}
}
