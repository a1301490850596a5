//! Log-based uplink adapter.
//!
//! Implements [`Uplink`] by rendering each report as JSON and writing it to
//! the logger. Stands in for the MQTT publisher on the host.

use log::{info, warn};
use serde::Serialize;

use crate::twin::ports::Uplink;
use crate::twin::publisher::{DataReport, StatusReport};

/// Adapter that logs every report and counts pushes.
#[derive(Debug, Default)]
pub struct LogUplink {
    status: u32,
    data: u32,
}

impl LogUplink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status_pushes(&self) -> u32 {
        self.status
    }

    pub fn data_pushes(&self) -> u32 {
        self.data
    }
}

fn render(report: &impl Serialize) -> String {
    serde_json::to_string(report).unwrap_or_else(|e| {
        warn!("PUB: encode failed: {}", e);
        String::from("{}")
    })
}

impl Uplink for LogUplink {
    fn push_status(&mut self, report: &StatusReport) {
        self.status += 1;
        info!("STATUS | {}", render(report));
    }

    fn push_data(&mut self, report: &DataReport) {
        self.data += 1;
        info!("DATA   | {}", render(report));
    }
}
