//! Mock transport adapters for integration tests.
//!
//! Records every report pushed through the uplink and lets tests script
//! exactly what the transport's pull primitive returns.

use std::collections::VecDeque;

use twinsync::adapters::sim_pin::SimPin;
use twinsync::registry::{FieldSet, FieldValue, FixedBuf, Shared, TypedField};
use twinsync::twin::commands::{CommandRequest, HandlerOutcome};
use twinsync::twin::handlers::{DelayedToggle, FnHandler};
use twinsync::twin::params::ParameterDescriptor;
use twinsync::twin::ports::{ChunkSource, PullError, Uplink};
use twinsync::twin::publisher::{DataHandle, DataReport, DataStream, StatusReport};
use twinsync::twin::transfer::{ResourceDescriptor, ResourceSink};
use twinsync::{DeviceTwin, SyncConfig};

// ── Recording uplink ──────────────────────────────────────────

#[derive(Debug, Default)]
pub struct RecordingUplink {
    pub status: Vec<StatusReport>,
    pub data: Vec<DataReport>,
}

#[allow(dead_code)]
impl RecordingUplink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `name` in the most recent status report.
    pub fn last_status(&self, name: &str) -> Option<FieldValue> {
        self.status
            .last()?
            .fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.clone())
    }
}

impl Uplink for RecordingUplink {
    fn push_status(&mut self, report: &StatusReport) {
        self.status.push(report.clone());
    }

    fn push_data(&mut self, report: &DataReport) {
        self.data.push(report.clone());
    }
}

// ── Scripted chunk source ─────────────────────────────────────

/// One scripted answer from the pull primitive.
#[derive(Debug, Clone)]
pub enum Pull {
    Bytes(Vec<u8>),
    /// Claim more bytes than the caller asked for.
    OverReport(usize),
    Fail,
}

#[derive(Debug, Default)]
pub struct ScriptedSource {
    script: VecDeque<Pull>,
    pub requested: Vec<usize>,
}

#[allow(dead_code)]
impl ScriptedSource {
    pub fn new(script: impl IntoIterator<Item = Pull>) -> Self {
        Self {
            script: script.into_iter().collect(),
            requested: Vec::new(),
        }
    }
}

impl ChunkSource for ScriptedSource {
    fn pull_chunk(&mut self, into: &mut [u8]) -> Result<usize, PullError> {
        self.requested.push(into.len());
        match self.script.pop_front() {
            None => Ok(0),
            Some(Pull::Fail) => Err(PullError),
            Some(Pull::OverReport(n)) => Ok(into.len() + n),
            Some(Pull::Bytes(b)) => {
                let n = b.len().min(into.len());
                into[..n].copy_from_slice(&b[..n]);
                Ok(n)
            }
        }
    }
}

// ── Device fixture ────────────────────────────────────────────

pub const PARAM_NAME: u16 = 1;
pub const PARAM_TIMEOUT: u16 = 2;
pub const PARAM_THRESHOLD: u16 = 3;
pub const PARAM_GAIN: u16 = 4;

pub const CMD_RESET: u16 = 1;
pub const CMD_LED: u16 = 2;

pub const RSC_MESSAGE: u16 = 1;
pub const RSC_IMAGE: u16 = 2;

pub const MESSAGE_CAP: usize = 150;
pub const IMAGE_CAP: usize = 5 * 1024;

/// A device wired like the LiveObjects sample application.
#[allow(dead_code)]
pub struct Device {
    pub twin: DeviceTwin,
    pub data: DataHandle,
    pub message: Shared<FixedBuf>,
    pub message_version: Shared<FixedBuf>,
    pub image: Shared<FixedBuf>,
    pub image_version: Shared<FixedBuf>,
    pub name: Shared<FixedBuf>,
    pub timeout: Shared<u32>,
    pub threshold: Shared<i32>,
    pub gain: Shared<f32>,
    pub counter: Shared<i32>,
    pub led: SimPin,
}

pub fn device() -> Device {
    device_with(SyncConfig::default())
}

pub fn device_with(config: SyncConfig) -> Device {
    let message = Shared::new(FixedBuf::with_text(MESSAGE_CAP, "READY"));
    let message_version = Shared::new(FixedBuf::with_text(10, "01.00"));
    let image = Shared::new(FixedBuf::new(IMAGE_CAP));
    let image_version = Shared::new(FixedBuf::with_text(10, "01.00"));
    let name = Shared::new(FixedBuf::with_text(20, "TICTAC"));
    let timeout = Shared::new(10_u32);
    let threshold = Shared::new(-3_i32);
    let gain = Shared::new(1.05_f32);
    let counter = Shared::new(0_i32);
    let led = SimPin::new();

    let mut twin = DeviceTwin::new(config).unwrap();
    twin.attach_status(
        FieldSet::new()
            .with(TypedField::int32("sample_counter", &counter))
            .with(TypedField::text("sample_message", &message)),
    )
    .unwrap();
    let data = twin
        .attach_data(
            DataStream::new(
                "urn:lo:nsid:synchro",
                "latency",
                "Test",
                FieldSet::new().with(TypedField::int32("counter", &counter)),
            )
            .unwrap(),
        )
        .unwrap();

    twin.register_parameter(ParameterDescriptor::text(
        PARAM_NAME,
        TypedField::text("name", &name),
    ))
    .unwrap();
    twin.register_parameter(ParameterDescriptor::ranged(
        PARAM_TIMEOUT,
        TypedField::uint32("timeout", &timeout),
        1..=120,
    ))
    .unwrap();
    twin.register_parameter(ParameterDescriptor::ranged(
        PARAM_THRESHOLD,
        TypedField::int32("threshold", &threshold),
        -10..=10,
    ))
    .unwrap();
    twin.register_parameter(ParameterDescriptor::ranged(
        PARAM_GAIN,
        TypedField::float("gain", &gain),
        0.0..=10.0,
    ))
    .unwrap();

    twin.register_command(
        CMD_RESET,
        "RESET",
        FnHandler(|_: &CommandRequest| HandlerOutcome::Ok),
    )
    .unwrap();
    twin.register_command(CMD_LED, "LED", DelayedToggle::new(led.clone()))
        .unwrap();

    twin.register_resource(ResourceDescriptor::new(
        RSC_MESSAGE,
        "message",
        &message_version,
        ResourceSink::Text(message.clone()),
    ))
    .unwrap();
    twin.register_resource(ResourceDescriptor::new(
        RSC_IMAGE,
        "image",
        &image_version,
        ResourceSink::Binary(image.clone()),
    ))
    .unwrap();

    Device {
        twin,
        data,
        message,
        message_version,
        image,
        image_version,
        name,
        timeout,
        threshold,
        gain,
        counter,
        led,
    }
}

pub fn text(buf: &Shared<FixedBuf>) -> String {
    buf.with(|b| b.text().into_owned())
}
