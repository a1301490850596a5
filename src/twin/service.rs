//! Device twin service: the transport-facing entry point.
//!
//! [`DeviceTwin`] owns the parameter synchronizer, command dispatcher,
//! resource transfer manager and publisher. The transport calls the
//! `on_*_event` methods and serialises the returned [`ResponseCode`].
//! Ports are injected at call sites so the whole service runs against
//! mocks in tests.
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!  transport ───▶ │          DeviceTwin          │ ──▶ Uplink
//!  events         │ params · commands · transfer │
//!  ChunkSource ──▶│          publisher           │
//!                 └──────────────────────────────┘
//! ```

use log::{debug, info};

use crate::config::{ConfigError, SyncConfig};
use crate::error::{Error, RegistryError, ResponseCode};
use crate::registry::FieldSet;

use super::commands::{CommandDispatcher, CommandHandler, CommandRequest, CommandResponse};
use super::params::{BatchOutcome, ParamUpdate, ParameterDescriptor, ParameterSynchronizer};
use super::ports::{ChunkSource, Uplink};
use super::publisher::{DataHandle, DataStream, PublishVia, Publisher, StatusHandle};
use super::transfer::{DIGEST_LEN, ResourceDescriptor, ResourceTransferManager};

// ───────────────────────────────────────────────────────────────
// Events
// ───────────────────────────────────────────────────────────────

/// Phase of an inbound resource event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourcePhase<'a> {
    /// The platform proposes an update.
    Start {
        size: usize,
        old_version: &'a str,
        new_version: &'a str,
        digest: Option<[u8; DIGEST_LEN]>,
    },
    /// A chunk is waiting in the transport buffer.
    Data { offset: usize },
    /// The platform finished sending.
    Complete { success: bool, new_version: &'a str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceEvent<'a> {
    pub uref: u16,
    pub phase: ResourcePhase<'a>,
}

// ───────────────────────────────────────────────────────────────
// DeviceTwin
// ───────────────────────────────────────────────────────────────

pub struct DeviceTwin {
    config: SyncConfig,
    params: ParameterSynchronizer,
    commands: CommandDispatcher,
    resources: ResourceTransferManager,
    publisher: Publisher,
}

impl DeviceTwin {
    /// Build the service. The configuration is validated first so a zero
    /// chunk budget or batch limit never reaches the components.
    pub fn new(config: SyncConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            "TWIN: init (chunk={} args={} params={} data_sets={})",
            config.chunk_budget,
            config.max_command_args,
            config.max_params_per_update,
            config.max_data_sets
        );
        Ok(Self {
            params: ParameterSynchronizer::new(&config),
            commands: CommandDispatcher::new(&config),
            resources: ResourceTransferManager::new(&config),
            publisher: Publisher::new(&config),
            config,
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    // ── Registration ──────────────────────────────────────────

    pub fn register_parameter(&mut self, desc: ParameterDescriptor) -> Result<(), RegistryError> {
        self.params.register(desc)
    }

    pub fn register_command(
        &mut self,
        uref: u16,
        name: &'static str,
        handler: impl CommandHandler + 'static,
    ) -> Result<(), RegistryError> {
        self.commands.register(uref, name, handler)
    }

    pub fn register_resource(&mut self, desc: ResourceDescriptor) -> Result<(), RegistryError> {
        self.resources.register(desc)
    }

    pub fn attach_status(&mut self, set: FieldSet) -> Result<StatusHandle, RegistryError> {
        self.publisher.attach_status(set)
    }

    pub fn attach_data(&mut self, stream: DataStream) -> Result<DataHandle, RegistryError> {
        self.publisher.attach_data(stream)
    }

    // ── Component access ──────────────────────────────────────

    pub fn params(&self) -> &ParameterSynchronizer {
        &self.params
    }

    pub fn commands(&self) -> &CommandDispatcher {
        &self.commands
    }

    pub fn resources(&self) -> &ResourceTransferManager {
        &self.resources
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    // ── Transport callbacks ───────────────────────────────────

    pub fn on_resource_event(
        &self,
        event: ResourceEvent<'_>,
        source: &mut impl ChunkSource,
        uplink: &mut impl Uplink,
    ) -> ResponseCode {
        let uref = event.uref;
        let result = match event.phase {
            ResourcePhase::Start {
                size,
                old_version,
                new_version,
                digest,
            } => {
                info!(
                    "RSC: uref={} update v{} -> v{} ({} bytes)",
                    uref, old_version, new_version, size
                );
                let begun = match digest {
                    Some(d) => self.resources.begin_transfer_with_digest(uref, size, d),
                    None => self.resources.begin_transfer(uref, size),
                };
                begun.map(|()| ResponseCode::Ok)
            }
            ResourcePhase::Data { offset } => self
                .resources
                .accept_chunk(uref, offset, source)
                .map(|_| ResponseCode::Ok),
            ResourcePhase::Complete {
                success,
                new_version,
            } => {
                let mut publish = PublishVia {
                    publisher: &self.publisher,
                    uplink,
                };
                self.resources
                    .complete_transfer(uref, success, new_version, &mut publish)
                    .map(|c| c.response_code())
            }
        };
        respond(result.map_err(Error::from))
    }

    pub fn on_command_event(&self, request: &CommandRequest) -> ResponseCode {
        respond(
            self.commands
                .dispatch(request)
                .map(ResponseCode::from)
                .map_err(Error::from),
        )
    }

    pub fn on_parameter_event(&self, uref: u16, raw: &[u8]) -> ResponseCode {
        respond(
            self.params
                .apply_update(uref, raw)
                .map(|()| ResponseCode::Ok)
                .map_err(Error::from),
        )
    }

    pub fn on_parameter_batch(&self, updates: &[ParamUpdate<'_>]) -> BatchOutcome {
        self.params.apply_batch(updates)
    }

    // ── Periodic context ──────────────────────────────────────

    /// Advance deferred commands. Returns the number of responses queued.
    pub fn tick(&self) -> usize {
        self.commands.tick()
    }

    /// Deferred command response ready for the transport.
    pub fn next_response(&self) -> Option<CommandResponse> {
        self.commands.next_response()
    }

    pub fn publish_status(&self, uplink: &mut impl Uplink) {
        self.publisher.publish_all_status(uplink);
    }

    pub fn publish_data(&self, handle: DataHandle, uplink: &mut impl Uplink) -> bool {
        self.publisher.publish_data(handle, uplink)
    }
}

fn respond(result: Result<ResponseCode, Error>) -> ResponseCode {
    match result {
        Ok(code) => code,
        Err(e) => {
            debug!("TWIN: {} ({:?})", e, e.category());
            e.response_code()
        }
    }
}

impl core::fmt::Debug for DeviceTwin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DeviceTwin")
            .field("params", &self.params.len())
            .field("commands", &self.commands.len())
            .field("resources", &self.resources)
            .finish()
    }
}
