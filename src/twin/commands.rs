//! Command dispatcher.
//!
//! Routes inbound commands to handlers keyed by uref and tracks deferred
//! completion. A handler that answers `Pending` has its request's
//! correlation id stored on the descriptor; the periodic [`tick`] polls it
//! and queues a [`CommandResponse`] once it resolves.
//!
//! ```text
//!  transport ──dispatch──▶ ┌──────────────┐ ──handle──▶ CommandHandler
//!                          │  Dispatcher  │
//!  periodic  ───tick─────▶ └──────┬───────┘ ──poll────▶ CommandHandler
//!                                 │ CommandResponse
//!  transport ◀─next_response──────┘ (bounded channel)
//! ```
//!
//! [`tick`]: CommandDispatcher::tick

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{debug, info, warn};

use crate::config::{MAX_COMMAND_ARGS, PENDING_RESPONSE_DEPTH, SyncConfig};
use crate::error::{CommandError, RegistryError, ResponseCode};
use crate::registry::{Guarded, guarded};

// ───────────────────────────────────────────────────────────────
// Requests
// ───────────────────────────────────────────────────────────────

/// Type tag of a command argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Number,
    Text,
    Bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Number(i64),
    Text(String),
    Bool(bool),
}

impl ArgValue {
    pub fn kind(&self) -> ArgKind {
        match self {
            Self::Number(_) => ArgKind::Number,
            Self::Text(_) => ArgKind::Text,
            Self::Bool(_) => ArgKind::Bool,
        }
    }

    /// Integer view: numbers as-is, text parsed after trimming.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Bool(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandArg {
    pub name: String,
    pub value: ArgValue,
}

/// One inbound command. Lives for a single dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandRequest {
    /// Target descriptor; 0 when the platform sent none.
    pub uref: u16,
    /// Platform-assigned correlation id, must be non-zero.
    pub correlation_id: u32,
    args: heapless::Vec<CommandArg, MAX_COMMAND_ARGS>,
}

impl CommandRequest {
    pub fn new(uref: u16, correlation_id: u32) -> Self {
        Self {
            uref,
            correlation_id,
            args: heapless::Vec::new(),
        }
    }

    /// Append an argument; fails once the request block is full.
    pub fn push_arg(&mut self, name: &str, value: ArgValue) -> Result<(), CommandError> {
        self.args
            .push(CommandArg {
                name: name.to_owned(),
                value,
            })
            .map_err(|_| CommandError::TooManyArguments)
    }

    /// Builder form of [`push_arg`](Self::push_arg).
    pub fn with_arg(mut self, name: &str, value: ArgValue) -> Result<Self, CommandError> {
        self.push_arg(name, value)?;
        Ok(self)
    }

    pub fn args(&self) -> &[CommandArg] {
        &self.args
    }

    /// First argument whose name matches, ignoring ASCII case.
    pub fn arg(&self, name: &str) -> Option<&ArgValue> {
        self.args
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| &a.value)
    }

    pub fn int_arg(&self, name: &str) -> Option<i64> {
        self.arg(name).and_then(ArgValue::as_int)
    }
}

// ───────────────────────────────────────────────────────────────
// Handlers
// ───────────────────────────────────────────────────────────────

/// What a handler decided for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    Ok,
    Pending,
    Error,
}

/// Final state of a deferred command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Ok,
    Error,
}

impl From<Resolution> for ResponseCode {
    fn from(r: Resolution) -> Self {
        match r {
            Resolution::Ok => ResponseCode::Ok,
            Resolution::Error => ResponseCode::CommandFailed,
        }
    }
}

pub trait CommandHandler: Send {
    fn handle(&mut self, request: &CommandRequest) -> HandlerOutcome;

    /// Advance deferred work by one tick. Only called while the command
    /// has a pending correlation id.
    fn poll_deferred(&mut self) -> Option<Resolution> {
        None
    }
}

/// Result of a successful dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    Ok,
    Pending(u32),
}

impl From<Dispatched> for ResponseCode {
    fn from(d: Dispatched) -> Self {
        match d {
            Dispatched::Ok => ResponseCode::Ok,
            Dispatched::Pending(_) => ResponseCode::Pending,
        }
    }
}

/// Late response for a previously pending command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandResponse {
    pub uref: u16,
    pub correlation_id: u32,
    pub code: ResponseCode,
}

// ───────────────────────────────────────────────────────────────
// Descriptors
// ───────────────────────────────────────────────────────────────

/// Registered command, as seen from outside the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub uref: u16,
    pub name: &'static str,
    /// 0 when no response is outstanding.
    pub correlation_id: u32,
}

struct SlotState {
    correlation_id: u32,
    handler: Box<dyn CommandHandler>,
}

struct CommandSlot {
    uref: u16,
    name: &'static str,
    state: Guarded<SlotState>,
}

// ───────────────────────────────────────────────────────────────
// Dispatcher
// ───────────────────────────────────────────────────────────────

pub struct CommandDispatcher {
    slots: Vec<CommandSlot>,
    max_args: usize,
    responses: Channel<CriticalSectionRawMutex, CommandResponse, PENDING_RESPONSE_DEPTH>,
}

impl CommandDispatcher {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            slots: Vec::new(),
            max_args: config.max_command_args.min(MAX_COMMAND_ARGS),
            responses: Channel::new(),
        }
    }

    /// Register a handler under a non-zero, unique uref.
    pub fn register(
        &mut self,
        uref: u16,
        name: &'static str,
        handler: impl CommandHandler + 'static,
    ) -> Result<(), RegistryError> {
        if uref == 0 {
            return Err(RegistryError::ZeroUref);
        }
        if self.slot(uref).is_some() {
            return Err(RegistryError::DuplicateUref(uref));
        }
        self.slots.push(CommandSlot {
            uref,
            name,
            state: guarded(SlotState {
                correlation_id: 0,
                handler: Box::new(handler),
            }),
        });
        info!("CMD: registered uref={} '{}'", uref, name);
        Ok(())
    }

    fn slot(&self, uref: u16) -> Option<&CommandSlot> {
        self.slots.iter().find(|s| s.uref == uref)
    }

    pub fn descriptor(&self, uref: u16) -> Option<CommandDescriptor> {
        self.slot(uref).map(|s| CommandDescriptor {
            uref: s.uref,
            name: s.name,
            correlation_id: s.state.lock(|st| st.borrow().correlation_id),
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Route one request to its handler.
    pub fn dispatch(&self, request: &CommandRequest) -> Result<Dispatched, CommandError> {
        if request.uref == 0 || request.correlation_id == 0 {
            warn!(
                "CMD: malformed request uref={} cid={}",
                request.uref, request.correlation_id
            );
            return Err(CommandError::MalformedRequest);
        }
        if request.args().len() > self.max_args {
            warn!(
                "CMD: uref={} carries {} args (max {})",
                request.uref,
                request.args().len(),
                self.max_args
            );
            return Err(CommandError::TooManyArguments);
        }
        let Some(slot) = self.slot(request.uref) else {
            warn!("CMD: unknown command uref={}", request.uref);
            return Err(CommandError::UnknownCommand);
        };

        info!(
            "CMD: '{}' uref={} cid={} args={}",
            slot.name,
            slot.uref,
            request.correlation_id,
            request.args().len()
        );

        slot.state.lock(|st| {
            let mut st = st.borrow_mut();
            let outcome = st.handler.handle(request);
            let superseded = core::mem::take(&mut st.correlation_id);
            if superseded != 0 {
                warn!(
                    "CMD: '{}' cid={} supersedes pending cid={}",
                    slot.name, request.correlation_id, superseded
                );
                self.queue(
                    slot,
                    CommandResponse {
                        uref: slot.uref,
                        correlation_id: superseded,
                        code: ResponseCode::CommandFailed,
                    },
                );
            }
            match outcome {
                HandlerOutcome::Ok => Ok(Dispatched::Ok),
                HandlerOutcome::Error => {
                    warn!("CMD: '{}' cid={} failed", slot.name, request.correlation_id);
                    Err(CommandError::HandlerFailed)
                }
                HandlerOutcome::Pending => {
                    st.correlation_id = request.correlation_id;
                    info!("CMD: '{}' cid={} pending", slot.name, request.correlation_id);
                    Ok(Dispatched::Pending(request.correlation_id))
                }
            }
        })
    }

    /// Queue a late response. Returns false, with a warning, when the
    /// queue has no room.
    fn queue(&self, slot: &CommandSlot, response: CommandResponse) -> bool {
        match self.responses.try_send(response) {
            Ok(()) => {
                info!(
                    "CMD: '{}' cid={} resolved {:?}",
                    slot.name, response.correlation_id, response.code
                );
                true
            }
            Err(_) => {
                warn!(
                    "CMD: '{}' response queue full, cid={} {:?} lost",
                    slot.name, response.correlation_id, response.code
                );
                false
            }
        }
    }

    /// Poll every pending handler once. Returns the number of responses
    /// queued.
    ///
    /// While the response queue is full no handler is advanced, so a
    /// resolution is never produced without a place to put it.
    pub fn tick(&self) -> usize {
        let mut queued = 0;
        for slot in &self.slots {
            // Checked, polled, queued and cleared in one critical section.
            let sent = slot.state.lock(|st| {
                let mut st = st.borrow_mut();
                if st.correlation_id == 0 {
                    return Some(false);
                }
                if self.responses.is_full() {
                    return None;
                }
                let Some(resolution) = st.handler.poll_deferred() else {
                    return Some(false);
                };
                let response = CommandResponse {
                    uref: slot.uref,
                    correlation_id: st.correlation_id,
                    code: resolution.into(),
                };
                let sent = self.queue(slot, response);
                if sent {
                    st.correlation_id = 0;
                }
                Some(sent)
            });
            match sent {
                Some(true) => queued += 1,
                Some(false) => {}
                None => {
                    debug!("CMD: response queue full, deferring poll");
                    break;
                }
            }
        }
        queued
    }

    /// Next deferred response for the transport, if any.
    pub fn next_response(&self) -> Option<CommandResponse> {
        self.responses.try_receive().ok()
    }
}

impl core::fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("commands", &self.slots.len())
            .field("max_args", &self.max_args)
            .field("queued", &self.responses.len())
            .finish()
    }
}
