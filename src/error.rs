//! Unified error types for the device-twin core.
//!
//! A single `Error` enum that every subsystem converts into, so the
//! transport-facing service can map any rejection onto one response code.
//! All variants are `Copy` so they pass through the callback layer without
//! allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible core operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A resource transfer was rejected or aborted.
    Transfer(TransferError),
    /// A command could not be dispatched or its handler failed.
    Command(CommandError),
    /// A parameter update was rejected.
    Param(ParamError),
    /// A registration step failed (setup time only).
    Registry(RegistryError),
}

impl Error {
    /// Classify the error against the protocol-level taxonomy.
    pub const fn category(self) -> ErrorCategory {
        match self {
            Self::Transfer(e) => match e {
                TransferError::UnknownResource => ErrorCategory::UnknownReference,
                TransferError::TransferInProgress => ErrorCategory::TransferInProgress,
                TransferError::SizeTooLarge | TransferError::OutOfBounds => {
                    ErrorCategory::CapacityViolation
                }
                TransferError::NoActiveTransfer => ErrorCategory::MalformedRequest,
                TransferError::ChunkReadFailed => ErrorCategory::Transport,
            },
            Self::Command(e) => match e {
                CommandError::MalformedRequest | CommandError::TooManyArguments => {
                    ErrorCategory::MalformedRequest
                }
                CommandError::UnknownCommand => ErrorCategory::UnknownCommand,
                CommandError::HandlerFailed => ErrorCategory::ValidationFailure,
            },
            Self::Param(e) => match e {
                ParamError::UnknownParameter => ErrorCategory::UnknownReference,
                ParamError::OutOfRange | ParamError::Unchanged | ParamError::LengthInvalid => {
                    ErrorCategory::ValidationFailure
                }
                ParamError::BatchOverflow => ErrorCategory::MalformedRequest,
            },
            Self::Registry(_) => ErrorCategory::Setup,
        }
    }

    /// Wire-level response code the transport sends back to the platform.
    pub const fn response_code(self) -> ResponseCode {
        match self {
            Self::Transfer(e) => match e {
                TransferError::UnknownResource => ResponseCode::UnknownResource,
                TransferError::TransferInProgress => ResponseCode::TransferInProgress,
                TransferError::SizeTooLarge => ResponseCode::SizeTooLarge,
                TransferError::OutOfBounds => ResponseCode::OutOfBounds,
                TransferError::NoActiveTransfer => ResponseCode::NoActiveTransfer,
                TransferError::ChunkReadFailed => ResponseCode::ChunkReadFailed,
            },
            Self::Command(e) => match e {
                CommandError::MalformedRequest | CommandError::TooManyArguments => {
                    ResponseCode::MalformedRequest
                }
                CommandError::UnknownCommand => ResponseCode::UnknownCommand,
                CommandError::HandlerFailed => ResponseCode::CommandFailed,
            },
            Self::Param(e) => match e {
                ParamError::UnknownParameter => ResponseCode::UnknownParameter,
                ParamError::OutOfRange => ResponseCode::OutOfRange,
                ParamError::Unchanged => ResponseCode::Unchanged,
                ParamError::LengthInvalid => ResponseCode::LengthInvalid,
                ParamError::BatchOverflow => ResponseCode::MalformedRequest,
            },
            Self::Registry(_) => ResponseCode::MalformedRequest,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transfer(e) => write!(f, "transfer: {e}"),
            Self::Command(e) => write!(f, "command: {e}"),
            Self::Param(e) => write!(f, "param: {e}"),
            Self::Registry(e) => write!(f, "registry: {e}"),
        }
    }
}

impl core::error::Error for Error {}

/// Protocol-level error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A uref did not resolve to a registered resource or parameter.
    UnknownReference,
    /// A declared size or chunk write exceeds a fixed buffer.
    CapacityViolation,
    /// A parameter value is outside its domain or unchanged.
    ValidationFailure,
    /// Null, zero-id, or otherwise ill-formed inbound request.
    MalformedRequest,
    /// Command uref has no registered handler.
    UnknownCommand,
    /// A transfer session is already active.
    TransferInProgress,
    /// The transport's pull primitive failed.
    Transport,
    /// Registration-time misconfiguration.
    Setup,
}

// ---------------------------------------------------------------------------
// Resource transfer errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferError {
    /// uref does not resolve to a registered resource.
    UnknownResource,
    /// Another session holds the transfer buffer.
    TransferInProgress,
    /// Declared size does not fit the resource's sink.
    SizeTooLarge,
    /// A chunk would land beyond the declared size or sink capacity.
    OutOfBounds,
    /// Chunk or completion arrived with no session open.
    NoActiveTransfer,
    /// The transport's pull primitive reported an error.
    ChunkReadFailed,
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownResource => write!(f, "unknown resource"),
            Self::TransferInProgress => write!(f, "transfer already in progress"),
            Self::SizeTooLarge => write!(f, "declared size exceeds sink capacity"),
            Self::OutOfBounds => write!(f, "chunk out of bounds"),
            Self::NoActiveTransfer => write!(f, "no active transfer"),
            Self::ChunkReadFailed => write!(f, "chunk read failed"),
        }
    }
}

impl core::error::Error for TransferError {}

impl From<TransferError> for Error {
    fn from(e: TransferError) -> Self {
        Self::Transfer(e)
    }
}

// ---------------------------------------------------------------------------
// Command errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// Missing descriptor or zero correlation id.
    MalformedRequest,
    /// More arguments than the request block can hold.
    TooManyArguments,
    /// No handler registered for the descriptor's uref.
    UnknownCommand,
    /// The handler ran and reported failure.
    HandlerFailed,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedRequest => write!(f, "malformed request"),
            Self::TooManyArguments => write!(f, "too many arguments"),
            Self::UnknownCommand => write!(f, "unknown command"),
            Self::HandlerFailed => write!(f, "handler failed"),
        }
    }
}

impl core::error::Error for CommandError {}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Self::Command(e)
    }
}

// ---------------------------------------------------------------------------
// Parameter errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamError {
    UnknownParameter,
    /// Decoded value is outside the field's allowed range.
    OutOfRange,
    /// Decoded value equals the stored value.
    Unchanged,
    /// Raw length does not fit the field (string bound or scalar width).
    LengthInvalid,
    /// Batch carried more updates than a single request may.
    BatchOverflow,
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownParameter => write!(f, "unknown parameter"),
            Self::OutOfRange => write!(f, "value out of range"),
            Self::Unchanged => write!(f, "value unchanged"),
            Self::LengthInvalid => write!(f, "invalid length"),
            Self::BatchOverflow => write!(f, "too many updates in one request"),
        }
    }
}

impl core::error::Error for ParamError {}

impl From<ParamError> for Error {
    fn from(e: ParamError) -> Self {
        Self::Param(e)
    }
}

// ---------------------------------------------------------------------------
// Registration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// urefs must be positive.
    ZeroUref,
    /// uref already registered in this set.
    DuplicateUref(u16),
    /// The set reached its configured maximum.
    SetFull,
    /// A name or metadata string exceeds its bound.
    NameTooLong,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroUref => write!(f, "uref must be non-zero"),
            Self::DuplicateUref(u) => write!(f, "uref {u} already registered"),
            Self::SetFull => write!(f, "set is full"),
            Self::NameTooLong => write!(f, "name too long"),
        }
    }
}

impl core::error::Error for RegistryError {}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

// ---------------------------------------------------------------------------
// Wire response codes
// ---------------------------------------------------------------------------

/// Response codes handed back to the transport layer.
///
/// `Ok = 1`, `Pending = 0`, every rejection is a distinct negative value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ResponseCode {
    Ok = 1,
    Pending = 0,
    UnknownResource = -1,
    UnknownCommand = -2,
    UnknownParameter = -3,
    TransferInProgress = -4,
    SizeTooLarge = -5,
    OutOfBounds = -6,
    OutOfRange = -7,
    LengthInvalid = -8,
    Unchanged = -9,
    MalformedRequest = -10,
    CommandFailed = -11,
    NoActiveTransfer = -12,
    ChunkReadFailed = -13,
    DigestMismatch = -14,
}

impl ResponseCode {
    /// Raw integer as sent on the wire.
    pub const fn code(self) -> i32 {
        self as i32
    }

    pub const fn is_error(self) -> bool {
        (self as i32) < 0
    }
}

impl From<Error> for ResponseCode {
    fn from(e: Error) -> Self {
        e.response_code()
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
