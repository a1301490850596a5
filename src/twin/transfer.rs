//! Resource transfer manager.
//!
//! Receives named resources (firmware images, text blobs) in chunks pulled
//! from the transport, into fixed-capacity sinks the application owns.
//!
//! Flow: `begin_transfer` → N × `accept_chunk` → `complete_transfer`
//!
//! ```text
//!          begin (Accept)            complete
//!  Idle ──────────────────▶ Transferring ──────▶ Idle
//!   ▲                         │    ▲
//!   └──── abort / reject ─────┘    └── accept_chunk
//! ```
//!
//! The device has one transfer buffer, so at most one session exists at a
//! time. Every offset and size coming from the platform is checked against
//! both the declared size and the sink capacity before a byte is written;
//! a violation discards the session.

use core::fmt;

use log::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::{RegistryError, ResponseCode, TransferError};
use crate::registry::{FixedBuf, Guarded, Shared, guarded};

use super::ports::{ChunkSource, StatusPublish};

/// SHA-256 digest length.
pub const DIGEST_LEN: usize = 32;

// ── Descriptors ───────────────────────────────────────────────

/// Where a resource's bytes land.
///
/// A text sink is NUL-terminated after every chunk, so the application
/// can read it as a string at any time. A sink shared with a status
/// field updates that field as chunks arrive.
#[derive(Debug, Clone)]
pub enum ResourceSink {
    Text(Shared<FixedBuf>),
    Binary(Shared<FixedBuf>),
}

impl ResourceSink {
    pub fn buffer(&self) -> &Shared<FixedBuf> {
        match self {
            Self::Text(b) | Self::Binary(b) => b,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    pub fn capacity(&self) -> usize {
        self.buffer().with(FixedBuf::capacity)
    }
}

#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    uref: u16,
    name: &'static str,
    version: Shared<FixedBuf>,
    sink: ResourceSink,
}

impl ResourceDescriptor {
    pub fn new(
        uref: u16,
        name: &'static str,
        version: &Shared<FixedBuf>,
        sink: ResourceSink,
    ) -> Self {
        Self {
            uref,
            name,
            version: version.clone(),
            sink,
        }
    }

    pub fn uref(&self) -> u16 {
        self.uref
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Current committed version string.
    pub fn version(&self) -> String {
        self.version.with(|v| v.text().into_owned())
    }

    pub fn sink(&self) -> &ResourceSink {
        &self.sink
    }
}

// ── Session ───────────────────────────────────────────────────

/// Snapshot of the active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferSession {
    pub uref: u16,
    pub declared_size: usize,
    /// Highest byte offset written so far.
    pub cumulative_offset: usize,
    expected_digest: Option<[u8; DIGEST_LEN]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Idle,
    Transferring(TransferSession),
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Version committed, status re-published.
    Committed,
    /// Platform reported failure; version untouched.
    RolledBack,
    /// Received bytes did not match the announced digest; version untouched.
    DigestMismatch,
}

impl Completion {
    pub fn response_code(self) -> ResponseCode {
        match self {
            Self::Committed | Self::RolledBack => ResponseCode::Ok,
            Self::DigestMismatch => ResponseCode::DigestMismatch,
        }
    }
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Committed => write!(f, "committed"),
            Self::RolledBack => write!(f, "rolled back"),
            Self::DigestMismatch => write!(f, "digest mismatch"),
        }
    }
}

struct TransferSlot {
    active: Option<TransferSession>,
    scratch: Box<[u8]>,
}

// ── Manager ───────────────────────────────────────────────────

pub struct ResourceTransferManager {
    resources: Vec<ResourceDescriptor>,
    slot: Guarded<TransferSlot>,
}

impl ResourceTransferManager {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            resources: Vec::new(),
            slot: guarded(TransferSlot {
                active: None,
                scratch: vec![0u8; config.chunk_budget].into_boxed_slice(),
            }),
        }
    }

    /// Register a resource under a non-zero, unique uref.
    pub fn register(&mut self, desc: ResourceDescriptor) -> Result<(), RegistryError> {
        if desc.uref == 0 {
            return Err(RegistryError::ZeroUref);
        }
        if self.resource(desc.uref).is_some() {
            return Err(RegistryError::DuplicateUref(desc.uref));
        }
        info!(
            "RSC: registered uref={} '{}' v{} cap={}",
            desc.uref,
            desc.name,
            desc.version(),
            desc.sink.capacity()
        );
        self.resources.push(desc);
        Ok(())
    }

    pub fn resource(&self, uref: u16) -> Option<&ResourceDescriptor> {
        self.resources.iter().find(|r| r.uref == uref)
    }

    pub fn resources(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.resources.iter()
    }

    pub fn state(&self) -> TransferState {
        self.slot.lock(|s| match s.borrow().active {
            Some(session) => TransferState::Transferring(session),
            None => TransferState::Idle,
        })
    }

    pub fn is_idle(&self) -> bool {
        self.state() == TransferState::Idle
    }

    /// Open a session for `uref`.
    ///
    /// `declared_size` must leave room for a terminator in the sink.
    pub fn begin_transfer(&self, uref: u16, declared_size: usize) -> Result<(), TransferError> {
        self.open(uref, declared_size, None)
    }

    /// Like [`begin_transfer`](Self::begin_transfer), and verify the
    /// received bytes against `digest` before committing.
    pub fn begin_transfer_with_digest(
        &self,
        uref: u16,
        declared_size: usize,
        digest: [u8; DIGEST_LEN],
    ) -> Result<(), TransferError> {
        self.open(uref, declared_size, Some(digest))
    }

    fn open(
        &self,
        uref: u16,
        declared_size: usize,
        expected_digest: Option<[u8; DIGEST_LEN]>,
    ) -> Result<(), TransferError> {
        let Some(rsc) = self.resource(uref) else {
            warn!("RSC: begin for unknown uref={}", uref);
            return Err(TransferError::UnknownResource);
        };
        self.slot.lock(|s| {
            let mut s = s.borrow_mut();
            if let Some(active) = s.active {
                warn!(
                    "RSC: begin uref={} rejected, uref={} in progress",
                    uref, active.uref
                );
                return Err(TransferError::TransferInProgress);
            }
            let capacity = rsc.sink.capacity();
            if declared_size >= capacity {
                warn!(
                    "RSC: '{}' size {} does not fit capacity {}",
                    rsc.name, declared_size, capacity
                );
                return Err(TransferError::SizeTooLarge);
            }
            s.active = Some(TransferSession {
                uref,
                declared_size,
                cumulative_offset: 0,
                expected_digest,
            });
            info!(
                "RSC: '{}' begin ({} bytes{})",
                rsc.name,
                declared_size,
                if expected_digest.is_some() { ", digest" } else { "" }
            );
            Ok(())
        })
    }

    /// Pull the next chunk for `uref` into its sink at `offset`.
    ///
    /// Returns the number of bytes written, 0 when the source had nothing.
    /// Out-of-bounds writes and pull failures discard the session.
    pub fn accept_chunk(
        &self,
        uref: u16,
        offset: usize,
        source: &mut impl ChunkSource,
    ) -> Result<usize, TransferError> {
        self.slot.lock(|s| {
            let mut s = s.borrow_mut();
            let TransferSlot { active, scratch } = &mut *s;

            let Some(session) = active.as_mut() else {
                warn!("RSC: chunk for uref={} with no active transfer", uref);
                return Err(TransferError::NoActiveTransfer);
            };
            if session.uref != uref {
                warn!(
                    "RSC: chunk for uref={} while uref={} in progress",
                    uref, session.uref
                );
                return Err(TransferError::TransferInProgress);
            }
            let Some(rsc) = self.resource(uref) else {
                *active = None;
                return Err(TransferError::UnknownResource);
            };

            let Some(room) = session.declared_size.checked_sub(offset) else {
                warn!(
                    "RSC: '{}' offset {} beyond size {}, abort",
                    rsc.name, offset, session.declared_size
                );
                *active = None;
                return Err(TransferError::OutOfBounds);
            };
            let want = room.min(scratch.len());
            if want == 0 {
                debug!("RSC: '{}' nothing left to pull at {}", rsc.name, offset);
                return Ok(0);
            }

            let n = match source.pull_chunk(&mut scratch[..want]) {
                Ok(n) => n,
                Err(e) => {
                    warn!("RSC: '{}' {} at offset {}, abort", rsc.name, e, offset);
                    *active = None;
                    return Err(TransferError::ChunkReadFailed);
                }
            };
            if n == 0 {
                debug!("RSC: '{}' no data at offset {}", rsc.name, offset);
                return Ok(0);
            }

            // n is bounded by want, so offset + n <= declared_size; the
            // checks below hold even for a source that over-reports.
            let end = offset.saturating_add(n);
            // Text ends at the high-water mark so a resent chunk never cuts
            // off bytes already received past it.
            let high = session.cumulative_offset.max(end);
            let text = rsc.sink.is_text();
            let written = rsc.sink.buffer().with_mut(|buf| {
                if n > want || end > session.declared_size || high > buf.max_text_len() {
                    return false;
                }
                if buf.write_at(offset, &scratch[..n]).is_err() {
                    return false;
                }
                !text || buf.terminate_at(high).is_ok()
            });
            if !written {
                warn!(
                    "RSC: '{}' chunk {}+{} out of bounds, abort",
                    rsc.name, offset, n
                );
                *active = None;
                return Err(TransferError::OutOfBounds);
            }

            session.cumulative_offset = high;
            debug!(
                "RSC: '{}' chunk {}+{} ({}/{})",
                rsc.name, offset, n, session.cumulative_offset, session.declared_size
            );
            Ok(n)
        })
    }

    /// Close the session for `uref`.
    ///
    /// On success the version buffer takes `new_version` (truncated to
    /// fit) and `publish` re-sends status. On failure, or when an announced
    /// digest does not match, the version is left untouched.
    pub fn complete_transfer(
        &self,
        uref: u16,
        success: bool,
        new_version: &str,
        publish: &mut impl StatusPublish,
    ) -> Result<Completion, TransferError> {
        let session = self.slot.lock(|s| {
            let mut s = s.borrow_mut();
            let current = s.active;
            match current {
                None => {
                    warn!("RSC: complete for uref={} with no active transfer", uref);
                    Err(TransferError::NoActiveTransfer)
                }
                Some(active) if active.uref != uref => {
                    warn!(
                        "RSC: complete for uref={} while uref={} in progress",
                        uref, active.uref
                    );
                    Err(TransferError::TransferInProgress)
                }
                Some(active) => {
                    s.active = None;
                    Ok(active)
                }
            }
        })?;
        let Some(rsc) = self.resource(uref) else {
            return Err(TransferError::UnknownResource);
        };

        if !success {
            warn!("RSC: '{}' failed, keeping v{}", rsc.name, rsc.version());
            return Ok(Completion::RolledBack);
        }
        if let Some(expected) = session.expected_digest {
            let actual = rsc
                .sink
                .buffer()
                .with(|b| hmac_sha256::Hash::hash(&b.as_bytes()[..session.declared_size]));
            if actual != expected {
                warn!("RSC: '{}' digest mismatch, keeping v{}", rsc.name, rsc.version());
                return Ok(Completion::DigestMismatch);
            }
        }
        if session.cumulative_offset < session.declared_size {
            warn!(
                "RSC: '{}' committed with {}/{} bytes",
                rsc.name, session.cumulative_offset, session.declared_size
            );
        }

        let old = rsc.version();
        rsc.version.with_mut(|v| v.set_str(new_version));
        info!("RSC: '{}' committed v{} -> v{}", rsc.name, old, rsc.version());
        publish.publish_status();
        Ok(Completion::Committed)
    }

    /// Discard the active session, if any.
    pub fn abort(&self) {
        let dropped = self.slot.lock(|s| s.borrow_mut().active.take());
        if let Some(session) = dropped {
            warn!("RSC: uref={} aborted", session.uref);
        }
    }
}

impl fmt::Debug for ResourceTransferManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceTransferManager")
            .field("resources", &self.resources.len())
            .field("state", &self.state())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────
