//! In-memory chunk source.
//!
//! Plays the role of the transport's receive buffer: bytes are queued with
//! [`feed`](SliceChunkSource::feed) and drained by the transfer manager.

use std::collections::VecDeque;

use crate::twin::ports::{ChunkSource, PullError};

#[derive(Debug, Default, Clone)]
pub struct SliceChunkSource {
    pending: VecDeque<u8>,
    fail_next: bool,
}

impl SliceChunkSource {
    pub fn new(data: &[u8]) -> Self {
        let mut s = Self::default();
        s.feed(data);
        s
    }

    /// Queue more bytes behind whatever is still pending.
    pub fn feed(&mut self, data: &[u8]) {
        self.pending.extend(data);
    }

    /// Make the next pull report a transport error.
    pub fn fail_next(&mut self) {
        self.fail_next = true;
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl ChunkSource for SliceChunkSource {
    fn pull_chunk(&mut self, into: &mut [u8]) -> Result<usize, PullError> {
        if core::mem::take(&mut self.fail_next) {
            return Err(PullError);
        }
        let n = into.len().min(self.pending.len());
        for (slot, byte) in into.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}
