//! Fixed-capacity byte buffer with C-string semantics.
//!
//! Capacity is chosen by the application at construction and never
//! changes. Text content runs up to the first NUL, so a buffer of
//! capacity `n` holds at most `n - 1` text bytes plus the terminator.

use std::borrow::Cow;

/// Fixed-capacity, zero-initialised byte buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct FixedBuf {
    bytes: Box<[u8]>,
}

impl FixedBuf {
    /// Allocate a zeroed buffer of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0u8; capacity].into_boxed_slice(),
        }
    }

    /// Allocate a buffer and seed it with `text` (truncated to fit).
    pub fn with_text(capacity: usize, text: &str) -> Self {
        let mut buf = Self::new(capacity);
        buf.set_str(text);
        buf
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Largest text length the buffer can hold next to its terminator.
    pub fn max_text_len(&self) -> usize {
        self.capacity().saturating_sub(1)
    }

    /// The whole backing store, including bytes past the terminator.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length of the text up to the first NUL.
    pub fn text_len(&self) -> usize {
        self.bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.bytes.len())
    }

    /// Text content up to the first NUL.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes[..self.text_len()])
    }

    /// Replace the text with `data`, truncated to `max_text_len()`, and
    /// terminate it. Returns the number of bytes stored.
    pub fn set_text(&mut self, data: &[u8]) -> usize {
        if self.bytes.is_empty() {
            return 0;
        }
        let n = data.len().min(self.max_text_len());
        self.bytes[..n].copy_from_slice(&data[..n]);
        self.bytes[n] = 0;
        n
    }

    /// Like [`set_text`](Self::set_text) but never splits a UTF-8 sequence.
    pub fn set_str(&mut self, text: &str) -> usize {
        let mut n = text.len().min(self.max_text_len());
        while !text.is_char_boundary(n) {
            n -= 1;
        }
        self.set_text(&text.as_bytes()[..n])
    }

    /// Copy `data` to `offset`. Fails without writing if any byte would
    /// land outside the buffer.
    pub fn write_at(&mut self, offset: usize, data: &[u8]) -> Result<(), BufferOverflow> {
        let end = offset.checked_add(data.len()).ok_or(BufferOverflow)?;
        if end > self.bytes.len() {
            return Err(BufferOverflow);
        }
        self.bytes[offset..end].copy_from_slice(data);
        Ok(())
    }

    /// Write a NUL at `index`.
    pub fn terminate_at(&mut self, index: usize) -> Result<(), BufferOverflow> {
        let slot = self.bytes.get_mut(index).ok_or(BufferOverflow)?;
        *slot = 0;
        Ok(())
    }
}

impl core::fmt::Debug for FixedBuf {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FixedBuf")
            .field("capacity", &self.capacity())
            .field("text", &self.text())
            .finish()
    }
}

/// A write would have crossed the end of a [`FixedBuf`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferOverflow;
