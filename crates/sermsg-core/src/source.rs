//! Byte sources - the only thing the engine needs from a transport

use std::collections::VecDeque;

use bytes::{Buf, Bytes, BytesMut};
use tracing::debug;

/// Pull-style access to a transport's received bytes.
///
/// Implementations may wrap a hardware receive buffer, a socket-fed queue, or
/// a one-shot string cursor. The engine only calls `next_byte` after
/// `available` reported at least one byte.
pub trait ByteSource {
    /// Number of bytes ready to be consumed
    fn available(&self) -> usize;

    /// Consume the next byte, `None` if nothing is ready
    fn next_byte(&mut self) -> Option<u8>;
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn available(&self) -> usize {
        (**self).available()
    }

    fn next_byte(&mut self) -> Option<u8> {
        (**self).next_byte()
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn available(&self) -> usize {
        (**self).available()
    }

    fn next_byte(&mut self) -> Option<u8> {
        (**self).next_byte()
    }
}

impl ByteSource for VecDeque<u8> {
    fn available(&self) -> usize {
        self.len()
    }

    fn next_byte(&mut self) -> Option<u8> {
        self.pop_front()
    }
}

/// One-shot cursor over a complete string.
///
/// Bytes a poll does not consume stay readable until `replace` swaps in new
/// data.
#[derive(Debug, Clone, Default)]
pub struct StrSource {
    data: Bytes,
}

impl StrSource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Swap in a new string and rewind
    pub fn replace(&mut self, data: impl Into<Bytes>) {
        self.data = data.into();
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> &[u8] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl ByteSource for StrSource {
    fn available(&self) -> usize {
        self.data.len()
    }

    fn next_byte(&mut self) -> Option<u8> {
        if self.data.has_remaining() {
            Some(self.data.get_u8())
        } else {
            None
        }
    }
}

/// Default receive buffer capacity, sized like a typical UART RX ring
pub const DEFAULT_SOURCE_CAPACITY: usize = 256;

/// Bounded FIFO standing in for a hardware receive buffer.
///
/// Writers `push` raw bytes in; anything beyond the free capacity is dropped
/// and counted, the way a UART ring overflows when nobody polls it.
#[derive(Debug)]
pub struct BufferedSource {
    buffer: BytesMut,
    capacity: usize,
    dropped: u64,
}

impl BufferedSource {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SOURCE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    /// Append bytes, returning how many were accepted
    pub fn push(&mut self, data: &[u8]) -> usize {
        let accepted = data.len().min(self.free());
        self.buffer.extend_from_slice(&data[..accepted]);

        let overflow = data.len() - accepted;
        if overflow > 0 {
            self.dropped += overflow as u64;
            debug!(
                dropped = overflow,
                capacity = self.capacity,
                "Receive buffer full, dropping bytes"
            );
        }

        accepted
    }

    /// Free space left in the buffer
    pub fn free(&self) -> usize {
        self.capacity - self.buffer.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Total bytes refused because the buffer was full
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for BufferedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteSource for BufferedSource {
    fn available(&self) -> usize {
        self.buffer.len()
    }

    fn next_byte(&mut self) -> Option<u8> {
        if self.buffer.has_remaining() {
            Some(self.buffer.get_u8())
        } else {
            None
        }
    }
}
