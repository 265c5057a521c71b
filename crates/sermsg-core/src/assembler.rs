//! Frame assembler - marker recognition and bounded payload buffering

use crate::config::{EngineConfig, OverflowPolicy};
use crate::error::Result;
use tracing::{debug, trace, warn};

/// Engine state. Exactly one is active; there is never more than one frame
/// in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    /// Scanning for a start marker
    #[default]
    Idle,
    /// Between a start marker and its end marker
    Receiving,
    /// A frame is complete and waits to be parsed
    FrameReady,
    /// Parsed arguments wait for the consumer's acknowledgment
    ArgumentsReady,
}

/// Result of pushing one byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Byte outside a frame, discarded
    Ignored,
    /// Start marker, a new frame began
    Started,
    /// Payload byte stored (or folded into the last slot on overflow)
    Buffered,
    /// End marker, the frame is ready
    Completed,
    /// End marker of an overflowed frame dropped under `OverflowPolicy::Reject`
    Rejected { received: usize },
    /// Byte refused because a completed frame has not been parsed yet
    Held,
}

/// Byte-at-a-time framing state machine over a fixed buffer
#[derive(Debug)]
pub struct FrameAssembler {
    buffer: Box<[u8]>,
    cursor: usize,
    state: State,
    /// Length of the last completed payload
    frame_len: usize,
    /// Payload bytes seen for the current frame, including truncated ones
    received: usize,
    overflowed: bool,
    start: u8,
    end: u8,
    policy: OverflowPolicy,
}

impl FrameAssembler {
    /// Build an assembler, validating the configuration first
    pub fn new(config: &EngineConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            buffer: vec![0u8; config.buffer_size].into_boxed_slice(),
            cursor: 0,
            state: State::Idle,
            frame_len: 0,
            received: 0,
            overflowed: false,
            start: config.start_byte(),
            end: config.end_byte(),
            policy: config.overflow,
        })
    }

    /// Advance the state machine by one byte.
    ///
    /// While `FrameReady` the byte is not consumed and `Step::Held` is
    /// returned; the caller keeps it until `mark_parsed` or `reset`.
    pub fn push(&mut self, byte: u8) -> Step {
        match self.state {
            State::Receiving if byte == self.end => self.finish(),
            State::Receiving => {
                self.store(byte);
                Step::Buffered
            }
            State::Idle | State::ArgumentsReady if byte == self.start => {
                self.begin();
                Step::Started
            }
            State::Idle | State::ArgumentsReady => Step::Ignored,
            State::FrameReady => Step::Held,
        }
    }

    fn begin(&mut self) {
        self.state = State::Receiving;
        self.cursor = 0;
        self.received = 0;
        self.overflowed = false;
    }

    fn store(&mut self, byte: u8) {
        self.buffer[self.cursor] = byte;
        self.cursor += 1;
        self.received = self.received.saturating_add(1);

        // The last slot is reserved for the terminator; keep overwriting the
        // slot before it until the end marker shows up.
        let limit = self.buffer.len() - 1;
        if self.cursor >= limit {
            self.cursor = limit - 1;
            if !self.overflowed {
                debug!(capacity = self.buffer.len(), "Frame payload overflowed buffer");
            }
            self.overflowed = true;
        }
    }

    fn finish(&mut self) -> Step {
        if self.overflowed && self.policy == OverflowPolicy::Reject {
            warn!(
                received = self.received,
                capacity = self.buffer.len(),
                "Rejecting oversized frame"
            );
            let received = self.received;
            self.state = State::Idle;
            self.cursor = 0;
            return Step::Rejected { received };
        }

        self.buffer[self.cursor] = 0;
        self.frame_len = self.cursor;
        self.cursor = 0;
        self.state = State::FrameReady;
        trace!(len = self.frame_len, truncated = self.overflowed, "Frame completed");
        Step::Completed
    }

    /// Payload of the last completed frame, without the terminator.
    ///
    /// Valid until the next frame starts writing into the buffer.
    pub fn frame(&self) -> &[u8] {
        &self.buffer[..self.frame_len]
    }

    /// Whether the last completed frame lost bytes to overflow
    pub fn truncated(&self) -> bool {
        self.overflowed
    }

    /// Payload bytes received for the current or last frame
    pub fn received(&self) -> usize {
        self.received
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Record that the completed frame has been parsed
    pub fn mark_parsed(&mut self) {
        if self.state == State::FrameReady {
            self.state = State::ArgumentsReady;
        }
    }

    /// Consumer acknowledgment, back to scanning
    pub fn clear(&mut self) {
        if self.state == State::ArgumentsReady {
            self.state = State::Idle;
        }
    }

    /// Abandon any in-flight frame
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.cursor = 0;
        self.received = 0;
        self.overflowed = false;
    }
}
