//! Message engine - drives framing and parsing on each poll

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, trace};

use crate::args::ArgumentList;
use crate::assembler::{FrameAssembler, State, Step};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::source::{ByteSource, StrSource};

/// Description of a frame completed during a poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSummary {
    /// Stored payload length, terminator excluded
    pub payload_len: usize,
    /// Payload bytes were lost to buffer overflow
    pub truncated: bool,
    /// Tokens found in the payload
    pub tokens: usize,
    /// Tokens dropped because the argument list was full
    pub discarded: usize,
}

/// What a single `poll()` did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollOutcome {
    /// Bytes taken from the source
    pub consumed: usize,
    /// Oversized frames dropped under `OverflowPolicy::Reject`
    pub rejected: usize,
    /// Set when a frame completed and its arguments are ready
    pub frame: Option<FrameSummary>,
}

impl PollOutcome {
    pub fn is_ready(&self) -> bool {
        self.frame.is_some()
    }
}

/// Running counters over the engine's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub bytes: u64,
    pub frames: u64,
    pub truncated: u64,
    pub rejected: u64,
    pub discarded_args: u64,
}

/// Cooperative, non-blocking message parser bound to one byte source.
///
/// The frame buffer, payload snapshot and argument list are allocated once
/// and reused for every message.
pub struct MessageEngine<S> {
    source: S,
    config: EngineConfig,
    assembler: FrameAssembler,
    /// Copy of the last completed payload
    payload: Vec<u8>,
    args: ArgumentList,
    stats: EngineStats,
}

impl<S: ByteSource> MessageEngine<S> {
    pub fn new(source: S, config: EngineConfig) -> Result<Self> {
        let assembler = FrameAssembler::new(&config)?;

        Ok(Self {
            source,
            assembler,
            payload: Vec::with_capacity(config.buffer_size),
            args: ArgumentList::new(config.max_args),
            stats: EngineStats::default(),
            config,
        })
    }

    /// Consume available bytes until they run out or a frame completes.
    ///
    /// Never blocks. A completed frame is parsed immediately and the
    /// assembler goes back to scanning for the next start marker.
    pub fn poll(&mut self) -> PollOutcome {
        let mut outcome = PollOutcome::default();

        while self.assembler.state() != State::FrameReady && self.source.available() > 0 {
            let Some(byte) = self.source.next_byte() else {
                break;
            };
            outcome.consumed += 1;

            if let Step::Rejected { .. } = self.assembler.push(byte) {
                outcome.rejected += 1;
            }
        }

        self.stats.bytes += outcome.consumed as u64;
        self.stats.rejected += outcome.rejected as u64;

        if self.assembler.state() == State::FrameReady {
            outcome.frame = Some(self.parse_frame());
        }

        outcome
    }

    fn parse_frame(&mut self) -> FrameSummary {
        self.payload.clear();
        self.payload.extend_from_slice(self.assembler.frame());

        let parsed = self.args.parse_into(&self.payload);
        let truncated = self.assembler.truncated();
        self.assembler.mark_parsed();

        self.stats.frames += 1;
        if truncated {
            self.stats.truncated += 1;
        }
        if parsed.discarded > 0 {
            self.stats.discarded_args += parsed.discarded as u64;
            debug!(
                tokens = parsed.tokens,
                max_args = self.args.capacity(),
                "Discarding arguments beyond capacity"
            );
        }
        trace!(args = ?self.args.as_slice(), "Arguments ready");

        FrameSummary {
            payload_len: self.payload.len(),
            truncated,
            tokens: parsed.tokens,
            discarded: parsed.discarded,
        }
    }
}

impl<S> MessageEngine<S> {
    /// True while parsed arguments wait for `clear_new_data`
    pub fn has_new_data(&self) -> bool {
        self.assembler.state() == State::ArgumentsReady
    }

    /// Acknowledge the current arguments
    pub fn clear_new_data(&mut self) {
        self.assembler.clear();
    }

    /// Arguments of the last parsed frame; stale until the next one lands
    pub fn arguments(&self) -> &[i32] {
        self.args.as_slice()
    }

    pub fn argument_count(&self) -> usize {
        self.args.len()
    }

    pub fn max_arguments(&self) -> usize {
        self.args.capacity()
    }

    /// Payload of the last parsed frame
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn state(&self) -> State {
        self.assembler.state()
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Drop any partial frame and pending acknowledgment.
    ///
    /// The only way out of a frame whose end marker never arrives.
    pub fn reset(&mut self) {
        self.assembler.reset();
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }
}

impl MessageEngine<StrSource> {
    /// String-fed engine for the push entry point
    pub fn from_config(config: EngineConfig) -> Result<Self> {
        Self::new(StrSource::default(), config)
    }

    /// Hand over a complete string and parse it synchronously.
    ///
    /// Replaces whatever the previous submission left unread, then runs one
    /// poll. Bytes after a completed frame stay queued for later `poll()` calls.
    pub fn submit(&mut self, data: impl Into<Bytes>) -> PollOutcome {
        self.source.replace(data);
        self.poll()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OverflowPolicy;
    use crate::source::BufferedSource;

    fn engine(buffer_size: usize, max_args: usize) -> MessageEngine<BufferedSource> {
        MessageEngine::new(BufferedSource::new(), EngineConfig::new(buffer_size, max_args)).unwrap()
    }

    fn feed(engine: &mut MessageEngine<BufferedSource>, bytes: &[u8]) {
        assert_eq!(engine.source_mut().push(bytes), bytes.len());
    }

    #[test]
    fn test_round_trip() {
        let mut engine = engine(64, 8);
        feed(&mut engine, b"!1,2,3;");

        let outcome = engine.poll();
        assert!(outcome.is_ready());
        assert!(engine.has_new_data());
        assert_eq!(engine.arguments(), &[1, 2, 3]);
        assert_eq!(engine.argument_count(), 3);
        assert_eq!(engine.max_arguments(), 8);
        assert_eq!(engine.payload(), b"1,2,3");
    }

    #[test]
    fn test_preamble_has_no_effect() {
        let mut plain = engine(64, 8);
        feed(&mut plain, b"!4;");
        plain.poll();

        let mut noisy = engine(64, 8);
        feed(&mut noisy, b"garbage!4;");
        noisy.poll();

        assert_eq!(noisy.arguments(), plain.arguments());
        assert_eq!(noisy.state(), plain.state());
        assert_eq!(noisy.arguments(), &[4]);
    }

    #[test]
    fn test_sequential_frames() {
        let mut engine = engine(64, 8);
        feed(&mut engine, b"!1;!2;");

        let first = engine.poll();
        assert_eq!(first.consumed, 3);
        assert_eq!(engine.arguments(), &[1]);
        engine.clear_new_data();
        assert!(!engine.has_new_data());

        engine.poll();
        assert!(engine.has_new_data());
        assert_eq!(engine.arguments(), &[2]);
    }

    #[test]
    fn test_unacknowledged_frame_is_overwritten() {
        let mut engine = engine(64, 8);
        feed(&mut engine, b"!1;!2;");
        engine.poll();
        engine.poll();
        assert_eq!(engine.arguments(), &[2]);
        assert!(engine.has_new_data());
    }

    #[test]
    fn test_truncation_bound() {
        let n = 8;
        let mut engine = engine(n, 8);
        feed(&mut engine, b"!123456789012345;");

        let frame = engine.poll().frame.unwrap();
        assert!(frame.truncated);
        assert_eq!(frame.payload_len, n - 2);
        assert_eq!(engine.payload(), b"123456");
        assert_eq!(engine.arguments(), &[123456]);
        assert_eq!(engine.stats().truncated, 1);
    }

    #[test]
    fn test_payload_one_short_of_capacity_is_truncated() {
        let n = 8;
        let mut engine = engine(n, 8);
        feed(&mut engine, b"!1234567;");

        let frame = engine.poll().frame.unwrap();
        assert!(frame.truncated);
        assert_eq!(frame.payload_len, n - 2);
        assert_eq!(engine.payload(), b"123456");

        engine.clear_new_data();
        feed(&mut engine, b"!123456;");
        let frame = engine.poll().frame.unwrap();
        assert!(!frame.truncated);
        assert_eq!(frame.payload_len, n - 2);
    }

    #[test]
    fn test_reject_policy_reports_and_recovers() {
        let config = EngineConfig::new(6, 4).with_overflow(OverflowPolicy::Reject);
        let mut engine = MessageEngine::new(BufferedSource::new(), config).unwrap();
        feed(&mut engine, b"!11111111;!7;");

        let outcome = engine.poll();
        assert_eq!(outcome.rejected, 1);
        assert!(outcome.is_ready());
        assert_eq!(engine.arguments(), &[7]);
        assert_eq!(engine.stats().rejected, 1);
    }

    #[test]
    fn test_argument_bound() {
        let mut engine = engine(64, 3);
        feed(&mut engine, b"!1,2,3,4,5,6;");

        let frame = engine.poll().frame.unwrap();
        assert_eq!(engine.argument_count(), 3);
        assert_eq!(frame.tokens, 6);
        assert_eq!(frame.discarded, 3);
        assert_eq!(engine.stats().discarded_args, 3);
    }

    #[test]
    fn test_idle_poll_is_idempotent() {
        let mut engine = engine(64, 8);
        feed(&mut engine, b"!9;");
        engine.poll();

        let before = (engine.has_new_data(), engine.argument_count(), engine.state());
        for _ in 0..10 {
            assert_eq!(engine.poll(), PollOutcome::default());
        }
        assert_eq!(
            (engine.has_new_data(), engine.argument_count(), engine.state()),
            before
        );
    }

    #[test]
    fn test_empty_payload() {
        let mut engine = engine(64, 8);
        feed(&mut engine, b"!;");
        engine.poll();
        assert!(engine.has_new_data());
        assert_eq!(engine.argument_count(), 0);
    }

    #[test]
    fn test_frame_split_across_polls() {
        let mut engine = engine(64, 8);
        feed(&mut engine, b"xx!10,");
        assert!(!engine.poll().is_ready());
        assert_eq!(engine.state(), State::Receiving);

        feed(&mut engine, b"-20");
        assert!(!engine.poll().is_ready());

        feed(&mut engine, b";");
        assert!(engine.poll().is_ready());
        assert_eq!(engine.arguments(), &[10, -20]);
    }

    #[test]
    fn test_missing_end_marker_stalls_until_reset() {
        let mut engine = engine(64, 8);
        feed(&mut engine, b"!1,2");
        engine.poll();
        feed(&mut engine, b"!3");
        engine.poll();
        assert_eq!(engine.state(), State::Receiving);
        assert!(!engine.has_new_data());

        engine.reset();
        feed(&mut engine, b"!5;");
        engine.poll();
        assert_eq!(engine.arguments(), &[5]);
    }

    #[test]
    fn test_submit_push_variant() {
        let mut engine = MessageEngine::from_config(EngineConfig::default()).unwrap();

        let outcome = engine.submit("!1,2;!3;");
        assert!(outcome.is_ready());
        assert_eq!(engine.arguments(), &[1, 2]);
        assert_eq!(engine.source().remaining(), b"!3;");

        // The remainder is still there for the next poll
        engine.clear_new_data();
        engine.poll();
        assert_eq!(engine.arguments(), &[3]);

        // A partial frame carries over into the next submission
        engine.clear_new_data();
        assert!(!engine.submit("!4,").is_ready());
        assert!(engine.submit("5;").is_ready());
        assert_eq!(engine.arguments(), &[4, 5]);

        engine.submit("!6;tail");
        assert_eq!(engine.into_source().remaining(), b"tail");
    }

    #[test]
    fn test_invalid_config() {
        assert!(MessageEngine::new(BufferedSource::new(), EngineConfig::new(1, 1)).is_err());
    }

    #[test]
    fn test_stats_serialize() {
        let mut engine = engine(64, 8);
        feed(&mut engine, b"!1;");
        engine.poll();

        let json = serde_json::to_value(engine.stats()).unwrap();
        assert_eq!(json["frames"], 1);
        assert_eq!(json["bytes"], 3);
    }
}
