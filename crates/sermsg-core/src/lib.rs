//! sermsg Core - Framing and Argument Parsing
//!
//! Turns an unordered byte stream into bounded command messages:
//!
//! ```text
//! frame    := '!' payload ';'
//! payload  := token (',' token)*
//! token    := [ws]* ['+'|'-']? digit*
//! ```
//!
//! This crate provides:
//! - `ByteSource`: the narrow capability every transport implements
//! - `FrameAssembler`: byte-at-a-time marker recognition into a fixed buffer
//! - `ArgumentList`: comma tokenizing into bounded signed 32-bit arguments
//! - `MessageEngine`: the cooperative `poll()` loop tying them together

pub mod args;
pub mod assembler;
pub mod config;
pub mod engine;
pub mod error;
pub mod source;

pub use args::{parse_arguments, parse_integer, ArgumentList, ParseSummary};
pub use assembler::{FrameAssembler, State, Step};
pub use config::{EngineConfig, OverflowPolicy};
pub use engine::{EngineStats, FrameSummary, MessageEngine, PollOutcome};
pub use error::{ConfigError, Result};
pub use source::{BufferedSource, ByteSource, StrSource};
