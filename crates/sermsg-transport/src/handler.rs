//! Connection handler - feeds received bytes through a message engine

use std::sync::Arc;

use sermsg_core::{BufferedSource, EngineConfig, EngineStats, MessageEngine};
use tracing::debug;

use crate::error::TransportResult;
use crate::listener::{SessionInfo, SessionListener};
use crate::reply::Reply;

/// Handles a single client connection
pub struct ConnectionHandler {
    /// Peer identity
    pub session: SessionInfo,
    /// Engine bound to this connection's receive buffer
    engine: MessageEngine<BufferedSource>,
    /// Event sink
    listener: Arc<dyn SessionListener>,
}

impl ConnectionHandler {
    pub fn new(
        session: SessionInfo,
        config: EngineConfig,
        listener: Arc<dyn SessionListener>,
    ) -> TransportResult<Self> {
        Self::with_source_capacity(
            session,
            config,
            listener,
            sermsg_core::source::DEFAULT_SOURCE_CAPACITY,
        )
    }

    /// Create a handler with a custom receive buffer size
    pub fn with_source_capacity(
        session: SessionInfo,
        config: EngineConfig,
        listener: Arc<dyn SessionListener>,
        capacity: usize,
    ) -> TransportResult<Self> {
        let source = BufferedSource::with_capacity(capacity.max(1));
        let engine = MessageEngine::new(source, config)?;

        Ok(Self {
            session,
            engine,
            listener,
        })
    }

    /// Process incoming data and return replies for the peer.
    ///
    /// Data larger than the receive buffer is fed through it in slices,
    /// polling in between, so nothing is dropped.
    pub fn process(&mut self, mut data: &[u8]) -> Vec<Reply> {
        let mut replies = Vec::new();

        while !data.is_empty() {
            let accepted = self.engine.source_mut().push(data);
            data = &data[accepted..];
            self.drain(&mut replies);
        }

        replies
    }

    /// Poll until the receive buffer is empty, acknowledging every frame
    fn drain(&mut self, replies: &mut Vec<Reply>) {
        loop {
            let outcome = self.engine.poll();

            if outcome.rejected > 0 {
                self.listener.on_rejected(&self.session, outcome.rejected);
                replies.push(Reply::Rejected { count: outcome.rejected });
            }

            let Some(summary) = outcome.frame else {
                break;
            };

            debug!(client = %self.session.id, args = ?self.engine.arguments(), "Processing frame");
            self.listener
                .on_frame(&self.session, self.engine.arguments(), &summary);

            if summary.truncated {
                replies.push(Reply::Truncated { kept: summary.payload_len });
            }
            if summary.discarded > 0 {
                replies.push(Reply::Discarded { count: summary.discarded });
            }
            replies.push(Reply::arguments(self.engine.arguments()));

            self.engine.clear_new_data();
        }
    }

    /// Counters of this connection's engine
    pub fn stats(&self) -> EngineStats {
        self.engine.stats()
    }

    /// Drop a half-received frame
    pub fn reset(&mut self) {
        self.engine.reset();
    }

    /// Notify the listener of the new session
    pub fn connected(&self) {
        self.listener.on_connect(&self.session);
    }

    /// Clean up when connection closes
    pub fn cleanup(&self) {
        self.listener.on_disconnect(&self.session);
    }
}
