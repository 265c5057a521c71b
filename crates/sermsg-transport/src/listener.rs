//! Session listeners - connection and frame events for the application

use std::net::SocketAddr;

use sermsg_core::FrameSummary;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Identity of one connected peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Unique session ID, `tcp:<peer>:<n>`
    pub id: String,
    pub peer: SocketAddr,
}

impl SessionInfo {
    pub fn new(id: impl Into<String>, peer: SocketAddr) -> Self {
        Self {
            id: id.into(),
            peer,
        }
    }
}

/// Receives session events. Every method defaults to doing nothing.
pub trait SessionListener: Send + Sync {
    fn on_connect(&self, _session: &SessionInfo) {}

    fn on_disconnect(&self, _session: &SessionInfo) {}

    /// A frame was parsed; `args` is only borrowed for the call
    fn on_frame(&self, _session: &SessionInfo, _args: &[i32], _summary: &FrameSummary) {}

    /// Oversized frames dropped under the reject policy
    fn on_rejected(&self, _session: &SessionInfo, _count: usize) {}
}

/// Logs every event through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingListener;

impl SessionListener for LoggingListener {
    fn on_connect(&self, session: &SessionInfo) {
        info!(client = %session.id, peer = %session.peer, "Client connected");
    }

    fn on_disconnect(&self, session: &SessionInfo) {
        info!(client = %session.id, "Client disconnected");
    }

    fn on_frame(&self, session: &SessionInfo, args: &[i32], summary: &FrameSummary) {
        info!(
            client = %session.id,
            count = args.len(),
            args = ?args,
            truncated = summary.truncated,
            discarded = summary.discarded,
            "Frame received"
        );
    }

    fn on_rejected(&self, session: &SessionInfo, count: usize) {
        warn!(client = %session.id, count, "Oversized frames rejected");
    }
}

/// A parsed frame handed off to another task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameEvent {
    pub session: String,
    pub args: Vec<i32>,
    pub summary: FrameSummary,
}

/// Forwards frames into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelListener {
    sender: mpsc::UnboundedSender<FrameEvent>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FrameEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl SessionListener for ChannelListener {
    fn on_frame(&self, session: &SessionInfo, args: &[i32], summary: &FrameSummary) {
        let event = FrameEvent {
            session: session.id.clone(),
            args: args.to_vec(),
            summary: *summary,
        };
        // The receiver going away just means nobody wants frames anymore
        let _ = self.sender.send(event);
    }
}
