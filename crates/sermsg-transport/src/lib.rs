//! sermsg Transport Layer
//!
//! Delivers raw bytes from the network into per-connection message engines:
//! - TCP: telnet-style sessions, one engine per connection
//! - Listener: connect/disconnect/frame events for the surrounding application
//! - Reply: optional text echo of parsed arguments back to the peer

pub mod error;
pub mod handler;
pub mod listener;
pub mod reply;
pub mod tcp;

pub use error::{TransportError, TransportResult};
pub use handler::ConnectionHandler;
pub use listener::{ChannelListener, FrameEvent, LoggingListener, SessionInfo, SessionListener};
pub use reply::Reply;
pub use tcp::TcpServer;
