//! TCP transport for sermsg

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::BytesMut;
use parking_lot::Mutex;
use sermsg_core::{EngineConfig, EngineStats};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

use crate::error::TransportResult;
use crate::handler::ConnectionHandler;
use crate::listener::{LoggingListener, SessionInfo, SessionListener};

/// Totals across every connection the server has handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerStats {
    pub connections: u64,
    pub active: u64,
    pub frames: u64,
    pub rejected: u64,
}

/// TCP server delivering telnet-style byte streams into message engines
pub struct TcpServer {
    addr: SocketAddr,
    config: EngineConfig,
    listener: Arc<dyn SessionListener>,
    client_counter: AtomicU64,
    echo: bool,
    stats: Arc<Mutex<ServerStats>>,
}

impl TcpServer {
    /// Validates the engine configuration up front so a bad value fails at
    /// startup instead of on the first connection.
    pub fn new(addr: SocketAddr, config: EngineConfig) -> TransportResult<Self> {
        config.validate()?;
        Ok(Self {
            addr,
            config,
            listener: Arc::new(LoggingListener),
            client_counter: AtomicU64::new(0),
            echo: false,
            stats: Arc::new(Mutex::new(ServerStats::default())),
        })
    }

    /// Set the listener receiving session and frame events
    pub fn with_listener(mut self, listener: Arc<dyn SessionListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Write replies back to the peer
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn stats(&self) -> ServerStats {
        *self.stats.lock()
    }

    /// Bind and serve until the task is dropped
    pub async fn run(&self) -> TransportResult<()> {
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "sermsg TCP server listening");
        self.serve(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> TransportResult<()> {
        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    let client_id = format!(
                        "tcp:{}:{}",
                        peer_addr,
                        self.client_counter.fetch_add(1, Ordering::Relaxed)
                    );
                    let session = SessionInfo::new(client_id.clone(), peer_addr);
                    let handler = match ConnectionHandler::new(
                        session,
                        self.config.clone(),
                        self.listener.clone(),
                    ) {
                        Ok(handler) => handler,
                        Err(e) => {
                            error!(client = %client_id, error = %e, "Failed to create handler");
                            continue;
                        }
                    };
                    let echo = self.echo;
                    let stats = self.stats.clone();

                    tokio::spawn(async move {
                        if let Err(e) = Self::handle_connection(stream, handler, echo, stats).await
                        {
                            error!(client = %client_id, error = %e, "Connection error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    async fn handle_connection(
        mut stream: TcpStream,
        mut handler: ConnectionHandler,
        echo: bool,
        stats: Arc<Mutex<ServerStats>>,
    ) -> TransportResult<()> {
        {
            let mut stats = stats.lock();
            stats.connections += 1;
            stats.active += 1;
        }
        handler.connected();

        let result = Self::pump(&mut stream, &mut handler, echo).await;

        handler.cleanup();
        let totals: EngineStats = handler.stats();
        {
            let mut stats = stats.lock();
            stats.active -= 1;
            stats.frames += totals.frames;
            stats.rejected += totals.rejected;
        }
        debug!(
            client = %handler.session.id,
            frames = totals.frames,
            bytes = totals.bytes,
            "Session closed"
        );

        result
    }

    async fn pump(
        stream: &mut TcpStream,
        handler: &mut ConnectionHandler,
        echo: bool,
    ) -> TransportResult<()> {
        let mut buf = vec![0u8; 4096];
        let mut out = BytesMut::new();

        loop {
            let n = stream.read(&mut buf).await?;
            if n == 0 {
                return Ok(());
            }

            let replies = handler.process(&buf[..n]);
            if echo && !replies.is_empty() {
                out.clear();
                for reply in &replies {
                    reply.encode_into(&mut out);
                }
                stream.write_all(&out).await?;
            }
        }
    }
}
