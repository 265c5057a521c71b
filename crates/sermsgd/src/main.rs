//! sermsg Daemon (sermsgd)
//!
//! Accepts TCP peers and parses `!a,b,c;` command frames from each of them.
//!
//! # Usage
//!
//! ```bash
//! # Start with defaults (TCP on 2323)
//! sermsgd
//!
//! # Custom port, echo parsed arguments back to the peer
//! sermsgd --port 7000 --echo
//!
//! # Bounded frames, drop oversized ones
//! sermsgd --buffer-size 32 --max-args 8 --overflow reject
//!
//! # With configuration file
//! sermsgd --config /etc/sermsg/sermsgd.toml
//! ```

mod config;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use sermsg_core::OverflowPolicy;
use sermsg_transport::TcpServer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::DaemonConfig;

/// sermsg Daemon - command frame parser
#[derive(Parser, Debug)]
#[command(name = "sermsgd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TCP port to listen on
    #[arg(long, env = "SERMSG_PORT")]
    port: Option<u16>,

    /// Bind address
    #[arg(long, env = "SERMSG_BIND")]
    bind: Option<String>,

    /// Configuration file path
    #[arg(short, long, env = "SERMSG_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SERMSG_LOG_LEVEL")]
    log_level: Option<String>,

    /// Frame buffer size in bytes, terminator included
    #[arg(long, env = "SERMSG_BUFFER_SIZE")]
    buffer_size: Option<usize>,

    /// Maximum arguments kept per frame
    #[arg(long, env = "SERMSG_MAX_ARGS")]
    max_args: Option<usize>,

    /// Oversized frame handling (truncate, reject)
    #[arg(long, env = "SERMSG_OVERFLOW")]
    overflow: Option<OverflowPolicy>,

    /// Echo parsed arguments back to the peer
    #[arg(long, env = "SERMSG_ECHO")]
    echo: bool,
}

impl Args {
    /// Command line and environment win over the file
    fn apply(&self, config: &mut DaemonConfig) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(ref bind) = self.bind {
            config.server.bind = bind.clone();
        }
        if self.echo {
            config.server.echo = true;
        }
        if let Some(ref level) = self.log_level {
            config.log.level = level.clone();
        }
        if let Some(size) = self.buffer_size {
            config.engine.buffer_size = size;
        }
        if let Some(max) = self.max_args {
            config.engine.max_args = max;
        }
        if let Some(policy) = self.overflow {
            config.engine.overflow = policy;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => DaemonConfig::load(path)?,
        None => DaemonConfig::default(),
    };
    args.apply(&mut config);

    // Initialize logging
    let level = match config.log.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    print_banner();

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let server = TcpServer::new(addr, config.engine.clone())?.with_echo(config.server.echo);

    info!(
        port = config.server.port,
        bind = %config.server.bind,
        buffer_size = config.engine.buffer_size,
        max_args = config.engine.max_args,
        overflow = %config.engine.overflow,
        echo = config.server.echo,
        "Starting sermsg daemon"
    );

    let handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            tracing::error!(error = %e, "TCP server error");
        }
    });

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
        }
        _ = handle => {
            anyhow::bail!("TCP server stopped unexpectedly");
        }
    }

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  !  sermsg
  ;  command frame parser
     Version {}
"#,
        env!("CARGO_PKG_VERSION")
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_override_file() {
        let args = Args::parse_from([
            "sermsgd",
            "--port",
            "9100",
            "--max-args",
            "4",
            "--overflow",
            "reject",
            "--echo",
        ]);
        let mut config = DaemonConfig::parse("[server]\nport = 7000\nbind = \"127.0.0.1\"\n").unwrap();
        args.apply(&mut config);

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.bind, "127.0.0.1");
        assert!(config.server.echo);
        assert_eq!(config.engine.max_args, 4);
        assert_eq!(config.engine.overflow, OverflowPolicy::Reject);
    }

    #[test]
    fn test_args_leave_file_values() {
        let args = Args::parse_from(["sermsgd"]);
        let mut config = DaemonConfig::parse("[engine]\nbuffer_size = 16\n").unwrap();
        args.apply(&mut config);
        assert_eq!(config.engine.buffer_size, 16);
    }
}
