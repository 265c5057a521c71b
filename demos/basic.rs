//! Basic sermsg Example
//!
//! Shows the polled engine, the push entry point and the TCP transport.
//!
//! Run with: cargo run --example basic

use std::net::SocketAddr;
use std::sync::Arc;

use sermsg_core::{BufferedSource, EngineConfig, MessageEngine, OverflowPolicy};
use sermsg_transport::{ChannelListener, TcpServer};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("sermsg Basic Example\n");

    println!("=== Polled Engine ===\n");
    polled_example()?;

    println!("\n=== Push Entry Point ===\n");
    push_example()?;

    println!("\n=== TCP Transport ===\n");
    tcp_example().await?;

    Ok(())
}

fn polled_example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = EngineConfig::new(16, 4);
    let mut engine = MessageEngine::new(BufferedSource::new(), config)?;

    // Bytes trickle in the way a UART delivers them
    let chunks: [&[u8]; 3] = [b"noise!10,", b"-20,3", b"0;!1,2,3,4,5,6;"];
    for chunk in chunks {
        engine.source_mut().push(chunk);

        loop {
            let outcome = engine.poll();
            let Some(frame) = outcome.frame else {
                break;
            };
            println!(
                "args {:?} (tokens: {}, discarded: {})",
                engine.arguments(),
                frame.tokens,
                frame.discarded
            );
            engine.clear_new_data();
        }
    }

    println!("stats: {:?}", engine.stats());
    Ok(())
}

fn push_example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = EngineConfig::new(8, 8).with_overflow(OverflowPolicy::Reject);
    let mut engine = MessageEngine::from_config(config)?;

    let outcome = engine.submit("!1234567890;!42;");
    println!("rejected frames: {}", outcome.rejected);
    println!("args: {:?}", engine.arguments());

    Ok(())
}

async fn tcp_example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr: SocketAddr = listener.local_addr()?;

    let (frames, mut rx) = ChannelListener::new();
    let server = Arc::new(
        TcpServer::new(addr, EngineConfig::default())?.with_listener(Arc::new(frames)),
    );
    let serving = server.clone();
    let task = tokio::spawn(async move { serving.serve(listener).await });

    let mut client = TcpStream::connect(addr).await?;
    client.write_all(b"!7,8,9;").await?;

    if let Some(event) = rx.recv().await {
        println!("{} sent {:?}", event.session, event.args);
    }

    task.abort();
    Ok(())
}
