//! sermsg CLI
//!
//! Interactive front end for the command frame parser.
//!
//! # Usage
//!
//! ```bash
//! # Parse typed input locally
//! sermsg
//!
//! # Local parser with small limits
//! sermsg --buffer-size 16 --max-args 4 --overflow reject
//!
//! # Forward input to a running daemon (started with --echo)
//! sermsg --connect 127.0.0.1:2323
//!
//! # Parse a single input and exit
//! sermsg -c "!1,2,3;"
//! ```

use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::TcpStream;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use sermsg_core::{EngineConfig, FrameSummary, MessageEngine, OverflowPolicy, StrSource};

/// sermsg Command Line Interface
#[derive(Parser, Debug)]
#[command(name = "sermsg")]
#[command(author, version, about = "sermsg CLI - command frame parser")]
struct Args {
    /// Forward input to a daemon at host:port instead of parsing locally
    #[arg(long, env = "SERMSG_ADDR")]
    connect: Option<String>,

    /// Parse input and exit
    #[arg(short, long)]
    command: Option<String>,

    /// Print frames as JSON
    #[arg(long)]
    json: bool,

    /// Frame buffer size in bytes (local mode)
    #[arg(long, default_value = "64")]
    buffer_size: usize,

    /// Maximum arguments per frame (local mode)
    #[arg(long, default_value = "30")]
    max_args: usize,

    /// Oversized frame handling (local mode)
    #[arg(long, default_value = "truncate")]
    overflow: OverflowPolicy,

    /// Quiet mode (no banner)
    #[arg(short, long)]
    quiet: bool,
}

/// Something worth showing after feeding a line
#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Frame { args: Vec<i32>, summary: FrameSummary },
    Rejected(usize),
}

/// Parses typed input with a string-fed engine
struct LocalSession {
    engine: MessageEngine<StrSource>,
}

impl LocalSession {
    fn new(config: EngineConfig) -> Result<Self> {
        let engine = MessageEngine::from_config(config).context("Invalid parser settings")?;
        Ok(Self { engine })
    }

    /// Submit one line, then keep polling for frames it still holds
    fn feed(&mut self, line: &str) -> Vec<Event> {
        let mut events = Vec::new();
        let mut outcome = self.engine.submit(line.as_bytes().to_vec());

        loop {
            if outcome.rejected > 0 {
                events.push(Event::Rejected(outcome.rejected));
            }
            let Some(summary) = outcome.frame else {
                break;
            };
            events.push(Event::Frame {
                args: self.engine.arguments().to_vec(),
                summary,
            });
            self.engine.clear_new_data();
            outcome = self.engine.poll();
        }

        events
    }
}

/// Reply from the daemon, decoded from its text lines
#[derive(Debug, Clone, PartialEq, Eq)]
enum RemoteReply {
    Arguments(Vec<i32>),
    Warning(String),
    Error(String),
    Text(String),
}

const ARGS_HEADER: &str = "Current number of args:";

/// Turns reply lines into `RemoteReply`s; the argument reply spans two lines
#[derive(Debug, Default)]
struct ReplyDecoder {
    awaiting_values: bool,
}

impl ReplyDecoder {
    fn line(&mut self, line: &str) -> Option<RemoteReply> {
        if self.awaiting_values {
            self.awaiting_values = false;
            let values: Vec<i32> = line
                .split_whitespace()
                .map(|v| v.parse().unwrap_or_default())
                .collect();
            return Some(RemoteReply::Arguments(values));
        }

        if line.starts_with(ARGS_HEADER) {
            self.awaiting_values = true;
            None
        } else if let Some(rest) = line.strip_prefix("-ERR ") {
            Some(RemoteReply::Error(rest.to_string()))
        } else if let Some(rest) = line.strip_prefix("-WARN ") {
            Some(RemoteReply::Warning(rest.to_string()))
        } else {
            Some(RemoteReply::Text(line.to_string()))
        }
    }

    fn mid_reply(&self) -> bool {
        self.awaiting_values
    }
}

/// Extra read timeouts tolerated while a reply is incomplete
const REPLY_GRACE: usize = 3;

/// Line-based connection to a daemon
struct RemoteSession {
    writer: TcpStream,
    reader: BufReader<TcpStream>,
    /// Unterminated text from a read that timed out
    partial: String,
    decoder: ReplyDecoder,
}

impl RemoteSession {
    fn connect(addr: &str) -> Result<Self> {
        let writer =
            TcpStream::connect(addr).with_context(|| format!("Failed to connect to {}", addr))?;
        writer.set_read_timeout(Some(Duration::from_millis(300)))?;
        let reader = BufReader::new(writer.try_clone()?);
        Ok(Self {
            writer,
            reader,
            partial: String::new(),
            decoder: ReplyDecoder::default(),
        })
    }

    /// Send raw input and collect replies until the daemon goes quiet
    fn send(&mut self, input: &str) -> Result<Vec<RemoteReply>> {
        self.writer.write_all(input.as_bytes())?;
        self.writer.flush()?;

        let mut replies = Vec::new();
        let mut grace = REPLY_GRACE;
        loop {
            match self.reader.read_line(&mut self.partial) {
                Ok(0) => anyhow::bail!("Connection closed by daemon"),
                Ok(_) => {
                    if !self.partial.ends_with('\n') {
                        continue;
                    }
                    let line = std::mem::take(&mut self.partial);
                    replies.extend(self.decoder.line(line.trim_end()));
                }
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    let incomplete = !self.partial.is_empty() || self.decoder.mid_reply();
                    if incomplete && grace > 0 {
                        grace -= 1;
                        continue;
                    }
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(replies)
    }
}

enum Session {
    Local(LocalSession),
    Remote(RemoteSession),
}

impl Session {
    fn execute(&mut self, input: &str, json: bool) -> Result<()> {
        match self {
            Session::Local(local) => {
                for event in local.feed(input) {
                    print_event(&event, json);
                }
            }
            Session::Remote(remote) => {
                for reply in remote.send(input)? {
                    print_reply(&reply, json);
                }
            }
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut session = match args.connect {
        Some(ref addr) => Session::Remote(RemoteSession::connect(addr)?),
        None => {
            let config = EngineConfig::new(args.buffer_size, args.max_args)
                .with_overflow(args.overflow);
            Session::Local(LocalSession::new(config)?)
        }
    };

    // Single command mode
    if let Some(ref cmd) = args.command {
        return session.execute(cmd, args.json);
    }

    if !args.quiet {
        let target = match args.connect {
            Some(ref addr) => format!("Connected to {}", addr),
            None => "Parsing locally".to_string(),
        };
        println!(
            "{}",
            format!(
                r#"
  !  sermsg CLI
  ;  {}
     Type frames like !1,2,3;  'help' for commands, 'quit' to exit
"#,
                target
            )
            .cyan()
        );
    }

    // Interactive mode
    let mut rl = DefaultEditor::new()?;
    let history_path = dirs_next::home_dir()
        .map(|p| p.join(".sermsg_history"))
        .unwrap_or_default();

    let _ = rl.load_history(&history_path);

    loop {
        let prompt = format!("{}> ", "sermsg".green());
        match rl.readline(&prompt) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line.as_str());

                // Handle local commands
                match line.trim().to_lowercase().as_str() {
                    "quit" | "exit" => break,
                    "help" => {
                        print_help();
                        continue;
                    }
                    "clear" => {
                        print!("\x1B[2J\x1B[1;1H");
                        continue;
                    }
                    "stats" => {
                        if let Session::Local(ref local) = session {
                            println!("{}", serde_json::to_string_pretty(&local.engine.stats())?);
                        } else {
                            println!("{}", "stats are only tracked in local mode".dimmed());
                        }
                        continue;
                    }
                    "reset" => {
                        if let Session::Local(ref mut local) = session {
                            local.engine.reset();
                            println!("{}", "Parser reset.".yellow());
                        }
                        continue;
                    }
                    _ => {}
                }

                if let Err(e) = session.execute(&line, args.json) {
                    eprintln!("{} {}", "Error:".red(), e);
                    if matches!(session, Session::Remote(_)) {
                        eprintln!("{}", "Connection lost.".red());
                        break;
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    let _ = rl.save_history(&history_path);
    Ok(())
}

fn print_event(event: &Event, json: bool) {
    match event {
        Event::Frame { args, summary } if json => {
            let value = serde_json::json!({
                "args": args,
                "count": args.len(),
                "truncated": summary.truncated,
                "discarded": summary.discarded,
            });
            println!("{}", value);
        }
        Event::Frame { args, summary } => {
            if summary.truncated {
                println!(
                    "{}",
                    format!("payload truncated to {} bytes", summary.payload_len).yellow()
                );
            }
            if summary.discarded > 0 {
                println!(
                    "{}",
                    format!("{} extra arguments discarded", summary.discarded).yellow()
                );
            }
            let values: Vec<String> = args.iter().map(|a| a.to_string()).collect();
            println!("{} [{}]", format!("({})", args.len()).dimmed(), values.join(", ").green());
        }
        Event::Rejected(count) if json => {
            println!("{}", serde_json::json!({ "rejected": count }));
        }
        Event::Rejected(count) => {
            println!("{}", format!("{} oversized frame(s) rejected", count).red());
        }
    }
}

fn print_reply(reply: &RemoteReply, json: bool) {
    match reply {
        RemoteReply::Arguments(args) if json => {
            println!("{}", serde_json::json!({ "args": args, "count": args.len() }));
        }
        RemoteReply::Arguments(args) => {
            let values: Vec<String> = args.iter().map(|a| a.to_string()).collect();
            println!("{} [{}]", format!("({})", args.len()).dimmed(), values.join(", ").green());
        }
        RemoteReply::Warning(text) if json => println!("{}", serde_json::json!({ "warning": text })),
        RemoteReply::Warning(text) => println!("{}", text.yellow()),
        RemoteReply::Error(text) if json => println!("{}", serde_json::json!({ "error": text })),
        RemoteReply::Error(text) => println!("{}", text.red()),
        RemoteReply::Text(text) if json => println!("{}", serde_json::json!({ "text": text })),
        RemoteReply::Text(text) => println!("{}", text),
    }
}

fn print_help() {
    println!(
        r#"
{}

{}
  !1,2,3;         One frame: start marker, comma separated integers, end marker
  !1,2            Frames may span several lines; finish later with ;
  junk!4;         Bytes before a start marker are ignored

{}
  help            Show this help
  clear           Clear screen
  stats           Parser counters (local mode)
  reset           Drop a half-received frame (local mode)
  quit/exit       Exit CLI
"#,
        "sermsg Input".cyan().bold(),
        "Frames".yellow().bold(),
        "Local".yellow().bold(),
    );
}

// Minimal dirs_next replacement for home directory
mod dirs_next {
    use std::path::PathBuf;

    pub fn home_dir() -> Option<PathBuf> {
        std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local() -> LocalSession {
        LocalSession::new(EngineConfig::default()).unwrap()
    }

    fn frames(events: &[Event]) -> Vec<Vec<i32>> {
        events
            .iter()
            .filter_map(|e| match e {
                Event::Frame { args, .. } => Some(args.clone()),
                Event::Rejected(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_line_with_several_frames() {
        let mut session = local();
        let events = session.feed("!1,2;noise!3;");
        assert_eq!(frames(&events), vec![vec![1, 2], vec![3]]);
    }

    #[test]
    fn test_frame_across_lines() {
        let mut session = local();
        assert!(session.feed("!5,").is_empty());
        assert_eq!(frames(&session.feed("6;")), vec![vec![5, 6]]);
    }

    #[test]
    fn test_rejected_frames_reported() {
        let config = EngineConfig::new(4, 4).with_overflow(OverflowPolicy::Reject);
        let mut session = LocalSession::new(config).unwrap();
        let events = session.feed("!123456;!1;");
        assert_eq!(events[0], Event::Rejected(1));
        assert_eq!(frames(&events), vec![vec![1]]);
    }

    #[test]
    fn test_invalid_settings() {
        assert!(LocalSession::new(EngineConfig::new(64, 0)).is_err());
    }

    #[test]
    fn test_decode_daemon_replies() {
        let mut decoder = ReplyDecoder::default();
        assert_eq!(
            decoder.line("-WARN DISCARDED 2 extra arguments"),
            Some(RemoteReply::Warning("DISCARDED 2 extra arguments".into()))
        );
        assert_eq!(decoder.line("Current number of args: 3"), None);
        assert!(decoder.mid_reply());
        assert_eq!(decoder.line("1 -2 3"), Some(RemoteReply::Arguments(vec![1, -2, 3])));
        assert!(!decoder.mid_reply());

        // A frame with no arguments still sends an empty values line
        assert_eq!(decoder.line("Current number of args: 0"), None);
        assert_eq!(decoder.line(""), Some(RemoteReply::Arguments(vec![])));
        assert_eq!(
            decoder.line("-ERR OVERFLOW 1 frame(s) rejected"),
            Some(RemoteReply::Error("OVERFLOW 1 frame(s) rejected".into()))
        );
    }

    #[test]
    fn test_remote_reply_split_across_reads() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let daemon = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 64];
            let n = std::io::Read::read(&mut stream, &mut buf).unwrap();
            assert_eq!(&buf[..n], b"!1,2;");

            stream.write_all(b"Current number of args: 2\r\n1 ").unwrap();
            std::thread::sleep(Duration::from_millis(450));
            stream.write_all(b"2\r\n").unwrap();
            stream
        });

        let mut session = RemoteSession::connect(&addr.to_string()).unwrap();
        let replies = session.send("!1,2;").unwrap();
        assert_eq!(replies, vec![RemoteReply::Arguments(vec![1, 2])]);
        assert!(session.partial.is_empty());

        drop(daemon.join().unwrap());
    }
}
