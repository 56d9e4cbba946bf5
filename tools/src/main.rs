use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::RecvTimeoutError;
use listener::{list_interfaces, replay_file, Listener, ListenerHandle, Message};
use pdec_tools::{
    decode_body, decode_payload, parse_hex, tables_summary, CaptureArgs, OutputArgs, TableArgs,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "pdec-tools",
    version,
    about = "Passive capture and decoding tools for pdec"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Capture live traffic and print classified messages as JSON lines.
    Listen {
        #[command(flatten)]
        capture: CaptureArgs,
        #[command(flatten)]
        tables: TableArgs,
        #[command(flatten)]
        output: OutputArgs,
        /// Stop after this many seconds.
        #[arg(long)]
        duration_secs: Option<u64>,
    },
    /// Decode an offline pcap file.
    Replay {
        /// Path to the capture file.
        pcap_file: PathBuf,
        #[command(flatten)]
        capture: CaptureArgs,
        #[command(flatten)]
        tables: TableArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Decode one transport payload given as hex or a file of raw bytes.
    Decode {
        /// Hex-encoded payload.
        #[arg(conflicts_with = "file", required_unless_present = "file")]
        hex: Option<String>,
        /// File holding the raw payload bytes.
        #[arg(long)]
        file: Option<PathBuf>,
        /// Input is a single message body starting at the 0xF3 signature.
        #[arg(long)]
        body: bool,
        #[command(flatten)]
        tables: TableArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// List capture interfaces.
    Interfaces,
    /// Summarize the code tables in use.
    Tables {
        #[command(flatten)]
        tables: TableArgs,
        /// Print every code and name.
        #[arg(long)]
        dump: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Listen {
            capture,
            tables,
            output,
            duration_secs,
        } => {
            let config = capture.to_config()?;
            let tables = tables.load()?;
            let (tx, rx) = output.channel();
            let handle = Listener::new(config, tables, tx)
                .start()
                .context("start listener")?;
            let deadline = duration_secs.map(|secs| Instant::now() + Duration::from_secs(secs));
            let written = write_until_stopped(&handle, &rx, &output, deadline);
            handle.stop();
            // Capture threads blocked on a full bounded channel wake with
            // OutputClosed once the receiver is gone.
            drop(rx);
            let stats = handle.stats();
            handle.join().context("capture failed")?;
            info!(?stats, "listener stopped");
            written?;
        }
        Command::Replay {
            pcap_file,
            capture,
            tables,
            output,
        } => {
            let config = capture.to_config()?;
            let tables = tables.load()?;
            let (tx, rx) = output.channel();
            let writer = thread::Builder::new()
                .name("pdec-writer".to_owned())
                .spawn(move || -> Result<()> {
                    let mut stdout = io::stdout().lock();
                    for message in rx {
                        write_message(&mut stdout, &output, &message)?;
                    }
                    Ok(())
                })
                .context("spawn writer thread")?;
            let stats = replay_file(&pcap_file, &config, tables, tx)
                .with_context(|| format!("replay {}", pcap_file.display()))?;
            match writer.join() {
                Ok(result) => result?,
                Err(_) => bail!("writer thread panicked"),
            }
            info!(?stats, "replay finished");
        }
        Command::Decode {
            hex,
            file,
            body,
            tables,
            output,
        } => {
            let bytes = match (hex, file) {
                (Some(hex), _) => parse_hex(&hex)?,
                (None, Some(path)) => {
                    fs::read(&path).with_context(|| format!("read payload {}", path.display()))?
                }
                (None, None) => bail!("either a hex payload or --file is required"),
            };
            let tables = tables.load()?;
            let config = CaptureArgs::default().to_config()?;
            let mut stdout = io::stdout().lock();
            if body {
                let message = decode_body(&bytes, &config, tables)?;
                write_message(&mut stdout, &output, &message)?;
            } else {
                let (messages, stats) = decode_payload(&bytes, &config, tables)?;
                for message in &messages {
                    write_message(&mut stdout, &output, message)?;
                }
                info!(?stats, "payload decoded");
            }
        }
        Command::Interfaces => {
            let mut stdout = io::stdout().lock();
            for interface in list_interfaces()? {
                let mut flags = Vec::new();
                if interface.up {
                    flags.push("up");
                }
                if interface.loopback {
                    flags.push("loopback");
                }
                if interface.is_default_candidate() {
                    flags.push("default");
                }
                writeln!(
                    stdout,
                    "{}\t[{}]\t{}",
                    interface.name,
                    flags.join(","),
                    interface.description.as_deref().unwrap_or("")
                )?;
            }
        }
        Command::Tables { tables, dump } => {
            let tables = tables.load()?;
            let summary = tables_summary(&tables, dump);
            let json = serde_json::to_string_pretty(&summary).context("serialize json")?;
            println!("{json}");
        }
    }
    Ok(())
}

fn write_message(out: &mut impl Write, output: &OutputArgs, message: &Message) -> Result<()> {
    let line = output.render(message)?;
    writeln!(out, "{line}").context("write message")
}

// Returns when the deadline passes, stdout fails, or every capture thread
// has exited.
fn write_until_stopped(
    handle: &ListenerHandle,
    rx: &crossbeam_channel::Receiver<Message>,
    output: &OutputArgs,
    deadline: Option<Instant>,
) -> Result<()> {
    let mut stdout = io::stdout().lock();
    let tick = Duration::from_millis(250);
    loop {
        if deadline.is_some_and(|at| Instant::now() >= at) {
            info!("capture duration reached");
            return Ok(());
        }
        match rx.recv_timeout(tick) {
            Ok(message) => {
                if let Err(err) = write_message(&mut stdout, output, &message) {
                    warn!(error = %err, "stdout closed");
                    handle.stop();
                    return Err(err);
                }
            }
            Err(RecvTimeoutError::Timeout) if handle.is_finished() => {
                info!("every capture thread exited");
                return Ok(());
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return Ok(()),
        }
    }
}
