//! Command-line helpers for the pdec passive decoder.
//!
//! The `pdec-tools` binary is a thin shell over these helpers:
//!
//! - Turn command-line flags into a [`ListenerConfig`]
//! - Load the bundled or overridden code tables
//! - Decode captured payloads offline into JSON lines
//!
//! # Design Principles
//!
//! - **Pure JSON on stdout** - Logs go to stderr, messages to stdout.
//! - **Fail at startup** - Bad tables or flags stop the tool before capture.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, ensure, Context, Result};
use clap::Args;
use codec::{decode_message, ReassemblyLimits};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use listener::{
    Classifier, DispatchSnapshot, Dispatcher, ListenerConfig, Message, DEFAULT_PORT,
};
use schema::CodeTables;
use serde_json::json;
use wire::ReliableMessage;

/// Flags shared by the capture commands.
#[derive(Debug, Clone, Args)]
pub struct CaptureArgs {
    /// Interface to capture on. Repeat for several; default is every
    /// non-loopback interface that is up.
    #[arg(long = "interface", short = 'i')]
    pub interfaces: Vec<String>,
    /// Port carrying the protocol, matched on either side.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Maximum bytes captured per frame.
    #[arg(long, default_value_t = 2048)]
    pub snaplen: i32,
    #[arg(long)]
    pub promiscuous: bool,
    /// Maximum incomplete fragment groups held at once.
    #[arg(long)]
    pub max_groups: Option<usize>,
    /// Seconds an incomplete fragment group may wait. 0 disables expiry.
    #[arg(long)]
    pub group_ttl_secs: Option<u64>,
    /// Keep incomplete fragment groups forever.
    #[arg(long, conflicts_with_all = ["max_groups", "group_ttl_secs"])]
    pub no_eviction: bool,
}

impl Default for CaptureArgs {
    fn default() -> Self {
        Self {
            interfaces: Vec::new(),
            port: DEFAULT_PORT,
            snaplen: 2048,
            promiscuous: false,
            max_groups: None,
            group_ttl_secs: None,
            no_eviction: false,
        }
    }
}

impl CaptureArgs {
    pub fn to_config(&self) -> Result<ListenerConfig> {
        ensure!(self.snaplen > 0, "snaplen must be positive, got {}", self.snaplen);
        Ok(ListenerConfig {
            port: self.port,
            interfaces: self.interfaces.clone(),
            snaplen: self.snaplen,
            promiscuous: self.promiscuous,
            reassembly_limits: self.reassembly_limits()?,
            ..ListenerConfig::default()
        })
    }

    fn reassembly_limits(&self) -> Result<ReassemblyLimits> {
        if self.no_eviction {
            return Ok(ReassemblyLimits::unbounded());
        }
        let mut limits = ReassemblyLimits::default();
        if let Some(max_groups) = self.max_groups {
            ensure!(max_groups > 0, "max-groups must be at least 1");
            limits.max_groups = max_groups;
        }
        if let Some(secs) = self.group_ttl_secs {
            limits.group_ttl = (secs > 0).then(|| Duration::from_secs(secs));
        }
        Ok(limits)
    }
}

/// Code table overrides.
#[derive(Debug, Clone, Default, Args)]
pub struct TableArgs {
    /// Event code table (JSON object of code to name).
    #[arg(long)]
    pub events: Option<PathBuf>,
    /// Operation code table (JSON object of code to name).
    #[arg(long)]
    pub operations: Option<PathBuf>,
}

impl TableArgs {
    pub fn load(&self) -> Result<Arc<CodeTables>> {
        let tables = CodeTables::from_paths(self.events.as_deref(), self.operations.as_deref())
            .context("load code tables")?;
        Ok(Arc::new(tables))
    }
}

/// How classified messages are written.
#[derive(Debug, Clone, Copy, Default, Args)]
pub struct OutputArgs {
    /// Pretty-print each message instead of one JSON object per line.
    #[arg(long)]
    pub pretty: bool,
    /// Use a bounded output channel of this many messages.
    #[arg(long, value_name = "N")]
    pub bounded: Option<usize>,
}

impl OutputArgs {
    /// Creates the channel between capture threads and the writer.
    #[must_use]
    pub fn channel(&self) -> (Sender<Message>, Receiver<Message>) {
        match self.bounded {
            Some(capacity) => bounded(capacity),
            None => unbounded(),
        }
    }

    pub fn render(&self, message: &Message) -> Result<String> {
        let text = if self.pretty {
            serde_json::to_string_pretty(message)
        } else {
            serde_json::to_string(message)
        };
        text.context("serialize message")
    }
}

/// Parses hex input, ignoring whitespace and an optional `0x` prefix.
pub fn parse_hex(input: &str) -> Result<Vec<u8>> {
    let digits: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(&digits);
    if digits.len() % 2 != 0 {
        bail!("hex input has an odd number of digits");
    }
    digits
        .as_bytes()
        .chunks(2)
        .enumerate()
        .map(|(i, pair)| {
            let pair = std::str::from_utf8(pair).context("hex input is not ascii")?;
            u8::from_str_radix(pair, 16)
                .with_context(|| format!("invalid hex byte {pair:?} at offset {}", i * 2))
        })
        .collect()
}

/// Runs one transport payload through the full pipeline.
///
/// Returns the classified messages and the dispatch counters. Failures
/// inside the payload are logged and counted, not returned.
pub fn decode_payload(
    payload: &[u8],
    config: &ListenerConfig,
    tables: Arc<CodeTables>,
) -> Result<(Vec<Message>, DispatchSnapshot)> {
    let (tx, rx) = unbounded();
    let dispatcher = Dispatcher::from_config(config, tables, tx);
    dispatcher
        .process_payload(payload)
        .context("dispatch payload")?;
    let stats = dispatcher.stats();
    drop(dispatcher);
    Ok((rx.try_iter().collect(), stats))
}

/// Decodes a single reliable message body, header included.
pub fn decode_body(
    body: &[u8],
    config: &ListenerConfig,
    tables: Arc<CodeTables>,
) -> Result<Message> {
    let message = ReliableMessage::parse(body).context("parse message header")?;
    let decoded = decode_message(&message, &config.codec_limits).context("decode message")?;
    Ok(Classifier::new(tables).classify(decoded))
}

/// Summary of the loaded code tables.
#[must_use]
pub fn tables_summary(tables: &CodeTables, dump: bool) -> serde_json::Value {
    let mut summary = json!({
        "events": tables.events.len(),
        "operations": tables.operations.len(),
        "fingerprint": format!("{:016x}", tables.fingerprint()),
    });
    if dump {
        let entries = |table: &schema::CodeTable| {
            table
                .iter()
                .map(|(code, name)| (code.to_string(), json!(name)))
                .collect::<serde_json::Map<_, _>>()
        };
        summary["event_codes"] = entries(&tables.events).into();
        summary["operation_codes"] = entries(&tables.operations).into();
    }
    summary
}
