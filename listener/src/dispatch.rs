//! Routing captured payloads through framing, reassembly, decoding and
//! classification.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use codec::{decode_message, CodecLimits, Reassembler, ReassemblyLimits};
use crossbeam_channel::Sender;
use schema::CodeTables;
use tracing::{debug, trace, warn};
use wire::{decode_packet, Command, CommandKind, FragmentChunk, ReliableMessage};

use crate::classify::{Classifier, Message};
use crate::config::ListenerConfig;
use crate::error::{ListenerError, ListenerResult};
use crate::stats::{DispatchSnapshot, DispatchStats};

/// Turns transport payloads into classified messages on the output channel.
///
/// Cloning is cheap. Clones share one reassembler, one set of counters and
/// one output channel, so every capture thread can hold its own.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    classifier: Classifier,
    reassembler: Arc<Mutex<Reassembler>>,
    wire_limits: wire::Limits,
    codec_limits: CodecLimits,
    stats: Arc<DispatchStats>,
    output: Sender<Message>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        tables: Arc<CodeTables>,
        wire_limits: wire::Limits,
        codec_limits: CodecLimits,
        reassembly_limits: ReassemblyLimits,
        output: Sender<Message>,
    ) -> Self {
        Self {
            classifier: Classifier::new(tables),
            reassembler: Arc::new(Mutex::new(Reassembler::new(reassembly_limits))),
            wire_limits,
            codec_limits,
            stats: Arc::new(DispatchStats::default()),
            output,
        }
    }

    /// Builds a dispatcher from the limits in `config`.
    #[must_use]
    pub fn from_config(
        config: &ListenerConfig,
        tables: Arc<CodeTables>,
        output: Sender<Message>,
    ) -> Self {
        Self::new(
            tables,
            config.wire_limits.clone(),
            config.codec_limits.clone(),
            config.reassembly_limits.clone(),
            output,
        )
    }

    /// Current counters, including the shared reassembler's.
    #[must_use]
    pub fn stats(&self) -> DispatchSnapshot {
        let mut snapshot = self.stats.snapshot();
        snapshot.reassembly = self.lock_reassembler().stats();
        snapshot
    }

    /// Processes one transport payload.
    ///
    /// A payload that fails framing yields no commands and is counted as
    /// malformed. Individual commands that fail to decode are logged and
    /// skipped. Returns the number of messages sent, or
    /// [`ListenerError::OutputClosed`] once nobody is receiving.
    pub fn process_payload(&self, payload: &[u8]) -> ListenerResult<usize> {
        self.stats.record_payload();
        let packet = match decode_packet(payload, &self.wire_limits) {
            Ok(packet) => packet,
            Err(err) => {
                self.stats.record_malformed_payload();
                warn!(len = payload.len(), error = %err, "discarding malformed payload");
                return Ok(0);
            }
        };
        self.stats.record_commands(packet.commands.len());

        let mut sent = 0;
        for command in &packet.commands {
            match command.kind {
                kind if kind.carries_message() => {
                    sent += self.dispatch_body(command)?;
                }
                CommandKind::SendReliableFragment => {
                    sent += self.dispatch_fragment(command)?;
                }
                other => {
                    self.stats.record_ignored_command();
                    trace!(kind = ?other, "ignoring command");
                }
            }
        }
        Ok(sent)
    }

    fn dispatch_body(&self, command: &Command<'_>) -> ListenerResult<usize> {
        match ReliableMessage::parse(command.data) {
            Ok(message) => self.emit(&message),
            Err(err) => {
                self.stats.record_message_failure();
                warn!(
                    kind = ?command.kind,
                    seq = command.reliable_sequence_number,
                    error = %err,
                    "discarding command body"
                );
                Ok(0)
            }
        }
    }

    fn dispatch_fragment(&self, command: &Command<'_>) -> ListenerResult<usize> {
        self.stats.record_fragment();
        let chunk = match FragmentChunk::parse(command) {
            Ok(chunk) => chunk,
            Err(err) => {
                self.stats.record_fragment_failure();
                warn!(
                    seq = command.reliable_sequence_number,
                    error = %err,
                    "discarding fragment"
                );
                return Ok(0);
            }
        };

        let offered = self.lock_reassembler().offer(&chunk);
        match offered {
            Ok(Some(message)) => {
                debug!(
                    group_id = chunk.fragment_group_id,
                    fragments = chunk.fragment_count,
                    "reassembled message"
                );
                self.emit(&message)
            }
            Ok(None) => Ok(0),
            Err(err) => {
                self.stats.record_fragment_failure();
                warn!(
                    group_id = chunk.fragment_group_id,
                    index = chunk.fragment_index,
                    error = %err,
                    "rejected fragment"
                );
                Ok(0)
            }
        }
    }

    fn emit(&self, message: &ReliableMessage) -> ListenerResult<usize> {
        let decoded = match decode_message(message, &self.codec_limits) {
            Ok(decoded) => decoded,
            Err(err) => {
                self.stats.record_message_failure();
                warn!(
                    message_type = ?message.message_type,
                    code = message.code,
                    error = %err,
                    "discarding undecodable message"
                );
                return Ok(0);
            }
        };

        let classified = self.classifier.classify(decoded);
        trace!(kind = ?classified.kind, name = %classified.name, "classified message");
        self.output
            .send(classified)
            .map_err(|_| ListenerError::OutputClosed)?;
        self.stats.record_message();
        Ok(1)
    }

    // Reassembler state is consistent between calls, so a poisoned lock is
    // still usable.
    fn lock_reassembler(&self) -> MutexGuard<'_, Reassembler> {
        self.reassembler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
