//! Dispatch counters shared by capture threads.

use std::sync::atomic::{AtomicU64, Ordering};

use codec::ReassemblyStats;

/// Counters updated concurrently by every capture thread.
#[derive(Debug, Default)]
pub struct DispatchStats {
    payloads: AtomicU64,
    malformed_payloads: AtomicU64,
    commands: AtomicU64,
    ignored_commands: AtomicU64,
    fragments: AtomicU64,
    fragment_failures: AtomicU64,
    message_failures: AtomicU64,
    messages: AtomicU64,
}

/// A point-in-time copy of [`DispatchStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSnapshot {
    pub payloads: u64,
    pub malformed_payloads: u64,
    pub commands: u64,
    pub ignored_commands: u64,
    pub fragments: u64,
    pub fragment_failures: u64,
    pub message_failures: u64,
    pub messages: u64,
    pub reassembly: ReassemblyStats,
}

impl DispatchStats {
    pub(crate) fn record_payload(&self) {
        self.payloads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_malformed_payload(&self) {
        self.malformed_payloads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_commands(&self, count: usize) {
        self.commands.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_ignored_command(&self) {
        self.ignored_commands.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fragment(&self) {
        self.fragments.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fragment_failure(&self) {
        self.fragment_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_message_failure(&self) {
        self.message_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_message(&self) {
        self.messages.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies the counters. `reassembly` is filled in by the dispatcher.
    #[must_use]
    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            payloads: self.payloads.load(Ordering::Relaxed),
            malformed_payloads: self.malformed_payloads.load(Ordering::Relaxed),
            commands: self.commands.load(Ordering::Relaxed),
            ignored_commands: self.ignored_commands.load(Ordering::Relaxed),
            fragments: self.fragments.load(Ordering::Relaxed),
            fragment_failures: self.fragment_failures.load(Ordering::Relaxed),
            message_failures: self.message_failures.load(Ordering::Relaxed),
            messages: self.messages.load(Ordering::Relaxed),
            reassembly: ReassemblyStats::default(),
        }
    }
}
