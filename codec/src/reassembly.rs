//! Fragment reassembly for split reliable messages.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use tracing::{debug, trace};
use wire::{FragmentChunk, ReliableMessage};

use crate::error::{ReassemblyError, ReassemblyResult};

/// Bounds on buffered fragment state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReassemblyLimits {
    /// Maximum number of incomplete groups held at once.
    pub max_groups: usize,
    /// Maximum bytes reserved across all incomplete groups.
    pub max_buffered_bytes: usize,
    /// Maximum declared length of a single assembled message.
    pub max_message_len: usize,
    /// How long an incomplete group may wait for its remaining chunks.
    pub group_ttl: Option<Duration>,
}

impl Default for ReassemblyLimits {
    fn default() -> Self {
        Self {
            max_groups: 256,
            max_buffered_bytes: 8 * 1024 * 1024,
            max_message_len: 1024 * 1024,
            group_ttl: Some(Duration::from_secs(30)),
        }
    }
}

impl ReassemblyLimits {
    /// Creates limits suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_groups: 4,
            max_buffered_bytes: 4096,
            max_message_len: 1024,
            group_ttl: Some(Duration::from_secs(1)),
        }
    }

    /// Never evicts and never expires. Incomplete groups stay buffered until
    /// they complete.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            max_groups: usize::MAX,
            max_buffered_bytes: usize::MAX,
            max_message_len: usize::MAX,
            group_ttl: None,
        }
    }
}

/// Counters describing what the reassembler has done with offered chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReassemblyStats {
    pub completed: u64,
    pub duplicates: u64,
    pub rejected: u64,
    pub expired: u64,
    pub evicted: u64,
}

/// Buffers fragment chunks by group until every index has arrived.
///
/// The first chunk of a group fixes its total length and fragment count.
/// Groups are independent of one another.
///
/// Completed group ids are remembered for `group_ttl`, up to `max_groups`
/// of them, so a retransmitted chunk of a finished group is a duplicate
/// rather than the start of a new one.
#[derive(Debug)]
pub struct Reassembler {
    limits: ReassemblyLimits,
    groups: HashMap<u32, FragmentGroup>,
    order: VecDeque<u32>,
    buffered_bytes: usize,
    completed: HashMap<u32, CompletedGroup>,
    completed_order: VecDeque<u32>,
    stats: ReassemblyStats,
}

#[derive(Debug, Clone, Copy)]
struct CompletedGroup {
    total_length: u32,
    fragment_count: u32,
    expires_at: Option<Instant>,
}

impl CompletedGroup {
    fn matches(&self, chunk: &FragmentChunk<'_>) -> bool {
        self.total_length == chunk.total_length && self.fragment_count == chunk.fragment_count
    }
}

#[derive(Debug)]
struct FragmentGroup {
    total_length: u32,
    fragment_count: u32,
    received_bytes: Vec<u8>,
    received_mask: Vec<bool>,
    received_count: u32,
    expires_at: Option<Instant>,
}

impl FragmentGroup {
    fn new(total_length: u32, fragment_count: u32, expires_at: Option<Instant>) -> Self {
        Self {
            total_length,
            fragment_count,
            received_bytes: vec![0; total_length as usize],
            received_mask: vec![false; fragment_count as usize],
            received_count: 0,
            expires_at,
        }
    }

    fn is_complete(&self) -> bool {
        self.received_count == self.fragment_count
    }
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new(ReassemblyLimits::default())
    }
}

impl Reassembler {
    #[must_use]
    pub fn new(limits: ReassemblyLimits) -> Self {
        Self {
            limits,
            groups: HashMap::new(),
            order: VecDeque::new(),
            buffered_bytes: 0,
            completed: HashMap::new(),
            completed_order: VecDeque::new(),
            stats: ReassemblyStats::default(),
        }
    }

    #[must_use]
    pub const fn limits(&self) -> &ReassemblyLimits {
        &self.limits
    }

    #[must_use]
    pub const fn stats(&self) -> ReassemblyStats {
        self.stats
    }

    /// Number of incomplete groups currently buffered.
    #[must_use]
    pub fn pending_groups(&self) -> usize {
        self.groups.len()
    }

    /// Bytes reserved by incomplete groups.
    #[must_use]
    pub const fn buffered_bytes(&self) -> usize {
        self.buffered_bytes
    }

    /// Number of completed group ids still remembered.
    #[must_use]
    pub fn remembered_groups(&self) -> usize {
        self.completed.len()
    }

    /// Offers a chunk using the current time for expiry.
    pub fn offer(&mut self, chunk: &FragmentChunk<'_>) -> ReassemblyResult<Option<ReliableMessage>> {
        self.offer_at(chunk, Instant::now())
    }

    /// Offers a chunk at `now`.
    ///
    /// Returns the reconstructed message when this chunk completes its
    /// group, `Ok(None)` while the group is still incomplete or the chunk is
    /// a re-delivery, and an error when the chunk is inconsistent.
    pub fn offer_at(
        &mut self,
        chunk: &FragmentChunk<'_>,
        now: Instant,
    ) -> ReassemblyResult<Option<ReliableMessage>> {
        self.collect_expired(now);
        let result = self.merge(chunk, now);
        if result.is_err() {
            self.stats.rejected += 1;
        }
        result
    }

    /// Removes groups whose TTL has passed. Returns how many incomplete
    /// groups were dropped.
    pub fn collect_expired(&mut self, now: Instant) -> usize {
        while let Some(&group_id) = self.completed_order.front() {
            let expired = match self.completed.get(&group_id) {
                Some(done) => done.expires_at.is_some_and(|at| at <= now),
                None => true,
            };
            if !expired {
                break;
            }
            self.completed_order.pop_front();
            self.completed.remove(&group_id);
        }

        let mut dropped = 0;
        while let Some(&group_id) = self.order.front() {
            let expired = match self.groups.get(&group_id) {
                Some(group) => group.expires_at.is_some_and(|at| at <= now),
                None => true,
            };
            if !expired {
                break;
            }
            self.order.pop_front();
            if let Some(group) = self.groups.remove(&group_id) {
                self.release(&group);
                self.stats.expired += 1;
                dropped += 1;
                debug!(
                    group_id,
                    received = group.received_count,
                    fragment_count = group.fragment_count,
                    "fragment group expired"
                );
            }
        }
        dropped
    }

    fn merge(
        &mut self,
        chunk: &FragmentChunk<'_>,
        now: Instant,
    ) -> ReassemblyResult<Option<ReliableMessage>> {
        let group_id = chunk.fragment_group_id;

        // A different shape means the id was reused for a new message.
        let reused = match self.completed.get(&group_id) {
            Some(done) if done.matches(chunk) => {
                self.stats.duplicates += 1;
                trace!(group_id, index = chunk.fragment_index, "chunk of completed group ignored");
                return Ok(None);
            }
            Some(_) => true,
            None => false,
        };

        match self.groups.get(&group_id) {
            Some(group) => {
                if group.total_length != chunk.total_length
                    || group.fragment_count != chunk.fragment_count
                {
                    return Err(ReassemblyError::GroupMismatch {
                        group_id,
                        expected_total: group.total_length,
                        expected_count: group.fragment_count,
                        found_total: chunk.total_length,
                        found_count: chunk.fragment_count,
                    });
                }
            }
            None => self.validate_new_group(chunk)?,
        }
        validate_placement(chunk)?;
        if reused {
            self.forget_completed(group_id);
        }

        if !self.groups.contains_key(&group_id) {
            let total = chunk.total_length as usize;
            self.make_room(total);
            let expires_at = self.limits.group_ttl.and_then(|ttl| now.checked_add(ttl));
            self.groups.insert(
                group_id,
                FragmentGroup::new(chunk.total_length, chunk.fragment_count, expires_at),
            );
            self.order.push_back(group_id);
            self.buffered_bytes = self.buffered_bytes.saturating_add(total);
        }

        let Some(group) = self.groups.get_mut(&group_id) else {
            return Ok(None);
        };
        let index = chunk.fragment_index as usize;
        if group.received_mask[index] {
            self.stats.duplicates += 1;
            trace!(group_id, index, "duplicate fragment ignored");
            return Ok(None);
        }

        let start = chunk.chunk_offset as usize;
        group.received_bytes[start..start + chunk.data.len()].copy_from_slice(chunk.data);
        group.received_mask[index] = true;
        group.received_count += 1;
        if !group.is_complete() {
            return Ok(None);
        }

        let Some(group) = self.groups.remove(&group_id) else {
            return Ok(None);
        };
        self.order.retain(|id| *id != group_id);
        self.release(&group);
        self.remember_completed(group_id, &group, now);
        self.stats.completed += 1;
        trace!(group_id, len = group.received_bytes.len(), "fragment group complete");
        let message = ReliableMessage::parse(&group.received_bytes)?;
        Ok(Some(message))
    }

    fn validate_new_group(&self, chunk: &FragmentChunk<'_>) -> ReassemblyResult<()> {
        let group_id = chunk.fragment_group_id;
        if chunk.fragment_count == 0 {
            return Err(ReassemblyError::ZeroFragmentCount { group_id });
        }
        let limit = self.limits.max_message_len.min(self.limits.max_buffered_bytes);
        if chunk.total_length as usize > limit {
            return Err(ReassemblyError::MessageTooLarge {
                group_id,
                total_length: chunk.total_length,
                limit,
            });
        }
        if chunk.fragment_count > chunk.total_length.max(1) {
            return Err(ReassemblyError::FragmentCountExceedsLength {
                group_id,
                fragment_count: chunk.fragment_count,
                total_length: chunk.total_length,
            });
        }
        Ok(())
    }

    /// Evicts the oldest groups until a new group of `additional` bytes fits.
    fn make_room(&mut self, additional: usize) {
        while self.groups.len() >= self.limits.max_groups
            || self.buffered_bytes.saturating_add(additional) > self.limits.max_buffered_bytes
        {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if let Some(group) = self.groups.remove(&oldest) {
                self.release(&group);
                self.stats.evicted += 1;
                debug!(
                    group_id = oldest,
                    received = group.received_count,
                    fragment_count = group.fragment_count,
                    "evicting oldest fragment group"
                );
            }
        }
    }

    fn remember_completed(&mut self, group_id: u32, group: &FragmentGroup, now: Instant) {
        if self.limits.max_groups == 0 {
            return;
        }
        while self.completed.len() >= self.limits.max_groups {
            let Some(oldest) = self.completed_order.pop_front() else {
                break;
            };
            self.completed.remove(&oldest);
        }
        let done = CompletedGroup {
            total_length: group.total_length,
            fragment_count: group.fragment_count,
            expires_at: self.limits.group_ttl.and_then(|ttl| now.checked_add(ttl)),
        };
        self.completed.insert(group_id, done);
        self.completed_order.push_back(group_id);
    }

    fn forget_completed(&mut self, group_id: u32) {
        self.completed.remove(&group_id);
        self.completed_order.retain(|id| *id != group_id);
    }

    fn release(&mut self, group: &FragmentGroup) {
        self.buffered_bytes = self
            .buffered_bytes
            .saturating_sub(group.received_bytes.len());
    }
}

fn validate_placement(chunk: &FragmentChunk<'_>) -> ReassemblyResult<()> {
    let group_id = chunk.fragment_group_id;
    if chunk.fragment_index >= chunk.fragment_count {
        return Err(ReassemblyError::IndexOutOfRange {
            group_id,
            index: chunk.fragment_index,
            fragment_count: chunk.fragment_count,
        });
    }
    let end = u64::from(chunk.chunk_offset) + chunk.data.len() as u64;
    if end > u64::from(chunk.total_length) {
        return Err(ReassemblyError::ChunkOverflow {
            group_id,
            offset: chunk.chunk_offset,
            len: chunk.data.len(),
            total_length: chunk.total_length,
        });
    }
    Ok(())
}
