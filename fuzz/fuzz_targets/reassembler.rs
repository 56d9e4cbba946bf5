#![no_main]

use std::time::{Duration, Instant};

use codec::{Reassembler, ReassemblyLimits};
use libfuzzer_sys::fuzz_target;
use wire::FragmentChunk;

// Each step reads an 8-byte header then up to 15 chunk bytes. Small field
// ranges keep groups colliding so duplicates, mismatches and completion
// all occur.
fuzz_target!(|data: &[u8]| {
    let mut reassembler = Reassembler::new(ReassemblyLimits::for_testing());
    let start = Instant::now();
    let mut now = start;
    let mut rest = data;

    while rest.len() >= 8 {
        let (head, tail) = rest.split_at(8);
        let len = usize::from(head[7] % 16).min(tail.len());
        let (chunk_data, tail) = tail.split_at(len);
        rest = tail;

        now += Duration::from_millis(u64::from(head[6]) * 8);
        let chunk = FragmentChunk {
            channel_id: 0,
            reliable_sequence_number: u32::from(head[0]),
            fragment_group_id: u32::from(head[0] % 8),
            fragment_count: u32::from(head[1] % 8),
            fragment_index: u32::from(head[2] % 8),
            total_length: u32::from(head[3]),
            chunk_offset: u32::from(head[4]),
            data: chunk_data,
        };

        let before = reassembler.buffered_bytes();
        if reassembler.offer_at(&chunk, now).is_err() {
            assert!(reassembler.buffered_bytes() <= before);
        }
        assert!(reassembler.pending_groups() <= reassembler.limits().max_groups);
        assert!(reassembler.remembered_groups() <= reassembler.limits().max_groups);
        assert!(reassembler.buffered_bytes() <= reassembler.limits().max_buffered_bytes);
    }
});
