#![no_main]

use libfuzzer_sys::fuzz_target;
use wire::{decode_packet, CommandKind, FragmentChunk, ReliableMessage};

fuzz_target!(|data: &[u8]| {
    let limits = wire::Limits::for_testing();
    let Ok(packet) = decode_packet(data, &limits) else {
        return;
    };
    assert!(packet.commands.len() <= limits.max_commands);

    for command in &packet.commands {
        match command.kind {
            CommandKind::SendReliableFragment => {
                if let Ok(chunk) = FragmentChunk::parse(command) {
                    assert!(chunk.data.len() <= command.data.len());
                }
            }
            _ => {
                let _ = ReliableMessage::parse(command.data);
            }
        }
    }
});
