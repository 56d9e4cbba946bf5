use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;

use codec::{encode_message, DecodedMessage, ParameterTable, Value};
use crossbeam_channel::{bounded, unbounded};
use etherparse::PacketBuilder;
use listener::{
    extract_payload, replay_file, DispatchSnapshot, Dispatcher, LinkLayer, ListenerConfig, Message,
    MessageKind,
};
use schema::CodeTables;
use serde_json::json;
use wire::{
    encode_command, encode_packet_header, split_into_fragment_bodies, CommandKind, PacketHeader,
};

fn tables() -> Arc<CodeTables> {
    Arc::new(CodeTables::from_json_strs(r#"{"1":"PlayerMove"}"#, r#"{"2":"Join"}"#).unwrap())
}

fn event_body(code: u8, entries: &[(u8, Value)]) -> Vec<u8> {
    let parameters: ParameterTable = entries.iter().cloned().collect();
    let mut body = Vec::new();
    encode_message(&DecodedMessage::event(code, parameters), &mut body).unwrap();
    body
}

fn payload<B: AsRef<[u8]>>(commands: &[(CommandKind, u32, B)]) -> Vec<u8> {
    let mut buf = Vec::new();
    let count = u8::try_from(commands.len()).unwrap();
    encode_packet_header(&PacketHeader::new(7, count), &mut buf);
    for (kind, seq, body) in commands {
        encode_command(*kind, 0, *seq, body.as_ref(), &mut buf).unwrap();
    }
    buf
}

fn run(payloads: &[Vec<u8>]) -> Vec<serde_json::Value> {
    run_with_stats(payloads).0
}

fn run_with_stats(payloads: &[Vec<u8>]) -> (Vec<serde_json::Value>, DispatchSnapshot) {
    let (tx, rx) = unbounded();
    let dispatcher = Dispatcher::from_config(&ListenerConfig::for_testing(), tables(), tx);
    for payload in payloads {
        dispatcher.process_payload(payload).unwrap();
    }
    let stats = dispatcher.stats();
    drop(dispatcher);
    let out = rx.iter().map(|m| serde_json::to_value(&m).unwrap()).collect();
    (out, stats)
}

/// Collects formatted log lines in memory.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn with_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, logs.text())
}

#[test]
fn known_event_end_to_end() {
    let body = event_body(1, &[(252, Value::Int(1)), (1, Value::Int(42))]);
    let out = run(&[payload(&[(CommandKind::SendReliable, 1, &body)])]);
    assert_eq!(
        out,
        vec![json!({"type": "Event", "name": "PlayerMove", "data": {"252": 1, "1": 42}})]
    );
}

#[test]
fn unknown_event_code_falls_back() {
    let body = event_body(1, &[(252, Value::Int(9999))]);
    let out = run(&[payload(&[(CommandKind::SendReliable, 1, &body)])]);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0]["type"], "Event");
    assert_eq!(out[0]["name"], "Unknown (9999)");
}

#[test]
fn event_without_code_is_move() {
    let body = event_body(3, &[(0, Value::Int(5)), (1, Value::Float(1.5))]);
    let out = run(&[payload(&[(CommandKind::SendReliable, 1, &body)])]);
    assert_eq!(
        out,
        vec![json!({"type": "Event", "name": "Move", "data": {"0": 5, "1": 1.5}})]
    );
}

#[test]
fn truncated_header_does_not_poison_next_payload() {
    let good = event_body(1, &[(252, Value::Int(1))]);
    let truncated = payload(&[(CommandKind::SendReliable, 1, &good)])[..8].to_vec();
    let next = payload(&[(CommandKind::SendReliable, 2, &good)]);
    let ((out, stats), logs) = with_logs(|| run_with_stats(&[truncated, next]));

    assert_eq!(out.len(), 1);
    assert_eq!(out[0]["name"], "PlayerMove");
    assert_eq!(stats.malformed_payloads, 1);
    assert_eq!(stats.messages, 1);
    assert_eq!(logs.matches("discarding malformed payload").count(), 1);
    assert_eq!(logs.matches("WARN").count(), 1);
}

#[test]
fn operation_response_carries_parameters() {
    let parameters: ParameterTable = [(253, Value::Int(2)), (0, Value::from("room"))]
        .into_iter()
        .collect();
    let mut body = Vec::new();
    encode_message(
        &DecodedMessage::response(2, 0, Value::Null, parameters),
        &mut body,
    )
    .unwrap();
    let out = run(&[payload(&[(CommandKind::SendReliable, 1, &body)])]);
    assert_eq!(
        out,
        vec![json!({"type": "OperationResponse", "name": "Join", "data": {"253": 2, "0": "room"}})]
    );
}

#[test]
fn fragments_from_two_threads_reassemble_once() {
    let (tx, rx) = bounded::<Message>(4);
    let dispatcher = Dispatcher::from_config(&ListenerConfig::for_testing(), tables(), tx);
    let body = event_body(
        1,
        &[(252, Value::Int(1)), (4, Value::Bytes((0..=200).collect()))],
    );
    let bodies = split_into_fragment_bodies(90, &body, 16).unwrap();
    let payloads: Vec<Vec<u8>> = bodies
        .iter()
        .enumerate()
        .map(|(i, fragment)| {
            let seq = 90 + u32::try_from(i).unwrap();
            payload(&[(CommandKind::SendReliableFragment, seq, fragment)])
        })
        .collect();

    let (even, odd): (Vec<_>, Vec<_>) = payloads
        .into_iter()
        .enumerate()
        .partition(|(i, _)| i % 2 == 0);
    let workers: Vec<_> = [even, odd]
        .into_iter()
        .map(|share| {
            let dispatcher = dispatcher.clone();
            thread::spawn(move || {
                for (_, payload) in share.into_iter().rev() {
                    dispatcher.process_payload(&payload).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let stats = dispatcher.stats();
    drop(dispatcher);
    let messages: Vec<Message> = rx.iter().collect();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].kind, MessageKind::Event);
    assert_eq!(messages[0].name, "PlayerMove");
    assert_eq!(stats.reassembly.completed, 1);
    assert_eq!(stats.fragments, bodies.len() as u64);
}

fn udp_frame(source: u16, destination: u16, data: &[u8]) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [6, 5, 4, 3, 2, 1])
        .ipv4([192, 168, 1, 10], [192, 168, 1, 20], 64)
        .udp(source, destination);
    let mut frame = Vec::new();
    builder.write(&mut frame, data).unwrap();
    frame
}

#[test]
fn frames_filtered_by_port_before_dispatch() {
    let body = event_body(1, &[(252, Value::Int(1))]);
    let data = payload(&[(CommandKind::SendReliable, 1, &body)]);
    let on_port = udp_frame(40000, 5056, &data);
    let off_port = udp_frame(40000, 5057, &data);

    assert_eq!(
        extract_payload(LinkLayer::Ethernet, &on_port, 5056),
        Some(data.as_slice())
    );
    assert_eq!(extract_payload(LinkLayer::Ethernet, &off_port, 5056), None);
}

// Classic pcap layout: little-endian global header, Ethernet link type.
fn write_pcap(frames: &[Vec<u8>]) -> PathBuf {
    let mut file = Vec::new();
    file.extend_from_slice(&0xa1b2_c3d4u32.to_le_bytes());
    file.extend_from_slice(&2u16.to_le_bytes());
    file.extend_from_slice(&4u16.to_le_bytes());
    file.extend_from_slice(&0i32.to_le_bytes());
    file.extend_from_slice(&0u32.to_le_bytes());
    file.extend_from_slice(&65535u32.to_le_bytes());
    file.extend_from_slice(&1u32.to_le_bytes());
    for (i, frame) in frames.iter().enumerate() {
        let len = u32::try_from(frame.len()).unwrap();
        file.extend_from_slice(&u32::try_from(i + 1).unwrap().to_le_bytes());
        file.extend_from_slice(&0u32.to_le_bytes());
        file.extend_from_slice(&len.to_le_bytes());
        file.extend_from_slice(&len.to_le_bytes());
        file.extend_from_slice(frame);
    }

    let dir = std::env::temp_dir().join(format!("pdec-listener-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("replay.pcap");
    fs::write(&path, file).unwrap();
    path
}

#[test]
fn replay_file_decodes_captured_frames() {
    let known = event_body(1, &[(252, Value::Int(1)), (1, Value::Int(42))]);
    let unknown = event_body(1, &[(252, Value::Int(9999))]);
    let path = write_pcap(&[
        udp_frame(40000, 5056, &payload(&[(CommandKind::SendReliable, 1, &known)])),
        udp_frame(40000, 6000, &payload(&[(CommandKind::SendReliable, 2, &known)])),
        udp_frame(5056, 40000, &payload(&[(CommandKind::SendReliable, 3, &unknown)])),
    ]);

    let (tx, rx) = unbounded();
    let stats = replay_file(&path, &ListenerConfig::for_testing(), tables(), tx).unwrap();
    let names: Vec<String> = rx.iter().map(|m| m.name).collect();
    assert_eq!(names, vec!["PlayerMove", "Unknown (9999)"]);
    assert_eq!(stats.payloads, 2);
    assert_eq!(stats.messages, 2);
}

#[test]
fn replay_missing_file_is_an_error() {
    let (tx, _rx) = unbounded();
    let missing = std::env::temp_dir().join("pdec-listener-does-not-exist.pcap");
    let err = replay_file(&missing, &ListenerConfig::default(), tables(), tx).unwrap_err();
    assert!(matches!(err, listener::ListenerError::File { .. }));
}
