//! Capture sessions and link-layer demultiplexing.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;
use etherparse::{NetSlice, SlicedPacket, TransportSlice};
use pcap::{Activated, Active, Capture, Device, Linktype};
use schema::CodeTables;
use tracing::{debug, info, warn};

use crate::classify::Message;
use crate::config::ListenerConfig;
use crate::dispatch::Dispatcher;
use crate::error::{ListenerError, ListenerResult};
use crate::stats::DispatchSnapshot;

/// Link layers the demultiplexer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkLayer {
    Ethernet,
    /// Frames start at the IP header.
    RawIp,
    /// Linux "cooked" capture, used by the `any` device.
    LinuxSll,
}

impl LinkLayer {
    #[must_use]
    pub fn from_linktype(linktype: Linktype) -> Option<Self> {
        match linktype {
            Linktype::ETHERNET => Some(Self::Ethernet),
            Linktype::RAW | Linktype::IPV4 => Some(Self::RawIp),
            Linktype::LINUX_SLL => Some(Self::LinuxSll),
            _ => None,
        }
    }
}

/// A capture interface as reported by the capture library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceInfo {
    pub name: String,
    pub description: Option<String>,
    pub loopback: bool,
    pub up: bool,
}

impl InterfaceInfo {
    /// Interfaces opened when none are configured explicitly.
    #[must_use]
    pub const fn is_default_candidate(&self) -> bool {
        self.up && !self.loopback
    }
}

/// Lists every interface the capture library can see.
pub fn list_interfaces() -> ListenerResult<Vec<InterfaceInfo>> {
    let devices = Device::list().map_err(|e| ListenerError::DeviceList {
        message: e.to_string(),
    })?;
    Ok(devices
        .into_iter()
        .map(|device| InterfaceInfo {
            loopback: device.flags.is_loopback(),
            up: device.flags.is_up(),
            name: device.name,
            description: device.desc,
        })
        .collect())
}

/// Resolves the interface names to open for `config`.
pub fn resolve_interfaces(config: &ListenerConfig) -> ListenerResult<Vec<String>> {
    if !config.interfaces.is_empty() {
        return Ok(config.interfaces.clone());
    }
    let names: Vec<String> = list_interfaces()?
        .into_iter()
        .filter(InterfaceInfo::is_default_candidate)
        .map(|info| info.name)
        .collect();
    if names.is_empty() {
        return Err(ListenerError::NoInterfaces);
    }
    Ok(names)
}

/// Returns the transport payload of an IPv4 UDP or TCP frame with `port` on
/// either side. Everything else yields `None`.
#[must_use]
pub fn extract_payload(link: LinkLayer, frame: &[u8], port: u16) -> Option<&[u8]> {
    let sliced = match link {
        LinkLayer::Ethernet => SlicedPacket::from_ethernet(frame),
        LinkLayer::RawIp => SlicedPacket::from_ip(frame),
        LinkLayer::LinuxSll => SlicedPacket::from_linux_sll(frame),
    }
    .ok()?;

    if !matches!(sliced.net, Some(NetSlice::Ipv4(_))) {
        return None;
    }
    let (source, destination, payload) = match sliced.transport? {
        TransportSlice::Udp(udp) => (udp.source_port(), udp.destination_port(), udp.payload()),
        TransportSlice::Tcp(tcp) => (tcp.source_port(), tcp.destination_port(), tcp.payload()),
        _ => return None,
    };
    if source != port && destination != port {
        return None;
    }
    if payload.is_empty() {
        return None;
    }
    Some(payload)
}

/// An opened live capture with its filter applied.
pub(crate) struct LiveSession {
    pub name: String,
    pub capture: Capture<Active>,
    pub link: LinkLayer,
}

pub(crate) fn open_live(name: &str, config: &ListenerConfig) -> ListenerResult<LiveSession> {
    let open_err = |e: pcap::Error| ListenerError::Open {
        source: name.to_owned(),
        message: e.to_string(),
    };
    let mut capture = Capture::from_device(name)
        .map_err(open_err)?
        .promisc(config.promiscuous)
        .snaplen(config.snaplen)
        .timeout(config.timeout_ms())
        .open()
        .map_err(open_err)?;

    let link = apply_filter(&mut capture, name, config)?;
    info!(interface = name, filter = %config.bpf_filter(), ?link, "capture opened");
    Ok(LiveSession {
        name: name.to_owned(),
        capture,
        link,
    })
}

fn apply_filter<T: Activated + ?Sized>(
    capture: &mut Capture<T>,
    source: &str,
    config: &ListenerConfig,
) -> ListenerResult<LinkLayer> {
    let filter = config.bpf_filter();
    capture
        .filter(&filter, true)
        .map_err(|e| ListenerError::Filter {
            source: source.to_owned(),
            filter,
            message: e.to_string(),
        })?;
    let linktype = capture.get_datalink();
    LinkLayer::from_linktype(linktype).ok_or_else(|| ListenerError::UnsupportedLinkType {
        source: source.to_owned(),
        linktype: linktype.0,
    })
}

/// Reads frames until shutdown, end of input, or a closed output channel.
pub(crate) fn run_capture<T: Activated + ?Sized>(
    capture: &mut Capture<T>,
    source: &str,
    link: LinkLayer,
    port: u16,
    dispatcher: &Dispatcher,
    shutdown: &AtomicBool,
) -> ListenerResult<()> {
    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!(source, "capture stopping on shutdown");
            return Ok(());
        }
        match capture.next_packet() {
            Ok(packet) => {
                let Some(payload) = extract_payload(link, packet.data, port) else {
                    continue;
                };
                if let Err(ListenerError::OutputClosed) = dispatcher.process_payload(payload) {
                    info!(source, "output closed, capture stopping");
                    return Ok(());
                }
            }
            Err(pcap::Error::TimeoutExpired) => continue,
            Err(pcap::Error::NoMorePackets) => {
                debug!(source, "end of capture");
                return Ok(());
            }
            Err(err) => {
                warn!(source, error = %err, "capture read failed");
                return Err(ListenerError::Read {
                    source: source.to_owned(),
                    message: err.to_string(),
                });
            }
        }
    }
}

/// Runs the decoding pipeline over an offline capture file.
///
/// Messages go to `output` as they would for a live capture. Returns the
/// final counters once the file is exhausted or the output closes.
pub fn replay_file(
    path: &Path,
    config: &ListenerConfig,
    tables: Arc<CodeTables>,
    output: Sender<Message>,
) -> ListenerResult<DispatchSnapshot> {
    let source = path.display().to_string();
    let mut capture = Capture::from_file(path).map_err(|e| ListenerError::File {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let link = apply_filter(&mut capture, &source, config)?;
    info!(file = %source, ?link, "replaying capture file");

    let dispatcher = Dispatcher::from_config(config, tables, output);
    let shutdown = AtomicBool::new(false);
    run_capture(
        &mut capture,
        &source,
        link,
        config.port,
        &dispatcher,
        &shutdown,
    )?;
    Ok(dispatcher.stats())
}
