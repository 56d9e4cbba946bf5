//! Listener configuration.

use std::time::Duration;

use codec::{CodecLimits, ReassemblyLimits};

/// Default port carrying the captured protocol.
pub const DEFAULT_PORT: u16 = 5056;

/// Settings for capture sessions and the decoding pipeline behind them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerConfig {
    /// UDP/TCP port to capture on either side.
    pub port: u16,
    /// Interfaces to open. Empty means every non-loopback interface that is up.
    pub interfaces: Vec<String>,
    /// Maximum bytes captured per frame.
    pub snaplen: i32,
    pub promiscuous: bool,
    /// How long a capture read blocks before checking for shutdown.
    pub read_timeout: Duration,
    pub wire_limits: wire::Limits,
    pub codec_limits: CodecLimits,
    pub reassembly_limits: ReassemblyLimits,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            interfaces: Vec::new(),
            snaplen: 2048,
            promiscuous: false,
            read_timeout: Duration::from_millis(500),
            wire_limits: wire::Limits::default(),
            codec_limits: CodecLimits::default(),
            reassembly_limits: ReassemblyLimits::default(),
        }
    }
}

impl ListenerConfig {
    /// Creates a config with small limits and a short read timeout.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            read_timeout: Duration::from_millis(50),
            wire_limits: wire::Limits::for_testing(),
            codec_limits: CodecLimits::for_testing(),
            reassembly_limits: ReassemblyLimits::for_testing(),
            ..Self::default()
        }
    }

    /// BPF expression selecting traffic on the configured port.
    #[must_use]
    pub fn bpf_filter(&self) -> String {
        format!("port {}", self.port)
    }

    /// Read timeout in whole milliseconds, as the capture library expects.
    #[must_use]
    pub fn timeout_ms(&self) -> i32 {
        i32::try_from(self.read_timeout.as_millis()).unwrap_or(i32::MAX)
    }
}
