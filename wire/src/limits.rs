//! Configurable limits for bounded decoding.

/// Wire-level limits for packet decoding.
///
/// These limits are enforced while framing commands so a hostile or corrupt
/// capture cannot force unbounded work per packet. Value decoding limits
/// belong to the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum captured payload size in bytes.
    pub max_packet_bytes: usize,

    /// Maximum number of commands in a packet.
    pub max_commands: usize,

    /// Maximum declared length of a single command, header included.
    pub max_command_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            // Captures are UDP datagrams or TCP segments; 64 KB covers both.
            max_packet_bytes: 64 * 1024,
            max_commands: 64,
            max_command_len: 64 * 1024,
        }
    }
}

impl Limits {
    /// Creates limits suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_packet_bytes: 4096,
            max_commands: 8,
            max_command_len: 1024,
        }
    }

    /// Creates limits with no restrictions (use with caution).
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_packet_bytes: usize::MAX,
            max_commands: usize::MAX,
            max_command_len: usize::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits_values() {
        let limits = Limits::default();
        assert_eq!(limits.max_packet_bytes, 64 * 1024);
        assert_eq!(limits.max_commands, 64);
    }

    #[test]
    fn testing_limits_smaller() {
        let test_limits = Limits::for_testing();
        let default_limits = Limits::default();

        assert!(test_limits.max_packet_bytes < default_limits.max_packet_bytes);
        assert!(test_limits.max_commands < default_limits.max_commands);
        assert!(test_limits.max_command_len < default_limits.max_command_len);
    }

    #[test]
    fn unlimited_limits() {
        let limits = Limits::unlimited();
        assert_eq!(limits.max_packet_bytes, usize::MAX);
        assert_eq!(limits.max_commands, usize::MAX);
        assert_eq!(limits.max_command_len, usize::MAX);
    }

    #[test]
    fn limits_const_constructible() {
        const LIMITS: Limits = Limits::for_testing();
        assert_eq!(LIMITS.max_packet_bytes, 4096);
    }
}
