//! Error types for capture and dispatch.

use std::fmt;
use std::path::PathBuf;

/// Result type for listener operations.
pub type ListenerResult<T> = Result<T, ListenerError>;

/// Errors that stop a capture session or prevent one from starting.
///
/// Per-packet decode failures are not errors here; they are logged and
/// counted in the dispatch stats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerError {
    /// Interfaces could not be enumerated.
    DeviceList { message: String },

    /// No interface matched the configuration.
    NoInterfaces,

    /// A capture session could not be opened.
    Open { source: String, message: String },

    /// The capture filter was rejected.
    Filter {
        source: String,
        filter: String,
        message: String,
    },

    /// The capture's link layer cannot be demultiplexed.
    UnsupportedLinkType { source: String, linktype: i32 },

    /// A capture thread could not be spawned.
    Spawn { source: String, message: String },

    /// A capture thread panicked.
    ThreadPanicked { source: String },

    /// Reading from a capture failed.
    Read { source: String, message: String },

    /// A capture file could not be opened.
    File { path: PathBuf, message: String },

    /// Every receiver of the output channel is gone.
    OutputClosed,
}

impl fmt::Display for ListenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceList { message } => write!(f, "failed to list interfaces: {message}"),
            Self::NoInterfaces => write!(f, "no capture interfaces available"),
            Self::Open { source, message } => {
                write!(f, "failed to open capture on {source}: {message}")
            }
            Self::Filter {
                source,
                filter,
                message,
            } => {
                write!(f, "failed to set filter {filter:?} on {source}: {message}")
            }
            Self::UnsupportedLinkType { source, linktype } => {
                write!(f, "unsupported link type {linktype} on {source}")
            }
            Self::Spawn { source, message } => {
                write!(f, "failed to spawn capture thread for {source}: {message}")
            }
            Self::ThreadPanicked { source } => write!(f, "capture thread for {source} panicked"),
            Self::Read { source, message } => {
                write!(f, "capture read on {source} failed: {message}")
            }
            Self::File { path, message } => {
                write!(f, "failed to open capture file {}: {message}", path.display())
            }
            Self::OutputClosed => write!(f, "output channel closed"),
        }
    }
}

impl std::error::Error for ListenerError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_open() {
        let err = ListenerError::Open {
            source: "eth0".to_owned(),
            message: "permission denied".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("eth0"), "should mention interface");
        assert!(msg.contains("permission denied"), "should carry cause");
    }

    #[test]
    fn error_display_filter() {
        let err = ListenerError::Filter {
            source: "any".to_owned(),
            filter: "port 5056".to_owned(),
            message: "syntax".to_owned(),
        };
        assert!(err.to_string().contains("port 5056"));
    }
}
