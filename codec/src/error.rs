//! Error types for value decoding and fragment reassembly.

use std::fmt;

use bytestream::ByteError;
use wire::DecodeError;

/// Result type for value decoding and encoding.
pub type CodecResult<T> = Result<T, CodecError>;

/// Result type for fragment reassembly.
pub type ReassemblyResult<T> = Result<T, ReassemblyError>;

/// Errors that can occur while decoding or encoding Protocol16 values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Byte-level read or write failure (truncation, length overflow).
    Bytes(ByteError),

    /// Reliable message header failure.
    Wire(DecodeError),

    /// A type tag this decoder does not know.
    UnknownTypeCode { tag: u8 },

    /// A map key that cannot be canonicalized to a string.
    InvalidKey { found: &'static str },

    /// A typed array whose element type occupies no bytes.
    ZeroWidthElement { tag: u8 },

    /// Limits exceeded.
    LimitsExceeded {
        kind: LimitKind,
        limit: usize,
        actual: usize,
    },
}

/// Specific limit that was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    Depth,
    CollectionLength,
    StringLength,
    BytesLength,
    Values,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(e) => write!(f, "byte error: {e}"),
            Self::Wire(e) => write!(f, "wire error: {e}"),
            Self::UnknownTypeCode { tag } => {
                write!(f, "unknown type code 0x{tag:02X}")
            }
            Self::InvalidKey { found } => {
                write!(f, "{found} cannot be used as a map key")
            }
            Self::ZeroWidthElement { tag } => {
                write!(f, "typed array element type 0x{tag:02X} has no width")
            }
            Self::LimitsExceeded {
                kind,
                limit,
                actual,
            } => {
                write!(f, "{kind} limit exceeded: {actual} > {limit}")
            }
        }
    }
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Depth => "nesting depth",
            Self::CollectionLength => "collection length",
            Self::StringLength => "string length",
            Self::BytesLength => "byte array length",
            Self::Values => "decoded value count",
        };
        write!(f, "{name}")
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bytes(e) => Some(e),
            Self::Wire(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ByteError> for CodecError {
    fn from(err: ByteError) -> Self {
        Self::Bytes(err)
    }
}

impl From<DecodeError> for CodecError {
    fn from(err: DecodeError) -> Self {
        Self::Wire(err)
    }
}

/// Errors reported when a fragment chunk cannot be merged.
///
/// A rejected chunk never modifies buffered group state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReassemblyError {
    /// The chunk declares a group of zero fragments.
    ZeroFragmentCount { group_id: u32 },

    /// The chunk declares more fragments than the message has bytes.
    FragmentCountExceedsLength {
        group_id: u32,
        fragment_count: u32,
        total_length: u32,
    },

    /// Fragment index outside `[0, fragment_count)`.
    IndexOutOfRange {
        group_id: u32,
        index: u32,
        fragment_count: u32,
    },

    /// Chunk bytes would land past the end of the message buffer.
    ChunkOverflow {
        group_id: u32,
        offset: u32,
        len: usize,
        total_length: u32,
    },

    /// The declared message length is larger than reassembly allows.
    MessageTooLarge {
        group_id: u32,
        total_length: u32,
        limit: usize,
    },

    /// The chunk disagrees with the group's first chunk.
    GroupMismatch {
        group_id: u32,
        expected_total: u32,
        expected_count: u32,
        found_total: u32,
        found_count: u32,
    },

    /// The assembled bytes are not a valid reliable message.
    Message(DecodeError),
}

impl fmt::Display for ReassemblyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroFragmentCount { group_id } => {
                write!(f, "fragment group {group_id} declares zero fragments")
            }
            Self::FragmentCountExceedsLength {
                group_id,
                fragment_count,
                total_length,
            } => {
                write!(
                    f,
                    "fragment group {group_id} declares {fragment_count} fragments for {total_length} bytes"
                )
            }
            Self::IndexOutOfRange {
                group_id,
                index,
                fragment_count,
            } => {
                write!(
                    f,
                    "fragment index {index} out of range for group {group_id} of {fragment_count}"
                )
            }
            Self::ChunkOverflow {
                group_id,
                offset,
                len,
                total_length,
            } => {
                write!(
                    f,
                    "chunk at offset {offset} with {len} bytes overflows group {group_id} of {total_length} bytes"
                )
            }
            Self::MessageTooLarge {
                group_id,
                total_length,
                limit,
            } => {
                write!(
                    f,
                    "fragment group {group_id} message length {total_length} exceeds {limit}"
                )
            }
            Self::GroupMismatch {
                group_id,
                expected_total,
                expected_count,
                found_total,
                found_count,
            } => {
                write!(
                    f,
                    "fragment group {group_id} mismatch: expected {expected_count} fragments/{expected_total} bytes, \
                     found {found_count}/{found_total}"
                )
            }
            Self::Message(e) => write!(f, "assembled message invalid: {e}"),
        }
    }
}

impl std::error::Error for ReassemblyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Message(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DecodeError> for ReassemblyError {
    fn from(err: DecodeError) -> Self {
        Self::Message(err)
    }
}
