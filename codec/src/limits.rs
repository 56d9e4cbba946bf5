//! Limits for value decoding.

/// Bounds enforced while decoding Protocol16 values.
///
/// Every declared count or length is checked against these before anything
/// is allocated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecLimits {
    /// Maximum nesting of containers (arrays, tables, nested messages).
    pub max_depth: usize,
    /// Maximum element count of any single collection.
    pub max_collection_len: usize,
    /// Maximum byte length of a single string.
    pub max_string_len: usize,
    /// Maximum byte length of a byte array or custom value.
    pub max_bytes_len: usize,
    /// Maximum number of values produced by one decode call, nested
    /// elements included.
    pub max_values: usize,
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self {
            max_depth: 32,
            max_collection_len: 65_536,
            max_string_len: 64 * 1024,
            max_bytes_len: 1024 * 1024,
            max_values: 1 << 20,
        }
    }
}

impl CodecLimits {
    /// Creates limits suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_depth: 8,
            max_collection_len: 256,
            max_string_len: 1024,
            max_bytes_len: 4096,
            max_values: 4096,
        }
    }

    /// Creates limits with no restrictions (use with caution).
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_depth: usize::MAX,
            max_collection_len: usize::MAX,
            max_string_len: usize::MAX,
            max_bytes_len: usize::MAX,
            max_values: usize::MAX,
        }
    }
}
