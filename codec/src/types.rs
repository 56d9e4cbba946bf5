//! Protocol16 type tags.

/// Type tag that prefixes every serialized Protocol16 value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode {
    Null,
    Byte,
    Short,
    Integer,
    Long,
    Float,
    Double,
    Boolean,
    String,
    StringArray,
    ByteArray,
    IntegerArray,
    /// Homogeneous array: one element tag, untagged elements.
    Array,
    /// Heterogeneous array: every element carries its own tag.
    ObjectArray,
    Hashtable,
    Dictionary,
    Custom,
    EventData,
    OperationRequest,
    OperationResponse,
}

impl TypeCode {
    /// Parses a tag byte. Both `0` and `'*'` denote null.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Option<Self> {
        let code = match raw {
            0 | b'*' => Self::Null,
            b'b' => Self::Byte,
            b'k' => Self::Short,
            b'i' => Self::Integer,
            b'l' => Self::Long,
            b'f' => Self::Float,
            b'd' => Self::Double,
            b'o' => Self::Boolean,
            b's' => Self::String,
            b'a' => Self::StringArray,
            b'x' => Self::ByteArray,
            b'n' => Self::IntegerArray,
            b'y' => Self::Array,
            b'z' => Self::ObjectArray,
            b'h' => Self::Hashtable,
            b'D' => Self::Dictionary,
            b'c' => Self::Custom,
            b'e' => Self::EventData,
            b'q' => Self::OperationRequest,
            b'p' => Self::OperationResponse,
            _ => return None,
        };
        Some(code)
    }

    /// Canonical tag byte written by the encoder.
    #[must_use]
    pub const fn raw(self) -> u8 {
        match self {
            Self::Null => b'*',
            Self::Byte => b'b',
            Self::Short => b'k',
            Self::Integer => b'i',
            Self::Long => b'l',
            Self::Float => b'f',
            Self::Double => b'd',
            Self::Boolean => b'o',
            Self::String => b's',
            Self::StringArray => b'a',
            Self::ByteArray => b'x',
            Self::IntegerArray => b'n',
            Self::Array => b'y',
            Self::ObjectArray => b'z',
            Self::Hashtable => b'h',
            Self::Dictionary => b'D',
            Self::Custom => b'c',
            Self::EventData => b'e',
            Self::OperationRequest => b'q',
            Self::OperationResponse => b'p',
        }
    }

    /// Returns `true` if dictionary entries declared with this tag carry
    /// their own per-entry tag.
    #[must_use]
    pub const fn is_dynamic(raw: u8) -> bool {
        raw == 0 || raw == b'*'
    }
}
