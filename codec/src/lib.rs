//! Protocol16 value decoding and fragment reassembly for pdec.
//!
//! This crate sits above the command framing in `wire`. It turns complete
//! reliable message bodies into generic value trees and stitches fragmented
//! messages back together.
//!
//! # Features
//!
//! - Type-tagged value decoding into a closed [`Value`] tree
//! - Parameter table and message body decoding
//! - Bounded fragment reassembly with TTL and capacity eviction
//! - A canonical encoder for fixtures and fuzz seeds
//!
//! # Design Principles
//!
//! - **Never panic on input** - Malformed bytes fail one value or one message.
//! - **Bounded memory** - Declared counts are checked before allocating.
//! - **No shared state** - Decoding is a pure function of its input.

mod decode;
mod encode;
mod error;
mod limits;
mod message;
mod reassembly;
mod types;
mod value;

pub use decode::{decode_value, read_parameter_table, read_value};
pub use encode::{encode_message, encode_parameter_table, encode_value};
pub use error::{CodecError, CodecResult, LimitKind, ReassemblyError, ReassemblyResult};
pub use limits::CodecLimits;
pub use message::{
    decode_message, decode_parameter_table, DecodedMessage, ParameterTable,
    EVENT_CODE_PARAMETER, OPERATION_CODE_PARAMETER,
};
pub use reassembly::{Reassembler, ReassemblyLimits, ReassemblyStats};
pub use types::TypeCode;
pub use value::Value;
pub use wire::Limits as WireLimits;
