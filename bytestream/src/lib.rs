//! Bounded byte reading and writing primitives for pdec.
//!
//! This crate provides [`ByteReader`] and [`ByteWriter`] for the big-endian,
//! byte-aligned encoding used by the captured protocol. It is designed for
//! bounded, panic-free operation with explicit error handling.
//!
//! # Design Principles
//!
//! - **No unsafe code** - Safety is paramount.
//! - **Bounded operations** - All reads are bounds-checked.
//! - **No domain knowledge** - This crate knows nothing about commands, fragments, or values.
//! - **Explicit errors** - All failures return structured errors, never panic.
//!
//! # Example
//!
//! ```
//! use bytestream::{ByteReader, ByteWriter};
//!
//! let mut writer = ByteWriter::new();
//! writer.write_u8(0xF3);
//! writer.write_u16(512);
//!
//! let bytes = writer.finish();
//!
//! let mut reader = ByteReader::new(&bytes);
//! assert_eq!(reader.read_u8().unwrap(), 0xF3);
//! assert_eq!(reader.read_u16().unwrap(), 512);
//! ```

mod error;
mod reader;
mod writer;

pub use error::{ByteError, ByteResult};
pub use reader::ByteReader;
pub use writer::ByteWriter;
