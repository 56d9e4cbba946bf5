//! Event and operation code tables for pdec.
//!
//! The classifier names decoded messages by looking up their event or
//! operation code in these tables:
//! - Bundled tables embedded at build time
//! - Override files loaded at startup
//! - Deterministic fingerprints for telling table versions apart
//!
//! # Design Principles
//!
//! - **Explicit loading** - Tables are built once and shared, never global.
//! - **Fail at startup** - A malformed table is an error, not a silent gap.

mod error;
mod hash;
mod table;

pub use error::{SchemaError, SchemaResult, TableKind};
pub use hash::{table_fingerprint, tables_fingerprint};
pub use table::{CodeTable, CodeTables};

impl CodeTables {
    /// Fingerprint over both tables.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        tables_fingerprint(self)
    }
}
