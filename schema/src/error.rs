//! Code table loading errors.

use std::fmt;
use std::path::PathBuf;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Which code table an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    Events,
    Operations,
}

/// Errors that can occur when loading code tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A table file could not be read.
    Io { path: PathBuf, message: String },

    /// A table is not a JSON object of string to string.
    Json { table: TableKind, message: String },

    /// A table key is not a decimal integer code.
    InvalidCode { table: TableKind, code: String },

    /// A table entry has an empty name.
    EmptyName { table: TableKind, code: String },
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Events => write!(f, "event"),
            Self::Operations => write!(f, "operation"),
        }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, message } => {
                write!(f, "failed to read {}: {message}", path.display())
            }
            Self::Json { table, message } => {
                write!(f, "malformed {table} code table: {message}")
            }
            Self::InvalidCode { table, code } => {
                write!(f, "{table} code table key {code:?} is not an integer")
            }
            Self::EmptyName { table, code } => {
                write!(f, "{table} code {code} has an empty name")
            }
        }
    }
}

impl std::error::Error for SchemaError {}
