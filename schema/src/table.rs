//! Code-to-name tables.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{SchemaError, SchemaResult, TableKind};

const BUNDLED_EVENTS: &str = include_str!("../assets/event_codes.json");
const BUNDLED_OPERATIONS: &str = include_str!("../assets/operation_codes.json");

/// A read-only map from integer code to name.
///
/// Lookups take the stringified code as it appears in a decoded parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeTable {
    kind: Option<TableKind>,
    entries: BTreeMap<i64, String>,
}

impl CodeTable {
    /// Parses a JSON object whose keys are decimal codes and values names.
    pub fn from_json_str(kind: TableKind, json: &str) -> SchemaResult<Self> {
        let raw: BTreeMap<String, String> =
            serde_json::from_str(json).map_err(|e| SchemaError::Json {
                table: kind,
                message: e.to_string(),
            })?;

        let mut entries = BTreeMap::new();
        for (code, name) in raw {
            let parsed = code.parse::<i64>().map_err(|_| SchemaError::InvalidCode {
                table: kind,
                code: code.clone(),
            })?;
            if name.is_empty() {
                return Err(SchemaError::EmptyName { table: kind, code });
            }
            entries.insert(parsed, name);
        }
        Ok(Self {
            kind: Some(kind),
            entries,
        })
    }

    /// Reads and parses a table file.
    pub fn from_path(kind: TableKind, path: &Path) -> SchemaResult<Self> {
        let json = fs::read_to_string(path).map_err(|e| SchemaError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json_str(kind, &json)
    }

    #[must_use]
    pub const fn kind(&self) -> Option<TableKind> {
        self.kind
    }

    /// Looks up a stringified code such as `"1"` or `"-3"`.
    #[must_use]
    pub fn get(&self, code: &str) -> Option<&str> {
        let code = code.parse::<i64>().ok()?;
        self.get_code(code)
    }

    #[must_use]
    pub fn get_code(&self, code: i64) -> Option<&str> {
        self.entries.get(&code).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in ascending code order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, &str)> {
        self.entries.iter().map(|(code, name)| (*code, name.as_str()))
    }
}

/// The event and operation tables used by the classifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeTables {
    pub events: CodeTable,
    pub operations: CodeTable,
}

impl CodeTables {
    #[must_use]
    pub const fn new(events: CodeTable, operations: CodeTable) -> Self {
        Self { events, operations }
    }

    /// Loads the tables embedded in this crate.
    pub fn bundled() -> SchemaResult<Self> {
        Self::from_json_strs(BUNDLED_EVENTS, BUNDLED_OPERATIONS)
    }

    pub fn from_json_strs(events: &str, operations: &str) -> SchemaResult<Self> {
        Ok(Self {
            events: CodeTable::from_json_str(TableKind::Events, events)?,
            operations: CodeTable::from_json_str(TableKind::Operations, operations)?,
        })
    }

    /// Loads override files. A table without a path falls back to the
    /// bundled one.
    pub fn from_paths(events: Option<&Path>, operations: Option<&Path>) -> SchemaResult<Self> {
        let events = match events {
            Some(path) => CodeTable::from_path(TableKind::Events, path)?,
            None => CodeTable::from_json_str(TableKind::Events, BUNDLED_EVENTS)?,
        };
        let operations = match operations {
            Some(path) => CodeTable::from_path(TableKind::Operations, path)?,
            None => CodeTable::from_json_str(TableKind::Operations, BUNDLED_OPERATIONS)?,
        };
        Ok(Self { events, operations })
    }

    #[must_use]
    pub fn event_name(&self, code: &str) -> Option<&str> {
        self.events.get(code)
    }

    #[must_use]
    pub fn operation_name(&self, code: &str) -> Option<&str> {
        self.operations.get(code)
    }
}
