//! Naming decoded messages with the code tables.

use std::sync::Arc;

use codec::{DecodedMessage, Value, EVENT_CODE_PARAMETER, OPERATION_CODE_PARAMETER};
use schema::CodeTables;
use serde::Serialize;
use tracing::warn;
use wire::MessageType;

/// Name given to events that carry no event code parameter.
pub const IMPLICIT_EVENT_NAME: &str = "Move";

/// Output category of a classified message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MessageKind {
    Event,
    OperationRequest,
    OperationResponse,
}

impl From<MessageType> for MessageKind {
    fn from(message_type: MessageType) -> Self {
        match message_type {
            MessageType::EventData => Self::Event,
            MessageType::OperationRequest => Self::OperationRequest,
            MessageType::OperationResponse => Self::OperationResponse,
        }
    }
}

/// A named, decoded message ready for consumers.
///
/// Serializes as `{"type": ..., "name": ..., "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub name: String,
    /// Every decoded parameter, keyed by decimal parameter code.
    pub data: Value,
}

/// Assigns names to decoded messages.
#[derive(Debug, Clone)]
pub struct Classifier {
    tables: Arc<CodeTables>,
}

impl Classifier {
    #[must_use]
    pub const fn new(tables: Arc<CodeTables>) -> Self {
        Self { tables }
    }

    #[must_use]
    pub fn tables(&self) -> &CodeTables {
        &self.tables
    }

    /// Classifies a decoded message. Lookup misses produce an
    /// `Unknown (<code>)` name and a warning, never an error.
    #[must_use]
    pub fn classify(&self, message: DecodedMessage) -> Message {
        let kind = MessageKind::from(message.message_type);
        let name = match kind {
            MessageKind::Event => match message.parameters.get(EVENT_CODE_PARAMETER) {
                None => IMPLICIT_EVENT_NAME.to_owned(),
                Some(code) => lookup(code, |key| self.tables.event_name(key), kind),
            },
            MessageKind::OperationRequest | MessageKind::OperationResponse => {
                match message.parameters.get(OPERATION_CODE_PARAMETER) {
                    None => {
                        warn!(?kind, code = message.code, "operation without operation code");
                        "Unknown (none)".to_owned()
                    }
                    Some(code) => lookup(code, |key| self.tables.operation_name(key), kind),
                }
            }
        };

        Message {
            kind,
            name,
            data: message.parameters.into_value(),
        }
    }
}

fn lookup<'t>(code: &Value, table: impl Fn(&str) -> Option<&'t str>, kind: MessageKind) -> String {
    let key = code
        .key_string()
        .unwrap_or_else(|| code.type_name().to_owned());
    if let Some(name) = table(&key) {
        return name.to_owned();
    }
    warn!(?kind, code = %key, "unknown code");
    format!("Unknown ({key})")
}
