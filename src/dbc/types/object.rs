use serde::Serialize;
use std::fmt;

use crate::dbc::core::cursor::TextCursor;
use crate::dbc::types::{attributes::DbcObjType, errors::DbcError};

/// A DBC record that can be read from text and written back to canonical text.
///
/// Re-generated text is not a byte copy of the input (whitespace and `//`
/// comments are dropped) but parses back into an equal value.
pub trait DbcObject: Sized {
    /// Parses one record of this kind.
    fn from_dbc_text(text: &str) -> Result<Self, DbcError>;

    /// Canonical DBC text for this record.
    fn generate_text(&self) -> String;
}

/// Non-owning reference to the object a `CM_` or `BA_` record targets.
///
/// Nodes are named, messages are addressed by their raw DBC id and signals by
/// message id plus signal name, exactly as they appear in the file.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ObjectRef {
    Database,
    Node(String),
    Message(u32),
    Signal { message_id: u32, signal: String },
}

impl ObjectRef {
    pub fn kind(&self) -> DbcObjType {
        match self {
            ObjectRef::Database => DbcObjType::Database,
            ObjectRef::Node(_) => DbcObjType::Node,
            ObjectRef::Message(_) => DbcObjType::Message,
            ObjectRef::Signal { .. } => DbcObjType::Signal,
        }
    }

    /// Reads an optional `BU_ <name>` / `BO_ <id>` / `SG_ <id> <name>` selector.
    pub(crate) fn parse(cursor: &mut TextCursor<'_>) -> Result<Self, DbcError> {
        if cursor.eat_keyword("BU_") {
            let name = cursor.expect_token("node name")?;
            Ok(ObjectRef::Node(name.to_string()))
        } else if cursor.eat_keyword("BO_") {
            Ok(ObjectRef::Message(cursor.next_number("message id")?))
        } else if cursor.eat_keyword("SG_") {
            let message_id = cursor.next_number("message id")?;
            let signal = cursor.expect_token("signal name")?.to_string();
            Ok(ObjectRef::Signal { message_id, signal })
        } else if cursor.eat_keyword("EV_") {
            Err(cursor.error("environment variables are not supported"))
        } else {
            Ok(ObjectRef::Database)
        }
    }

    /// Selector text followed by a space, empty for the database itself.
    pub(crate) fn prefix(&self) -> String {
        match self {
            ObjectRef::Database => String::new(),
            ObjectRef::Node(name) => format!("BU_ {} ", name),
            ObjectRef::Message(id) => format!("BO_ {} ", id),
            ObjectRef::Signal { message_id, signal } => format!("SG_ {} {} ", message_id, signal),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectRef::Database => f.write_str("database"),
            ObjectRef::Node(name) => write!(f, "node '{}'", name),
            ObjectRef::Message(id) => write!(f, "message {}", id),
            ObjectRef::Signal { message_id, signal } => {
                write!(f, "signal '{}' of message {}", signal, message_id)
            }
        }
    }
}
