use serde::Serialize;

use crate::dbc::core::cursor::TextCursor;
use crate::dbc::core::strings::quote;
use crate::dbc::types::{
    errors::DbcError,
    object::{DbcObject, ObjectRef},
};

/// Free-text annotation (`CM_`) attached to the database, a node, a message or a signal.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Comment {
    target: ObjectRef,
    text: String,
    dbc_text: String,
}

impl Comment {
    pub fn new(target: ObjectRef, text: impl Into<String>) -> Self {
        let text = text.into();
        let dbc_text = format!("CM_ {}{};", target.prefix(), quote(&text));
        Self {
            target,
            text,
            dbc_text,
        }
    }

    pub fn target(&self) -> &ObjectRef {
        &self.target
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn dbc_text(&self) -> &str {
        &self.dbc_text
    }
}

impl DbcObject for Comment {
    fn from_dbc_text(text: &str) -> Result<Self, DbcError> {
        let mut cursor = TextCursor::new(text, "CM_");
        cursor.expect_keyword("CM_")?;
        let target = ObjectRef::parse(&mut cursor)?;
        let body = cursor.next_quoted()?;
        cursor.finish()?;
        Ok(Self::new(target, body))
    }

    fn generate_text(&self) -> String {
        self.dbc_text.clone()
    }
}
