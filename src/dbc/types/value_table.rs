use serde::Serialize;
use std::collections::BTreeMap;

use crate::dbc::core::cursor::TextCursor;
use crate::dbc::core::strings::quote;
use crate::dbc::types::{errors::DbcError, object::DbcObject};

/// Reads `<value> "<description>"` pairs up to the end of the record.
fn read_entries(cursor: &mut TextCursor<'_>) -> Result<BTreeMap<i64, String>, DbcError> {
    let mut entries = BTreeMap::new();
    loop {
        if cursor.peek_char() == Some(';') || cursor.is_at_end() {
            break;
        }
        let value: i64 = cursor.next_number("value description key")?;
        let description = cursor.next_quoted()?;
        entries.insert(value, description);
    }
    cursor.finish()?;
    Ok(entries)
}

fn entries_text(entries: &BTreeMap<i64, String>) -> String {
    entries
        .iter()
        .map(|(value, description)| format!(" {} {}", value, quote(description)))
        .collect()
}

/// Named, reusable mapping of raw values to labels (`VAL_TABLE_`).
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ValueTable {
    name: String,
    entries: BTreeMap<i64, String>,
    dbc_text: String,
}

impl ValueTable {
    pub fn new(name: impl Into<String>, entries: BTreeMap<i64, String>) -> Self {
        let name = name.into();
        let dbc_text = format!("VAL_TABLE_ {}{} ;", name, entries_text(&entries));
        Self {
            name,
            entries,
            dbc_text,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &BTreeMap<i64, String> {
        &self.entries
    }

    pub fn description(&self, value: i64) -> Option<&str> {
        self.entries.get(&value).map(String::as_str)
    }

    pub fn dbc_text(&self) -> &str {
        &self.dbc_text
    }
}

impl DbcObject for ValueTable {
    fn from_dbc_text(text: &str) -> Result<Self, DbcError> {
        let mut cursor = TextCursor::new(text, "VAL_TABLE_");
        cursor.expect_keyword("VAL_TABLE_")?;
        let name = cursor.expect_token("value table name")?.to_string();
        let entries = read_entries(&mut cursor)?;
        Ok(Self::new(name, entries))
    }

    fn generate_text(&self) -> String {
        self.dbc_text.clone()
    }
}

/// Value descriptions bound to one signal (`VAL_ <message id> <signal> ...`).
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ValueDescriptions {
    message_id: u32,
    signal: String,
    entries: BTreeMap<i64, String>,
    dbc_text: String,
}

impl ValueDescriptions {
    pub fn new(message_id: u32, signal: impl Into<String>, entries: BTreeMap<i64, String>) -> Self {
        let signal = signal.into();
        let dbc_text = format!("VAL_ {} {}{} ;", message_id, signal, entries_text(&entries));
        Self {
            message_id,
            signal,
            entries,
            dbc_text,
        }
    }

    pub fn message_id(&self) -> u32 {
        self.message_id
    }

    pub fn signal(&self) -> &str {
        &self.signal
    }

    pub fn entries(&self) -> &BTreeMap<i64, String> {
        &self.entries
    }

    pub fn into_entries(self) -> BTreeMap<i64, String> {
        self.entries
    }

    pub fn dbc_text(&self) -> &str {
        &self.dbc_text
    }
}

impl DbcObject for ValueDescriptions {
    fn from_dbc_text(text: &str) -> Result<Self, DbcError> {
        let mut cursor = TextCursor::new(text, "VAL_");
        cursor.expect_keyword("VAL_")?;
        let message_id = cursor.next_number("message id")?;
        let signal = cursor.expect_token("signal name")?.to_string();
        let entries = read_entries(&mut cursor)?;
        Ok(Self::new(message_id, signal, entries))
    }

    fn generate_text(&self) -> String {
        self.dbc_text.clone()
    }
}
