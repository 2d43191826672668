use serde::Serialize;
use std::collections::BTreeMap;

use crate::dbc::core::cursor::TextCursor;
use crate::dbc::types::{
    attributes::{AttributeObject, AttributeValue},
    errors::DbcError,
    object::DbcObject,
    signal::{NO_NODE, Signal},
};

/// Bit 31 of a DBC message id flags a 29-bit identifier.
pub const EXTENDED_ID_FLAG: u32 = 0x8000_0000;

#[derive(Default, Copy, Clone, PartialEq, Eq, Debug, Serialize)]
pub enum IdFormat {
    #[default]
    Standard,
    Extended,
}

/// CAN message (`BO_`) with the signals it carries, in declaration order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Message {
    /// Raw DBC id, including the extended flag.
    id: u32,
    name: String,
    /// Payload length in bytes.
    dlc: u16,
    transmitter: Option<String>,
    /// Additional senders declared with `BO_TX_BU_`.
    extra_transmitters: Vec<String>,
    signals: Vec<Signal>,
    comment: Option<String>,
    attributes: BTreeMap<String, AttributeValue>,
    #[serde(skip)]
    dbc_text: String,
}

impl Message {
    /// A transmitter of `None` (or `Vector__XXX`) means no sender.
    pub fn new(
        id: u32,
        name: impl Into<String>,
        dlc: u16,
        transmitter: Option<String>,
        signals: Vec<Signal>,
    ) -> Result<Self, DbcError> {
        let mut message = Self {
            id,
            name: name.into(),
            dlc,
            transmitter: transmitter.filter(|t| t != NO_NODE),
            extra_transmitters: Vec::new(),
            signals: Vec::with_capacity(signals.len()),
            comment: None,
            attributes: BTreeMap::new(),
            dbc_text: String::new(),
        };
        for signal in signals {
            message.push_signal(signal)?;
        }
        message.refresh_text();
        Ok(message)
    }

    fn push_signal(&mut self, signal: Signal) -> Result<(), DbcError> {
        if self.signal(signal.name()).is_some() {
            return Err(DbcError::DuplicateName {
                kind: "signal",
                name: format!("{}.{}", self.name, signal.name()),
            });
        }
        self.signals.push(signal);
        Ok(())
    }

    /// Appends a signal; names are unique within a message.
    pub fn add_signal(&mut self, signal: Signal) -> Result<(), DbcError> {
        self.push_signal(signal)?;
        self.refresh_text();
        Ok(())
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// CAN identifier without the extended flag.
    pub fn can_id(&self) -> u32 {
        self.id & !EXTENDED_ID_FLAG
    }

    pub fn id_format(&self) -> IdFormat {
        if self.id & EXTENDED_ID_FLAG != 0 {
            IdFormat::Extended
        } else {
            IdFormat::Standard
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dlc(&self) -> u16 {
        self.dlc
    }

    pub fn transmitter(&self) -> Option<&str> {
        self.transmitter.as_deref()
    }

    pub fn extra_transmitters(&self) -> &[String] {
        &self.extra_transmitters
    }

    /// Adds `BO_TX_BU_` senders, skipping ones already known.
    pub fn add_transmitters<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if name == NO_NODE
                || self.transmitter.as_deref() == Some(name.as_str())
                || self.extra_transmitters.contains(&name)
            {
                continue;
            }
            self.extra_transmitters.push(name);
        }
    }

    /// Main transmitter followed by the `BO_TX_BU_` senders.
    pub fn transmitters(&self) -> impl Iterator<Item = &str> + '_ {
        self.transmitter
            .iter()
            .chain(self.extra_transmitters.iter())
            .map(String::as_str)
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn signal(&self, name: &str) -> Option<&Signal> {
        self.signals.iter().find(|s| s.name() == name)
    }

    pub fn signal_mut(&mut self, name: &str) -> Option<&mut Signal> {
        self.signals.iter_mut().find(|s| s.name() == name)
    }

    /// The first signal marked ` M`.
    pub fn multiplexor(&self) -> Option<&Signal> {
        self.signals.iter().find(|s| s.is_multiplexor())
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn set_comment(&mut self, comment: Option<String>) {
        self.comment = comment;
    }

    /// `BO_` line followed by its indented `SG_` lines.
    pub fn dbc_text(&self) -> &str {
        &self.dbc_text
    }

    fn refresh_text(&mut self) {
        let mut text = format!(
            "BO_ {} {}: {} {}",
            self.id,
            self.name,
            self.dlc,
            self.transmitter.as_deref().unwrap_or(NO_NODE)
        );
        for signal in &self.signals {
            text.push_str("\n ");
            text.push_str(signal.dbc_text());
        }
        self.dbc_text = text;
    }
}

impl DbcObject for Message {
    /// `BO_ <id> <name>: <dlc> <transmitter>` followed by one `SG_` per line.
    fn from_dbc_text(text: &str) -> Result<Self, DbcError> {
        let mut lines = text.lines();
        let header = lines
            .next()
            .ok_or_else(|| DbcError::malformed("BO_", "empty record"))?;
        let mut cursor = TextCursor::new(header, "BO_");
        cursor.expect_keyword("BO_")?;
        let id: u32 = cursor.next_number("message id")?;
        let name = cursor.expect_token("message name")?;
        cursor.expect_char(':')?;
        let dlc: u16 = cursor.next_number("message size")?;
        let transmitter = cursor.next_token().map(str::to_string);
        cursor.finish()?;

        let signals = lines
            .filter(|line| !line.trim().is_empty())
            .map(Signal::from_dbc_text)
            .collect::<Result<Vec<_>, _>>()?;
        Message::new(id, name, dlc, transmitter, signals)
    }

    fn generate_text(&self) -> String {
        self.dbc_text.clone()
    }
}

impl AttributeObject for Message {
    fn attribute_values(&self) -> &BTreeMap<String, AttributeValue> {
        &self.attributes
    }

    fn attribute_values_mut(&mut self) -> &mut BTreeMap<String, AttributeValue> {
        &mut self.attributes
    }
}

/// Extra senders of a message (`BO_TX_BU_ <id> : <node>,<node>;`).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MessageTransmitters {
    message_id: u32,
    transmitters: Vec<String>,
}

impl MessageTransmitters {
    pub fn new(message_id: u32, transmitters: Vec<String>) -> Self {
        Self {
            message_id,
            transmitters,
        }
    }

    pub fn message_id(&self) -> u32 {
        self.message_id
    }

    pub fn transmitters(&self) -> &[String] {
        &self.transmitters
    }

    pub fn into_transmitters(self) -> Vec<String> {
        self.transmitters
    }
}

impl DbcObject for MessageTransmitters {
    fn from_dbc_text(text: &str) -> Result<Self, DbcError> {
        let mut cursor = TextCursor::new(text, "BO_TX_BU_");
        cursor.expect_keyword("BO_TX_BU_")?;
        let message_id = cursor.next_number("message id")?;
        cursor.expect_char(':')?;
        let mut transmitters = Vec::new();
        loop {
            if let Some(token) = cursor.next_token() {
                transmitters.push(token.to_string());
            } else if !cursor.eat_char(',') {
                break;
            }
        }
        cursor.finish()?;
        Ok(Self::new(message_id, transmitters))
    }

    fn generate_text(&self) -> String {
        format!(
            "BO_TX_BU_ {} : {};",
            self.message_id,
            self.transmitters.join(",")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbc::types::signal::Endianness;

    const ENGINE: &str = "BO_ 100 EngineData: 8 ECU1\n SG_ Speed : 0|16@1+ (0.1,0) [0|6553.5] \"km/h\" ECU2,ECU3\n SG_ Rpm : 16|16@1+ (1,0) [0|8000] \"rpm\" ECU2";

    #[test]
    fn test_parse_message() {
        let msg = Message::from_dbc_text(ENGINE).unwrap();
        assert_eq!(msg.id(), 100);
        assert_eq!(msg.name(), "EngineData");
        assert_eq!(msg.dlc(), 8);
        assert_eq!(msg.transmitter(), Some("ECU1"));
        assert_eq!(msg.signals().len(), 2);
        assert_eq!(msg.signals()[1].name(), "Rpm");
        assert_eq!(msg.dbc_text(), ENGINE);
        assert_eq!(msg.id_format(), IdFormat::Standard);
    }

    #[test]
    fn test_extended_id() {
        let msg = Message::from_dbc_text("BO_ 2364540158 EEC1: 8 Vector__XXX").unwrap();
        assert_eq!(msg.id_format(), IdFormat::Extended);
        assert_eq!(msg.can_id(), 0x0CF0_04FE);
        assert_eq!(msg.transmitter(), None);
        assert!(msg.signals().is_empty());
        assert_eq!(msg.dbc_text(), "BO_ 2364540158 EEC1: 8 Vector__XXX");
    }

    #[test]
    fn test_duplicate_signal_name() {
        let text = "BO_ 1 M: 8 A\n SG_ S : 0|8@1+ (1,0) [0|0] \"\" B\n SG_ S : 8|8@1+ (1,0) [0|0] \"\" B";
        assert!(matches!(
            Message::from_dbc_text(text),
            Err(DbcError::DuplicateName { kind: "signal", .. })
        ));
    }

    #[test]
    fn test_signal_error_aborts_message() {
        let text = "BO_ 1 M: 8 A\n SG_ S : 0|8@1+ (1,0) [0|0 \"\" B";
        assert!(Message::from_dbc_text(text).is_err());
    }

    #[test]
    fn test_add_signal_regenerates_text() {
        let mut msg = Message::new(7, "Status", 1, None, vec![]).unwrap();
        let flag = Signal::new("Flag", 0, 1, Endianness::Intel, false).unwrap();
        msg.add_signal(flag).unwrap();
        assert_eq!(
            msg.dbc_text(),
            "BO_ 7 Status: 1 Vector__XXX\n SG_ Flag : 0|1@1+ (1,0) [0|0] \"\" Vector__XXX"
        );
    }

    #[test]
    fn test_new_message_builds_text() {
        let speed = Signal::new("Speed", 0, 16, Endianness::Intel, false)
            .unwrap()
            .with_scaling(0.1, 0.0)
            .unwrap()
            .with_receivers(["ECU2"])
            .unwrap();
        let msg = Message::new(100, "EngineData", 8, Some("ECU1".into()), vec![speed]).unwrap();
        assert_eq!(
            msg.dbc_text(),
            "BO_ 100 EngineData: 8 ECU1\n SG_ Speed : 0|16@1+ (0.1,0) [0|0] \"\" ECU2"
        );
        assert_eq!(msg.generate_text(), msg.dbc_text());
    }

    #[test]
    fn test_transmitters() {
        let mut msg = Message::from_dbc_text("BO_ 5 Shared: 2 A").unwrap();
        let extra = MessageTransmitters::from_dbc_text("BO_TX_BU_ 5 : B,A , C;").unwrap();
        assert_eq!(extra.generate_text(), "BO_TX_BU_ 5 : B,A,C;");
        msg.add_transmitters(extra.into_transmitters());
        assert_eq!(msg.transmitters().collect::<Vec<_>>(), ["A", "B", "C"]);
        assert_eq!(msg.extra_transmitters(), ["B", "C"]);
    }
}
