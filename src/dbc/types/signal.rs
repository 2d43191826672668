use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::dbc::core::cursor::{TextCursor, parse_number};
use crate::dbc::core::message_layout::{Step, compile_steps};
use crate::dbc::core::strings::{format_f64, quote};
use crate::dbc::types::{
    attributes::{AttributeObject, AttributeValue},
    errors::DbcError,
    object::DbcObject,
};

/// Receiver placeholder meaning "no receiver".
pub const NO_NODE: &str = "Vector__XXX";

/// Byte order of a signal (`@0` / `@1`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endianness {
    /// Big-endian, `@0`. The start bit is the most significant bit.
    #[default]
    Motorola,
    /// Little-endian, `@1`. The start bit is the least significant bit.
    Intel,
}

/// Multiplexing role of a signal within its message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MuxRole {
    #[default]
    None,
    /// The selector signal (` M`).
    Multiplexor,
    /// Present only when the multiplexor carries this value (` m<N>`).
    Multiplexed(u32),
}

/// Definition of a signal within a CAN message.
///
/// Describes position/bit-length, endianness, sign, scaling (factor/offset),
/// valid range, unit of measure, value descriptions, and receiver nodes.
/// Layout fields are fixed at construction; the extraction steps are
/// precomputed from them.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Signal {
    name: String,
    mux: MuxRole,
    start_bit: u16,
    length: u16,
    endianness: Endianness,
    is_signed: bool,
    factor: f64,
    offset: f64,
    minimum: f64,
    maximum: f64,
    unit: String,
    receivers: Vec<String>,
    value_definitions: BTreeMap<i64, String>,
    comment: Option<String>,
    attributes: BTreeMap<String, AttributeValue>,
    #[serde(skip)]
    steps: Vec<Step>,
    #[serde(skip)]
    dbc_text: String,
}

impl Signal {
    /// New signal with factor 1, offset 0, no range, no unit and no receivers.
    pub fn new(
        name: impl Into<String>,
        start_bit: u16,
        length: u16,
        endianness: Endianness,
        is_signed: bool,
    ) -> Result<Self, DbcError> {
        let name = name.into();
        if length == 0 || length > 64 {
            return Err(DbcError::InvalidLayout {
                signal: name,
                details: format!("length {} is outside 1..=64", length),
            });
        }
        let mut signal = Self {
            name,
            mux: MuxRole::None,
            start_bit,
            length,
            endianness,
            is_signed,
            factor: 1.0,
            offset: 0.0,
            minimum: 0.0,
            maximum: 0.0,
            unit: String::new(),
            receivers: Vec::new(),
            value_definitions: BTreeMap::new(),
            comment: None,
            attributes: BTreeMap::new(),
            steps: compile_steps(start_bit, length, endianness),
            dbc_text: String::new(),
        };
        signal.refresh_text();
        Ok(signal)
    }

    pub fn with_scaling(mut self, factor: f64, offset: f64) -> Result<Self, DbcError> {
        if factor == 0.0 || !factor.is_finite() {
            return Err(DbcError::InvalidLayout {
                signal: self.name,
                details: format!("factor {} cannot scale a raw value", factor),
            });
        }
        self.factor = factor;
        self.offset = offset;
        self.refresh_text();
        Ok(self)
    }

    pub fn with_range(mut self, minimum: f64, maximum: f64) -> Self {
        self.minimum = minimum;
        self.maximum = maximum;
        self.refresh_text();
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self.refresh_text();
        self
    }

    pub fn with_mux(mut self, mux: MuxRole) -> Self {
        self.mux = mux;
        self.refresh_text();
        self
    }

    /// Receiver node names; `Vector__XXX` entries are dropped.
    pub fn with_receivers<I, S>(mut self, receivers: I) -> Result<Self, DbcError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = Vec::new();
        for r in receivers {
            let r = r.into();
            if r == NO_NODE {
                continue;
            }
            if names.contains(&r) {
                return Err(DbcError::malformed(
                    "SG_",
                    format!("receiver '{}' listed twice for signal '{}'", r, self.name),
                ));
            }
            names.push(r);
        }
        self.receivers = names;
        self.refresh_text();
        Ok(self)
    }

    pub fn with_value_definitions(mut self, definitions: BTreeMap<i64, String>) -> Self {
        self.value_definitions = definitions;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mux_role(&self) -> MuxRole {
        self.mux
    }

    pub fn is_multiplexor(&self) -> bool {
        self.mux == MuxRole::Multiplexor
    }

    /// True for every signal taking part in multiplexing, the multiplexor
    /// included. Only switched signals carry a [`multiplexer_identifier`].
    ///
    /// [`multiplexer_identifier`]: Signal::multiplexer_identifier
    pub fn is_multiplexed(&self) -> bool {
        self.mux != MuxRole::None
    }

    pub fn multiplexer_identifier(&self) -> Option<u32> {
        match self.mux {
            MuxRole::Multiplexed(value) => Some(value),
            _ => None,
        }
    }

    pub fn start_bit(&self) -> u16 {
        self.start_bit
    }

    pub fn length(&self) -> u16 {
        self.length
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    pub fn is_signed(&self) -> bool {
        self.is_signed
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn minimum(&self) -> f64 {
        self.minimum
    }

    pub fn maximum(&self) -> f64 {
        self.maximum
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn receivers(&self) -> &[String] {
        &self.receivers
    }

    pub fn value_definitions(&self) -> &BTreeMap<i64, String> {
        &self.value_definitions
    }

    pub fn set_value_definitions(&mut self, definitions: BTreeMap<i64, String>) {
        self.value_definitions = definitions;
    }

    /// Label for a raw value, if one is defined.
    pub fn value_description(&self, raw: i64) -> Option<&str> {
        self.value_definitions.get(&raw).map(String::as_str)
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn set_comment(&mut self, comment: Option<String>) {
        self.comment = comment;
    }

    /// `SG_` line without the leading indentation.
    pub fn dbc_text(&self) -> &str {
        &self.dbc_text
    }

    pub(crate) fn steps(&self) -> &[Step] {
        &self.steps
    }

    fn refresh_text(&mut self) {
        let mux = match self.mux {
            MuxRole::None => String::new(),
            MuxRole::Multiplexor => " M".to_string(),
            MuxRole::Multiplexed(value) => format!(" m{}", value),
        };
        let receivers = if self.receivers.is_empty() {
            NO_NODE.to_string()
        } else {
            self.receivers.join(",")
        };
        self.dbc_text = format!(
            "SG_ {}{} : {}|{}@{}{} ({},{}) [{}|{}] {} {}",
            self.name,
            mux,
            self.start_bit,
            self.length,
            match self.endianness {
                Endianness::Motorola => '0',
                Endianness::Intel => '1',
            },
            if self.is_signed { '-' } else { '+' },
            format_f64(self.factor),
            format_f64(self.offset),
            format_f64(self.minimum),
            format_f64(self.maximum),
            quote(&self.unit),
            receivers
        );
    }
}

fn parse_mux(token: &str) -> Result<MuxRole, DbcError> {
    if token == "M" {
        return Ok(MuxRole::Multiplexor);
    }
    match token.strip_prefix('m') {
        Some(rest) if rest.ends_with('M') => Err(DbcError::malformed(
            "SG_",
            format!("extended multiplexing '{}' is not supported", token),
        )),
        Some(rest) => Ok(MuxRole::Multiplexed(parse_number(rest, "multiplexer value")?)),
        None => Err(DbcError::malformed(
            "SG_",
            format!("unexpected multiplexer indicator '{}'", token),
        )),
    }
}

impl DbcObject for Signal {
    /// `SG_ <name> [M|m<N>] : <start>|<len>@<0|1><+|-> (<factor>,<offset>) [<min>|<max>] "<unit>" <receivers>`
    fn from_dbc_text(text: &str) -> Result<Self, DbcError> {
        let mut cursor = TextCursor::new(text, "SG_");
        cursor.expect_keyword("SG_")?;
        let name = cursor.expect_token("signal name")?;
        let mux = if cursor.peek_char() == Some(':') {
            MuxRole::None
        } else {
            parse_mux(cursor.expect_token("multiplexer indicator")?)?
        };
        cursor.expect_char(':')?;
        let start_bit: u16 = cursor.next_number("start bit")?;
        cursor.expect_char('|')?;
        let length: u16 = cursor.next_number("signal length")?;
        cursor.expect_char('@')?;
        let endianness = match cursor.next_raw_char() {
            Some('0') => Endianness::Motorola,
            Some('1') => Endianness::Intel,
            other => return Err(cursor.error(format!("invalid byte order {:?}", other))),
        };
        let is_signed = match cursor.next_raw_char() {
            Some('+') => false,
            Some('-') => true,
            other => return Err(cursor.error(format!("invalid sign {:?}", other))),
        };
        cursor.expect_char('(')?;
        let factor: f64 = cursor.next_number("factor")?;
        cursor.expect_char(',')?;
        let offset: f64 = cursor.next_number("offset")?;
        cursor.expect_char(')')?;
        cursor.expect_char('[')?;
        let minimum: f64 = cursor.next_number("minimum")?;
        cursor.expect_char('|')?;
        let maximum: f64 = cursor.next_number("maximum")?;
        cursor.expect_char(']')?;
        let unit = cursor.next_quoted()?;

        let mut receivers = Vec::new();
        loop {
            if let Some(token) = cursor.next_token() {
                receivers.push(token);
            } else if !cursor.eat_char(',') {
                break;
            }
        }
        cursor.finish()?;

        Signal::new(name, start_bit, length, endianness, is_signed)?
            .with_scaling(factor, offset)?
            .with_range(minimum, maximum)
            .with_unit(unit)
            .with_mux(mux)
            .with_receivers(receivers)
    }

    fn generate_text(&self) -> String {
        self.dbc_text.clone()
    }
}

impl AttributeObject for Signal {
    fn attribute_values(&self) -> &BTreeMap<String, AttributeValue> {
        &self.attributes
    }

    fn attribute_values_mut(&mut self) -> &mut BTreeMap<String, AttributeValue> {
        &mut self.attributes
    }
}
