use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::dbc::core::cursor::{TextCursor, parse_number};
use crate::dbc::core::strings::{format_f64, quote};
use crate::dbc::types::{
    errors::DbcError,
    object::{DbcObject, ObjectRef},
};

/// The type of object an attribute definition applies to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DbcObjType {
    #[default]
    Database,
    Node,
    Message,
    Signal,
}

impl DbcObjType {
    /// Keyword selecting this object kind in `BA_DEF_`, `BA_` and `CM_` records.
    pub fn keyword(self) -> &'static str {
        match self {
            DbcObjType::Database => "",
            DbcObjType::Node => "BU_",
            DbcObjType::Message => "BO_",
            DbcObjType::Signal => "SG_",
        }
    }
}

impl fmt::Display for DbcObjType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DbcObjType::Database => "Database",
            DbcObjType::Node => "Node",
            DbcObjType::Message => "Message",
            DbcObjType::Signal => "Signal",
        })
    }
}

/// Attribute value kinds as declared by `BA_DEF_` records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeType {
    Enum,
    Float,
    Int,
    #[default]
    String,
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AttributeType::Enum => "Enum",
            AttributeType::Float => "Float",
            AttributeType::Int => "Int",
            AttributeType::String => "String",
        })
    }
}

/// Concrete attribute value stored on Database/Node/Message/Signal entities.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Str(String),
    Int(i64),
    Float(f64),
    /// Enum values hold the literal, not the index used on disk.
    Enum(String),
}

impl AttributeValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeValue::Str(_) => "string",
            AttributeValue::Int(_) => "integer",
            AttributeValue::Float(_) => "float",
            AttributeValue::Enum(_) => "enum",
        }
    }

    /// Value as written in a `BA_` record. Enum literals known to `definition`
    /// are written as their index.
    pub(crate) fn to_dbc_text(&self, definition: Option<&Attribute>) -> String {
        match self {
            AttributeValue::Str(s) => quote(s),
            AttributeValue::Int(v) => v.to_string(),
            AttributeValue::Float(v) => format_f64(*v),
            AttributeValue::Enum(s) => match definition {
                Some(Attribute::Enum(def)) => def
                    .enum_values
                    .iter()
                    .position(|e| e == s)
                    .map(|i| i.to_string())
                    .unwrap_or_else(|| quote(s)),
                _ => quote(s),
            },
        }
    }

    /// Types a raw value token against its definition, or by the token shape
    /// when no definition is known.
    pub(crate) fn from_token(
        token: ValueToken,
        definition: Option<&Attribute>,
    ) -> Result<Self, DbcError> {
        let value = match (definition, token) {
            (Some(Attribute::Enum(def)), ValueToken::Bare(t)) => {
                let index: i64 = parse_number(&t, "enum index")?;
                match usize::try_from(index)
                    .ok()
                    .and_then(|i| def.enum_values.get(i))
                {
                    Some(literal) => AttributeValue::Enum(literal.clone()),
                    None => AttributeValue::Int(index),
                }
            }
            (Some(Attribute::Enum(_)), ValueToken::Quoted(s)) => AttributeValue::Enum(s),
            (Some(Attribute::Float(_)), ValueToken::Bare(t)) => {
                AttributeValue::Float(parse_number(&t, "attribute value")?)
            }
            (Some(Attribute::Int(_)), ValueToken::Bare(t)) => {
                AttributeValue::Int(parse_number(&t, "attribute value")?)
            }
            (_, ValueToken::Quoted(s)) => AttributeValue::Str(s),
            (_, ValueToken::Bare(t)) => match t.parse::<i64>() {
                Ok(v) => AttributeValue::Int(v),
                Err(_) => AttributeValue::Float(parse_number(&t, "attribute value")?),
            },
        };
        Ok(value)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Str(s) | AttributeValue::Enum(s) => write!(f, "{}", s),
            AttributeValue::Int(i) => write!(f, "{}", i),
            AttributeValue::Float(x) => f.write_str(&format_f64(*x)),
        }
    }
}

/// A value token before it is typed: either quoted text or a bare number.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum ValueToken {
    Quoted(String),
    Bare(String),
}

pub(crate) fn read_value_token(cursor: &mut TextCursor<'_>) -> Result<ValueToken, DbcError> {
    if cursor.peek_char() == Some('"') {
        Ok(ValueToken::Quoted(cursor.next_quoted()?))
    } else {
        Ok(ValueToken::Bare(cursor.expect_token("value")?.to_string()))
    }
}

/// Objects that carry attribute values keyed by attribute name.
pub trait AttributeObject {
    fn attribute_values(&self) -> &BTreeMap<String, AttributeValue>;

    fn attribute_values_mut(&mut self) -> &mut BTreeMap<String, AttributeValue>;

    fn attribute_value(&self, name: &str) -> Option<&AttributeValue> {
        self.attribute_values().get(name)
    }

    /// Sets a value, returning the one it replaced.
    fn set_attribute_value(&mut self, name: &str, value: AttributeValue) -> Option<AttributeValue> {
        self.attribute_values_mut().insert(name.to_string(), value)
    }

    fn remove_attribute_value(&mut self, name: &str) -> Option<AttributeValue> {
        self.attribute_values_mut().remove(name)
    }
}

fn definition_text(name: &str, obj_type: DbcObjType, type_text: &str) -> String {
    match obj_type {
        DbcObjType::Database => format!("BA_DEF_  {} {};", quote(name), type_text),
        _ => format!("BA_DEF_ {} {} {};", obj_type.keyword(), quote(name), type_text),
    }
}

fn default_text(name: &str, value_text: &str) -> String {
    format!("BA_DEF_DEF_  {} {};", quote(name), value_text)
}

/// Reads a `BA_DEF_DEF_` record and checks it targets `name`.
fn read_default_record(text: &str, name: &str) -> Result<ValueToken, DbcError> {
    let mut cursor = TextCursor::new(text, "BA_DEF_DEF_");
    cursor.expect_keyword("BA_DEF_DEF_")?;
    let target = cursor.next_quoted()?;
    if target != name {
        return Err(cursor.error(format!(
            "default for '{}' applied to attribute '{}'",
            target, name
        )));
    }
    let token = read_value_token(&mut cursor)?;
    cursor.finish()?;
    Ok(token)
}

fn bare_default(token: ValueToken, name: &str) -> Result<String, DbcError> {
    match token {
        ValueToken::Bare(t) => Ok(t),
        ValueToken::Quoted(s) => Err(DbcError::malformed(
            "BA_DEF_DEF_",
            format!("numeric default expected for '{}', got \"{}\"", name, s),
        )),
    }
}

fn check_bounds<T: PartialOrd + fmt::Display>(name: &str, value: T, min: T, max: T) -> Result<(), DbcError> {
    // equal bounds (typically `0 0`) leave the attribute unconstrained
    if min < max && (value < min || value > max) {
        return Err(DbcError::ConstraintViolation {
            name: name.to_string(),
            details: format!("{} outside [{}, {}]", value, min, max),
        });
    }
    Ok(())
}

/// `ENUM` attribute definition: a list of allowed literals.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EnumAttribute {
    name: String,
    dbc_obj_type: DbcObjType,
    enum_values: Vec<String>,
    default_value: Option<String>,
    dbc_text: String,
    default_value_dbc_text: String,
}

impl EnumAttribute {
    pub fn new(name: impl Into<String>, dbc_obj_type: DbcObjType, enum_values: Vec<String>) -> Self {
        let mut attr = Self {
            name: name.into(),
            dbc_obj_type,
            enum_values,
            default_value: None,
            dbc_text: String::new(),
            default_value_dbc_text: String::new(),
        };
        attr.refresh_text();
        attr
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dbc_obj_type(&self) -> DbcObjType {
        self.dbc_obj_type
    }

    pub fn enum_values(&self) -> &[String] {
        &self.enum_values
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    pub fn set_default_value(&mut self, value: impl Into<String>) {
        self.default_value = Some(value.into());
        self.refresh_default_text();
    }

    /// Accepts the default either as a quoted literal or as an index into the list.
    pub fn parse_default_value(&mut self, text: &str) -> Result<(), DbcError> {
        let value = match read_default_record(text, &self.name)? {
            ValueToken::Quoted(s) => s,
            ValueToken::Bare(t) => {
                let index: usize = parse_number(&t, "enum default index")?;
                self.enum_values.get(index).cloned().ok_or_else(|| {
                    DbcError::malformed(
                        "BA_DEF_DEF_",
                        format!("enum index {} out of range for '{}'", index, self.name),
                    )
                })?
            }
        };
        self.set_default_value(value);
        Ok(())
    }

    pub fn dbc_text(&self) -> &str {
        &self.dbc_text
    }

    pub fn default_value_dbc_text(&self) -> &str {
        &self.default_value_dbc_text
    }

    fn refresh_text(&mut self) {
        let values: Vec<String> = self.enum_values.iter().map(|v| quote(v)).collect();
        self.dbc_text = definition_text(
            &self.name,
            self.dbc_obj_type,
            &format!("ENUM {}", values.join(",")),
        );
        self.refresh_default_text();
    }

    fn refresh_default_text(&mut self) {
        self.default_value_dbc_text = match &self.default_value {
            Some(v) => default_text(&self.name, &quote(v)),
            None => String::new(),
        };
    }
}

/// `FLOAT` attribute definition with inclusive bounds.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FloatAttribute {
    name: String,
    dbc_obj_type: DbcObjType,
    minimum: f64,
    maximum: f64,
    default_value: Option<f64>,
    dbc_text: String,
    default_value_dbc_text: String,
}

impl FloatAttribute {
    pub fn new(name: impl Into<String>, dbc_obj_type: DbcObjType, minimum: f64, maximum: f64) -> Self {
        let mut attr = Self {
            name: name.into(),
            dbc_obj_type,
            minimum,
            maximum,
            default_value: None,
            dbc_text: String::new(),
            default_value_dbc_text: String::new(),
        };
        attr.refresh_text();
        attr
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dbc_obj_type(&self) -> DbcObjType {
        self.dbc_obj_type
    }

    pub fn minimum(&self) -> f64 {
        self.minimum
    }

    pub fn maximum(&self) -> f64 {
        self.maximum
    }

    pub fn default_value(&self) -> Option<f64> {
        self.default_value
    }

    pub fn set_default_value(&mut self, value: f64) {
        self.default_value = Some(value);
        self.refresh_default_text();
    }

    /// Values outside the bounds are accepted here and reported by validation.
    pub fn parse_default_value(&mut self, text: &str) -> Result<(), DbcError> {
        let token = bare_default(read_default_record(text, &self.name)?, &self.name)?;
        self.set_default_value(parse_number(&token, "float default")?);
        Ok(())
    }

    pub fn check(&self, value: f64) -> Result<(), DbcError> {
        check_bounds(&self.name, value, self.minimum, self.maximum)
    }

    pub fn dbc_text(&self) -> &str {
        &self.dbc_text
    }

    pub fn default_value_dbc_text(&self) -> &str {
        &self.default_value_dbc_text
    }

    fn refresh_text(&mut self) {
        let type_text = format!("FLOAT {} {}", format_f64(self.minimum), format_f64(self.maximum));
        self.dbc_text = definition_text(&self.name, self.dbc_obj_type, &type_text);
        self.refresh_default_text();
    }

    fn refresh_default_text(&mut self) {
        self.default_value_dbc_text = match self.default_value {
            Some(v) => default_text(&self.name, &format_f64(v)),
            None => String::new(),
        };
    }
}

/// `INT` (or `HEX`) attribute definition with inclusive bounds.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IntAttribute {
    name: String,
    dbc_obj_type: DbcObjType,
    minimum: i64,
    maximum: i64,
    hex: bool,
    default_value: Option<i64>,
    dbc_text: String,
    default_value_dbc_text: String,
}

impl IntAttribute {
    pub fn new(name: impl Into<String>, dbc_obj_type: DbcObjType, minimum: i64, maximum: i64) -> Self {
        Self::with_hex(name, dbc_obj_type, minimum, maximum, false)
    }

    /// Integer attribute declared as `HEX`; values are still decimal on disk.
    pub fn new_hex(name: impl Into<String>, dbc_obj_type: DbcObjType, minimum: i64, maximum: i64) -> Self {
        Self::with_hex(name, dbc_obj_type, minimum, maximum, true)
    }

    fn with_hex(name: impl Into<String>, dbc_obj_type: DbcObjType, minimum: i64, maximum: i64, hex: bool) -> Self {
        let mut attr = Self {
            name: name.into(),
            dbc_obj_type,
            minimum,
            maximum,
            hex,
            default_value: None,
            dbc_text: String::new(),
            default_value_dbc_text: String::new(),
        };
        attr.refresh_text();
        attr
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dbc_obj_type(&self) -> DbcObjType {
        self.dbc_obj_type
    }

    pub fn minimum(&self) -> i64 {
        self.minimum
    }

    pub fn maximum(&self) -> i64 {
        self.maximum
    }

    pub fn is_hex(&self) -> bool {
        self.hex
    }

    pub fn default_value(&self) -> Option<i64> {
        self.default_value
    }

    pub fn set_default_value(&mut self, value: i64) {
        self.default_value = Some(value);
        self.refresh_default_text();
    }

    pub fn parse_default_value(&mut self, text: &str) -> Result<(), DbcError> {
        let token = bare_default(read_default_record(text, &self.name)?, &self.name)?;
        self.set_default_value(parse_number(&token, "integer default")?);
        Ok(())
    }

    pub fn check(&self, value: i64) -> Result<(), DbcError> {
        check_bounds(&self.name, value, self.minimum, self.maximum)
    }

    pub fn dbc_text(&self) -> &str {
        &self.dbc_text
    }

    pub fn default_value_dbc_text(&self) -> &str {
        &self.default_value_dbc_text
    }

    fn refresh_text(&mut self) {
        let keyword = if self.hex { "HEX" } else { "INT" };
        let type_text = format!("{} {} {}", keyword, self.minimum, self.maximum);
        self.dbc_text = definition_text(&self.name, self.dbc_obj_type, &type_text);
        self.refresh_default_text();
    }

    fn refresh_default_text(&mut self) {
        self.default_value_dbc_text = match self.default_value {
            Some(v) => default_text(&self.name, &v.to_string()),
            None => String::new(),
        };
    }
}

/// `STRING` attribute definition.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StringAttribute {
    name: String,
    dbc_obj_type: DbcObjType,
    default_value: Option<String>,
    dbc_text: String,
    default_value_dbc_text: String,
}

impl StringAttribute {
    pub fn new(name: impl Into<String>, dbc_obj_type: DbcObjType) -> Self {
        let mut attr = Self {
            name: name.into(),
            dbc_obj_type,
            default_value: None,
            dbc_text: String::new(),
            default_value_dbc_text: String::new(),
        };
        attr.refresh_text();
        attr
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dbc_obj_type(&self) -> DbcObjType {
        self.dbc_obj_type
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    pub fn set_default_value(&mut self, value: impl Into<String>) {
        self.default_value = Some(value.into());
        self.refresh_default_text();
    }

    pub fn parse_default_value(&mut self, text: &str) -> Result<(), DbcError> {
        let value = match read_default_record(text, &self.name)? {
            ValueToken::Quoted(s) | ValueToken::Bare(s) => s,
        };
        self.set_default_value(value);
        Ok(())
    }

    pub fn dbc_text(&self) -> &str {
        &self.dbc_text
    }

    pub fn default_value_dbc_text(&self) -> &str {
        &self.default_value_dbc_text
    }

    fn refresh_text(&mut self) {
        self.dbc_text = definition_text(&self.name, self.dbc_obj_type, "STRING");
        self.refresh_default_text();
    }

    fn refresh_default_text(&mut self) {
        self.default_value_dbc_text = match &self.default_value {
            Some(v) => default_text(&self.name, &quote(v)),
            None => String::new(),
        };
    }
}

/// Attribute definition (`BA_DEF_`) in one of its four typed forms.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Attribute {
    Enum(EnumAttribute),
    Float(FloatAttribute),
    Int(IntAttribute),
    String(StringAttribute),
}

impl Attribute {
    pub fn name(&self) -> &str {
        match self {
            Attribute::Enum(a) => a.name(),
            Attribute::Float(a) => a.name(),
            Attribute::Int(a) => a.name(),
            Attribute::String(a) => a.name(),
        }
    }

    pub fn dbc_obj_type(&self) -> DbcObjType {
        match self {
            Attribute::Enum(a) => a.dbc_obj_type(),
            Attribute::Float(a) => a.dbc_obj_type(),
            Attribute::Int(a) => a.dbc_obj_type(),
            Attribute::String(a) => a.dbc_obj_type(),
        }
    }

    pub fn attr_type(&self) -> AttributeType {
        match self {
            Attribute::Enum(_) => AttributeType::Enum,
            Attribute::Float(_) => AttributeType::Float,
            Attribute::Int(_) => AttributeType::Int,
            Attribute::String(_) => AttributeType::String,
        }
    }

    /// `BA_DEF_` record text.
    pub fn dbc_text(&self) -> &str {
        match self {
            Attribute::Enum(a) => a.dbc_text(),
            Attribute::Float(a) => a.dbc_text(),
            Attribute::Int(a) => a.dbc_text(),
            Attribute::String(a) => a.dbc_text(),
        }
    }

    /// `BA_DEF_DEF_` record text, empty when no default is set.
    pub fn default_value_dbc_text(&self) -> &str {
        match self {
            Attribute::Enum(a) => a.default_value_dbc_text(),
            Attribute::Float(a) => a.default_value_dbc_text(),
            Attribute::Int(a) => a.default_value_dbc_text(),
            Attribute::String(a) => a.default_value_dbc_text(),
        }
    }

    pub fn default_value(&self) -> Option<AttributeValue> {
        match self {
            Attribute::Enum(a) => a.default_value().map(|v| AttributeValue::Enum(v.to_string())),
            Attribute::Float(a) => a.default_value().map(AttributeValue::Float),
            Attribute::Int(a) => a.default_value().map(AttributeValue::Int),
            Attribute::String(a) => a.default_value().map(|v| AttributeValue::Str(v.to_string())),
        }
    }

    /// Sets the default, rejecting a value of the wrong kind.
    pub fn set_default_value(&mut self, value: AttributeValue) -> Result<(), DbcError> {
        let mismatch = self.mismatch(&value);
        match (self, value) {
            (Attribute::Enum(a), AttributeValue::Enum(v)) => a.set_default_value(v),
            (Attribute::Float(a), AttributeValue::Float(v)) => a.set_default_value(v),
            (Attribute::Float(a), AttributeValue::Int(v)) => a.set_default_value(v as f64),
            (Attribute::Int(a), AttributeValue::Int(v)) => a.set_default_value(v),
            (Attribute::String(a), AttributeValue::Str(v)) => a.set_default_value(v),
            _ => return Err(mismatch),
        }
        Ok(())
    }

    pub fn parse_default_value(&mut self, text: &str) -> Result<(), DbcError> {
        match self {
            Attribute::Enum(a) => a.parse_default_value(text),
            Attribute::Float(a) => a.parse_default_value(text),
            Attribute::Int(a) => a.parse_default_value(text),
            Attribute::String(a) => a.parse_default_value(text),
        }
    }

    /// Checks a value against this definition's kind and constraint.
    pub fn check_value(&self, value: &AttributeValue) -> Result<(), DbcError> {
        match (self, value) {
            (Attribute::Enum(a), AttributeValue::Enum(v)) => {
                if a.enum_values.contains(v) {
                    Ok(())
                } else {
                    Err(DbcError::ConstraintViolation {
                        name: a.name.clone(),
                        details: format!("'{}' is not one of {:?}", v, a.enum_values),
                    })
                }
            }
            (Attribute::Float(a), AttributeValue::Float(v)) => a.check(*v),
            (Attribute::Float(a), AttributeValue::Int(v)) => a.check(*v as f64),
            (Attribute::Int(a), AttributeValue::Int(v)) => a.check(*v),
            (Attribute::String(_), AttributeValue::Str(_)) => Ok(()),
            (_, other) => Err(self.mismatch(other)),
        }
    }

    /// Checks the default value, if any.
    pub fn check_default(&self) -> Result<(), DbcError> {
        match self.default_value() {
            Some(value) => self.check_value(&value),
            None => Ok(()),
        }
    }

    fn mismatch(&self, value: &AttributeValue) -> DbcError {
        DbcError::AttributeTypeMismatch {
            name: self.name().to_string(),
            expected: match self.attr_type() {
                AttributeType::Enum => "enum",
                AttributeType::Float => "float",
                AttributeType::Int => "integer",
                AttributeType::String => "string",
            },
            actual: value.type_name(),
        }
    }
}

impl DbcObject for Attribute {
    fn from_dbc_text(text: &str) -> Result<Self, DbcError> {
        let mut cursor = TextCursor::new(text, "BA_DEF_");
        cursor.expect_keyword("BA_DEF_")?;
        let obj_type = if cursor.eat_keyword("BU_") {
            DbcObjType::Node
        } else if cursor.eat_keyword("BO_") {
            DbcObjType::Message
        } else if cursor.eat_keyword("SG_") {
            DbcObjType::Signal
        } else if cursor.eat_keyword("EV_") {
            return Err(cursor.error("environment variable attributes are not supported"));
        } else {
            DbcObjType::Database
        };
        let name = cursor.next_quoted()?;
        let kind = cursor.expect_token("attribute type")?;
        let attr = match kind {
            "ENUM" => {
                let mut values = Vec::new();
                while cursor.peek_char() == Some('"') {
                    values.push(cursor.next_quoted()?);
                    if !cursor.eat_char(',') {
                        break;
                    }
                }
                Attribute::Enum(EnumAttribute::new(name, obj_type, values))
            }
            "FLOAT" => {
                let min = cursor.next_number("FLOAT minimum")?;
                let max = cursor.next_number("FLOAT maximum")?;
                Attribute::Float(FloatAttribute::new(name, obj_type, min, max))
            }
            "INT" => {
                let min = cursor.next_number("INT minimum")?;
                let max = cursor.next_number("INT maximum")?;
                Attribute::Int(IntAttribute::new(name, obj_type, min, max))
            }
            "HEX" => {
                let min = cursor.next_number("HEX minimum")?;
                let max = cursor.next_number("HEX maximum")?;
                Attribute::Int(IntAttribute::new_hex(name, obj_type, min, max))
            }
            "STRING" => Attribute::String(StringAttribute::new(name, obj_type)),
            other => return Err(cursor.error(format!("unknown attribute type '{}'", other))),
        };
        cursor.finish()?;
        Ok(attr)
    }

    fn generate_text(&self) -> String {
        self.dbc_text().to_string()
    }
}

macro_rules! variant_from_dbc_text {
    ($ty:ident, $variant:ident, $kind:literal) => {
        impl DbcObject for $ty {
            fn from_dbc_text(text: &str) -> Result<Self, DbcError> {
                match Attribute::from_dbc_text(text)? {
                    Attribute::$variant(a) => Ok(a),
                    other => Err(DbcError::malformed(
                        "BA_DEF_",
                        format!("expected {} attribute, found {}", $kind, other.attr_type()),
                    )),
                }
            }

            fn generate_text(&self) -> String {
                self.dbc_text.clone()
            }
        }

        impl From<$ty> for Attribute {
            fn from(attr: $ty) -> Self {
                Attribute::$variant(attr)
            }
        }
    };
}

variant_from_dbc_text!(EnumAttribute, Enum, "ENUM");
variant_from_dbc_text!(FloatAttribute, Float, "FLOAT");
variant_from_dbc_text!(IntAttribute, Int, "INT");
variant_from_dbc_text!(StringAttribute, String, "STRING");

/// One `BA_` record: a value for a named attribute on a specific object.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AttributeAssignment {
    name: String,
    target: ObjectRef,
    value: AttributeValue,
    dbc_text: String,
}

impl AttributeAssignment {
    /// `definition` decides how enum values are written.
    pub fn new(
        name: impl Into<String>,
        target: ObjectRef,
        value: AttributeValue,
        definition: Option<&Attribute>,
    ) -> Self {
        let name = name.into();
        let dbc_text = format!(
            "BA_ {} {}{};",
            quote(&name),
            target.prefix(),
            value.to_dbc_text(definition)
        );
        Self {
            name,
            target,
            value,
            dbc_text,
        }
    }

    /// Parses a `BA_` record, typing its value with the matching definition.
    pub fn from_dbc_text_with(text: &str, definitions: &[Attribute]) -> Result<Self, DbcError> {
        let mut cursor = TextCursor::new(text, "BA_");
        cursor.expect_keyword("BA_")?;
        let name = cursor.next_quoted()?;
        let target = ObjectRef::parse(&mut cursor)?;
        let token = read_value_token(&mut cursor)?;
        cursor.finish()?;
        let definition = definitions.iter().find(|d| d.name() == name);
        let value = AttributeValue::from_token(token, definition)?;
        Ok(Self::new(name, target, value, definition))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &ObjectRef {
        &self.target
    }

    pub fn value(&self) -> &AttributeValue {
        &self.value
    }

    pub fn dbc_text(&self) -> &str {
        &self.dbc_text
    }
}

impl DbcObject for AttributeAssignment {
    fn from_dbc_text(text: &str) -> Result<Self, DbcError> {
        Self::from_dbc_text_with(text, &[])
    }

    fn generate_text(&self) -> String {
        self.dbc_text.clone()
    }
}
