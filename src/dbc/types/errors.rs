use std::io;
use thiserror::Error;

/// Errors produced while parsing, validating, encoding or decoding DBC content.
#[derive(Debug, Error)]
pub enum DbcError {
    /// Text does not match the record grammar for its kind.
    #[error("Malformed {record} record: {details}")]
    MalformedRecord {
        record: &'static str,
        details: String,
    },
    /// A numeric field failed strict base-10 conversion.
    #[error("Malformed number for {field}: '{token}'")]
    MalformedNumber { field: &'static str, token: String },
    /// A name references something absent from the owning database.
    #[error("{kind} '{name}' referenced by {referrer} does not exist")]
    DanglingReference {
        kind: &'static str,
        name: String,
        referrer: String,
    },
    /// Bit layout is self-inconsistent or exceeds the message capacity.
    #[error("Invalid layout for signal '{signal}': {details}")]
    InvalidLayout { signal: String, details: String },
    /// Encoded raw value does not fit the declared bit width.
    #[error("Value {value} is out of range for signal '{signal}' (raw {raw_min}..={raw_max})")]
    OutOfRange {
        signal: String,
        value: f64,
        raw_min: f64,
        raw_max: f64,
    },
    /// Multiplexed signal is not present in this frame instance.
    #[error("Signal '{signal}' is not active: multiplexor is {actual}, expected {expected}")]
    NotActive {
        signal: String,
        expected: u32,
        actual: u64,
    },
    #[error("Frame too short for '{name}': {actual} bytes, expected at least {expected}")]
    ShortFrame {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("{kind} '{name}' already exists")]
    DuplicateName { kind: &'static str, name: String },
    #[error("Signal '{signal}' not found in message '{message}'")]
    SignalNotFound { message: String, signal: String },
    /// A value does not satisfy the constraint declared by its definition.
    #[error("Constraint violation on '{name}': {details}")]
    ConstraintViolation { name: String, details: String },
    #[error("Attribute '{name}' expects a {expected} value, got {actual}")]
    AttributeTypeMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("Not a valid .dbc file: {path}")]
    InvalidExtension { path: String },
    #[error("I/O failure on '{path}'. \nError: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl DbcError {
    pub(crate) fn malformed(record: &'static str, details: impl Into<String>) -> Self {
        DbcError::MalformedRecord {
            record,
            details: details.into(),
        }
    }

    pub(crate) fn io(path: &str, source: io::Error) -> Self {
        DbcError::Io {
            path: path.to_string(),
            source,
        }
    }
}

/// I/O errors compare by path and [`io::ErrorKind`].
impl PartialEq for DbcError {
    fn eq(&self, other: &Self) -> bool {
        use DbcError::*;
        match (self, other) {
            (
                MalformedRecord { record, details },
                MalformedRecord { record: r, details: d },
            ) => record == r && details == d,
            (MalformedNumber { field, token }, MalformedNumber { field: f, token: t }) => {
                field == f && token == t
            }
            (
                DanglingReference { kind, name, referrer },
                DanglingReference { kind: k, name: n, referrer: r },
            ) => kind == k && name == n && referrer == r,
            (InvalidLayout { signal, details }, InvalidLayout { signal: s, details: d }) => {
                signal == s && details == d
            }
            (
                OutOfRange { signal, value, raw_min, raw_max },
                OutOfRange { signal: s, value: v, raw_min: lo, raw_max: hi },
            ) => signal == s && value == v && raw_min == lo && raw_max == hi,
            (
                NotActive { signal, expected, actual },
                NotActive { signal: s, expected: e, actual: a },
            ) => signal == s && expected == e && actual == a,
            (
                ShortFrame { name, expected, actual },
                ShortFrame { name: n, expected: e, actual: a },
            ) => name == n && expected == e && actual == a,
            (DuplicateName { kind, name }, DuplicateName { kind: k, name: n }) => {
                kind == k && name == n
            }
            (
                SignalNotFound { message, signal },
                SignalNotFound { message: m, signal: s },
            ) => message == m && signal == s,
            (
                ConstraintViolation { name, details },
                ConstraintViolation { name: n, details: d },
            ) => name == n && details == d,
            (
                AttributeTypeMismatch { name, expected, actual },
                AttributeTypeMismatch { name: n, expected: e, actual: a },
            ) => name == n && expected == e && actual == a,
            (InvalidExtension { path }, InvalidExtension { path: p }) => path == p,
            (Io { path, source }, Io { path: p, source: s }) => {
                path == p && source.kind() == s.kind()
            }
            _ => false,
        }
    }
}
