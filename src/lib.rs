//! # dbc_loader
//!
//! Rust utilities for reading, writing and using **CAN bus DBC** databases.
//!
//! ## Highlights
//! - **DBC parser**: load `.dbc` text into a SlotMap-backed [`Database`]; malformed records abort with a typed [`DbcError`].
//! - **Generator**: `Database::generate_text()` writes canonical DBC that parses back into an equal database.
//! - **Attributes**: typed `BA_DEF_` definitions ([`Attribute`]) with defaults, and per-object values via [`AttributeObject`].
//! - **Validation**: `Database::validate()` reports dangling references, constraint violations and layout conflicts.
//! - **Signal codec**: Intel and Motorola bit layouts, sign extension, scaling and multiplexer gating
//!   ([`dbc::codec`], `Message::decode_signal` / `encode_signal`).
//!
//! Entities also implement [`DbcObject`], so single records can be parsed
//! and regenerated on their own.
//!

#[cfg(feature = "dbc")]
pub mod dbc;

// Top-level re-exports (appear under Crate Items → Structs)
#[cfg(feature = "dbc")]
#[doc(inline)]
pub use crate::dbc::types::{
    attributes::{
        Attribute, AttributeAssignment, AttributeObject, AttributeType, AttributeValue,
        DbcObjType, EnumAttribute, FloatAttribute, IntAttribute, StringAttribute,
    },
    comment::Comment,
    database::{Database, MessageKey, NodeKey, UnresolvedRecords},
    errors::DbcError,
    message::{IdFormat, Message, MessageTransmitters},
    node::BusNode,
    object::{DbcObject, ObjectRef},
    signal::{Endianness, MuxRole, Signal},
    value_table::{ValueDescriptions, ValueTable},
};
