//! Database model (SlotMap-backed).
//!
//! This module defines the in-memory **CAN database** built by the DBC parser.
//! Nodes and messages live in **SlotMap** arenas with **stable keys**
//! ([`NodeKey`], [`MessageKey`]); declaration order is kept in order vectors,
//! which drive `iter_nodes()` / `iter_messages()` and text generation.
//!
//! **Lookups** are O(1): `get_message_by_id/_name`, `get_node_by_name`.
//! Names are matched exactly, as DBC identifiers are case-sensitive.
//!
//! Signals are owned by their message; cross references (transmitters,
//! receivers, comment and attribute targets) are stored as names or ids and
//! resolved against this database by `validate()`.

use serde::{Serialize, Serializer, ser::SerializeStruct};
use slotmap::{SlotMap, new_key_type};
use std::collections::{BTreeMap, HashMap};

use crate::dbc::types::{
    attributes::{Attribute, AttributeAssignment, AttributeObject, AttributeValue},
    comment::Comment,
    errors::DbcError,
    message::{Message, MessageTransmitters},
    node::BusNode,
    object::ObjectRef,
    value_table::{ValueDescriptions, ValueTable},
};

// --- Stable keys (SlotMap) ---
new_key_type! { pub struct NodeKey; }
new_key_type! { pub struct MessageKey; }

/// Records whose target was not found while parsing.
///
/// They are kept so that regeneration loses nothing, and reported by
/// `Database::validate()` as dangling references.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct UnresolvedRecords {
    pub comments: Vec<Comment>,
    pub value_descriptions: Vec<ValueDescriptions>,
    pub attribute_values: Vec<AttributeAssignment>,
    pub transmitters: Vec<MessageTransmitters>,
    /// `BA_DEF_DEF_` records naming an undefined attribute, as read.
    pub default_values: Vec<String>,
}

impl UnresolvedRecords {
    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
            && self.value_descriptions.is_empty()
            && self.attribute_values.is_empty()
            && self.transmitters.is_empty()
            && self.default_values.is_empty()
    }
}

/// In-memory representation of a CAN database (DBC).
///
/// Holds the version and comment, the node and message arenas with their
/// order vectors and lookup maps, value tables, attribute definitions (in
/// declaration order) and the database-level attribute values.
#[derive(Default, Clone, Debug)]
pub struct Database {
    // --- General information ---
    version: String,
    comment: Option<String>,

    // --- Main storage (stable-key maps) ---
    nodes: SlotMap<NodeKey, BusNode>,
    messages: SlotMap<MessageKey, Message>,

    // --- Order "views" ---
    nodes_order: Vec<NodeKey>,
    messages_order: Vec<MessageKey>,

    value_tables: Vec<ValueTable>,

    // --- Attribute definitions and DB attribute entry ---
    attribute_definitions: Vec<Attribute>,
    attributes: BTreeMap<String, AttributeValue>,

    unresolved: UnresolvedRecords,

    // --- Lookups ---
    node_key_by_name: HashMap<String, NodeKey>,
    msg_key_by_id: HashMap<u32, MessageKey>,
    msg_key_by_name: HashMap<String, MessageKey>,
}

impl Database {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Default::default()
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = version.into();
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn set_comment(&mut self, comment: Option<String>) {
        self.comment = comment;
    }

    // --------- Nodes --------
    /// Adds a node; node names are unique.
    pub fn add_node(&mut self, node: BusNode) -> Result<NodeKey, DbcError> {
        if self.node_key_by_name.contains_key(node.name()) {
            return Err(DbcError::DuplicateName {
                kind: "node",
                name: node.name().to_string(),
            });
        }
        let name = node.name().to_string();
        let key = self.nodes.insert(node);
        self.nodes_order.push(key);
        self.node_key_by_name.insert(name, key);
        Ok(key)
    }

    /// Nodes in declaration order.
    pub fn iter_nodes(&self) -> impl Iterator<Item = &BusNode> + '_ {
        self.nodes_order.iter().filter_map(|&k| self.nodes.get(k))
    }

    pub fn node_count(&self) -> usize {
        self.nodes_order.len()
    }

    pub fn get_node_key_by_name(&self, name: &str) -> Option<NodeKey> {
        self.node_key_by_name.get(name).copied()
    }

    pub fn get_node_by_key(&self, key: NodeKey) -> Option<&BusNode> {
        self.nodes.get(key)
    }

    pub fn get_node_by_key_mut(&mut self, key: NodeKey) -> Option<&mut BusNode> {
        self.nodes.get_mut(key)
    }

    pub fn get_node_by_name(&self, name: &str) -> Option<&BusNode> {
        let key = self.get_node_key_by_name(name)?;
        self.get_node_by_key(key)
    }

    pub fn get_node_by_name_mut(&mut self, name: &str) -> Option<&mut BusNode> {
        let key = self.get_node_key_by_name(name)?;
        self.get_node_by_key_mut(key)
    }

    // ------------- Messages ------------
    /// Adds a message; ids and names are unique.
    pub fn add_message(&mut self, message: Message) -> Result<MessageKey, DbcError> {
        if self.msg_key_by_id.contains_key(&message.id()) {
            return Err(DbcError::DuplicateName {
                kind: "message id",
                name: message.id().to_string(),
            });
        }
        if self.msg_key_by_name.contains_key(message.name()) {
            return Err(DbcError::DuplicateName {
                kind: "message",
                name: message.name().to_string(),
            });
        }
        let id = message.id();
        let name = message.name().to_string();
        let key = self.messages.insert(message);
        self.messages_order.push(key);
        self.msg_key_by_id.insert(id, key);
        self.msg_key_by_name.insert(name, key);
        Ok(key)
    }

    /// Messages in declaration order.
    pub fn iter_messages(&self) -> impl Iterator<Item = &Message> + '_ {
        self.messages_order.iter().filter_map(|&k| self.messages.get(k))
    }

    pub fn message_count(&self) -> usize {
        self.messages_order.len()
    }

    pub fn get_msg_key_by_id(&self, id: u32) -> Option<MessageKey> {
        self.msg_key_by_id.get(&id).copied()
    }

    pub fn get_msg_key_by_name(&self, name: &str) -> Option<MessageKey> {
        self.msg_key_by_name.get(name).copied()
    }

    pub fn get_message_by_key(&self, key: MessageKey) -> Option<&Message> {
        self.messages.get(key)
    }

    pub fn get_message_by_key_mut(&mut self, key: MessageKey) -> Option<&mut Message> {
        self.messages.get_mut(key)
    }

    /// Looks a message up by its raw DBC id.
    pub fn get_message_by_id(&self, id: u32) -> Option<&Message> {
        let key = self.get_msg_key_by_id(id)?;
        self.get_message_by_key(key)
    }

    pub fn get_message_by_id_mut(&mut self, id: u32) -> Option<&mut Message> {
        let key = self.get_msg_key_by_id(id)?;
        self.get_message_by_key_mut(key)
    }

    pub fn get_message_by_name(&self, name: &str) -> Option<&Message> {
        let key = self.get_msg_key_by_name(name)?;
        self.get_message_by_key(key)
    }

    pub fn get_message_by_name_mut(&mut self, name: &str) -> Option<&mut Message> {
        let key = self.get_msg_key_by_name(name)?;
        self.get_message_by_key_mut(key)
    }

    // ------------- Value tables ------------
    pub fn add_value_table(&mut self, table: ValueTable) -> Result<(), DbcError> {
        if self.get_value_table(table.name()).is_some() {
            return Err(DbcError::DuplicateName {
                kind: "value table",
                name: table.name().to_string(),
            });
        }
        self.value_tables.push(table);
        Ok(())
    }

    pub fn value_tables(&self) -> &[ValueTable] {
        &self.value_tables
    }

    pub fn get_value_table(&self, name: &str) -> Option<&ValueTable> {
        self.value_tables.iter().find(|t| t.name() == name)
    }

    // ------------- Attribute definitions ------------
    /// Adds a definition; attribute names are unique across object kinds.
    pub fn add_attribute_definition(&mut self, definition: Attribute) -> Result<(), DbcError> {
        if self.get_attribute_definition(definition.name()).is_some() {
            return Err(DbcError::DuplicateName {
                kind: "attribute",
                name: definition.name().to_string(),
            });
        }
        self.attribute_definitions.push(definition);
        Ok(())
    }

    /// Definitions in declaration order.
    pub fn attribute_definitions(&self) -> &[Attribute] {
        &self.attribute_definitions
    }

    pub fn get_attribute_definition(&self, name: &str) -> Option<&Attribute> {
        self.attribute_definitions.iter().find(|d| d.name() == name)
    }

    pub fn get_attribute_definition_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.attribute_definitions
            .iter_mut()
            .find(|d| d.name() == name)
    }

    /// The attribute-carrying object `target` names, if it exists.
    pub fn get_object(&self, target: &ObjectRef) -> Option<&dyn AttributeObject> {
        match target {
            ObjectRef::Database => Some(self as &dyn AttributeObject),
            ObjectRef::Node(name) => self
                .get_node_by_name(name)
                .map(|n| n as &dyn AttributeObject),
            ObjectRef::Message(id) => self
                .get_message_by_id(*id)
                .map(|m| m as &dyn AttributeObject),
            ObjectRef::Signal { message_id, signal } => self
                .get_message_by_id(*message_id)
                .and_then(|m| m.signal(signal))
                .map(|s| s as &dyn AttributeObject),
        }
    }

    pub fn get_object_mut(&mut self, target: &ObjectRef) -> Option<&mut dyn AttributeObject> {
        match target {
            ObjectRef::Database => Some(self as &mut dyn AttributeObject),
            ObjectRef::Node(name) => self
                .get_node_by_name_mut(name)
                .map(|n| n as &mut dyn AttributeObject),
            ObjectRef::Message(id) => self
                .get_message_by_id_mut(*id)
                .map(|m| m as &mut dyn AttributeObject),
            ObjectRef::Signal { message_id, signal } => self
                .get_message_by_id_mut(*message_id)
                .and_then(|m| m.signal_mut(signal))
                .map(|s| s as &mut dyn AttributeObject),
        }
    }

    /// Records read from text whose target does not exist.
    pub fn unresolved(&self) -> &UnresolvedRecords {
        &self.unresolved
    }

    pub(crate) fn unresolved_mut(&mut self) -> &mut UnresolvedRecords {
        &mut self.unresolved
    }
}

impl AttributeObject for Database {
    fn attribute_values(&self) -> &BTreeMap<String, AttributeValue> {
        &self.attributes
    }

    fn attribute_values_mut(&mut self) -> &mut BTreeMap<String, AttributeValue> {
        &mut self.attributes
    }
}

impl PartialEq for Database {
    /// Content equality: keys and lookup maps are ignored.
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
            && self.comment == other.comment
            && self.iter_nodes().eq(other.iter_nodes())
            && self.iter_messages().eq(other.iter_messages())
            && self.value_tables == other.value_tables
            && self.attribute_definitions == other.attribute_definitions
            && self.attributes == other.attributes
            && self.unresolved == other.unresolved
    }
}

impl Serialize for Database {
    /// Exports entities in declaration order; arena keys are not part of the output.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let nodes: Vec<&BusNode> = self.iter_nodes().collect();
        let messages: Vec<&Message> = self.iter_messages().collect();
        let mut state = serializer.serialize_struct("Database", 8)?;
        state.serialize_field("version", &self.version)?;
        state.serialize_field("comment", &self.comment)?;
        state.serialize_field("nodes", &nodes)?;
        state.serialize_field("messages", &messages)?;
        state.serialize_field("value_tables", &self.value_tables)?;
        state.serialize_field("attribute_definitions", &self.attribute_definitions)?;
        state.serialize_field("attributes", &self.attributes)?;
        state.serialize_field("unresolved", &self.unresolved)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbc::types::attributes::{DbcObjType, StringAttribute};

    fn build_test_db() -> Database {
        let mut db = Database::new("1.0");
        db.add_node(BusNode::new("Engine")).unwrap();
        db.add_node(BusNode::new("Gateway")).unwrap();
        db.add_message(Message::new(100, "EngineData", 8, Some("Engine".into()), vec![]).unwrap())
            .unwrap();
        db.add_message(Message::new(200, "GatewayStatus", 2, Some("Gateway".into()), vec![]).unwrap())
            .unwrap();
        db
    }

    #[test]
    fn test_lookups_and_order() {
        let db = build_test_db();
        let names: Vec<&str> = db.iter_messages().map(|m| m.name()).collect();
        assert_eq!(names, ["EngineData", "GatewayStatus"]);
        assert_eq!(db.get_message_by_id(200).map(|m| m.name()), Some("GatewayStatus"));
        assert_eq!(db.get_message_by_name("EngineData").map(|m| m.id()), Some(100));
        assert!(db.get_node_by_name("Engine").is_some());
        assert!(db.get_node_by_name("engine").is_none());
        assert_eq!(db.node_count(), 2);
    }

    #[test]
    fn test_duplicates_rejected() {
        let mut db = build_test_db();
        assert!(matches!(
            db.add_node(BusNode::new("Engine")),
            Err(DbcError::DuplicateName { kind: "node", .. })
        ));
        assert!(matches!(
            db.add_message(Message::new(100, "Other", 8, None, vec![]).unwrap()),
            Err(DbcError::DuplicateName { kind: "message id", .. })
        ));
        assert!(matches!(
            db.add_message(Message::new(300, "EngineData", 8, None, vec![]).unwrap()),
            Err(DbcError::DuplicateName { kind: "message", .. })
        ));
        let def = Attribute::String(StringAttribute::new("DBName", DbcObjType::Database));
        db.add_attribute_definition(def.clone()).unwrap();
        assert!(db.add_attribute_definition(def).is_err());
    }

    #[test]
    fn test_content_equality_ignores_keys() {
        let a = build_test_db();
        let b = build_test_db();
        assert_eq!(a, b);
        let mut c = build_test_db();
        c.set_comment(Some("changed".into()));
        assert_ne!(a, c);
    }
}
