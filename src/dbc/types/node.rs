use serde::Serialize;
use std::collections::BTreeMap;

use crate::dbc::core::cursor::TextCursor;
use crate::dbc::types::{
    attributes::{AttributeObject, AttributeValue},
    errors::DbcError,
    object::DbcObject,
};

/// Node/ECU defined in the database (one name of the `BU_` list).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BusNode {
    name: String,
    comment: Option<String>,
    attributes: BTreeMap<String, AttributeValue>,
}

impl BusNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            comment: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn set_comment(&mut self, comment: Option<String>) {
        self.comment = comment;
    }

    /// Parses the `BU_:` record into its nodes, in declaration order.
    pub fn parse_list(text: &str) -> Result<Vec<BusNode>, DbcError> {
        let mut cursor = TextCursor::new(text, "BU_");
        cursor.expect_keyword("BU_")?;
        cursor.expect_char(':')?;
        let mut nodes: Vec<BusNode> = Vec::new();
        while let Some(name) = cursor.next_token() {
            if nodes.iter().any(|n| n.name == name) {
                return Err(DbcError::DuplicateName {
                    kind: "node",
                    name: name.to_string(),
                });
            }
            nodes.push(BusNode::new(name));
        }
        cursor.finish()?;
        Ok(nodes)
    }

    /// The `BU_:` record for `nodes`.
    pub fn list_text<'a>(nodes: impl IntoIterator<Item = &'a BusNode>) -> String {
        let mut out = String::from("BU_:");
        for node in nodes {
            out.push(' ');
            out.push_str(&node.name);
        }
        out
    }
}

impl DbcObject for BusNode {
    /// A node's own text is its bare name.
    fn from_dbc_text(text: &str) -> Result<Self, DbcError> {
        let mut cursor = TextCursor::new(text, "BU_");
        let name = cursor.expect_token("node name")?;
        if !cursor.is_at_end() {
            return Err(cursor.error(format!("'{}' is not a single node name", text.trim())));
        }
        Ok(BusNode::new(name))
    }

    fn generate_text(&self) -> String {
        self.name.clone()
    }
}

impl AttributeObject for BusNode {
    fn attribute_values(&self) -> &BTreeMap<String, AttributeValue> {
        &self.attributes
    }

    fn attribute_values_mut(&mut self) -> &mut BTreeMap<String, AttributeValue> {
        &mut self.attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        let nodes = BusNode::parse_list("BU_: Engine Gateway  Dashboard").unwrap();
        let names: Vec<&str> = nodes.iter().map(|n| n.name()).collect();
        assert_eq!(names, ["Engine", "Gateway", "Dashboard"]);
        assert_eq!(BusNode::list_text(&nodes), "BU_: Engine Gateway Dashboard");
    }

    #[test]
    fn test_empty_list() {
        assert!(BusNode::parse_list("BU_:").unwrap().is_empty());
        assert_eq!(BusNode::list_text(&[]), "BU_:");
    }

    #[test]
    fn test_duplicate_node() {
        assert!(matches!(
            BusNode::parse_list("BU_: A B A"),
            Err(DbcError::DuplicateName { kind: "node", .. })
        ));
    }

    #[test]
    fn test_single_node_text() {
        let node = BusNode::from_dbc_text(" Engine ").unwrap();
        assert_eq!(node.generate_text(), "Engine");
        assert!(BusNode::from_dbc_text("Engine Gateway").is_err());
    }

    #[test]
    fn test_attributes() {
        let mut node = BusNode::new("Engine");
        assert!(node.set_attribute_value("NodeLayer", AttributeValue::Int(2)).is_none());
        assert_eq!(node.attribute_value("NodeLayer"), Some(&AttributeValue::Int(2)));
        assert_eq!(node.remove_attribute_value("NodeLayer"), Some(AttributeValue::Int(2)));
        assert!(node.attribute_values().is_empty());
    }
}
