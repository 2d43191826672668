use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::dbc::core::strings::quote;
use crate::dbc::types::{
    attributes::{AttributeAssignment, AttributeObject},
    comment::Comment,
    database::Database,
    errors::DbcError,
    message::MessageTransmitters,
    node::BusNode,
    object::{DbcObject, ObjectRef},
    value_table::ValueDescriptions,
};

const NS_KEYWORDS: &[&str] = &[
    "NS_DESC_",
    "CM_",
    "BA_DEF_",
    "BA_",
    "VAL_",
    "CAT_DEF_",
    "CAT_",
    "FILTER",
    "BA_DEF_DEF_",
    "EV_DATA_",
    "ENVVAR_DATA_",
    "SGTYPE_",
    "SGTYPE_VAL_",
    "BA_DEF_SGTYPE_",
    "BA_SGTYPE_",
    "SIG_TYPE_REF_",
    "VAL_TABLE_",
    "SIG_GROUP_",
    "SIG_VALTYPE_",
    "SIGTYPE_VALTYPE_",
    "BO_TX_BU_",
    "BA_DEF_REL_",
    "BA_REL_",
    "BA_DEF_DEF_REL_",
    "BU_SG_REL_",
    "BU_EV_REL_",
    "BU_BO_REL_",
];

/// Serializes a [`Database`] and writes it to `path` as UTF-8.
///
/// Ensures the destination has a `.dbc` extension and creates intermediate
/// directories when needed.
pub fn save_to_file(path: &str, database: &Database) -> Result<(), DbcError> {
    if !path.to_ascii_lowercase().ends_with(".dbc") {
        return Err(DbcError::InvalidExtension {
            path: path.to_string(),
        });
    }

    let serialized = database.generate_text();

    let path_ref = Path::new(path);
    if let Some(parent) = path_ref.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|source| DbcError::io(&parent.display().to_string(), source))?;
    }

    let file = File::create(path_ref).map_err(|source| DbcError::io(path, source))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(serialized.as_bytes())
        .map_err(|source| DbcError::io(path, source))?;
    writer.flush().map_err(|source| DbcError::io(path, source))?;
    log::info!("Saved {} ({} messages)", path, database.message_count());
    Ok(())
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

impl Database {
    /// Canonical DBC text for the whole database.
    ///
    /// Sections are written in the order `VERSION`, `NS_`, `BS_`, `BU_`,
    /// `VAL_TABLE_`, `BO_`/`SG_`, `BO_TX_BU_`, `CM_`, `BA_DEF_`,
    /// `BA_DEF_DEF_`, `BA_`, `VAL_`. Records kept in
    /// [`Database::unresolved`] are written back with their section.
    pub fn generate_text(&self) -> String {
        let mut out = String::new();

        push_line(&mut out, &format!("VERSION {}", quote(self.version())));
        out.push('\n');

        out.push_str("NS_ :\n");
        for keyword in NS_KEYWORDS {
            out.push('\t');
            out.push_str(keyword);
            out.push('\n');
        }
        out.push('\n');

        out.push_str("BS_:\n\n");

        push_line(&mut out, &BusNode::list_text(self.iter_nodes()));
        out.push('\n');

        for table in self.value_tables() {
            push_line(&mut out, table.dbc_text());
        }
        if !self.value_tables().is_empty() {
            out.push('\n');
        }

        for message in self.iter_messages() {
            push_line(&mut out, message.dbc_text());
            out.push('\n');
        }

        self.write_transmitters(&mut out);
        self.write_comments(&mut out);

        for definition in self.attribute_definitions() {
            push_line(&mut out, definition.dbc_text());
        }
        for definition in self.attribute_definitions() {
            if !definition.default_value_dbc_text().is_empty() {
                push_line(&mut out, definition.default_value_dbc_text());
            }
        }
        for text in &self.unresolved().default_values {
            push_line(&mut out, text);
        }

        self.write_attribute_values(&mut out);
        self.write_value_descriptions(&mut out);
        out
    }

    fn write_transmitters(&self, out: &mut String) {
        for message in self.iter_messages() {
            if !message.extra_transmitters().is_empty() {
                let tx = MessageTransmitters::new(message.id(), message.extra_transmitters().to_vec());
                push_line(out, &tx.generate_text());
            }
        }
        for tx in &self.unresolved().transmitters {
            push_line(out, &tx.generate_text());
        }
    }

    fn write_comments(&self, out: &mut String) {
        let mut write = |target: ObjectRef, text: Option<&str>| {
            if let Some(text) = text {
                push_line(out, Comment::new(target, text).dbc_text());
            }
        };
        write(ObjectRef::Database, self.comment());
        for node in self.iter_nodes() {
            write(ObjectRef::Node(node.name().to_string()), node.comment());
        }
        for message in self.iter_messages() {
            write(ObjectRef::Message(message.id()), message.comment());
            for signal in message.signals() {
                let target = ObjectRef::Signal {
                    message_id: message.id(),
                    signal: signal.name().to_string(),
                };
                write(target, signal.comment());
            }
        }
        for comment in &self.unresolved().comments {
            push_line(out, comment.dbc_text());
        }
    }

    fn write_attribute_values(&self, out: &mut String) {
        let mut write = |target: ObjectRef, object: &dyn AttributeObject| {
            for (name, value) in object.attribute_values() {
                let definition = self.get_attribute_definition(name);
                let assignment = AttributeAssignment::new(name, target.clone(), value.clone(), definition);
                push_line(out, assignment.dbc_text());
            }
        };
        write(ObjectRef::Database, self);
        for node in self.iter_nodes() {
            write(ObjectRef::Node(node.name().to_string()), node);
        }
        for message in self.iter_messages() {
            write(ObjectRef::Message(message.id()), message);
            for signal in message.signals() {
                let target = ObjectRef::Signal {
                    message_id: message.id(),
                    signal: signal.name().to_string(),
                };
                write(target, signal);
            }
        }
        for assignment in &self.unresolved().attribute_values {
            push_line(out, assignment.dbc_text());
        }
    }

    fn write_value_descriptions(&self, out: &mut String) {
        for message in self.iter_messages() {
            for signal in message.signals() {
                if signal.value_definitions().is_empty() {
                    continue;
                }
                let descriptions = ValueDescriptions::new(
                    message.id(),
                    signal.name(),
                    signal.value_definitions().clone(),
                );
                push_line(out, descriptions.dbc_text());
            }
        }
        for descriptions in &self.unresolved().value_descriptions {
            push_line(out, descriptions.dbc_text());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbc::parse::from_text;
    use crate::dbc::types::attributes::{Attribute, AttributeValue, DbcObjType, EnumAttribute};
    use crate::dbc::types::message::Message;
    use crate::dbc::types::signal::{Endianness, Signal};
    use pretty_assertions::assert_eq;

    fn build_test_db() -> Database {
        let mut db = Database::new("2.1");
        db.add_node(BusNode::new("ECU1")).unwrap();
        db.add_node(BusNode::new("ECU2")).unwrap();
        let speed = Signal::new("Speed", 0, 16, Endianness::Intel, false)
            .unwrap()
            .with_scaling(0.1, 0.0)
            .unwrap()
            .with_range(0.0, 6553.5)
            .with_unit("km/h")
            .with_receivers(["ECU2"])
            .unwrap();
        let msg = Message::new(100, "EngineData", 8, Some("ECU1".into()), vec![speed]).unwrap();
        db.add_message(msg).unwrap();

        let mut frame_format = Attribute::Enum(EnumAttribute::new(
            "VFrameFormat",
            DbcObjType::Message,
            vec!["StandardCAN".into(), "ExtendedCAN".into()],
        ));
        frame_format
            .set_default_value(AttributeValue::Enum("StandardCAN".into()))
            .unwrap();
        db.add_attribute_definition(frame_format).unwrap();
        db.get_message_by_id_mut(100)
            .unwrap()
            .set_attribute_value("VFrameFormat", AttributeValue::Enum("ExtendedCAN".into()));
        db.get_message_by_id_mut(100)
            .unwrap()
            .signal_mut("Speed")
            .unwrap()
            .set_comment(Some("Vehicle speed".into()));
        db
    }

    #[test]
    fn test_generate_text_sections() {
        let text = build_test_db().generate_text();
        let expected_tail = "BU_: ECU1 ECU2

BO_ 100 EngineData: 8 ECU1
 SG_ Speed : 0|16@1+ (0.1,0) [0|6553.5] \"km/h\" ECU2

CM_ SG_ 100 Speed \"Vehicle speed\";
BA_DEF_ BO_ \"VFrameFormat\" ENUM \"StandardCAN\",\"ExtendedCAN\";
BA_DEF_DEF_  \"VFrameFormat\" \"StandardCAN\";
BA_ \"VFrameFormat\" BO_ 100 1;
";
        assert!(text.starts_with("VERSION \"2.1\"\n\nNS_ :\n\tNS_DESC_\n"));
        assert!(text.ends_with(expected_tail), "{}", text);
    }

    #[test]
    fn test_roundtrip_equal() {
        let db = build_test_db();
        let again = from_text(&db.generate_text()).unwrap();
        assert_eq!(again, db);
        assert_eq!(again.generate_text(), db.generate_text());
    }

    #[test]
    fn test_save_to_file_checks_extension() {
        let db = build_test_db();
        assert!(matches!(
            save_to_file("out.txt", &db),
            Err(DbcError::InvalidExtension { .. })
        ));
    }
}
