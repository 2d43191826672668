use std::fs;
use std::path::Path;

use encoding_rs::WINDOWS_1252;

use crate::dbc::core::cursor::TextCursor;
use crate::dbc::core::records::{Record, split_records};
use crate::dbc::types::{
    attributes::{Attribute, AttributeAssignment},
    comment::Comment,
    database::Database,
    errors::DbcError,
    message::{Message, MessageTransmitters},
    node::BusNode,
    object::{DbcObject, ObjectRef},
    value_table::{ValueDescriptions, ValueTable},
};

/// Reads a `.dbc` file and parses it into a [`Database`].
///
/// The content is taken as UTF-8 when valid and decoded as Windows-1252
/// otherwise, which is what most DBC editors write.
///
/// # Errors
/// - [`DbcError::InvalidExtension`] if the path does not end in `.dbc`.
/// - [`DbcError::Io`] if the file cannot be read.
/// - Any parse error of [`from_text`].
pub fn from_file(path: &str) -> Result<Database, DbcError> {
    let is_dbc = Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("dbc"));
    if !is_dbc {
        return Err(DbcError::InvalidExtension {
            path: path.to_string(),
        });
    }

    let bytes = fs::read(path).map_err(|source| DbcError::io(path, source))?;
    let text = match std::str::from_utf8(&bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            log::debug!("{} is not UTF-8, decoding as Windows-1252", path);
            WINDOWS_1252.decode(&bytes).0.into_owned()
        }
    };
    let db = from_text(&text)?;
    log::info!(
        "Loaded {}: {} nodes, {} messages",
        path,
        db.node_count(),
        db.message_count()
    );
    Ok(db)
}

/// Parses DBC text into a [`Database`].
///
/// Records are recognized by their leading keyword; `VERSION`, `BU_`,
/// `VAL_TABLE_`, `BO_`/`SG_`, `BO_TX_BU_`, `CM_`, `BA_DEF_`, `BA_DEF_DEF_`,
/// `BA_` and `VAL_` are modeled. Other sections (`NS_`, `BS_`, environment
/// variables, signal groups, ...) are skipped.
///
/// Comments, value descriptions and attribute values whose target does not
/// exist are kept in [`Database::unresolved`] and reported by `validate()`.
///
/// # Errors
/// The first malformed record aborts the parse; no partial database is returned.
pub fn from_text(text: &str) -> Result<Database, DbcError> {
    let mut db = Database::default();
    for record in split_records(text)? {
        log::trace!("{} record at line {}", record.keyword, record.line);
        apply_record(&mut db, &record).map_err(|e| at_line(e, record.line))?;
    }
    Ok(db)
}

/// Prefixes record errors with the line they started on.
fn at_line(err: DbcError, line: usize) -> DbcError {
    match err {
        DbcError::MalformedRecord { record, details } => DbcError::MalformedRecord {
            record,
            details: format!("line {}: {}", line, details),
        },
        other => other,
    }
}

fn second_token(text: &str) -> &str {
    text.split(|c: char| c.is_whitespace() || c == ':')
        .filter(|t| !t.is_empty())
        .nth(1)
        .unwrap_or("")
}

fn apply_record(db: &mut Database, record: &Record<'_>) -> Result<(), DbcError> {
    let text = record.text.as_str();
    match record.keyword {
        "VERSION" => {
            let mut cursor = TextCursor::new(text, "VERSION");
            cursor.expect_keyword("VERSION")?;
            let version = cursor.next_quoted()?;
            cursor.finish()?;
            db.set_version(version);
        }
        "NS_" | "BS_" => {}
        "BU_" => {
            for node in BusNode::parse_list(text)? {
                db.add_node(node)?;
            }
        }
        "VAL_TABLE_" => {
            db.add_value_table(ValueTable::from_dbc_text(text)?)?;
        }
        "BO_" => {
            db.add_message(Message::from_dbc_text(text)?)?;
        }
        "BO_TX_BU_" => apply_transmitters(db, MessageTransmitters::from_dbc_text(text)?),
        "CM_" => {
            if second_token(text) == "EV_" {
                log::debug!("Skipping environment variable comment (line {})", record.line);
            } else {
                apply_comment(db, Comment::from_dbc_text(text)?);
            }
        }
        "BA_DEF_" => {
            if second_token(text) == "EV_" {
                log::debug!("Skipping environment variable attribute (line {})", record.line);
            } else {
                db.add_attribute_definition(Attribute::from_dbc_text(text)?)?;
            }
        }
        "BA_DEF_DEF_" => apply_default(db, text)?,
        "BA_" => {
            let assignment = AttributeAssignment::from_dbc_text_with(text, db.attribute_definitions())?;
            apply_attribute_value(db, assignment);
        }
        "VAL_" => {
            if second_token(text).parse::<u32>().is_ok() {
                apply_value_descriptions(db, ValueDescriptions::from_dbc_text(text)?);
            } else {
                log::debug!("Skipping environment variable values (line {})", record.line);
            }
        }
        other => {
            log::debug!("Skipping unsupported record {} (line {})", other, record.line);
        }
    }
    Ok(())
}

fn apply_transmitters(db: &mut Database, tx: MessageTransmitters) {
    match db.get_message_by_id_mut(tx.message_id()) {
        Some(message) => message.add_transmitters(tx.into_transmitters()),
        None => {
            log::warn!("BO_TX_BU_ for unknown message {}", tx.message_id());
            db.unresolved_mut().transmitters.push(tx);
        }
    }
}

fn apply_comment(db: &mut Database, comment: Comment) {
    let text = Some(comment.text().to_string());
    let attached = match comment.target() {
        ObjectRef::Database => {
            db.set_comment(text);
            true
        }
        ObjectRef::Node(name) => db
            .get_node_by_name_mut(name)
            .map(|n| n.set_comment(text))
            .is_some(),
        ObjectRef::Message(id) => db
            .get_message_by_id_mut(*id)
            .map(|m| m.set_comment(text))
            .is_some(),
        ObjectRef::Signal { message_id, signal } => db
            .get_message_by_id_mut(*message_id)
            .and_then(|m| m.signal_mut(signal))
            .map(|s| s.set_comment(text))
            .is_some(),
    };
    if !attached {
        log::warn!("Comment for unknown {}", comment.target());
        db.unresolved_mut().comments.push(comment);
    }
}

fn apply_default(db: &mut Database, text: &str) -> Result<(), DbcError> {
    let mut cursor = TextCursor::new(text, "BA_DEF_DEF_");
    cursor.expect_keyword("BA_DEF_DEF_")?;
    let name = cursor.next_quoted()?;
    match db.get_attribute_definition_mut(&name) {
        Some(definition) => definition.parse_default_value(text)?,
        None => {
            log::warn!("Default value for undefined attribute '{}'", name);
            db.unresolved_mut().default_values.push(text.to_string());
        }
    }
    Ok(())
}

fn apply_attribute_value(db: &mut Database, assignment: AttributeAssignment) {
    match db.get_object_mut(assignment.target()) {
        Some(object) => {
            object.set_attribute_value(assignment.name(), assignment.value().clone());
        }
        None => {
            log::warn!(
                "Attribute '{}' for unknown {}",
                assignment.name(),
                assignment.target()
            );
            db.unresolved_mut().attribute_values.push(assignment);
        }
    }
}

fn apply_value_descriptions(db: &mut Database, descriptions: ValueDescriptions) {
    match db
        .get_message_by_id_mut(descriptions.message_id())
        .and_then(|m| m.signal_mut(descriptions.signal()))
    {
        Some(signal) => signal.set_value_definitions(descriptions.entries().clone()),
        None => {
            log::warn!(
                "Value descriptions for unknown signal '{}' of message {}",
                descriptions.signal(),
                descriptions.message_id()
            );
            db.unresolved_mut().value_descriptions.push(descriptions);
        }
    }
}

impl DbcObject for Database {
    fn from_dbc_text(text: &str) -> Result<Self, DbcError> {
        from_text(text)
    }

    fn generate_text(&self) -> String {
        Database::generate_text(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbc::types::attributes::{AttributeObject, AttributeValue};

    const SAMPLE: &str = r#"VERSION "1.0"

NS_ :
	NS_DESC_
	CM_
	BA_DEF_

BS_:

BU_: ECU1 ECU2 ECU3

BO_ 100 EngineData: 8 ECU1
 SG_ Speed : 0|16@1+ (0.1,0) [0|6553.5] "km/h" ECU2,ECU3
 SG_ Gear : 16|4@1+ (1,0) [0|15] "" ECU2

BO_TX_BU_ 100 : ECU2;

CM_ SG_ 100 Speed "Vehicle
speed";
BA_DEF_ BO_ "VFrameFormat" ENUM "StandardCAN","ExtendedCAN";
BA_DEF_DEF_ "VFrameFormat" "StandardCAN";
BA_ "VFrameFormat" BO_ 100 1;
VAL_ 100 Gear 0 "Park" 1 "Drive" ;
"#;

    #[test]
    fn test_from_text() {
        let db = from_text(SAMPLE).unwrap();
        assert_eq!(db.version(), "1.0");
        assert_eq!(db.node_count(), 3);
        let msg = db.get_message_by_id(100).unwrap();
        assert_eq!(msg.transmitters().collect::<Vec<_>>(), ["ECU1", "ECU2"]);
        let speed = msg.signal("Speed").unwrap();
        assert_eq!(speed.comment(), Some("Vehicle\nspeed"));
        assert_eq!(
            msg.attribute_value("VFrameFormat"),
            Some(&AttributeValue::Enum("ExtendedCAN".into()))
        );
        assert_eq!(msg.signal("Gear").unwrap().value_description(1), Some("Drive"));
        assert!(db.unresolved().is_empty());
    }

    #[test]
    fn test_unresolved_targets_kept() {
        let text = "BU_: A\nCM_ BU_ Missing \"gone\";\nBA_ \"X\" BO_ 9 1;\nVAL_ 9 S 0 \"z\" ;";
        let db = from_text(text).unwrap();
        assert_eq!(db.unresolved().comments.len(), 1);
        assert_eq!(db.unresolved().attribute_values.len(), 1);
        assert_eq!(db.unresolved().value_descriptions.len(), 1);
    }

    #[test]
    fn test_error_aborts_with_line() {
        let text = "VERSION \"\"\n\nBO_ 1 M: 8 A\n SG_ S : 0|8@1+ (1,0) [0|0 \"\" B\n";
        match from_text(text) {
            Err(DbcError::MalformedRecord { details, .. }) => assert!(details.starts_with("line 3:")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_environment_records_skipped() {
        let text = "BA_DEF_ EV_ \"EnvAttr\" INT 0 1;\nCM_ EV_ Env \"x\";\nVAL_ EnvVar 0 \"a\" ;\nEV_ Env: 0 [0|1] \"\" 0 1 DUMMY_NODE_VECTOR0 Vector__XXX;";
        let db = from_text(text).unwrap();
        assert!(db.attribute_definitions().is_empty());
        assert!(db.unresolved().is_empty());
    }

    #[test]
    fn test_from_file_rejects_extension() {
        assert!(matches!(
            from_file("network.txt"),
            Err(DbcError::InvalidExtension { .. })
        ));
        assert!(matches!(
            from_file("does/not/exist.dbc"),
            Err(DbcError::Io { .. })
        ));
    }
}
