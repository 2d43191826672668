use crate::dbc::core::cursor::TextCursor;
use crate::dbc::core::message_layout::{check_signal_fits, steps_overlap};
use crate::dbc::types::{
    attributes::AttributeObject,
    database::Database,
    errors::DbcError,
    message::Message,
    object::ObjectRef,
    signal::{MuxRole, Signal},
};

fn dangling_target(target: &ObjectRef, referrer: &str) -> DbcError {
    let (kind, name) = match target {
        ObjectRef::Database => ("database", String::new()),
        ObjectRef::Node(name) => ("node", name.clone()),
        ObjectRef::Message(id) => ("message", id.to_string()),
        ObjectRef::Signal { message_id, signal } => ("signal", format!("{}.{}", message_id, signal)),
    };
    DbcError::DanglingReference {
        kind,
        name,
        referrer: referrer.to_string(),
    }
}

/// Attribute named by a `BA_DEF_DEF_` record.
fn default_target(text: &str) -> String {
    let mut cursor = TextCursor::new(text, "BA_DEF_DEF_");
    cursor
        .expect_keyword("BA_DEF_DEF_")
        .and_then(|()| cursor.next_quoted())
        .unwrap_or_else(|_| text.to_string())
}

/// True when both signals can be present in the same frame.
fn coexist(a: &Signal, b: &Signal) -> bool {
    match (a.mux_role(), b.mux_role()) {
        (MuxRole::Multiplexed(x), MuxRole::Multiplexed(y)) => x == y,
        _ => true,
    }
}

impl Database {
    /// Checks cross references, attribute constraints and signal layouts.
    ///
    /// Every problem found is reported; `Ok(())` means the database is
    /// internally consistent.
    pub fn validate(&self) -> Result<(), Vec<DbcError>> {
        let mut errors = Vec::new();
        for message in self.iter_messages() {
            self.validate_message_refs(message, &mut errors);
            validate_layout(message, &mut errors);
        }
        self.validate_attributes(&mut errors);
        self.validate_unresolved(&mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            log::debug!("Validation found {} problems", errors.len());
            Err(errors)
        }
    }

    fn validate_message_refs(&self, message: &Message, errors: &mut Vec<DbcError>) {
        for tx in message.transmitters() {
            if self.get_node_by_name(tx).is_none() {
                errors.push(DbcError::DanglingReference {
                    kind: "node",
                    name: tx.to_string(),
                    referrer: format!("message '{}'", message.name()),
                });
            }
        }
        for signal in message.signals() {
            for rx in signal.receivers() {
                if self.get_node_by_name(rx).is_none() {
                    errors.push(DbcError::DanglingReference {
                        kind: "node",
                        name: rx.clone(),
                        referrer: format!("signal '{}.{}'", message.name(), signal.name()),
                    });
                }
            }
        }
    }

    fn validate_attributes(&self, errors: &mut Vec<DbcError>) {
        for definition in self.attribute_definitions() {
            if let Err(e) = definition.check_default() {
                errors.push(e);
            }
        }

        let mut check = |target: ObjectRef, object: &dyn AttributeObject| {
            for (name, value) in object.attribute_values() {
                let Some(definition) = self.get_attribute_definition(name) else {
                    errors.push(DbcError::DanglingReference {
                        kind: "attribute",
                        name: name.clone(),
                        referrer: target.to_string(),
                    });
                    continue;
                };
                if definition.dbc_obj_type() != target.kind() {
                    errors.push(DbcError::ConstraintViolation {
                        name: name.clone(),
                        details: format!(
                            "defined for {} objects, assigned to {}",
                            definition.dbc_obj_type(),
                            target
                        ),
                    });
                    continue;
                }
                if let Err(e) = definition.check_value(value) {
                    errors.push(e);
                }
            }
        };
        check(ObjectRef::Database, self);
        for node in self.iter_nodes() {
            check(ObjectRef::Node(node.name().to_string()), node);
        }
        for message in self.iter_messages() {
            check(ObjectRef::Message(message.id()), message);
            for signal in message.signals() {
                let target = ObjectRef::Signal {
                    message_id: message.id(),
                    signal: signal.name().to_string(),
                };
                check(target, signal);
            }
        }
    }

    fn validate_unresolved(&self, errors: &mut Vec<DbcError>) {
        let unresolved = self.unresolved();
        for comment in &unresolved.comments {
            errors.push(dangling_target(comment.target(), "CM_"));
        }
        for assignment in &unresolved.attribute_values {
            errors.push(dangling_target(
                assignment.target(),
                &format!("BA_ \"{}\"", assignment.name()),
            ));
        }
        for descriptions in &unresolved.value_descriptions {
            let target = ObjectRef::Signal {
                message_id: descriptions.message_id(),
                signal: descriptions.signal().to_string(),
            };
            errors.push(dangling_target(&target, "VAL_"));
        }
        for tx in &unresolved.transmitters {
            errors.push(dangling_target(&ObjectRef::Message(tx.message_id()), "BO_TX_BU_"));
        }
        for text in &unresolved.default_values {
            errors.push(DbcError::DanglingReference {
                kind: "attribute",
                name: default_target(text),
                referrer: "BA_DEF_DEF_".to_string(),
            });
        }
    }
}

fn validate_layout(message: &Message, errors: &mut Vec<DbcError>) {
    let signals = message.signals();
    for signal in signals {
        if let Err(e) = check_signal_fits(signal.name(), signal.steps(), message.dlc() as usize) {
            errors.push(e);
        }
    }

    let multiplexors: Vec<&Signal> = signals.iter().filter(|s| s.is_multiplexor()).collect();
    if multiplexors.len() > 1 {
        errors.push(DbcError::InvalidLayout {
            signal: multiplexors[1].name().to_string(),
            details: format!("second multiplexor in message '{}'", message.name()),
        });
    }
    if multiplexors.is_empty() {
        for signal in signals.iter().filter(|s| s.multiplexer_identifier().is_some()) {
            errors.push(DbcError::InvalidLayout {
                signal: signal.name().to_string(),
                details: format!("multiplexed but message '{}' has no multiplexor", message.name()),
            });
        }
    }

    for (i, a) in signals.iter().enumerate() {
        for b in &signals[i + 1..] {
            if coexist(a, b) && steps_overlap(a.steps(), b.steps()) {
                errors.push(DbcError::InvalidLayout {
                    signal: b.name().to_string(),
                    details: format!("overlaps signal '{}'", a.name()),
                });
            }
        }
    }
}
