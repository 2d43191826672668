use crate::dbc::core::strings::quotes_balanced;
use crate::dbc::types::errors::DbcError;

/// One logical DBC record: a keyword line plus any continuation lines.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Record<'a> {
    pub(crate) keyword: &'a str,
    pub(crate) text: String,
    /// 1-based line of the keyword line.
    pub(crate) line: usize,
}

/// Keyword of a record line: everything up to whitespace or `:`.
fn leading_keyword(line: &str) -> &str {
    let end = line
        .find(|c: char| c.is_whitespace() || c == ':')
        .unwrap_or(line.len());
    &line[..end]
}

/// Splits DBC text into records.
///
/// - `SG_` lines are folded into the preceding `BO_` record.
/// - A record whose quotes are still open swallows the following lines.
/// - The indented body of `NS_` is skipped.
/// - Blank lines and `//` lines are ignored.
pub(crate) fn split_records(text: &str) -> Result<Vec<Record<'_>>, DbcError> {
    let mut records: Vec<Record<'_>> = Vec::new();
    let mut in_ns_block = false;

    for (idx, raw) in text.lines().enumerate() {
        // continuation of an open quoted string
        if let Some(last) = records.last_mut()
            && !quotes_balanced(&last.text)
        {
            last.text.push('\n');
            last.text.push_str(raw);
            continue;
        }

        let line = raw.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        if in_ns_block {
            if raw.starts_with(char::is_whitespace) {
                continue;
            }
            in_ns_block = false;
        }

        let keyword = leading_keyword(line);
        match keyword {
            "NS_" => in_ns_block = true,
            "SG_" => {
                match records.last_mut() {
                    Some(last) if last.keyword == "BO_" => {
                        last.text.push('\n');
                        last.text.push_str(line);
                    }
                    _ => {
                        return Err(DbcError::malformed(
                            "SG_",
                            format!("line {}: signal outside of a message", idx + 1),
                        ));
                    }
                }
                continue;
            }
            _ => {}
        }
        records.push(Record {
            keyword,
            text: line.to_string(),
            line: idx + 1,
        });
    }

    Ok(records)
}
