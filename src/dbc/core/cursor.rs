use std::str::FromStr;

use crate::dbc::types::errors::DbcError;

/// Characters that end a bare token even without surrounding whitespace.
const DELIMITERS: &[char] = &[':', ';', ',', '|', '@', '(', ')', '[', ']'];

/// Forward-only scanner over the text of one DBC record.
///
/// Tolerant to inconsistent spacing: every read skips leading whitespace
/// (including newlines of multi-line records) before looking at the input.
#[derive(Debug, Clone)]
pub(crate) struct TextCursor<'a> {
    text: &'a str,
    pos: usize,
    record: &'static str,
}

impl<'a> TextCursor<'a> {
    /// `record` names the record kind for error messages (e.g. `"SG_"`).
    pub(crate) fn new(text: &'a str, record: &'static str) -> Self {
        Self {
            text,
            pos: 0,
            record,
        }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    pub(crate) fn skip_whitespace(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    pub(crate) fn error(&self, details: impl Into<String>) -> DbcError {
        DbcError::malformed(self.record, details)
    }

    /// Skips the record keyword and any amount of whitespace after it.
    pub(crate) fn expect_keyword(&mut self, keyword: &str) -> Result<(), DbcError> {
        self.skip_whitespace();
        let rest = self.rest();
        let ends_cleanly = rest
            .get(keyword.len()..)
            .and_then(|after| after.chars().next())
            .is_none_or(|c| c.is_whitespace() || DELIMITERS.contains(&c) || c == '"');
        if rest.starts_with(keyword) && ends_cleanly {
            self.pos += keyword.len();
            Ok(())
        } else {
            Err(self.error(format!("expected keyword {}", keyword)))
        }
    }

    /// Consumes `keyword` if it is the next token.
    pub(crate) fn eat_keyword(&mut self, keyword: &str) -> bool {
        let saved = self.pos;
        if self.expect_keyword(keyword).is_ok() {
            true
        } else {
            self.pos = saved;
            false
        }
    }

    pub(crate) fn peek_char(&mut self) -> Option<char> {
        self.skip_whitespace();
        self.rest().chars().next()
    }

    /// Next character, without skipping whitespace first.
    pub(crate) fn next_raw_char(&mut self) -> Option<char> {
        let c = self.rest().chars().next()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    pub(crate) fn eat_char(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_char(&mut self, expected: char) -> Result<(), DbcError> {
        if self.eat_char(expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", expected)))
        }
    }

    /// Next bare token: a run of characters up to whitespace or a delimiter.
    pub(crate) fn next_token(&mut self) -> Option<&'a str> {
        self.skip_whitespace();
        let rest = self.rest();
        let end = rest
            .find(|c: char| c.is_whitespace() || DELIMITERS.contains(&c) || c == '"')
            .unwrap_or(rest.len());
        if end == 0 {
            return None;
        }
        self.pos += end;
        Some(&rest[..end])
    }

    pub(crate) fn expect_token(&mut self, what: &str) -> Result<&'a str, DbcError> {
        self.next_token()
            .ok_or_else(|| self.error(format!("missing {}", what)))
    }

    /// Reads a quoted string, unescaping `\"` and `\\`.
    pub(crate) fn next_quoted(&mut self) -> Result<String, DbcError> {
        if !self.eat_char('"') {
            return Err(self.error("expected quoted string"));
        }
        let mut out = String::new();
        let mut escaped = false;
        while let Some(c) = self.next_raw_char() {
            if escaped {
                // only `\"` and `\\` are escapes, other backslashes are literal
                if c != '"' && c != '\\' {
                    out.push('\\');
                }
                out.push(c);
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                return Ok(out);
            } else {
                out.push(c);
            }
        }
        Err(self.error("unterminated quoted string"))
    }

    pub(crate) fn next_number<T: FromStr>(&mut self, field: &'static str) -> Result<T, DbcError> {
        let token = self.expect_token(field)?;
        parse_number(token, field)
    }

    /// Consumes an optional trailing `;` and checks nothing else follows.
    pub(crate) fn finish(&mut self) -> Result<(), DbcError> {
        self.eat_char(';');
        self.skip_whitespace();
        if self.rest().is_empty() {
            Ok(())
        } else {
            Err(self.error(format!("unexpected trailing text '{}'", self.rest())))
        }
    }

    pub(crate) fn is_at_end(&mut self) -> bool {
        self.skip_whitespace();
        self.rest().is_empty()
    }
}

/// Strict base-10 conversion of a single token.
pub(crate) fn parse_number<T: FromStr>(token: &str, field: &'static str) -> Result<T, DbcError> {
    token.parse::<T>().map_err(|_| DbcError::MalformedNumber {
        field,
        token: token.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_and_delimiters() {
        let mut c = TextCursor::new("SG_ Speed : 0|16@1+ (0.1,-5)", "SG_");
        c.expect_keyword("SG_").unwrap();
        assert_eq!(c.next_token(), Some("Speed"));
        c.expect_char(':').unwrap();
        assert_eq!(c.next_number::<u16>("start").unwrap(), 0);
        c.expect_char('|').unwrap();
        assert_eq!(c.next_token(), Some("16"));
        c.expect_char('@').unwrap();
        assert_eq!(c.next_raw_char(), Some('1'));
        assert_eq!(c.next_raw_char(), Some('+'));
        c.expect_char('(').unwrap();
        assert_eq!(c.next_number::<f64>("factor").unwrap(), 0.1);
        c.expect_char(',').unwrap();
        assert_eq!(c.next_number::<f64>("offset").unwrap(), -5.0);
        c.expect_char(')').unwrap();
        assert!(c.is_at_end());
    }

    #[test]
    fn test_keyword_must_end_cleanly() {
        let mut c = TextCursor::new("BA_DEF_DEF_  \"X\" 1;", "BA_DEF_");
        assert!(c.expect_keyword("BA_DEF_").is_err());
        assert!(c.eat_keyword("BA_DEF_DEF_"));
        assert_eq!(c.next_quoted().unwrap(), "X");
    }

    #[test]
    fn test_quoted_with_escapes_and_newlines() {
        let mut c = TextCursor::new("\"a \\\"b\\\"\nc\";", "CM_");
        assert_eq!(c.next_quoted().unwrap(), "a \"b\"\nc");
        c.finish().unwrap();
    }

    #[test]
    fn test_lone_backslash_kept() {
        let mut c = TextCursor::new(r#""see C:\temp\new" "a\\b""#, "CM_");
        assert_eq!(c.next_quoted().unwrap(), r"see C:\temp\new");
        assert_eq!(c.next_quoted().unwrap(), r"a\b");
        c.finish().unwrap();
    }

    #[test]
    fn test_malformed_number() {
        let mut c = TextCursor::new("12x", "BO_");
        assert_eq!(
            c.next_number::<u32>("id"),
            Err(DbcError::MalformedNumber {
                field: "id",
                token: "12x".to_string()
            })
        );
    }

    #[test]
    fn test_unterminated_quote() {
        let mut c = TextCursor::new("\"open", "CM_");
        assert!(matches!(
            c.next_quoted(),
            Err(DbcError::MalformedRecord { record: "CM_", .. })
        ));
    }
}
