// Utilities for quoted strings and number formatting in DBC text.
//
// These helpers support escaped quotes (\") and multi-line quoted strings,
// which are common in CM_ comments or attribute values.

// Count unescaped double quotes in a string.
// A quote is considered escaped if immediately preceded by an odd number of backslashes.
pub(crate) fn count_unescaped_quotes(s: &str) -> usize {
    let mut count = 0usize;
    let mut backslashes = 0usize;
    for ch in s.chars() {
        if ch == '\\' {
            backslashes += 1;
            continue;
        }
        if ch == '"' && backslashes % 2 == 0 {
            count += 1;
        }
        backslashes = 0;
    }
    count
}

// True when every opened quoted segment is closed.
pub(crate) fn quotes_balanced(s: &str) -> bool {
    count_unescaped_quotes(s) % 2 == 0
}

/// Escape `"` and `\` so the string can sit between DBC quotes.
pub(crate) fn escape_dbc_string(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Quote and escape a string for output.
pub(crate) fn quote(input: &str) -> String {
    format!("\"{}\"", escape_dbc_string(input))
}

/// Shortest decimal form that parses back to the same `f64`.
pub(crate) fn format_f64(value: f64) -> String {
    if value == 0.0 {
        // no "-0"
        return "0".to_string();
    }
    format!("{}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_unescaped_quotes() {
        assert_eq!(count_unescaped_quotes("\"a\""), 2);
        assert_eq!(count_unescaped_quotes("\\\"a\\\""), 0);
        assert!(quotes_balanced("before \"x\" after"));
        assert!(!quotes_balanced("before \"x without end"));
    }

    #[test]
    fn test_escape_roundtrip_chars() {
        assert_eq!(escape_dbc_string(r#"say "hi" \o/"#), r#"say \"hi\" \\o/"#);
        assert_eq!(quote("km/h"), "\"km/h\"");
    }

    #[test]
    fn test_format_f64() {
        assert_eq!(format_f64(1.0), "1");
        assert_eq!(format_f64(-0.0), "0");
        assert_eq!(format_f64(0.1), "0.1");
        assert_eq!(format_f64(6553.5), "6553.5");
        assert_eq!(format_f64(1e-5).parse::<f64>().unwrap(), 1e-5);
    }
}
