//! Literal normalization.
//!
//! Every text literal that ends up inside generated SQL goes through
//! [`normalize`] first. The canonical form is lossy: case, quotes and
//! formatting whitespace are discarded, so equality and LIKE comparisons
//! become robust to free-text data entry. Imported survey values are stored in
//! the same canonical form by the ingestion pipeline.
//!
//! ```
//! use indicator_sql::normalize::normalize;
//!
//! assert_eq!(normalize(Some(" Café\t\n ")), Some("café".to_string()));
//! assert_eq!(normalize(None), None);
//! ```

use serde_json::Value;
use unicode_normalization::UnicodeNormalization;

/// Normalize an optional piece of text.
///
/// Returns `None` (the NULL marker) for `None` input and for input that is
/// empty once normalized.
pub fn normalize(value: Option<&str>) -> Option<String> {
    value.and_then(normalize_text)
}

/// Normalize a piece of text, see [`normalize`].
pub fn normalize_text(value: &str) -> Option<String> {
    let folded: String = value
        .nfkc()
        .map(|c| match c {
            '\r' | '\n' | '\t' | '\'' | '"' => ' ',
            other => other,
        })
        .filter(|c| !is_invisible_control(*c))
        .collect::<String>()
        .to_lowercase();

    let collapsed = folded.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Normalize any JSON scalar.
///
/// Numbers and booleans use their JSON text form. Arrays and objects are not
/// scalars and yield `None`.
pub fn normalize_scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Array(_) | Value::Object(_) => None,
        Value::String(s) => normalize_text(s),
        Value::Bool(b) => normalize_text(&b.to_string()),
        Value::Number(n) => normalize_text(&n.to_string()),
    }
}

/// Wrap text in single quotes, doubling embedded quotes.
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Control (Cc) and common format (Cf) characters.
fn is_invisible_control(c: char) -> bool {
    c.is_control()
        || matches!(
            c,
            '\u{00AD}'
                | '\u{061C}'
                | '\u{180E}'
                | '\u{200B}'..='\u{200F}'
                | '\u{202A}'..='\u{202E}'
                | '\u{2060}'..='\u{2064}'
                | '\u{2066}'..='\u{206F}'
                | '\u{FEFF}'
                | '\u{FFF9}'..='\u{FFFB}'
        )
}
